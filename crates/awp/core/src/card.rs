//! Card file system primitives

use std::fmt;

use crate::Result;
use crate::control::CardControl;
use crate::file::{AclOperation, FileDescriptor};
use crate::path::{FileId, Path};

/// Generic file system primitives offered by the card
///
/// The card keeps exactly one currently selected file; [`CardFileSystem::delete`]
/// works relative to it. Higher layers track that state through
/// [`Session`](crate::Session).
pub trait CardFileSystem: fmt::Debug {
    /// Select the file at `path`, making it current
    ///
    /// Fails with [`Error::FileNotFound`](crate::Error::FileNotFound) if nothing
    /// exists there.
    fn select(&mut self, path: &Path) -> Result<FileDescriptor>;

    /// Create `file` inside its parent DF
    fn create(&mut self, file: &FileDescriptor) -> Result<()>;

    /// Delete the child `id` of the currently selected DF
    fn delete(&mut self, id: FileId) -> Result<()>;

    /// Replace the content of a transparent EF
    fn update(&mut self, file: &FileDescriptor, data: &[u8]) -> Result<()>;

    /// Satisfy the access condition protecting `operation` on `file`
    fn authenticate(&mut self, file: &FileDescriptor, operation: AclOperation) -> Result<()>;

    /// Drop the card's cached application registry
    fn reset_applications(&mut self) -> Result<()>;
}

/// A card offering both the file system and the control channel
pub trait Card: CardFileSystem + CardControl {}

impl<T: CardFileSystem + CardControl> Card for T {}
