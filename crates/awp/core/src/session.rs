//! Card session and its cursor
//!
//! The card exposes one currently selected file and one authentication state,
//! both threaded implicitly through every command. [`Session`] owns the card
//! handle together with a [`Cursor`] that records that state explicitly, so
//! every protocol step operates on `&mut Session` and exactly one caller can
//! drive the card at a time.

use std::collections::BTreeSet;

use tracing::{debug, trace, warn};

use crate::card::Card;
use crate::control::{ControlRequest, ControlResponse};
use crate::file::{AclOperation, FileDescriptor};
use crate::path::{FileId, Path};
use crate::{Error, Result, ResultExt};

/// Selection and authorization state of a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    selected: Option<Path>,
    authorized: BTreeSet<(Path, AclOperation)>,
}

impl Cursor {
    /// Path of the currently selected file
    pub const fn selected(&self) -> Option<&Path> {
        self.selected.as_ref()
    }

    /// Whether `operation` has been authorized on `path` in this session
    pub fn is_authorized(&self, path: &Path, operation: AclOperation) -> bool {
        self.authorized.contains(&(path.clone(), operation))
    }
}

/// Exclusive personalization session over a card
#[derive(Debug)]
pub struct Session<C> {
    card: C,
    cursor: Cursor,
}

impl<C: Card> Session<C> {
    /// Open a session over `card`
    pub fn new(card: C) -> Self {
        Self {
            card,
            cursor: Cursor::default(),
        }
    }

    /// The underlying card
    pub const fn card(&self) -> &C {
        &self.card
    }

    /// Mutable access to the underlying card
    ///
    /// Commands issued directly on the card bypass the cursor.
    pub fn card_mut(&mut self) -> &mut C {
        &mut self.card
    }

    /// Current selection and authorization state
    pub const fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Select the file at `path`
    pub fn select(&mut self, path: &Path) -> Result<FileDescriptor> {
        trace!(%path, "select");
        let file = self.card.select(path)?;
        self.cursor.selected = Some(path.clone());
        Ok(file)
    }

    /// Satisfy the access condition of `operation` on `file`
    pub fn authenticate(&mut self, file: &FileDescriptor, operation: AclOperation) -> Result<()> {
        trace!(path = %file.path, %operation, "authenticate");
        self.card.authenticate(file, operation)?;
        self.cursor.authorized.insert((file.path.clone(), operation));
        Ok(())
    }

    /// Create `file` inside the parent DF
    pub fn create(&mut self, file: &FileDescriptor) -> Result<()> {
        debug!(path = %file.path, file_type = ?file.file_type, size = file.size, "create");
        self.card.create(file)
    }

    /// Delete child `id` of the currently selected DF
    pub fn delete_child(&mut self, id: FileId) -> Result<()> {
        let Some(parent) = self.cursor.selected.clone() else {
            return Err(Error::InvalidArguments("no DF selected for delete"));
        };
        debug!(%parent, %id, "delete");
        self.card.delete(id)?;
        let deleted = parent.join(id)?;
        self.cursor
            .authorized
            .retain(|(path, _)| path != &deleted && !path.is_descendant_of(&deleted));
        Ok(())
    }

    /// Replace the content of `file`
    pub fn update(&mut self, file: &FileDescriptor, data: &[u8]) -> Result<()> {
        trace!(path = %file.path, len = data.len(), "update");
        self.card.update(file, data)
    }

    /// Issue a card control request
    pub fn control(&mut self, request: &ControlRequest) -> Result<ControlResponse> {
        self.card.control(request)
    }

    /// Drop the card's cached application registry
    pub fn reset_applications(&mut self) -> Result<()> {
        debug!("reset application registry");
        self.card.reset_applications()
    }

    /// Select the parent of `file`, authorize CREATE on it and create `file`
    pub fn create_file(&mut self, file: &FileDescriptor) -> Result<()> {
        let parent_path = file
            .parent()
            .ok_or(Error::InvalidArguments("file has no parent DF"))?;
        let parent = self
            .select(&parent_path)
            .context(format!("Cannot select parent of {}", file.path))?;
        self.authenticate(&parent, AclOperation::Create)?;
        self.create(file)
    }

    /// Write `data` to `file`, creating the file if it does not exist yet
    pub fn update_file(&mut self, file: &FileDescriptor, data: &[u8]) -> Result<()> {
        let selected = match self.select(&file.path) {
            Ok(selected) => selected,
            Err(e) if e.is_file_not_found() => {
                warn!(path = %file.path, "File does not exist, creating it");
                self.create_file(file)?;
                self.select(&file.path)?
            }
            Err(e) => return Err(e),
        };
        if data.len() > selected.size {
            return Err(Error::InvalidArguments("data does not fit the file"));
        }
        self.authenticate(&selected, AclOperation::Update)?;
        self.update(&selected, data)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use bytes::Bytes;

    use super::*;
    use crate::control::{CardControl, Opcode};
    use crate::file::FileType;
    use crate::card::CardFileSystem;

    #[derive(Debug, Default)]
    struct MockCard {
        files: BTreeMap<Path, FileDescriptor>,
        calls: Vec<String>,
    }

    impl CardFileSystem for MockCard {
        fn select(&mut self, path: &Path) -> Result<FileDescriptor> {
            self.calls.push(format!("select {path}"));
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| Error::FileNotFound(path.clone()))
        }

        fn create(&mut self, file: &FileDescriptor) -> Result<()> {
            self.calls.push(format!("create {}", file.path));
            self.files.insert(file.path.clone(), file.clone());
            Ok(())
        }

        fn delete(&mut self, id: FileId) -> Result<()> {
            self.calls.push(format!("delete {id}"));
            Ok(())
        }

        fn update(&mut self, file: &FileDescriptor, data: &[u8]) -> Result<()> {
            self.calls.push(format!("update {} {}", file.path, data.len()));
            Ok(())
        }

        fn authenticate(&mut self, file: &FileDescriptor, operation: AclOperation) -> Result<()> {
            self.calls.push(format!("authenticate {} {operation}", file.path));
            Ok(())
        }

        fn reset_applications(&mut self) -> Result<()> {
            Ok(())
        }
    }

    impl CardControl for MockCard {
        fn do_control(&mut self, _opcode: Opcode, _payload: &[u8]) -> Result<Bytes> {
            Ok(Bytes::new())
        }
    }

    fn df(hex: &str) -> FileDescriptor {
        FileDescriptor::new(Path::from_hex(hex).unwrap(), FileType::Df, 0)
    }

    #[test]
    fn test_update_file_creates_missing_file() {
        let mut card = MockCard::default();
        let app_df = df("3F005011");
        card.files.insert(app_df.path.clone(), app_df);
        let mut session = Session::new(card);

        let token_info = FileDescriptor::new(
            Path::from_hex("3F0050111000").unwrap(),
            FileType::WorkingEf,
            16,
        );
        session.update_file(&token_info, &[0u8; 16]).unwrap();

        assert_eq!(
            session.card().calls,
            [
                "select 3F0050111000",
                "select 3F005011",
                "authenticate 3F005011 CREATE",
                "create 3F0050111000",
                "select 3F0050111000",
                "authenticate 3F0050111000 UPDATE",
                "update 3F0050111000 16",
            ]
        );
        assert_eq!(session.cursor().selected(), Some(&token_info.path));
        assert!(
            session
                .cursor()
                .is_authorized(&token_info.path, AclOperation::Update)
        );
    }

    #[test]
    fn test_update_file_rejects_oversized_data() {
        let mut card = MockCard::default();
        let file = FileDescriptor::new(Path::from_hex("3F001000").unwrap(), FileType::WorkingEf, 4);
        card.files.insert(file.path.clone(), file.clone());
        let mut session = Session::new(card);

        let err = session.update_file(&file, &[0u8; 5]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArguments);
    }

    #[test]
    fn test_delete_requires_selection() {
        let mut session = Session::new(MockCard::default());
        assert!(session.delete_child(FileId::new(0x1000)).is_err());

        let app_df = df("3F005011");
        session.card_mut().files.insert(app_df.path.clone(), app_df.clone());
        session.select(&app_df.path).unwrap();
        session.authenticate(&app_df, AclOperation::Delete).unwrap();
        session.delete_child(FileId::new(0x9002)).unwrap();

        assert!(session.cursor().is_authorized(&app_df.path, AclOperation::Delete));
        assert_eq!(session.card().calls.last().unwrap(), "delete 9002");
    }
}
