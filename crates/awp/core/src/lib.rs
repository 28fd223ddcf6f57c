//! Core types and collaborator traits for Oberthur AWP card personalization
//!
//! This crate provides the vocabulary shared by the personalization protocols
//! and the card implementations they drive:
//!
//! - File system model: [`Path`], [`FileId`], [`FileDescriptor`] and its [`Acl`]
//! - Credentials and objects: [`PinCredential`], [`KeyObject`], key material
//! - The fixed-size token metadata record: [`TokenInfo`] and [`TokenState`]
//! - Structured card control messages: [`ControlRequest`] / [`ControlResponse`]
//! - Collaborator traits: [`Profile`], [`CardFileSystem`], [`CardControl`]
//! - The owned card [`Session`], which tracks the selected file and the
//!   authorizations granted so far
//!
//! The card itself (its transport, its cryptographic engine) is only ever
//! reached through the traits.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub use bytes::{Bytes, BytesMut};

pub mod card;
pub mod control;
pub mod error;
pub mod file;
pub mod object;
pub mod path;
pub mod pin;
pub mod profile;
pub mod session;
pub mod token;

pub use card::{Card, CardFileSystem};
pub use control::{CardControl, ControlRequest, ControlResponse, Opcode, PinType};
pub use error::{Error, ErrorKind, Result, ResultExt};
pub use file::{Acl, AclMethod, AclOperation, EfStructure, FileDescriptor, FileType};
pub use object::{Algorithm, DsaKey, KeyId, KeyObject, ObjectType, PrivateKey, PublicKey, RsaCrtKey};
pub use path::{FileId, Path};
pub use pin::{PinCredential, PinFlags, PinPolicy, PinRole};
pub use profile::{Profile, StaticProfile};
pub use session::{Cursor, Session};
pub use token::{TokenFlags, TokenInfo, TokenState};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{Bytes, BytesMut, Error, ErrorKind, Result, ResultExt};

    pub use crate::file::{Acl, AclMethod, AclOperation, EfStructure, FileDescriptor, FileType};
    pub use crate::path::{FileId, Path};

    pub use crate::object::{KeyObject, ObjectType, PrivateKey, PublicKey};
    pub use crate::pin::{PinCredential, PinFlags, PinPolicy, PinRole};
    pub use crate::token::{TokenFlags, TokenInfo, TokenState};

    pub use crate::card::{Card, CardFileSystem};
    pub use crate::control::{CardControl, ControlRequest, ControlResponse, Opcode};
    pub use crate::profile::Profile;
    pub use crate::session::Session;
}
