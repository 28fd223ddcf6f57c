//! Core error type for all personalization operations
//!
//! Every protocol step fails fast with one of these variants. Callers that
//! perform idempotent work (erase, directory creation) inspect
//! [`Error::kind`] to tolerate the specific outcomes they expect, such as
//! [`ErrorKind::FileNotFound`], regardless of any context attached on the way up.

use iso7816_tlv::TlvError;

use crate::control::Opcode;
use crate::file::AclOperation;
use crate::path::Path;

/// Result type for personalization operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type that encompasses all possible errors in the workspace
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The caller supplied arguments the card cannot accept
    #[error("Invalid arguments: {0}")]
    InvalidArguments(&'static str),

    /// The profile lacks a required template or defines it unusably
    #[error("Inconsistent profile: {0}")]
    InconsistentProfile(String),

    /// The operation or object type is not supported by this card family
    #[error("Not supported: {0}")]
    NotSupported(&'static str),

    /// A PIN credential carries a reference the card does not allow for its role
    #[error("Invalid PIN reference {reference:?}: {message}")]
    InvalidPinReference {
        /// Offending reference, if one was assigned
        reference: Option<u8>,
        /// What was expected
        message: &'static str,
    },

    /// A buffer could not be allocated
    #[error("Out of memory")]
    OutOfMemory,

    /// No file exists at the given path
    #[error("File not found: {0}")]
    FileNotFound(Path),

    /// A file already exists at the given path
    #[error("File already exists: {0}")]
    FileAlreadyExists(Path),

    /// The card refused an access condition
    #[error("Security status not satisfied: {operation} on {path}")]
    SecurityStatusNotSatisfied {
        /// File the access condition belongs to
        path: Path,
        /// Operation that was refused
        operation: AclOperation,
    },

    /// The card rejected a card-specific control request
    #[error("Card control request {opcode} failed: {reason}")]
    CardControlFailure {
        /// Opcode of the rejected request
        opcode: Opcode,
        /// Reason reported by the card
        reason: String,
    },

    /// Data returned by the card or stored on it is malformed
    #[error("Invalid data: {0}")]
    InvalidData(&'static str),

    /// TLV encoding error
    #[error("TLV error: {0}")]
    Tlv(TlvError),

    /// Context error with message and source error
    #[error("{context}: {source}")]
    Context {
        /// Contextual message
        context: String,
        /// Source error
        source: Box<Self>,
    },
}

/// Discriminant of an [`Error`], with any context stripped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ErrorKind {
    InvalidArguments,
    InconsistentProfile,
    NotSupported,
    InvalidPinReference,
    OutOfMemory,
    FileNotFound,
    FileAlreadyExists,
    SecurityStatusNotSatisfied,
    CardControlFailure,
    InvalidData,
    Tlv,
}

impl Error {
    /// Create a new error with context information
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an inconsistent profile error
    pub fn inconsistent_profile<S: Into<String>>(message: S) -> Self {
        Self::InconsistentProfile(message.into())
    }

    /// Create an inconsistent profile error for a file name the profile lacks
    pub fn missing_template(name: &str) -> Self {
        Self::InconsistentProfile(format!("profile does not define '{name}'"))
    }

    /// Create an invalid PIN reference error
    pub const fn invalid_pin_reference(reference: Option<u8>, message: &'static str) -> Self {
        Self::InvalidPinReference { reference, message }
    }

    /// Create a card control failure
    pub fn control_failure<S: Into<String>>(opcode: Opcode, reason: S) -> Self {
        Self::CardControlFailure {
            opcode,
            reason: reason.into(),
        }
    }

    /// Kind of the innermost error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Context { source, .. } => source.kind(),
            Self::InvalidArguments(_) => ErrorKind::InvalidArguments,
            Self::InconsistentProfile(_) => ErrorKind::InconsistentProfile,
            Self::NotSupported(_) => ErrorKind::NotSupported,
            Self::InvalidPinReference { .. } => ErrorKind::InvalidPinReference,
            Self::OutOfMemory => ErrorKind::OutOfMemory,
            Self::FileNotFound(_) => ErrorKind::FileNotFound,
            Self::FileAlreadyExists(_) => ErrorKind::FileAlreadyExists,
            Self::SecurityStatusNotSatisfied { .. } => ErrorKind::SecurityStatusNotSatisfied,
            Self::CardControlFailure { .. } => ErrorKind::CardControlFailure,
            Self::InvalidData(_) => ErrorKind::InvalidData,
            Self::Tlv(_) => ErrorKind::Tlv,
        }
    }

    /// Whether the innermost error is [`ErrorKind::FileNotFound`]
    pub fn is_file_not_found(&self) -> bool {
        self.kind() == ErrorKind::FileNotFound
    }

    /// Whether the innermost error is [`ErrorKind::FileAlreadyExists`]
    pub fn is_already_exists(&self) -> bool {
        self.kind() == ErrorKind::FileAlreadyExists
    }
}

impl From<TlvError> for Error {
    fn from(error: TlvError) -> Self {
        Self::Tlv(error)
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Self::OutOfMemory
    }
}

/// Extension trait for Result with personalization errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, context: S) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context<S: Into<String>>(self, context: S) -> Self {
        self.map_err(|e| e.with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strips_context() {
        let path = Path::from_hex("3F005011").unwrap();
        let err: Result<()> = Err(Error::FileNotFound(path));
        let err = err
            .context("Cannot select parent")
            .context("Failed to erase card")
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert!(err.is_file_not_found());
        assert!(!err.is_already_exists());
        assert_eq!(
            err.to_string(),
            "Failed to erase card: Cannot select parent: File not found: 3F005011"
        );
    }

    #[test]
    fn test_try_reserve_maps_to_out_of_memory() {
        let mut buffer: Vec<u8> = Vec::new();
        let err: Error = buffer.try_reserve_exact(usize::MAX).unwrap_err().into();
        assert_eq!(err, Error::OutOfMemory);
    }
}
