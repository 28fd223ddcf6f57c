use awp_core::{AclOperation, FileId, Opcode, Path};
use serde::Serialize;

/// A call received by the simulated card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "kebab-case")]
pub enum Call {
    /// File selection
    Select {
        /// Requested path
        path: Path,
    },
    /// File creation
    Create {
        /// Path of the new file
        path: Path,
    },
    /// Deletion of a child of the selected DF
    Delete {
        /// DF selected at the time
        parent: Option<Path>,
        /// Child identifier
        id: FileId,
    },
    /// Content update
    Update {
        /// Updated file
        path: Path,
        /// Bytes written
        len: usize,
    },
    /// Access condition verification
    Authenticate {
        /// Guarded file
        path: Path,
        /// Guarded operation
        operation: AclOperation,
    },
    /// Card control request
    Control {
        /// Request opcode
        opcode: Opcode,
    },
    /// Application registry reset
    ResetApplications,
}

impl Call {
    /// Kind of the call, for matching faults
    pub const fn kind(&self) -> CallKind {
        match self {
            Self::Select { .. } => CallKind::Select,
            Self::Create { .. } => CallKind::Create,
            Self::Delete { .. } => CallKind::Delete,
            Self::Update { .. } => CallKind::Update,
            Self::Authenticate { .. } => CallKind::Authenticate,
            Self::Control { opcode } => CallKind::Control(*opcode),
            Self::ResetApplications => CallKind::ResetApplications,
        }
    }
}

/// Call discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum CallKind {
    Select,
    Create,
    Delete,
    Update,
    Authenticate,
    Control(Opcode),
    ResetApplications,
}
