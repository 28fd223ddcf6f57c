//! Serializable view of a simulated card

use awp_core::{Algorithm, EfStructure, FileType, KeyId, Path};
use serde::Serialize;

/// Card content at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardSnapshot {
    /// Files in tree order
    pub files: Vec<FileEntry>,
    /// PIN reference data, secrets omitted
    pub pins: Vec<PinEntry>,
    /// Key material, secrets omitted
    pub keys: Vec<KeyEntry>,
    /// Application registry resets
    pub resets: usize,
    /// Calls received
    pub calls: usize,
}

/// A file on the card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// Absolute path
    pub path: Path,
    /// Kind of node
    #[serde(rename = "type")]
    pub file_type: FileType,
    /// Declared size
    pub size: usize,
    /// Structure tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ef_structure: Option<EfStructure>,
    /// Content as hex, if any was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// A PIN slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinEntry {
    /// PIN reference
    pub reference: u8,
    /// DF the PIN was created in
    pub path: Option<Path>,
    /// Attempts allowed
    pub tries: u8,
    /// Attempts allowed for the attached PUK
    pub puk_tries: Option<u8>,
}

/// A key file holding key material
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyEntry {
    /// Key file
    pub path: Path,
    /// Algorithm
    pub algorithm: Algorithm,
    /// Modulus length, zero for DSA
    pub modulus_bits: usize,
    /// Object id of imported keys
    pub id: Option<KeyId>,
    /// Whether the key was generated on the card
    pub generated: bool,
}
