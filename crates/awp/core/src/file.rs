//! File descriptors and access conditions

use std::collections::BTreeMap;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::path::{FileId, Path};

/// Kind of file system node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileType {
    /// Dedicated file (directory)
    Df,
    /// Elementary file readable through the file system
    WorkingEf,
    /// Elementary file holding card-internal objects such as keys
    InternalEf,
}

/// Structure tag of an elementary file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EfStructure {
    /// Transparent binary file
    Transparent,
    /// Linear file with fixed-size records
    LinearFixed,
    /// Linear file with variable-size records
    LinearVariable,
    /// Cyclic record file
    Cyclic,
    /// RSA public key
    RsaPublic,
    /// RSA private key, straightforward method
    RsaSfm,
    /// RSA private key in CRT form
    RsaCrt,
    /// DSA public key
    DsaPublic,
    /// DSA private key
    DsaPrivate,
    /// DES key
    Des,
}

impl EfStructure {
    /// Card-level key structure code for internal EFs
    ///
    /// Returns `None` for structures that do not describe key material.
    pub const fn key_code(self) -> Option<u8> {
        match self {
            Self::RsaPublic => Some(0x01),
            Self::RsaSfm => Some(0x02),
            Self::RsaCrt => Some(0x04),
            Self::DsaPublic => Some(0x05),
            Self::DsaPrivate => Some(0x06),
            Self::Des => Some(0x80),
            Self::Transparent | Self::LinearFixed | Self::LinearVariable | Self::Cyclic => None,
        }
    }

    /// Structure for a card-level key structure code
    pub const fn from_key_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::RsaPublic),
            0x02 => Some(Self::RsaSfm),
            0x04 => Some(Self::RsaCrt),
            0x05 => Some(Self::DsaPublic),
            0x06 => Some(Self::DsaPrivate),
            0x80 => Some(Self::Des),
            _ => None,
        }
    }
}

/// Operation guarded by an access condition
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AclOperation {
    /// Select the file
    #[display("SELECT")]
    Select,
    /// Read file content
    #[display("READ")]
    Read,
    /// Update file content or key material
    #[display("UPDATE")]
    Update,
    /// Delete a file
    #[display("DELETE")]
    Delete,
    /// Create a child file
    #[display("CREATE")]
    Create,
    /// Use cryptographic services of a DF
    #[display("CRYPTO")]
    Crypto,
    /// Encipher with a public key
    #[display("PSO-ENCRYPT")]
    PsoEncrypt,
    /// Decipher with a private key
    #[display("PSO-DECRYPT")]
    PsoDecrypt,
    /// Compute a signature
    #[display("PSO-COMPUTE-SIGNATURE")]
    PsoComputeSignature,
    /// Verify a signature
    #[display("PSO-VERIFY-SIGNATURE")]
    PsoVerifySignature,
    /// Internal authentication
    #[display("INTERNAL-AUTHENTICATE")]
    InternalAuthenticate,
    /// External authentication
    #[display("EXTERNAL-AUTHENTICATE")]
    ExternalAuthenticate,
}

/// Authentication method required for an operation
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AclMethod {
    /// Always allowed
    #[display("NONE")]
    None,
    /// Requires verification of the card holder PIN with this reference
    #[display("CHV{_0:02X}")]
    Chv(u8),
    /// Never allowed
    #[display("NEVER")]
    Never,
}

/// Access control list of a file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Acl(BTreeMap<AclOperation, AclMethod>);

impl Acl {
    /// Create an empty ACL
    pub fn new() -> Self {
        Self::default()
    }

    /// Access condition of an operation, if one is defined
    pub fn get(&self, operation: AclOperation) -> Option<AclMethod> {
        self.0.get(&operation).copied()
    }

    /// Replace the access condition of an operation
    pub fn set(&mut self, operation: AclOperation, method: AclMethod) {
        self.0.insert(operation, method);
    }

    /// Builder-style [`Acl::set`]
    pub fn with(mut self, operation: AclOperation, method: AclMethod) -> Self {
        self.set(operation, method);
        self
    }

    /// Whether no access condition is defined
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Description of a file, as resolved from a profile or selected on the card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Absolute path
    pub path: Path,
    /// File identifier, normally the trailing component of `path`
    pub id: FileId,
    /// Size in bytes, or modulus length in bits for key files
    #[serde(default)]
    pub size: usize,
    /// Kind of node
    #[serde(rename = "type")]
    pub file_type: FileType,
    /// Structure tag for elementary files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ef_structure: Option<EfStructure>,
    /// Access conditions
    #[serde(default, skip_serializing_if = "Acl::is_empty")]
    pub acl: Acl,
}

impl FileDescriptor {
    /// Create a descriptor whose identifier is the trailing component of `path`
    pub fn new(path: Path, file_type: FileType, size: usize) -> Self {
        let id = path.file_id().unwrap_or_default();
        Self {
            path,
            id,
            size,
            file_type,
            ef_structure: None,
            acl: Acl::new(),
        }
    }

    /// Builder-style structure tag
    pub fn with_structure(mut self, structure: EfStructure) -> Self {
        self.ef_structure = Some(structure);
        self
    }

    /// Builder-style ACL
    pub fn with_acl(mut self, acl: Acl) -> Self {
        self.acl = acl;
        self
    }

    /// Whether this is a directory
    pub fn is_df(&self) -> bool {
        self.file_type == FileType::Df
    }

    /// Path of the enclosing DF
    pub fn parent(&self) -> Option<Path> {
        self.path.parent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acl_display_and_override() {
        let mut acl = Acl::new()
            .with(AclOperation::Update, AclMethod::Chv(0x81))
            .with(AclOperation::PsoEncrypt, AclMethod::Never);
        acl.set(AclOperation::PsoEncrypt, AclMethod::None);

        assert_eq!(acl.get(AclOperation::Update), Some(AclMethod::Chv(0x81)));
        assert_eq!(acl.get(AclOperation::PsoEncrypt), Some(AclMethod::None));
        assert_eq!(acl.get(AclOperation::Delete), None);
        assert_eq!(AclMethod::Chv(0x81).to_string(), "CHV81");
        assert_eq!(AclOperation::PsoVerifySignature.to_string(), "PSO-VERIFY-SIGNATURE");
    }

    #[test]
    fn test_key_codes() {
        assert_eq!(EfStructure::RsaCrt.key_code(), Some(0x04));
        assert_eq!(EfStructure::RsaPublic.key_code(), Some(0x01));
        assert_eq!(EfStructure::Transparent.key_code(), None);
        assert_eq!(EfStructure::from_key_code(0x04), Some(EfStructure::RsaCrt));
        assert_eq!(EfStructure::from_key_code(0x03), None);
    }

    #[test]
    fn test_descriptor_from_json() {
        let json = r#"{
            "path": "3F0050119001",
            "id": "9001",
            "size": 1024,
            "type": "internal-ef",
            "acl": { "update": { "chv": 129 }, "delete": "none" }
        }"#;
        let file: FileDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(file.id, FileId::new(0x9001));
        assert_eq!(file.file_type, FileType::InternalEf);
        assert_eq!(file.ef_structure, None);
        assert_eq!(file.acl.get(AclOperation::Update), Some(AclMethod::Chv(0x81)));
        assert_eq!(file.parent(), Path::from_hex("3F005011").ok());
    }
}
