//! Card file system paths
//!
//! A [`Path`] is the concatenation of 2-byte file identifiers from the master
//! file down to the addressed file, e.g. `3F00 5011 9002 3001`.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Two-byte file identifier
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FileId(u16);

impl FileId {
    /// Identifier of the master file
    pub const MF: Self = Self(0x3F00);

    /// Create a file identifier from its numeric value
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Create a file identifier from its high and low bytes
    pub const fn from_bytes(hi: u8, lo: u8) -> Self {
        Self(u16::from_be_bytes([hi, lo]))
    }

    /// Numeric value
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Big-endian byte representation
    pub const fn to_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    /// This identifier with `bits` OR-ed into its low byte
    pub const fn or_low_byte(self, bits: u8) -> Self {
        Self(self.0 | bits as u16)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({:04X})", self.0)
    }
}

impl From<u16> for FileId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

impl Serialize for FileId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FileId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        u16::from_str_radix(s.trim(), 16)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// Absolute path of a file on the card
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Path(Vec<u8>);

impl Path {
    /// Maximum length of a path in bytes
    pub const MAX_LEN: usize = 16;

    /// Create a path from its raw bytes
    ///
    /// The byte length must be even and at most [`Path::MAX_LEN`].
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() % 2 != 0 {
            return Err(Error::InvalidArguments("path length must be a multiple of two"));
        }
        if bytes.len() > Self::MAX_LEN {
            return Err(Error::InvalidArguments("path is too long"));
        }
        Ok(Self(bytes))
    }

    /// Parse a path from hex, ignoring `/`, `:` and whitespace separators
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits: String = s
            .chars()
            .filter(|c| !matches!(c, '/' | ':') && !c.is_whitespace())
            .collect();
        let bytes =
            hex::decode(digits).map_err(|_| Error::InvalidArguments("path is not valid hex"))?;
        Self::new(bytes)
    }

    /// Raw bytes of the path
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the path is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of file identifier components
    pub fn depth(&self) -> usize {
        self.0.len() / 2
    }

    /// Path of the enclosing DF (this path minus its trailing identifier)
    ///
    /// Returns `None` for the master file or an empty path.
    pub fn parent(&self) -> Option<Self> {
        (self.0.len() > 2).then(|| Self(self.0[..self.0.len() - 2].to_vec()))
    }

    /// Identifier of the addressed file
    pub fn file_id(&self) -> Option<FileId> {
        match self.0.as_slice() {
            [.., hi, lo] => Some(FileId::from_bytes(*hi, *lo)),
            _ => None,
        }
    }

    /// Last byte of the path
    pub fn last_byte(&self) -> Option<u8> {
        self.0.last().copied()
    }

    /// Child path of this DF
    pub fn join(&self, id: FileId) -> Result<Self> {
        let mut bytes = self.0.clone();
        bytes.extend_from_slice(&id.to_bytes());
        Self::new(bytes)
    }

    /// Same path with its trailing identifier replaced
    pub fn with_file_id(&self, id: FileId) -> Self {
        let mut bytes = self.0.clone();
        match bytes.len() {
            0 => bytes.extend_from_slice(&id.to_bytes()),
            n => bytes[n - 2..].copy_from_slice(&id.to_bytes()),
        }
        Self(bytes)
    }

    /// OR `bits` into the last byte of the path
    pub fn or_last_byte(&mut self, bits: u8) {
        if let Some(last) = self.0.last_mut() {
            *last |= bits;
        }
    }

    /// Whether `self` lies strictly below `ancestor`
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        self.0.len() > ancestor.0.len() && self.0.starts_with(&ancestor.0)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(&self.0))
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({})", hex::encode_upper(&self.0))
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
