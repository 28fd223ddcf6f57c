//! PIN credentials, roles and retry policies

use std::fmt;

use derive_more::Display;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::path::Path;

/// PIN attribute flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PinFlags(u32);

impl PinFlags {
    /// Comparison is case sensitive
    pub const CASE_SENSITIVE: Self = Self(0x01);
    /// PIN is local to the application DF
    pub const LOCAL: Self = Self(0x02);
    /// PIN has been initialized
    pub const INITIALIZED: Self = Self(0x10);
    /// PIN unblocks another PIN (a PUK)
    pub const UNBLOCKING: Self = Self(0x40);
    /// Security officer PIN
    pub const SO_PIN: Self = Self(0x80);

    const NAMES: [(Self, &'static str); 5] = [
        (Self::CASE_SENSITIVE, "case-sensitive"),
        (Self::LOCAL, "local"),
        (Self::INITIALIZED, "initialized"),
        (Self::UNBLOCKING, "unblocking"),
        (Self::SO_PIN, "so-pin"),
    ];

    /// No flags set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Whether every flag in `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of both flag sets
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for PinFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Display for PinFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join(", "))
    }
}

impl Serialize for PinFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        names.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PinFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        names.iter().try_fold(Self::empty(), |flags, name| {
            Self::NAMES
                .iter()
                .find(|(_, known)| *known == name.as_str())
                .map(|(flag, _)| flags | *flag)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown PIN flag '{name}'")))
        })
    }
}

/// A PIN or PUK credential being provisioned
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PinCredential {
    /// Human readable label
    #[serde(default)]
    pub label: String,
    /// Card slot number; assigned by the reference allocator when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<u8>,
    /// Role and attribute flags
    #[serde(default)]
    pub flags: PinFlags,
    /// File the credential is created under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Path>,
}

impl PinCredential {
    /// Create a credential with the given flags and no reference
    pub fn new(label: impl Into<String>, flags: PinFlags) -> Self {
        Self {
            label: label.into(),
            reference: None,
            flags,
            path: None,
        }
    }

    /// Builder-style reference
    pub fn with_reference(mut self, reference: u8) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Security officer PIN
    pub const fn is_so_pin(&self) -> bool {
        self.flags.contains(PinFlags::SO_PIN)
    }

    /// Unblocking PIN (PUK)
    pub const fn is_unblocking(&self) -> bool {
        self.flags.contains(PinFlags::UNBLOCKING)
    }

    /// Local to the application DF
    pub const fn is_local(&self) -> bool {
        self.flags.contains(PinFlags::LOCAL)
    }
}

/// Role a PIN plays in the profile
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PinRole {
    /// Security officer PIN
    #[display("so-pin")]
    SoPin,
    /// Security officer PUK
    #[display("so-puk")]
    SoPuk,
    /// Card holder PIN
    #[display("user-pin")]
    UserPin,
    /// Card holder PUK
    #[display("user-puk")]
    UserPuk,
}

/// Retry policy of a PIN role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PinPolicy {
    /// Number of attempts before the PIN blocks
    #[serde(default)]
    pub tries_left: u8,
}

impl PinPolicy {
    /// Create a policy allowing `tries_left` attempts
    pub const fn new(tries_left: u8) -> Self {
        Self { tries_left }
    }
}
