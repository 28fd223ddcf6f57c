//! Token metadata: status flags and the fixed-size TokenInfo record
//!
//! The record stored on the card has the layout
//!
//! ```text
//! [0, size-4)        label, space padded
//! [size-4, size-2)   zero
//! [size-2, size)     device flags, big-endian
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Abstract PKCS#15 token status flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenFlags(u32);

impl TokenFlags {
    /// Token is read only
    pub const READ_ONLY: Self = Self(0x0001);
    /// Login is required before private objects can be used
    pub const LOGIN_REQUIRED: Self = Self(0x0002);
    /// Token has a random number generator
    pub const PRN_GENERATION: Self = Self(0x0004);
    /// Token is EID compliant
    pub const EID_COMPLIANT: Self = Self(0x0008);
    /// The user PIN has been provisioned
    pub const USER_PIN_INITIALIZED: Self = Self(0x0001_0000);
    /// The token structure has been created
    pub const TOKEN_INITIALIZED: Self = Self(0x0002_0000);

    /// Flags managed by personalization
    pub const PERSONALIZATION_MASK: Self = Self(
        Self::PRN_GENERATION.0
            | Self::LOGIN_REQUIRED.0
            | Self::USER_PIN_INITIALIZED.0
            | Self::TOKEN_INITIALIZED.0,
    );

    // (abstract flag, device bit)
    const DEVICE_MAP: [(Self, u16); 4] = [
        (Self::PRN_GENERATION, 0x0001),
        (Self::LOGIN_REQUIRED, 0x0004),
        (Self::USER_PIN_INITIALIZED, 0x0008),
        (Self::TOKEN_INITIALIZED, 0x0400),
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

    /// Intersection of both flag sets
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Flags of `self` that are not in `other`
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Card-specific encoding of the personalization flags
    pub fn to_device(self) -> u16 {
        Self::DEVICE_MAP
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .fold(0, |device, (_, bit)| device | bit)
    }

    /// Decode the card-specific encoding; unknown device bits are ignored
    pub fn from_device(device: u16) -> Self {
        Self::DEVICE_MAP
            .iter()
            .filter(|(_, bit)| device & bit != 0)
            .fold(Self::empty(), |flags, (flag, _)| flags | *flag)
    }
}

impl std::ops::BitOr for TokenFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Display for TokenFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::READ_ONLY, "read-only"),
            (Self::LOGIN_REQUIRED, "login-required"),
            (Self::PRN_GENERATION, "prn-generation"),
            (Self::EID_COMPLIANT, "eid-compliant"),
            (Self::USER_PIN_INITIALIZED, "user-pin-initialized"),
            (Self::TOKEN_INITIALIZED, "token-initialized"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", set.join(" | "))
    }
}

/// Decoded TokenInfo record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    /// Token label
    pub label: String,
    /// Status flags
    pub flags: TokenFlags,
}

impl TokenInfo {
    /// Minimum record size accepted by the card
    pub const MIN_SIZE: usize = 16;
    /// Label used when no other label is available
    pub const DEFAULT_LABEL: &'static str = "OpenSC-Token";

    /// Create a record
    pub fn new(label: impl Into<String>, flags: TokenFlags) -> Self {
        Self {
            label: label.into(),
            flags,
        }
    }

    /// Encode into a record of exactly `size` bytes
    ///
    /// The label is truncated to `size - 4` bytes.
    pub fn encode(&self, size: usize) -> Result<Vec<u8>> {
        if size < Self::MIN_SIZE {
            return Err(Error::inconsistent_profile(format!(
                "token info record of {size} bytes is smaller than {}",
                Self::MIN_SIZE
            )));
        }

        let label_len = size - 4;
        let mut record = Vec::new();
        record.try_reserve_exact(size)?;

        let label = self.label.as_bytes();
        record.extend_from_slice(&label[..label.len().min(label_len)]);
        record.resize(label_len, b' ');
        record.extend_from_slice(&[0, 0]);
        record.extend_from_slice(&self.flags.to_device().to_be_bytes());
        Ok(record)
    }

    /// Decode a record read back from the card
    pub fn decode(record: &[u8]) -> Result<Self> {
        if record.len() < Self::MIN_SIZE {
            return Err(Error::InvalidData("token info record too short"));
        }

        let size = record.len();
        let label = String::from_utf8_lossy(&record[..size - 4])
            .trim_end_matches([' ', '\0'])
            .to_string();
        let device = u16::from_be_bytes([record[size - 2], record[size - 1]]);
        Ok(Self {
            label,
            flags: TokenFlags::from_device(device),
        })
    }
}

/// Live token state shared by every personalization step
///
/// There is a single copy of the status flags; every change goes through
/// [`TokenState::apply_status`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenState {
    /// Label currently held by the card, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    flags: TokenFlags,
}

impl TokenState {
    /// Create a state with the given label and flags
    pub const fn new(label: Option<String>, flags: TokenFlags) -> Self {
        Self { label, flags }
    }

    /// Current status flags
    pub const fn flags(&self) -> TokenFlags {
        self.flags
    }

    /// Replace the personalization-managed flags, keeping all others
    pub fn apply_status(&mut self, status: TokenFlags) {
        let mask = TokenFlags::PERSONALIZATION_MASK;
        self.flags = self.flags.difference(mask) | status.intersection(mask);
    }
}
