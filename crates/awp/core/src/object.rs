//! PKCS#15 object types, key objects and key material

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::path::Path;

/// PKCS#15 object type code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectType(u32);

impl ObjectType {
    /// Mask selecting the generic type class
    pub const CLASS_MASK: u32 = 0x0F00;
    /// Bit marking a card-specific variant of a generic type
    pub const DEVICE_SPECIFIC: u32 = 0x1000;

    /// Private key class
    pub const PRKEY: Self = Self(0x100);
    /// RSA private key
    pub const PRKEY_RSA: Self = Self(0x101);
    /// DSA private key
    pub const PRKEY_DSA: Self = Self(0x102);
    /// Public key class
    pub const PUBKEY: Self = Self(0x200);
    /// RSA public key
    pub const PUBKEY_RSA: Self = Self(0x201);
    /// DSA public key
    pub const PUBKEY_DSA: Self = Self(0x202);
    /// Certificate class
    pub const CERT: Self = Self(0x400);
    /// X.509 certificate
    pub const CERT_X509: Self = Self(0x401);
    /// Data object class
    pub const DATA_OBJECT: Self = Self(0x500);

    const NAMES: [(Self, &'static str); 9] = [
        (Self::PRKEY, "private-key"),
        (Self::PRKEY_RSA, "private-rsa"),
        (Self::PRKEY_DSA, "private-dsa"),
        (Self::PUBKEY, "public-key"),
        (Self::PUBKEY_RSA, "public-rsa"),
        (Self::PUBKEY_DSA, "public-dsa"),
        (Self::CERT, "certificate"),
        (Self::CERT_X509, "cert-x509"),
        (Self::DATA_OBJECT, "data-object"),
    ];

    /// Create from the raw code
    pub const fn new(code: u32) -> Self {
        Self(code)
    }

    /// Raw code
    pub const fn code(self) -> u32 {
        self.0
    }

    /// Whether the card-specific bit is set
    pub const fn is_device_specific(self) -> bool {
        self.0 & Self::DEVICE_SPECIFIC != 0
    }

    /// Card-specific variant of this type
    pub const fn device_specific(self) -> Self {
        Self(self.0 | Self::DEVICE_SPECIFIC)
    }

    /// This type with the card-specific bit cleared
    pub const fn without_device_bit(self) -> Self {
        Self(self.0 & !Self::DEVICE_SPECIFIC)
    }

    /// Generic type class
    pub const fn class(self) -> Self {
        Self(self.0 & Self::CLASS_MASK)
    }

    fn name(self) -> Option<&'static str> {
        Self::NAMES
            .iter()
            .find(|(ty, _)| *ty == self)
            .map(|(_, name)| *name)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.without_device_bit().name() {
            Some(name) if self.is_device_specific() => write!(f, "{name} (device specific)"),
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:04X}", self.0),
        }
    }
}

impl Serialize for ObjectType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.name() {
            Some(name) => serializer.serialize_str(name),
            None => serializer.serialize_u32(self.0),
        }
    }
}

impl<'de> Deserialize<'de> for ObjectType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(u32),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Code(code) => Ok(Self(code)),
            Repr::Name(name) => Self::NAMES
                .iter()
                .find(|(_, known)| *known == name.as_str())
                .map(|(ty, _)| *ty)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown object type '{name}'"))),
        }
    }
}

/// Key algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// RSA
    Rsa,
    /// DSA
    Dsa,
}

/// PKCS#15 object identifier
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(#[serde(with = "hex_bytes")] Vec<u8>);

impl KeyId {
    /// Create an identifier from raw bytes
    pub fn new(id: impl Into<Vec<u8>>) -> Self {
        Self(id.into())
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the identifier is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// A key object placed in a card slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyObject {
    /// Object identifier
    pub id: KeyId,
    /// Object type
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    /// Modulus length in bits
    pub modulus_bits: usize,
    /// Path of the key file
    pub path: Path,
    /// Slot number on input, card key reference once the file is created
    #[serde(default)]
    pub key_reference: u8,
}

/// Public key material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    /// Algorithm
    pub algorithm: Algorithm,
    /// Modulus, big-endian
    #[serde(with = "hex_bytes")]
    pub modulus: Vec<u8>,
    /// Public exponent, big-endian
    #[serde(with = "hex_bytes")]
    pub exponent: Vec<u8>,
}

impl PublicKey {
    /// Fixed public exponent used for on-card generation
    pub const RSA_EXPONENT: [u8; 3] = [0x01, 0x00, 0x01];

    /// RSA public key with the fixed exponent
    pub fn rsa(modulus: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm: Algorithm::Rsa,
            modulus: modulus.into(),
            exponent: Self::RSA_EXPONENT.to_vec(),
        }
    }
}

/// RSA private key in CRT form
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
pub struct RsaCrtKey {
    /// Modulus
    #[serde(with = "hex_bytes")]
    pub modulus: Vec<u8>,
    /// Public exponent
    #[serde(with = "hex_bytes")]
    pub public_exponent: Vec<u8>,
    /// First prime
    #[serde(with = "hex_bytes")]
    pub p: Vec<u8>,
    /// Second prime
    #[serde(with = "hex_bytes")]
    pub q: Vec<u8>,
    /// d mod (p - 1)
    #[serde(with = "hex_bytes")]
    pub dmp1: Vec<u8>,
    /// d mod (q - 1)
    #[serde(with = "hex_bytes")]
    pub dmq1: Vec<u8>,
    /// q^-1 mod p
    #[serde(with = "hex_bytes")]
    pub iqmp: Vec<u8>,
}

impl fmt::Debug for RsaCrtKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaCrtKey")
            .field("modulus_bits", &(self.modulus.len() * 8))
            .finish_non_exhaustive()
    }
}

/// DSA private key
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
pub struct DsaKey {
    /// Prime modulus
    #[serde(with = "hex_bytes")]
    pub p: Vec<u8>,
    /// Subgroup order
    #[serde(with = "hex_bytes")]
    pub q: Vec<u8>,
    /// Generator
    #[serde(with = "hex_bytes")]
    pub g: Vec<u8>,
    /// Private value
    #[serde(with = "hex_bytes")]
    pub x: Vec<u8>,
}

impl fmt::Debug for DsaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DsaKey").finish_non_exhaustive()
    }
}

/// Private key material supplied for import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "lowercase")]
pub enum PrivateKey {
    /// RSA key in CRT form
    Rsa(RsaCrtKey),
    /// DSA key
    Dsa(DsaKey),
}

impl PrivateKey {
    /// Algorithm of the key
    pub const fn algorithm(&self) -> Algorithm {
        match self {
            Self::Rsa(_) => Algorithm::Rsa,
            Self::Dsa(_) => Algorithm::Dsa,
        }
    }
}

/// Serde adapter storing byte strings as hex
pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim()).map_err(serde::de::Error::custom)
    }
}
