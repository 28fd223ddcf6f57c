//! Card-specific control requests
//!
//! Operations the generic file system primitives cannot express (PIN creation,
//! on-card key generation, key import) are sent to the card as structured
//! [`ControlRequest`] messages. Each request is serialized to a constructed
//! BER-TLV template before it crosses the [`CardControl`] boundary:
//!
//! | opcode | template | children |
//! |--------|----------|----------|
//! | create-pin | `A1` | `80` type, `81` reference, `82` PIN, `83` PIN tries, `84` PUK, `85` PUK tries |
//! | generate-key | `A2` | `80` private file id, `81` public file id, `82` exponent, `83` bits |
//! | update-key | `A3` | `80` key structure, `81` object id, `90`.. key components |

use std::fmt;

use bytes::Bytes;
use derive_more::Display;
use iso7816_tlv::ber::{Tag, Tlv, Value};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use zeroize::Zeroizing;

use crate::file::EfStructure;
use crate::object::{DsaKey, KeyId, PrivateKey, RsaCrtKey};
use crate::path::FileId;
use crate::{Error, Result};

/// Template tags
pub mod tags {
    /// Create PIN template
    pub const CREATE_PIN: u8 = 0xA1;
    /// Generate key template
    pub const GENERATE_KEY: u8 = 0xA2;
    /// Update key template
    pub const UPDATE_KEY: u8 = 0xA3;

    /// PIN type / key structure
    pub const TYPE: u8 = 0x80;
    /// PIN reference / object id / public file id
    pub const REFERENCE: u8 = 0x81;
    /// PIN value / exponent
    pub const VALUE: u8 = 0x82;
    /// PIN tries / key bits
    pub const COUNT: u8 = 0x83;
    /// PUK value
    pub const PUK: u8 = 0x84;
    /// PUK tries
    pub const PUK_COUNT: u8 = 0x85;

    /// First key component; RSA uses `90..=96`, DSA `98..=9B`
    pub const COMPONENT_BASE: u8 = 0x90;
    /// First DSA key component
    pub const DSA_COMPONENT_BASE: u8 = 0x98;
}

/// Control request opcode
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Opcode {
    /// Create PIN reference data
    #[display("create-pin")]
    CreatePin,
    /// Generate a key pair on the card
    #[display("generate-key")]
    GenerateKey,
    /// Import private key material
    #[display("update-key")]
    UpdateKey,
}

impl Opcode {
    const fn template(self) -> u8 {
        match self {
            Self::CreatePin => tags::CREATE_PIN,
            Self::GenerateKey => tags::GENERATE_KEY,
            Self::UpdateKey => tags::UPDATE_KEY,
        }
    }

    fn from_template(tag: &Tag) -> Result<Self> {
        [Self::CreatePin, Self::GenerateKey, Self::UpdateKey]
            .into_iter()
            .find(|opcode| Tag::try_from(opcode.template()).is_ok_and(|t| &t == tag))
            .ok_or(Error::InvalidData("unknown control template"))
    }
}

/// PIN type for [`ControlRequest::CreatePin`]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinType {
    /// Card holder verification
    #[display("CHV")]
    Chv,
}

impl PinType {
    const fn code(self) -> u8 {
        match self {
            Self::Chv => 0x01,
        }
    }

    fn from_code(code: u8) -> Result<Self> {
        match code {
            0x01 => Ok(Self::Chv),
            _ => Err(Error::InvalidData("unknown PIN type")),
        }
    }
}

/// Structured card control request
#[derive(Clone, PartialEq, Eq)]
pub enum ControlRequest {
    /// Create reference data for a PIN, optionally with its PUK
    CreatePin {
        /// PIN type
        pin_type: PinType,
        /// PIN reference
        reference: u8,
        /// PIN value
        pin: Zeroizing<Vec<u8>>,
        /// Attempts allowed before the PIN blocks
        pin_tries: u8,
        /// PUK value and its attempt counter
        puk: Option<(Zeroizing<Vec<u8>>, u8)>,
    },
    /// Generate an RSA key pair into existing key files
    GenerateKey {
        /// Private key file
        private_id: FileId,
        /// Public key file
        public_id: FileId,
        /// Public exponent
        exponent: u32,
        /// Modulus length in bits
        bits: u16,
    },
    /// Load private key material into the selected key file
    UpdateKey {
        /// Key structure
        key_type: EfStructure,
        /// PKCS#15 object id
        id: KeyId,
        /// Key material
        key: PrivateKey,
    },
}

impl fmt::Debug for ControlRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreatePin {
                pin_type,
                reference,
                pin_tries,
                puk,
                ..
            } => f
                .debug_struct("CreatePin")
                .field("pin_type", pin_type)
                .field("reference", &format_args!("{reference:#04x}"))
                .field("pin_tries", pin_tries)
                .field("puk_tries", &puk.as_ref().map(|(_, tries)| *tries))
                .finish_non_exhaustive(),
            Self::GenerateKey {
                private_id,
                public_id,
                exponent,
                bits,
            } => f
                .debug_struct("GenerateKey")
                .field("private_id", private_id)
                .field("public_id", public_id)
                .field("exponent", &format_args!("{exponent:#x}"))
                .field("bits", bits)
                .finish(),
            Self::UpdateKey { key_type, id, .. } => f
                .debug_struct("UpdateKey")
                .field("key_type", key_type)
                .field("id", &format_args!("{id}"))
                .finish_non_exhaustive(),
        }
    }
}

fn primitive(tag: u8, value: impl Into<Vec<u8>>) -> Result<Tlv> {
    Ok(Tlv::new(Tag::try_from(tag)?, Value::Primitive(value.into()))?)
}

fn children(tlv: &Tlv) -> Result<&[Tlv]> {
    match tlv.value() {
        Value::Constructed(tlvs) => Ok(tlvs.as_slice()),
        Value::Primitive(_) => Err(Error::InvalidData("control template is not constructed")),
    }
}

fn find<'a>(tlvs: &'a [Tlv], tag: u8) -> Result<Option<&'a [u8]>> {
    let tag = Tag::try_from(tag)?;
    for tlv in tlvs {
        if tlv.tag() == &tag {
            return match tlv.value() {
                Value::Primitive(bytes) => Ok(Some(bytes.as_slice())),
                Value::Constructed(_) => Err(Error::InvalidData("expected a primitive value")),
            };
        }
    }
    Ok(None)
}

fn require<'a>(tlvs: &'a [Tlv], tag: u8) -> Result<&'a [u8]> {
    find(tlvs, tag)?.ok_or(Error::InvalidData("missing control field"))
}

fn single_byte(tlvs: &[Tlv], tag: u8) -> Result<u8> {
    match require(tlvs, tag)? {
        [byte] => Ok(*byte),
        _ => Err(Error::InvalidData("expected a single byte")),
    }
}

fn file_id(tlvs: &[Tlv], tag: u8) -> Result<FileId> {
    match require(tlvs, tag)? {
        [hi, lo] => Ok(FileId::from_bytes(*hi, *lo)),
        _ => Err(Error::InvalidData("expected a file identifier")),
    }
}

impl ControlRequest {
    /// Opcode of this request
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::CreatePin { .. } => Opcode::CreatePin,
            Self::GenerateKey { .. } => Opcode::GenerateKey,
            Self::UpdateKey { .. } => Opcode::UpdateKey,
        }
    }

    /// Serialize into the request template
    pub fn to_tlv(&self) -> Result<Tlv> {
        let fields = match self {
            Self::CreatePin {
                pin_type,
                reference,
                pin,
                pin_tries,
                puk,
            } => {
                let mut fields = vec![
                    primitive(tags::TYPE, [pin_type.code()])?,
                    primitive(tags::REFERENCE, [*reference])?,
                    primitive(tags::VALUE, pin.as_slice())?,
                    primitive(tags::COUNT, [*pin_tries])?,
                ];
                if let Some((puk, puk_tries)) = puk {
                    fields.push(primitive(tags::PUK, puk.as_slice())?);
                    fields.push(primitive(tags::PUK_COUNT, [*puk_tries])?);
                }
                fields
            }
            Self::GenerateKey {
                private_id,
                public_id,
                exponent,
                bits,
            } => {
                let exponent = exponent.to_be_bytes();
                let significant = exponent.iter().position(|b| *b != 0).unwrap_or(3);
                vec![
                    primitive(tags::TYPE, private_id.to_bytes())?,
                    primitive(tags::REFERENCE, public_id.to_bytes())?,
                    primitive(tags::VALUE, &exponent[significant..])?,
                    primitive(tags::COUNT, bits.to_be_bytes())?,
                ]
            }
            Self::UpdateKey { key_type, id, key } => {
                let code = key_type
                    .key_code()
                    .ok_or(Error::InvalidArguments("key type is not a key structure"))?;
                let mut fields = vec![
                    primitive(tags::TYPE, [code])?,
                    primitive(tags::REFERENCE, id.as_bytes())?,
                ];
                let (base, components): (u8, Vec<&[u8]>) = match key {
                    PrivateKey::Rsa(rsa) => (
                        tags::COMPONENT_BASE,
                        vec![
                            rsa.modulus.as_slice(),
                            rsa.public_exponent.as_slice(),
                            rsa.p.as_slice(),
                            rsa.q.as_slice(),
                            rsa.dmp1.as_slice(),
                            rsa.dmq1.as_slice(),
                            rsa.iqmp.as_slice(),
                        ],
                    ),
                    PrivateKey::Dsa(dsa) => (
                        tags::DSA_COMPONENT_BASE,
                        vec![
                            dsa.p.as_slice(),
                            dsa.q.as_slice(),
                            dsa.g.as_slice(),
                            dsa.x.as_slice(),
                        ],
                    ),
                };
                for (tag, component) in (base..).zip(components) {
                    fields.push(primitive(tag, component)?);
                }
                fields
            }
        };

        Ok(Tlv::new(
            Tag::try_from(self.opcode().template())?,
            Value::Constructed(fields),
        )?)
    }

    /// Serialize into the request payload bytes
    pub fn to_bytes(&self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new(self.to_tlv()?.to_vec()))
    }

    /// Parse a request template
    pub fn from_tlv(tlv: &Tlv) -> Result<Self> {
        let opcode = Opcode::from_template(tlv.tag())?;
        let fields = children(tlv)?;

        match opcode {
            Opcode::CreatePin => {
                let puk = match find(fields, tags::PUK)? {
                    Some(puk) => Some((
                        Zeroizing::new(puk.to_vec()),
                        single_byte(fields, tags::PUK_COUNT)?,
                    )),
                    None => None,
                };
                Ok(Self::CreatePin {
                    pin_type: PinType::from_code(single_byte(fields, tags::TYPE)?)?,
                    reference: single_byte(fields, tags::REFERENCE)?,
                    pin: Zeroizing::new(require(fields, tags::VALUE)?.to_vec()),
                    pin_tries: single_byte(fields, tags::COUNT)?,
                    puk,
                })
            }
            Opcode::GenerateKey => {
                let exponent = require(fields, tags::VALUE)?;
                if exponent.is_empty() || exponent.len() > 4 {
                    return Err(Error::InvalidData("invalid exponent length"));
                }
                let exponent = exponent
                    .iter()
                    .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte));
                let bits = match require(fields, tags::COUNT)? {
                    [hi, lo] => u16::from_be_bytes([*hi, *lo]),
                    _ => return Err(Error::InvalidData("invalid key length")),
                };
                Ok(Self::GenerateKey {
                    private_id: file_id(fields, tags::TYPE)?,
                    public_id: file_id(fields, tags::REFERENCE)?,
                    exponent,
                    bits,
                })
            }
            Opcode::UpdateKey => {
                let key_type = EfStructure::from_key_code(single_byte(fields, tags::TYPE)?)
                    .ok_or(Error::InvalidData("unknown key structure"))?;
                let id = KeyId::new(require(fields, tags::REFERENCE)?);
                let component =
                    |tag: u8| -> Result<Vec<u8>> { Ok(require(fields, tag)?.to_vec()) };
                let key = if find(fields, tags::COMPONENT_BASE)?.is_some() {
                    PrivateKey::Rsa(RsaCrtKey {
                        modulus: component(tags::COMPONENT_BASE)?,
                        public_exponent: component(tags::COMPONENT_BASE + 1)?,
                        p: component(tags::COMPONENT_BASE + 2)?,
                        q: component(tags::COMPONENT_BASE + 3)?,
                        dmp1: component(tags::COMPONENT_BASE + 4)?,
                        dmq1: component(tags::COMPONENT_BASE + 5)?,
                        iqmp: component(tags::COMPONENT_BASE + 6)?,
                    })
                } else {
                    PrivateKey::Dsa(DsaKey {
                        p: component(tags::DSA_COMPONENT_BASE)?,
                        q: component(tags::DSA_COMPONENT_BASE + 1)?,
                        g: component(tags::DSA_COMPONENT_BASE + 2)?,
                        x: component(tags::DSA_COMPONENT_BASE + 3)?,
                    })
                };
                Ok(Self::UpdateKey { key_type, id, key })
            }
        }
    }

    /// Parse request payload bytes
    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        Self::from_tlv(&Tlv::from_bytes(payload)?)
    }
}

/// Result of a successful control request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlResponse {
    /// The request completed without output
    Done,
    /// Modulus of a freshly generated key pair
    GeneratedKey {
        /// Modulus, big-endian
        modulus: Bytes,
    },
}

impl ControlResponse {
    /// Interpret the raw output of a control request
    pub fn parse(opcode: Opcode, output: Bytes) -> Result<Self> {
        match opcode {
            Opcode::GenerateKey if output.is_empty() => {
                Err(Error::InvalidData("key generation returned no modulus"))
            }
            Opcode::GenerateKey => Ok(Self::GeneratedKey { modulus: output }),
            Opcode::CreatePin | Opcode::UpdateKey if output.is_empty() => Ok(Self::Done),
            Opcode::CreatePin | Opcode::UpdateKey => {
                Err(Error::InvalidData("unexpected control output"))
            }
        }
    }
}

/// Card-specific control channel
///
/// Implementations only move opaque payloads; the default
/// [`CardControl::control`] handles serialization and logging.
pub trait CardControl: fmt::Debug {
    /// Issue a control request and wait for its completion
    fn control(&mut self, request: &ControlRequest) -> Result<ControlResponse> {
        let opcode = request.opcode();
        let payload = request.to_bytes()?;
        debug!(%opcode, len = payload.len(), "Issuing card control request");

        let result = self
            .do_control(opcode, &payload)
            .and_then(|output| ControlResponse::parse(opcode, output));
        match &result {
            Ok(ControlResponse::GeneratedKey { modulus }) => {
                trace!(%opcode, modulus = %hex::encode(modulus), "Card control succeeded");
            }
            Ok(ControlResponse::Done) => trace!(%opcode, "Card control succeeded"),
            Err(e) => debug!(%opcode, error = %e, "Card control failed"),
        }
        result
    }

    /// Transmit a serialized request and return its raw output
    ///
    /// This is the method that concrete implementations should override
    fn do_control(&mut self, opcode: Opcode, payload: &[u8]) -> Result<Bytes>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_create_pin_encoding() {
        let request = ControlRequest::CreatePin {
            pin_type: PinType::Chv,
            reference: 0x81,
            pin: Zeroizing::new(b"1234".to_vec()),
            pin_tries: 3,
            puk: None,
        };
        let bytes = request.to_bytes().unwrap();
        assert_eq!(
            bytes.as_slice(),
            hex!("A1 0F 800101 810181 820431323334 830103")
        );
        assert_eq!(ControlRequest::from_bytes(&bytes).unwrap(), request);
    }

    #[test]
    fn test_generate_key_encoding() {
        let request = ControlRequest::GenerateKey {
            private_id: FileId::new(0x3001),
            public_id: FileId::new(0x1012),
            exponent: 0x10001,
            bits: 1024,
        };
        let bytes = request.to_bytes().unwrap();
        assert_eq!(
            bytes.as_slice(),
            hex!("A2 11 80023001 81021012 8203010001 83020400")
        );
        assert_eq!(ControlRequest::from_bytes(&bytes).unwrap(), request);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let request = ControlRequest::CreatePin {
            pin_type: PinType::Chv,
            reference: 0x81,
            pin: Zeroizing::new(b"secret".to_vec()),
            pin_tries: 3,
            puk: Some((Zeroizing::new(vec![0xAA; 16]), 5)),
        };
        let debug = format!("{request:?}");
        assert!(debug.contains("puk_tries: Some(5)"));
        assert!(!debug.contains("secret"));
        assert!(!debug.contains("170"));
    }

    #[test]
    fn test_unknown_template_rejected() {
        let err = ControlRequest::from_bytes(&hex!("A4 03 800101")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidData);
    }

    #[test]
    fn test_response_parsing() {
        assert_eq!(
            ControlResponse::parse(Opcode::CreatePin, Bytes::new()).unwrap(),
            ControlResponse::Done
        );
        assert!(ControlResponse::parse(Opcode::GenerateKey, Bytes::new()).is_err());
        assert!(ControlResponse::parse(Opcode::UpdateKey, Bytes::from_static(&[0x00])).is_err());
    }
}
