//! Key file allocation and creation

use awp_core::prelude::*;
use awp_core::profile::names;
use tracing::{debug, instrument};

use crate::Personalizer;

/// How objects of one type are stored on the card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyFileRule {
    /// Object type the rule applies to
    pub object_type: ObjectType,
    /// Human readable description
    pub description: &'static str,
    /// Profile template the file is derived from
    pub template: &'static str,
    /// Structure given to internal EFs derived from the template
    pub structure: Option<EfStructure>,
}

static RULES: [KeyFileRule; 5] = [
    KeyFileRule {
        object_type: ObjectType::PRKEY_RSA,
        description: "RSA private key",
        template: names::TEMPLATE_PRIVATE_KEY,
        structure: Some(EfStructure::RsaCrt),
    },
    KeyFileRule {
        object_type: ObjectType::PUBKEY_RSA,
        description: "RSA public key",
        template: names::TEMPLATE_PUBLIC_KEY,
        structure: Some(EfStructure::RsaPublic),
    },
    KeyFileRule {
        object_type: ObjectType::PUBKEY_DSA,
        description: "DSA public key",
        template: names::TEMPLATE_PUBLIC_KEY,
        structure: None,
    },
    KeyFileRule {
        object_type: ObjectType::CERT,
        description: "certificate",
        template: names::TEMPLATE_CERTIFICATE,
        structure: None,
    },
    KeyFileRule {
        object_type: ObjectType::DATA_OBJECT,
        description: "data object",
        template: names::TEMPLATE_PUBLIC_DATA,
        structure: None,
    },
];

impl KeyFileRule {
    /// Rules in resolution order
    pub fn table() -> &'static [Self] {
        &RULES
    }

    /// Whether the rule applies to `object_type`
    pub fn matches(&self, object_type: ObjectType) -> bool {
        self.object_type == object_type
    }

    /// Find the rule for `object_type`
    ///
    /// Tries the exact type, then the type without its card-specific bit, then
    /// its generic class.
    pub fn resolve(object_type: ObjectType) -> Option<&'static Self> {
        let generic = object_type.without_device_bit();
        [object_type, generic, generic.class()]
            .into_iter()
            .find_map(|candidate| RULES.iter().find(|rule| rule.matches(candidate)))
    }
}

impl<C: Card, P: Profile> Personalizer<C, P> {
    /// Derive the file for an object of `object_type` in slot `slot`
    ///
    /// The slot number is OR-ed into the low byte of the template's id and of
    /// the last byte of its path.
    pub fn new_file(&self, object_type: ObjectType, slot: u8) -> Result<FileDescriptor> {
        let rule = KeyFileRule::resolve(object_type)
            .ok_or(Error::NotSupported("object type not supported by the card"))?;
        debug!(%object_type, template = rule.template, slot, "Allocating {}", rule.description);

        let mut file = self.profile.file(rule.template).ok_or_else(|| {
            Error::inconsistent_profile(format!(
                "profile does not define {} template '{}'",
                rule.description, rule.template
            ))
        })?;

        file.id = file.id.or_low_byte(slot);
        file.path.or_last_byte(slot);
        if file.file_type == FileType::InternalEf {
            file.ef_structure = rule.structure;
        }
        Ok(file)
    }

    /// Create the private key file of `object` at its assigned path
    ///
    /// An existing file at that path is deleted first. On success the key
    /// reference of `object` is the last byte of the path.
    #[instrument(level = "debug", skip_all, fields(id = %object.id, path = %object.path))]
    pub fn create_key(&mut self, object: &mut KeyObject) -> Result<()> {
        if object.object_type != ObjectType::PRKEY_RSA {
            return Err(Error::NotSupported("only RSA private keys can be created"));
        }

        let mut file = self
            .new_file(ObjectType::PRKEY_RSA, object.key_reference)
            .context("Cannot create key: failed to allocate new key object")?;
        file.size = object.modulus_bits;
        file.path = object.path.clone();
        file.id = object
            .path
            .file_id()
            .ok_or(Error::InvalidArguments("key path is empty"))?;

        match self.session.select(&file.path) {
            Ok(_) => {
                debug!("Key file exists, deleting it");
                self.delete_file(&file)
                    .context("Failed to delete private key file")?;
            }
            Err(e) if e.is_file_not_found() => {}
            Err(e) => return Err(e.with_context("Select private key file error")),
        }

        self.session
            .create_file(&file)
            .context("Failed to create private key file")?;
        object.key_reference = file.path.last_byte().unwrap_or_default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_order() {
        let rule = |ty| KeyFileRule::resolve(ty).map(|rule| rule.template);

        assert_eq!(rule(ObjectType::PRKEY_RSA), Some(names::TEMPLATE_PRIVATE_KEY));
        assert_eq!(
            rule(ObjectType::PRKEY_RSA.device_specific()),
            Some(names::TEMPLATE_PRIVATE_KEY)
        );
        assert_eq!(rule(ObjectType::PUBKEY_DSA), Some(names::TEMPLATE_PUBLIC_KEY));
        assert_eq!(rule(ObjectType::CERT_X509), Some(names::TEMPLATE_CERTIFICATE));
        assert_eq!(
            rule(ObjectType::new(0x0503).device_specific()),
            Some(names::TEMPLATE_PUBLIC_DATA)
        );
        assert_eq!(rule(ObjectType::PRKEY_DSA), None);
        assert_eq!(rule(ObjectType::new(0x0700)), None);
    }
}
