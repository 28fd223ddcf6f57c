//! On-card RSA key generation
//!
//! The card writes the public half of a generated key pair into a scratch
//! internal EF (`1012`) next to the private key file. The modulus is returned
//! by the generate request itself, after which the scratch file is deleted.

use awp_core::prelude::*;
use awp_core::{ControlRequest, ControlResponse};
use tracing::{debug, info, instrument};

use crate::{Personalizer, RSA_EXPONENT, TEMP_PUBLIC_KEY_ID};

/// Scratch public key file for the private key file `private_key`
///
/// It lives at the same path with `1012` as its last component, has the same
/// size and UPDATE condition, and allows public key operations freely.
pub(crate) fn temporary_public_key_file(private_key: &FileDescriptor) -> Result<FileDescriptor> {
    let update = private_key.acl.get(AclOperation::Update).ok_or_else(|| {
        Error::inconsistent_profile(format!(
            "private key file {} has no UPDATE access condition",
            private_key.path
        ))
    })?;

    let acl = Acl::new()
        .with(AclOperation::Update, update)
        .with(AclOperation::PsoEncrypt, AclMethod::None)
        .with(AclOperation::PsoVerifySignature, AclMethod::None)
        .with(AclOperation::ExternalAuthenticate, AclMethod::None);

    Ok(FileDescriptor {
        path: private_key.path.with_file_id(TEMP_PUBLIC_KEY_ID),
        id: TEMP_PUBLIC_KEY_ID,
        size: private_key.size,
        file_type: FileType::InternalEf,
        ef_structure: Some(EfStructure::RsaPublic),
        acl,
    })
}

impl<C: Card, P: Profile> Personalizer<C, P> {
    /// Generate an RSA key pair into the already created key file of `object`
    ///
    /// On success `object` carries the card key reference and the public key
    /// is returned. If the generate request fails, the scratch public key file
    /// stays on the card.
    #[instrument(level = "debug", skip_all, fields(id = %object.id, path = %object.path, bits = object.modulus_bits))]
    pub fn generate_key(&mut self, object: &mut KeyObject) -> Result<PublicKey> {
        if object.object_type != ObjectType::PRKEY_RSA {
            return Err(Error::NotSupported("only RSA keys can be generated"));
        }
        let bits = u16::try_from(object.modulus_bits)
            .map_err(|_| Error::InvalidArguments("modulus length out of range"))?;

        let parent_path = object
            .path
            .parent()
            .ok_or(Error::InvalidArguments("key path has no parent DF"))?;
        let parent = self
            .session
            .select(&parent_path)
            .context("Cannot generate key: failed to select private object DF")?;
        self.session
            .authenticate(&parent, AclOperation::Crypto)
            .context("Cannot generate key: 'CRYPTO' authentication failed")?;
        self.session
            .authenticate(&parent, AclOperation::Create)
            .context("Cannot generate key: 'CREATE' authentication failed")?;

        let private_key = self
            .session
            .select(&object.path)
            .context("Failed to generate key: cannot select private key file")?;

        let scratch = temporary_public_key_file(&private_key)?;
        self.session
            .create_file(&scratch)
            .context("Failed to create temporary public key file")?;
        debug!(path = %scratch.path, "Created temporary public key file");

        let request = ControlRequest::GenerateKey {
            private_id: private_key.id,
            public_id: scratch.id,
            exponent: RSA_EXPONENT,
            bits,
        };
        let modulus = match self
            .session
            .control(&request)
            .context("'GENERATE_KEY' card specific command failed")?
        {
            ControlResponse::GeneratedKey { modulus } => modulus,
            ControlResponse::Done => {
                return Err(Error::InvalidData("key generation returned no modulus"));
            }
        };
        if modulus.len() != object.modulus_bits / 8 {
            return Err(Error::InvalidData("generated modulus has the wrong length"));
        }

        let public_key = PublicKey::rsa(modulus.to_vec());
        object.key_reference = private_key.path.last_byte().unwrap_or_default();
        object.path = private_key.path;

        debug!("Deleting temporary public key file");
        self.delete_file(&scratch)
            .context("Failed to delete temporary public key file")?;

        info!(reference = object.key_reference, "Generated RSA key pair");
        Ok(public_key)
    }
}
