use awp_core::prelude::*;
use awp_core::{Algorithm, ControlRequest};
use tracing::{debug, instrument};

use crate::{MAX_KEY_ID_LENGTH, Personalizer};

impl<C: Card, P: Profile> Personalizer<C, P> {
    /// Import an RSA private key into the key file of `object`
    #[instrument(level = "debug", skip_all, fields(id = %object.id, path = %object.path))]
    pub fn store_key(&mut self, object: &KeyObject, key: &PrivateKey) -> Result<()> {
        if object.object_type != ObjectType::PRKEY_RSA || key.algorithm() != Algorithm::Rsa {
            return Err(Error::NotSupported("only RSA private keys can be stored"));
        }

        let file = self
            .session
            .select(&object.path)
            .context("Cannot store key: select key file failed")?;
        self.session
            .authenticate(&file, AclOperation::Update)
            .context("No authorisation to store private key")?;

        if object.id.len() > MAX_KEY_ID_LENGTH {
            return Err(Error::InvalidArguments("key ID is too long"));
        }

        debug!(file = %file.path, "Updating private key");
        let request = ControlRequest::UpdateKey {
            key_type: EfStructure::RsaCrt,
            id: object.id.clone(),
            key: key.clone(),
        };
        self.session
            .control(&request)
            .context("'UPDATE_KEY' card specific command failed")?;
        Ok(())
    }
}
