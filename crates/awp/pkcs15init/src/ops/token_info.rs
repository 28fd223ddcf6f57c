use awp_core::prelude::*;
use awp_core::profile::names;
use tracing::{debug, trace};

use crate::Personalizer;

impl<C: Card, P: Profile> Personalizer<C, P> {
    /// Write the TokenInfo record and apply `flags` to the token state
    ///
    /// The label is the first of: `label`, the card's current label, the
    /// profile label, [`TokenInfo::DEFAULT_LABEL`].
    pub fn write_token_info(&mut self, label: Option<&str>, flags: TokenFlags) -> Result<()> {
        let file = self.required_file(names::TOKEN_INFO)?;
        if file.size < TokenInfo::MIN_SIZE {
            return Err(Error::inconsistent_profile(format!(
                "{} is {} bytes, at least {} required",
                names::TOKEN_INFO,
                file.size,
                TokenInfo::MIN_SIZE
            )));
        }

        let label = label
            .or(self.token.label.as_deref())
            .or(self.profile.label())
            .unwrap_or(TokenInfo::DEFAULT_LABEL);
        debug!(label, %flags, device_flags = format_args!("{:#06x}", flags.to_device()), "Writing token info");

        let record = TokenInfo::new(label, flags).encode(file.size)?;
        trace!(record = %hex::encode(&record), "Token info record");

        self.session
            .update_file(&file, &record)
            .context("Failed to update token info")?;
        self.token.apply_status(flags);
        Ok(())
    }
}
