use awp_core::prelude::*;
use awp_core::profile::names;
use tracing::{info, instrument, warn};

use crate::Personalizer;

impl<C: Card, P: Profile> Personalizer<C, P> {
    /// Remove the AWP application from the card
    ///
    /// Deletes, in order, the DIR file, the PKCS#15 application DF, the
    /// private and public object DFs and the AWP application DF. Files that are
    /// already gone are skipped, so erasing twice is not an error. Only the
    /// PKCS#15 application DF must be defined by the profile.
    #[instrument(level = "debug", skip_all)]
    pub fn erase_card(&mut self) -> Result<()> {
        let df_info = self.profile.df_info().ok_or_else(|| {
            Error::inconsistent_profile("profile does not define the PKCS#15 application DF")
        })?;
        let steps = [
            self.profile.file(names::DIR),
            Some(df_info),
            self.profile.file(names::PRIVATE_DF),
            self.profile.file(names::PUBLIC_DF),
            self.profile.file(names::APP_DF),
        ];

        for file in steps.into_iter().flatten() {
            match self.delete_file(&file) {
                Ok(()) => info!(path = %file.path, "Deleted"),
                Err(e) if e.is_file_not_found() => {
                    warn!(path = %file.path, "Not present, skipping");
                }
                Err(e) => return Err(e.with_context(format!("Failed to erase {}", file.path))),
            }
        }

        self.session
            .reset_applications()
            .context("Failed to reset application list")
    }
}
