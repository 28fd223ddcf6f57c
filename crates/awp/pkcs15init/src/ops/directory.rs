use awp_core::prelude::*;
use tracing::{debug, info, instrument};

use crate::{DIRECTORY_LAYOUT, Personalizer};

impl<C: Card, P: Profile> Personalizer<C, P> {
    /// Create `root` and the AWP file tree below it, then seed the TokenInfo
    ///
    /// Files that already exist are kept; any other failure aborts.
    #[instrument(level = "debug", skip_all, fields(root = %root.path))]
    pub fn create_dir(&mut self, root: &FileDescriptor) -> Result<()> {
        self.session
            .create_file(root)
            .context("Failed to create DIR DF")?;

        for name in DIRECTORY_LAYOUT {
            let file = self.required_file(name)?;
            match self.session.create_file(&file) {
                Ok(()) => debug!(name, path = %file.path, "Created"),
                Err(e) if e.is_already_exists() => {
                    debug!(name, path = %file.path, "Already exists");
                }
                Err(e) => {
                    return Err(e.with_context(format!("Failed to create {name}")));
                }
            }
        }

        self.write_token_info(
            None,
            TokenFlags::TOKEN_INITIALIZED | TokenFlags::PRN_GENERATION,
        )?;
        info!("AWP file structure created");
        Ok(())
    }
}
