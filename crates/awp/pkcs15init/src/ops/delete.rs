use awp_core::prelude::*;
use tracing::{debug, instrument};

use crate::Personalizer;

impl<C: Card, P: Profile> Personalizer<C, P> {
    /// Delete `file` from its parent DF
    ///
    /// A DF must grant DELETE on itself, and the parent must grant DELETE too.
    #[instrument(level = "debug", skip_all, fields(path = %file.path))]
    pub fn delete_file(&mut self, file: &FileDescriptor) -> Result<()> {
        if file.is_df() {
            self.session
                .authenticate(file, AclOperation::Delete)
                .context("Cannot authenticate DELETE on DF")?;
        }

        let parent_path = file
            .parent()
            .ok_or(Error::InvalidArguments("cannot delete the MF"))?;
        let parent = self
            .session
            .select(&parent_path)
            .context("Cannot select parent")?;
        self.session
            .authenticate(&parent, AclOperation::Delete)
            .context("Cannot authenticate DELETE on parent")?;

        debug!(id = %file.id, parent = %parent.path, "Deleting");
        self.session.delete_child(file.id)
    }
}
