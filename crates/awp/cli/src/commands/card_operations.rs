//! Commands for basic card operations

use awp_core::{Profile, StaticProfile};
use awp_sim::SimulatedCard;
use eyre::OptionExt;
use tracing::info;

use super::CardPersonalizer;

/// Remove the AWP application
pub(crate) fn erase_command(personalizer: &mut CardPersonalizer) -> eyre::Result<()> {
    personalizer.erase_card()?;
    println!("Card erased.");
    Ok(())
}

/// Erase the card and build the AWP file structure
pub(crate) fn init_command(personalizer: &mut CardPersonalizer) -> eyre::Result<()> {
    personalizer.erase_card()?;

    let root = personalizer
        .profile()
        .df_info()
        .ok_or_eyre("profile does not define the PKCS#15 application DF")?;
    personalizer.create_dir(&root)?;
    info!(root = %root.path, "AWP structure initialized");

    println!("Card initialized.");
    println!("  Token flags: {}", personalizer.token().flags());
    Ok(())
}

/// Print the profile as TOML
pub(crate) fn show_profile_command(profile: &StaticProfile) -> eyre::Result<()> {
    println!("{}", toml::to_string_pretty(profile)?);
    Ok(())
}

/// Print the card content as JSON
pub(crate) fn dump_command(card: &SimulatedCard) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(&card.snapshot())?);
    Ok(())
}
