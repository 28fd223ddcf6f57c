use std::path::PathBuf;

use awp_pkcs15init::Personalizer;
use awp_sim::SimulatedCard;
use clap::{Parser, Subcommand};
use tracing::debug;

mod commands;
mod config;

use commands::*;
use config::Config;

#[derive(Parser)]
#[command(version, about = "Personalize Oberthur AWP cards with a PKCS#15 structure")]
struct Cli {
    /// Configuration file (defaults to ./awp.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Debug level output
    #[arg(short, long)]
    verbose: bool,

    /// Print the card content as JSON when done
    #[arg(long)]
    dump: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove the AWP application from the card
    Erase,

    /// Erase the card and create the AWP file structure
    Init,

    /// Initialize the card, then provision the configured PINs and keys
    Personalize,

    /// Print the profile in use
    ShowProfile,
}

fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    let mut personalizer = Personalizer::new(SimulatedCard::new(), config.profile());
    debug!(label = ?config.label, pins = config.pins.len(), keys = config.keys.len(), "Loaded configuration");

    match cli.command {
        Commands::Erase => erase_command(&mut personalizer)?,
        Commands::Init => init_command(&mut personalizer)?,
        Commands::Personalize => personalize_command(&mut personalizer, &config)?,
        Commands::ShowProfile => show_profile_command(personalizer.profile())?,
    }

    if cli.dump {
        dump_command(personalizer.card())?;
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .init();
}
