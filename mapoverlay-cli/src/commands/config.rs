//! Configuration management commands.

use clap::Subcommand;

use crate::error::CliError;
use mapoverlay::config::{config_file_path, ConfigFile};

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init { force } => run_init(force),
        ConfigCommands::Show => {
            let config = ConfigFile::load()?;
            print!("{}", config.to_config_string());
            Ok(())
        }
        ConfigCommands::Path => {
            println!("{}", config_file_path().display());
            Ok(())
        }
    }
}

fn run_init(force: bool) -> Result<(), CliError> {
    if force {
        ConfigFile::default().save()?;
        println!("Wrote default configuration to {}", config_file_path().display());
        return Ok(());
    }

    let existed = config_file_path().exists();
    let path = ConfigFile::ensure_exists()?;
    if existed {
        println!("Configuration already exists at {}", path.display());
        println!("Use --force to overwrite it with defaults.");
    } else {
        println!("Wrote default configuration to {}", path.display());
    }
    Ok(())
}
