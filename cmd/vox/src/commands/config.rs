//! Configuration management commands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use flitevox_cli::Config;

use super::{get_config, output, print_success};
use crate::Cli;

/// Manage CLI configuration.
///
/// Configuration is stored in ~/.flitevox/vox/config.yaml
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// View the current configuration
    Show,
    /// Write a default configuration, replacing the existing one
    Init {
        /// Voice resource directory
        #[arg(long)]
        voxdir: Option<PathBuf>,
    },
    /// Print the config file path
    Path,
}

impl ConfigCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        match &self.command {
            ConfigSubcommand::Show => {
                let cfg = get_config(cli)?;
                eprintln!("Config file: {}", cfg.path().display());
                output(cli).write(&cfg)
            }

            ConfigSubcommand::Init { voxdir } => {
                let existing = get_config(cli)?;
                let mut cfg = Config::default();
                if let Some(voxdir) = voxdir {
                    cfg.voices.voxdir = voxdir.clone();
                }
                flitevox_cli::save_config(super::APP_NAME, &cfg, existing.path().to_str())?;
                print_success(&format!("Config written to {}", existing.path().display()));
                Ok(())
            }

            ConfigSubcommand::Path => {
                let cfg = get_config(cli)?;
                println!("{}", cfg.path().display());
                Ok(())
            }
        }
    }
}
