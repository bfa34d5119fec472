//! Configuration commands.

use std::process::ExitCode;

use clap::{Args, Subcommand};
use voxgate_cli::{print_success, save_config, CliConfig};

use super::{get_config, output};
use crate::Cli;

/// Show or initialize the configuration.
///
/// Configuration is stored in ~/.voxgate/config.yaml unless --config is
/// given.
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Print the effective configuration, defaults included
    Show,
    /// Write the default configuration
    Init {
        /// Overwrite an existing non-empty config
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<ExitCode> {
        match &self.command {
            ConfigSubcommand::Show => {
                let cfg = get_config(cli)?;
                output(cli).write(&cfg)?;
            }
            ConfigSubcommand::Init { force } => {
                let current = get_config(cli)?;
                let existing = std::fs::read_to_string(current.path())?;
                if !existing.trim().is_empty() && !force {
                    anyhow::bail!(
                        "{} already has settings, use --force to overwrite",
                        current.path().display()
                    );
                }
                let path = save_config(&CliConfig::default(), Some(current.path()))?;
                print_success(&format!("Wrote default configuration to {}", path.display()));
            }
        }
        Ok(ExitCode::SUCCESS)
    }
}
