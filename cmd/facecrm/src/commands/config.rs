//! Configuration management commands.

use clap::{Args, Subcommand};
use facecrm_cli::{Config, save_config};

use super::{get_config, output, print_success};
use crate::Cli;

/// Manage CLI configuration.
///
/// Configuration is stored in ~/.facecrm/facecrm/config.yaml
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// View the current configuration
    #[command(alias = "view")]
    Show,
    /// Reset the configuration file to defaults
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
    /// Set the match distance threshold
    #[command(name = "set-threshold")]
    SetThreshold {
        /// Maximum distance (exclusive) for a match, e.g. 0.6
        value: f32,
    },
    /// Print the config file path
    Path,
}

impl ConfigCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        match &self.command {
            ConfigSubcommand::Show => {
                let cfg = get_config(cli)?;
                output(cli).write(&cfg)
            }

            ConfigSubcommand::Init { force } => {
                let cfg = get_config(cli)?;
                let untouched = serde_yaml::to_string(&Config::default())?;
                let current = serde_yaml::to_string(&cfg)?;
                if current != untouched && !force {
                    anyhow::bail!(
                        "{} already has custom settings, use --force to reset",
                        cfg.path().display()
                    );
                }
                let path = cfg.path().to_string_lossy().into_owned();
                save_config(&cfg.app_name, &Config::default(), Some(&path))?;
                print_success(&format!("Wrote default configuration to {}", path));
                Ok(())
            }

            ConfigSubcommand::SetThreshold { value } => {
                let mut cfg = get_config(cli)?;
                let previous = cfg.matching.threshold;
                cfg.set_threshold(*value)?;
                print_success(&format!("Match threshold changed from {} to {}", previous, value));
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
