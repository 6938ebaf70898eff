use std::path::PathBuf;

use clap::Subcommand;
use pomodoroom_planner::{ConfigError, PlannerConfig};

use super::{load_config, print_json, CliResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as JSON
    Show,
    /// Print the config file location
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(action: ConfigAction, path: Option<&PathBuf>) -> CliResult {
    let target = path.cloned().unwrap_or_else(PlannerConfig::default_path);
    match action {
        ConfigAction::Show => {
            let config = load_config(path)?;
            print_json(&config)?;
        }
        ConfigAction::Path => {
            println!("{}", target.display());
        }
        ConfigAction::Init { force } => {
            if target.exists() && !force {
                return Err(ConfigError::SaveFailed {
                    path: target,
                    message: "file already exists (use --force to overwrite)".to_string(),
                }
                .into());
            }
            PlannerConfig::default().save(&target)?;
            println!("wrote {}", target.display());
        }
    }
    Ok(())
}
