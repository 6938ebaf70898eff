use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "pomodoroom-planner",
    version,
    about = "Pomodoroom auto-scheduling planner"
)]
struct Cli {
    /// Planner config file (defaults to ~/.config/pomodoroom/planner.toml)
    #[arg(long = "config", global = true, value_name = "FILE")]
    config_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule generation and replanning
    Plan {
        #[command(subcommand)]
        action: commands::plan::PlanAction,
    },
    /// Segment granularity advice
    Granularity {
        #[command(subcommand)]
        action: commands::granularity::GranularityAction,
    },
    /// Task split previews
    Split {
        #[command(subcommand)]
        action: commands::split::SplitAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    // Logs go to stderr so stdout stays valid JSON.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> commands::CliResult {
    match cli.command {
        Commands::Plan { action } => {
            let config = commands::load_config(cli.config_file.as_ref())?;
            commands::plan::run(action, &config)
        }
        Commands::Granularity { action } => {
            let config = commands::load_config(cli.config_file.as_ref())?;
            commands::granularity::run(action, &config)
        }
        Commands::Split { action } => commands::split::run(action),
        Commands::Config { action } => commands::config::run(action, cli.config_file.as_ref()),
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
