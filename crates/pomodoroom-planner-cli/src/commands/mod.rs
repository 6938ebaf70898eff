pub mod config;
pub mod granularity;
pub mod plan;
pub mod split;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use pomodoroom_planner::schedule::parse_instant;
use pomodoroom_planner::{PlannerConfig, Result, ValidationError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

pub type CliResult = Result<()>;

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!(path = %path.display(), "reading input");
    let content = std::fs::read_to_string(path).inspect_err(|e| {
        warn!(path = %path.display(), error = %e, "cannot read input file");
    })?;
    let value = serde_json::from_str(&content).inspect_err(|e| {
        warn!(path = %path.display(), error = %e, "input file is not valid JSON");
    })?;
    Ok(value)
}

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `--now` if given, else the current time.
pub fn resolve_now(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw {
        Some(raw) => parse_instant(raw).ok_or_else(|| {
            ValidationError::InvalidValue {
                field: "--now".to_string(),
                message: format!("expected an RFC 3339 instant, got {raw:?}"),
            }
            .into()
        }),
        None => Ok(Utc::now()),
    }
}

/// Load the planner config from `path`, or from the default location.
pub fn load_config(path: Option<&PathBuf>) -> Result<PlannerConfig> {
    let config = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading planner config");
            PlannerConfig::load(path)?
        }
        None => PlannerConfig::load_or_default(),
    };
    config.validate()?;
    Ok(config)
}
