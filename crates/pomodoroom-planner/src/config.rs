//! Planner configuration.
//!
//! Stored as TOML at `~/.config/pomodoroom[-dev]/planner.toml`. Every
//! section and field has a default, so a partial or empty file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auto_schedule::{AutoBreakProjector, ProjectorConfig};
use crate::error::ConfigError;
use crate::granularity::{default_policies, GranularityConfig, RecommendOptions};
use crate::progression::Progression;
use crate::scheduler::replan::DEFAULT_PADDING_MINUTES;
use crate::scheduler::{
    AutoScheduler, EventDrivenReplanner, ProgressiveSelector, SchedulerConfig, SelectorConfig,
    MAX_LANES,
};

const CONFIG_FILE: &str = "planner.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplanConfig {
    /// Minutes added on both sides of the impacted window.
    #[serde(default = "default_padding_minutes")]
    pub padding_minutes: i64,
}

fn default_padding_minutes() -> i64 {
    DEFAULT_PADDING_MINUTES
}

impl Default for ReplanConfig {
    fn default() -> Self {
        Self {
            padding_minutes: default_padding_minutes(),
        }
    }
}

/// Top-level planner configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub selector: SelectorConfig,
    #[serde(default)]
    pub projector: ProjectorConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub replan: ReplanConfig,
    #[serde(default)]
    pub granularity: GranularityConfig,
}

/// Returns `~/.config/pomodoroom[-dev]/` based on POMODOROOM_ENV.
///
/// Set POMODOROOM_ENV=dev to use the development directory. The directory is
/// not created.
pub fn data_dir() -> PathBuf {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("POMODOROOM_ENV").unwrap_or_else(|_| "production".to_string());
    if env == "dev" {
        base_dir.join("pomodoroom-dev")
    } else {
        base_dir.join("pomodoroom")
    }
}

impl PlannerConfig {
    /// Default location of the config file.
    pub fn default_path() -> PathBuf {
        data_dir().join(CONFIG_FILE)
    }

    /// Parse a TOML document and clamp out-of-range values.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: PlannerConfig = toml::from_str(content)?;
        Ok(cfg.normalized())
    }

    /// Load from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from the default path, returning defaults when the file is
    /// missing or invalid.
    pub fn load_or_default() -> Self {
        let path = Self::default_path();
        if !path.exists() {
            debug!(path = %path.display(), "no planner config; using defaults");
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable planner config");
            Self::default()
        })
    }

    /// Persist to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Reject values that cannot be clamped into something meaningful.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.selector.focus_steps.iter().any(|&m| m > 0) {
            return Err(ConfigError::InvalidValue {
                key: "selector.focus_steps".to_string(),
                message: "at least one positive focus length is required".to_string(),
            });
        }
        if self.granularity.min_segment > self.granularity.max_segment {
            return Err(ConfigError::InvalidValue {
                key: "granularity.min_segment".to_string(),
                message: format!(
                    "{} exceeds granularity.max_segment ({})",
                    self.granularity.min_segment, self.granularity.max_segment
                ),
            });
        }
        Ok(())
    }

    /// Clamp out-of-range values.
    ///
    /// Lanes are kept in 1..=5, minute values are floored at 1 (breaks and
    /// padding at 0).
    pub fn normalized(mut self) -> Self {
        let s = &mut self.selector;
        s.min_focus = s.min_focus.max(1);
        s.short_break = s.short_break.max(0);
        s.long_break = s.long_break.max(0);

        let p = &mut self.projector;
        p.idle_reset_minutes = p.idle_reset_minutes.max(1);
        p.min_gap_for_break = p.min_gap_for_break.max(1);

        self.scheduler.default_lanes = self.scheduler.default_lanes.clamp(1, MAX_LANES as i32);
        self.replan.padding_minutes = self.replan.padding_minutes.max(0);

        let g = &mut self.granularity;
        g.base_minutes = g.base_minutes.max(1);
        g.min_segment = g.min_segment.max(1);
        g.max_segment = g.max_segment.max(1);
        self
    }

    pub fn selector(&self) -> ProgressiveSelector {
        ProgressiveSelector::with_config(self.selector.clone())
    }

    pub fn scheduler(&self) -> AutoScheduler {
        AutoScheduler::with_config(self.scheduler.clone(), self.selector())
    }

    pub fn replanner(&self) -> EventDrivenReplanner {
        EventDrivenReplanner::new(self.scheduler()).with_padding(self.replan.padding_minutes)
    }

    pub fn projector(&self) -> AutoBreakProjector {
        AutoBreakProjector::with_config(self.projector.clone(), &Progression::default_progressive())
    }

    pub fn recommend_options(&self) -> RecommendOptions {
        RecommendOptions {
            config: self.granularity.clone(),
            policies: default_policies(),
        }
    }
}
