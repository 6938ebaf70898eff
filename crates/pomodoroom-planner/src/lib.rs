//! # Pomodoroom Planner
//!
//! The auto-scheduling and adaptive time-allocation engine behind Pomodoroom.
//! Every entry point is a pure function of its inputs: "now" and block id
//! generation are passed in explicitly, so identical inputs always produce
//! identical plans.
//!
//! ## Architecture
//!
//! - **Timeline**: Free-gap detection between locked intervals
//! - **Scheduler**: Full-day, lane-parallel focus/break placement and
//!   event-driven incremental replanning
//! - **Auto schedule**: Estimated start times for unscheduled tasks and the
//!   projected task list with automatic breaks
//! - **Granularity**: Uncertainty scoring and segment-size recommendations
//!
//! ## Key Components
//!
//! - [`AutoScheduler`]: Full-day schedule generation
//! - [`EventDrivenReplanner`]: Local replanning after calendar changes
//! - [`AutoBreakProjector`]: Display projection with synthetic breaks
//! - [`PlannerConfig`]: TOML configuration

pub mod auto_schedule;
pub mod break_debt;
pub mod config;
pub mod error;
pub mod granularity;
pub mod progression;
pub mod schedule;
pub mod scheduler;
pub mod task;
pub mod timeline;

pub use auto_schedule::{
    build_projected_tasks_with_auto_breaks, get_display_start_time, recalculate_estimated_starts,
    recommend_break_minutes, AutoBreakProjector, ProjectedTask, ProjectorConfig,
};
pub use break_debt::BreakDebtLedger;
pub use config::PlannerConfig;
pub use error::{ConfigError, CoreError, Result, ValidationError};
pub use granularity::{
    calculate_uncertainty_score, get_granularity_tier, recommend_granularity, GranularityPolicy,
    GranularityRecommendation, GranularityTier, TaskMetrics,
};
pub use progression::{Progression, StageTables};
pub use schedule::{BlockIdGenerator, BlockType, DailyTemplate, FixedEvent, ScheduleBlock};
pub use scheduler::{
    AutoScheduler, EventDrivenReplanner, ImpactedWindow, ProgressiveSelector, ReplanOutcome,
    ReplanRequest, ScheduleRequest, SchedulerConfig, SelectorConfig,
};
pub use task::split_preview::{build_initial_split_preview, PreviewSegment, SplitPreviewInput};
pub use task::{EnergyLevel, Task, TaskKind, TaskState};
pub use timeline::{find_gaps, Interval, TimeGapDetector};
