use std::path::PathBuf;

use clap::Subcommand;
use pomodoroom_planner::{recommend_granularity, PlannerConfig, TaskMetrics};

use super::{print_json, read_json, CliResult};

#[derive(Subcommand)]
pub enum GranularityAction {
    /// Recommend a segment length from uncertainty signals
    Recommend {
        /// Task metrics JSON; overrides the individual flags
        #[arg(long)]
        metrics: Option<PathBuf>,
        /// Historical estimate variance (0-1)
        #[arg(long, default_value_t = 0.0)]
        variance: f64,
        /// Deadline flexibility (0-1)
        #[arg(long, default_value_t = 0.5)]
        flexibility: f64,
        /// Task complexity (0-1)
        #[arg(long, default_value_t = 0.5)]
        complexity: f64,
        /// Familiarity with the work (0-1)
        #[arg(long, default_value_t = 0.5)]
        familiarity: f64,
        /// Interruptions seen on similar tasks
        #[arg(long, default_value_t = 0)]
        interruptions: u32,
    },
}

pub fn run(action: GranularityAction, config: &PlannerConfig) -> CliResult {
    match action {
        GranularityAction::Recommend {
            metrics,
            variance,
            flexibility,
            complexity,
            familiarity,
            interruptions,
        } => {
            let metrics = match metrics {
                Some(path) => read_json(&path)?,
                None => TaskMetrics {
                    historical_variance: variance,
                    deadline_flexibility: flexibility,
                    complexity,
                    familiarity,
                    interruption_history: interruptions,
                },
            };
            let recommendation = recommend_granularity(&metrics, &config.recommend_options());
            print_json(&recommendation)
        }
    }
}
