use clap::Subcommand;
use pomodoroom_planner::{build_initial_split_preview, SplitPreviewInput};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum SplitAction {
    /// Preview how a long task splits into focus and break segments
    Preview {
        /// Task title
        title: String,
        /// Total task length in minutes
        #[arg(long)]
        total: u32,
        /// Focus segment length in minutes
        #[arg(long, default_value_t = 50)]
        focus: u32,
        /// Break length in minutes
        #[arg(long = "break", default_value_t = 10)]
        break_minutes: u32,
    },
}

pub fn run(action: SplitAction) -> CliResult {
    match action {
        SplitAction::Preview {
            title,
            total,
            focus,
            break_minutes,
        } => {
            let segments = build_initial_split_preview(&SplitPreviewInput {
                title,
                total_minutes: total,
                focus_block_minutes: focus,
                break_minutes,
            });
            print_json(&segments)
        }
    }
}
