use std::path::{Path, PathBuf};

use clap::Subcommand;
use pomodoroom_planner::schedule::{calendar_blocks_from_records, CalendarEventRecord};
use pomodoroom_planner::{
    recalculate_estimated_starts, BlockIdGenerator, BreakDebtLedger, DailyTemplate,
    PlannerConfig, ReplanRequest, Result, ScheduleBlock, ScheduleRequest, Task,
};
use serde::Serialize;

use super::{print_json, read_json, resolve_now, CliResult};

#[derive(Subcommand)]
pub enum PlanAction {
    /// Generate a full-day focus/break schedule
    Day {
        /// Daily template JSON
        #[arg(long)]
        template: PathBuf,
        /// Task list JSON
        #[arg(long)]
        tasks: PathBuf,
        /// Calendar events JSON (array of {id, start, end, summary})
        #[arg(long)]
        calendar: Option<PathBuf>,
        /// Reference instant (RFC 3339); defaults to now
        #[arg(long)]
        now: Option<String>,
        /// Parallel lanes (1-5)
        #[arg(long)]
        lanes: Option<i32>,
        /// Prefix for generated block ids
        #[arg(long, default_value = "block")]
        id_prefix: String,
    },
    /// Estimated start times for unscheduled tasks
    Window {
        #[arg(long)]
        tasks: PathBuf,
        #[arg(long)]
        now: Option<String>,
    },
    /// Projected task list with automatic breaks
    Project {
        #[arg(long)]
        tasks: PathBuf,
        #[arg(long)]
        now: Option<String>,
        /// Break debt ledger JSON
        #[arg(long)]
        ledger: Option<PathBuf>,
    },
    /// Replan the window touched by a calendar change
    Replan {
        /// Current block list JSON
        #[arg(long)]
        current: PathBuf,
        /// Calendar events before the change
        #[arg(long)]
        previous: PathBuf,
        /// Calendar events after the change
        #[arg(long)]
        next: PathBuf,
        #[arg(long)]
        template: PathBuf,
        #[arg(long)]
        tasks: PathBuf,
        #[arg(long)]
        now: Option<String>,
        #[arg(long)]
        lanes: Option<i32>,
        #[arg(long, default_value = "replan")]
        id_prefix: String,
    },
}

#[derive(Serialize)]
struct TaskStart<'a> {
    id: &'a str,
    title: &'a str,
    start_at: Option<chrono::DateTime<chrono::Utc>>,
}

fn read_calendar(path: &Path) -> Result<Vec<ScheduleBlock>> {
    let records: Vec<CalendarEventRecord> = read_json(path)?;
    Ok(calendar_blocks_from_records(&records))
}

pub fn run(action: PlanAction, config: &PlannerConfig) -> CliResult {
    match action {
        PlanAction::Day {
            template,
            tasks,
            calendar,
            now,
            lanes,
            id_prefix,
        } => {
            let template: DailyTemplate = read_json(&template)?;
            let tasks: Vec<Task> = read_json(&tasks)?;
            let calendar = match calendar {
                Some(path) => read_calendar(&path)?,
                None => Vec::new(),
            };
            let now = resolve_now(now.as_deref())?;

            let mut ids = BlockIdGenerator::new(id_prefix);
            let blocks = config.scheduler().generate_schedule(
                &ScheduleRequest {
                    template: &template,
                    calendar_events: &calendar,
                    tasks: &tasks,
                    now,
                    max_parallel_lanes: lanes,
                },
                &mut ids,
            );
            print_json(&blocks)
        }
        PlanAction::Window { tasks, now } => {
            let tasks: Vec<Task> = read_json(&tasks)?;
            let now = resolve_now(now.as_deref())?;
            let planned = recalculate_estimated_starts(&tasks, now);
            let starts: Vec<TaskStart<'_>> = planned
                .iter()
                .map(|t| TaskStart {
                    id: &t.id,
                    title: &t.title,
                    start_at: t.resolved_start(),
                })
                .collect();
            print_json(&starts)
        }
        PlanAction::Project { tasks, now, ledger } => {
            let tasks: Vec<Task> = read_json(&tasks)?;
            let now = resolve_now(now.as_deref())?;
            let mut projector = config.projector();
            if let Some(path) = ledger {
                let ledger: BreakDebtLedger = read_json(&path)?;
                projector = projector.with_ledger(ledger);
            }
            print_json(&projector.project(&tasks, now))
        }
        PlanAction::Replan {
            current,
            previous,
            next,
            template,
            tasks,
            now,
            lanes,
            id_prefix,
        } => {
            let current: Vec<ScheduleBlock> = read_json(&current)?;
            let previous = read_calendar(&previous)?;
            let next = read_calendar(&next)?;
            let template: DailyTemplate = read_json(&template)?;
            let tasks: Vec<Task> = read_json(&tasks)?;
            let now = resolve_now(now.as_deref())?;

            let mut ids = BlockIdGenerator::new(id_prefix);
            let outcome = config.replanner().replan(
                &ReplanRequest {
                    current_blocks: &current,
                    previous_calendar: &previous,
                    next_calendar: &next,
                    template: &template,
                    tasks: &tasks,
                    now,
                    max_parallel_lanes: lanes,
                },
                &mut ids,
            );
            print_json(&outcome)
        }
    }
}
