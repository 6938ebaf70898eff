//! Automatic full-day scheduler.
//!
//! This module fills a day with focus/break blocks:
//! - Derives day bounds and routine blocks from the DailyTemplate
//! - Treats routine and calendar blocks as locked
//! - Finds free gaps between locked blocks
//! - Fills every gap lane by lane with progressive focus/break placements
//! - Assigns focus blocks to the priority-ordered task queue

pub mod progressive;
pub mod replan;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::schedule::{BlockIdGenerator, BlockType, DailyTemplate, ScheduleBlock};
use crate::task::{Task, TaskCategory};
use crate::timeline::{find_gaps, Interval};

pub use progressive::{ProgressiveSelector, SelectorConfig};
pub use replan::{
    build_replan_diff, calculate_churn_outside_window, detect_impacted_window_from_calendar_delta,
    merge_local_replan, EventDrivenReplanner, ImpactedWindow, ReplanChange, ReplanDiffItem,
    ReplanOutcome, ReplanRequest,
};

/// Upper bound on parallel lanes.
pub const MAX_LANES: usize = 5;

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Lane count used when neither the request nor the template sets one.
    #[serde(default = "default_lanes")]
    pub default_lanes: i32,
}

fn default_lanes() -> i32 {
    1
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_lanes: default_lanes(),
        }
    }
}

/// Inputs for one full-day scheduling run.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleRequest<'a> {
    pub template: &'a DailyTemplate,
    /// Calendar events as blocks; they are always treated as locked.
    pub calendar_events: &'a [ScheduleBlock],
    pub tasks: &'a [Task],
    pub now: DateTime<Utc>,
    pub max_parallel_lanes: Option<i32>,
}

/// Automatic scheduler for focus/break blocks
#[derive(Debug, Clone, Default)]
pub struct AutoScheduler {
    config: SchedulerConfig,
    selector: ProgressiveSelector,
}

impl AutoScheduler {
    /// Create a new scheduler with default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom config
    pub fn with_config(config: SchedulerConfig, selector: ProgressiveSelector) -> Self {
        Self { config, selector }
    }

    pub fn selector(&self) -> &ProgressiveSelector {
        &self.selector
    }

    /// Generate the full-day block list.
    ///
    /// Returns locked routine/calendar blocks plus generated focus/break
    /// blocks, sorted by start time. Identical inputs (including the state of
    /// `ids`) produce identical output.
    pub fn generate_schedule(
        &self,
        request: &ScheduleRequest<'_>,
        ids: &mut BlockIdGenerator,
    ) -> Vec<ScheduleBlock> {
        let locked = locked_blocks(request.template, request.calendar_events, request.now);

        let Some(day) = request.template.day_bounds(request.now) else {
            debug!(
                wake_up = %request.template.wake_up,
                sleep = %request.template.sleep,
                "template has unparseable day bounds; returning locked blocks only"
            );
            return sorted_by_start(locked);
        };

        let lanes = self.resolve_lanes(request.max_parallel_lanes, request.template);
        let generated = self.schedule_range(day, &locked, request.tasks, lanes, ids);
        debug!(
            locked = locked.len(),
            generated = generated.len(),
            lanes,
            "generated full-day schedule"
        );

        sorted_by_start(locked.into_iter().chain(generated).collect())
    }

    /// Lane count: request, then template, then config; clamped to 1..=5.
    pub fn resolve_lanes(&self, requested: Option<i32>, template: &DailyTemplate) -> usize {
        let lanes = requested
            .or(template.max_parallel_lanes)
            .unwrap_or(self.config.default_lanes);
        lanes.clamp(1, MAX_LANES as i32) as usize
    }

    /// Fill the free time of `range` around `locked` and return only the new blocks.
    pub fn schedule_range(
        &self,
        range: Interval,
        locked: &[ScheduleBlock],
        tasks: &[Task],
        lanes: usize,
        ids: &mut BlockIdGenerator,
    ) -> Vec<ScheduleBlock> {
        let lanes = lanes.clamp(1, MAX_LANES);
        let locked_intervals: Vec<Interval> = locked.iter().map(ScheduleBlock::interval).collect();
        let gaps = find_gaps(&locked_intervals, range.start, range.end);

        let mut queue = TaskQueue::from_tasks(tasks);
        let mut sessions = vec![0usize; lanes];
        let mut blocks = Vec::new();

        for gap in gaps {
            let mut cursors = vec![gap.start; lanes];
            let mut exhausted = vec![false; lanes];

            loop {
                let mut progressed = false;

                for lane in 0..lanes {
                    if exhausted[lane] || cursors[lane] >= gap.end {
                        continue;
                    }

                    let available = (gap.end - cursors[lane]).num_minutes();
                    let session = sessions[lane];
                    let Some(focus) = self.selector.pick_focus_duration(available, session) else {
                        trace!(lane, available, "lane exhausted for gap");
                        exhausted[lane] = true;
                        continue;
                    };

                    let focus_start = cursors[lane];
                    let focus_end = focus_start + Duration::minutes(focus);
                    let assigned = queue.take();
                    blocks.push(ScheduleBlock {
                        id: ids.next_id(BlockType::Focus),
                        block_type: BlockType::Focus,
                        task_id: assigned.map(|(id, _)| id.to_string()),
                        start_time: focus_start,
                        end_time: focus_end,
                        locked: false,
                        label: Some(assigned.map_or("Focus", |(_, title)| title).to_string()),
                        lane: Some(lane as i32),
                    });
                    sessions[lane] += 1;

                    let brk = self.selector.break_for(session);
                    if brk > 0 && focus + brk <= available {
                        let break_end = focus_end + Duration::minutes(brk);
                        // Only lane 0 materializes breaks; other lanes just skip the time.
                        if lane == 0 {
                            let label = if self.selector.is_long_break(session) {
                                "Long Break"
                            } else {
                                "Short Break"
                            };
                            blocks.push(ScheduleBlock {
                                id: ids.next_id(BlockType::Break),
                                block_type: BlockType::Break,
                                task_id: None,
                                start_time: focus_end,
                                end_time: break_end,
                                locked: false,
                                label: Some(label.to_string()),
                                lane: Some(0),
                            });
                        }
                        cursors[lane] = break_end;
                    } else {
                        cursors[lane] = focus_end;
                    }
                    progressed = true;
                }

                if !progressed {
                    break;
                }
            }
        }

        blocks
    }
}

/// Routine blocks for the day plus calendar blocks, all forced locked.
pub fn locked_blocks(
    template: &DailyTemplate,
    calendar_events: &[ScheduleBlock],
    now: DateTime<Utc>,
) -> Vec<ScheduleBlock> {
    template
        .routine_blocks(now)
        .into_iter()
        .chain(calendar_events.iter().map(|event| ScheduleBlock {
            locked: true,
            ..event.clone()
        }))
        .collect()
}

fn sorted_by_start(mut blocks: Vec<ScheduleBlock>) -> Vec<ScheduleBlock> {
    blocks.sort_by_key(|b| b.start_time);
    blocks
}

/// Shared assignment cursor over the priority-ordered task queue.
struct TaskQueue<'a> {
    entries: Vec<(&'a str, &'a str, i32)>,
    head: usize,
}

impl<'a> TaskQueue<'a> {
    /// Active, incomplete tasks by priority descending; ties keep input order.
    fn from_tasks(tasks: &'a [Task]) -> Self {
        let mut active: Vec<&Task> = tasks
            .iter()
            .filter(|t| !t.completed && t.category == TaskCategory::Active)
            .collect();
        active.sort_by_key(|t| std::cmp::Reverse(t.priority_or_default()));

        Self {
            entries: active
                .into_iter()
                .map(|t| (t.id.as_str(), t.title.as_str(), t.remaining_pomodoros()))
                .collect(),
            head: 0,
        }
    }

    /// Consume one pomodoro of the head task, advancing past exhausted tasks.
    fn take(&mut self) -> Option<(&'a str, &'a str)> {
        while let Some(entry) = self.entries.get_mut(self.head) {
            if entry.2 > 0 {
                entry.2 -= 1;
                return Some((entry.0, entry.1));
            }
            self.head += 1;
        }
        None
    }
}
