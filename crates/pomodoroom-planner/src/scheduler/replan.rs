//! Event-driven incremental replanning.
//!
//! When the calendar changes, only the time window touched by the change
//! (plus padding) is rescheduled. Blocks outside that window are carried
//! forward unchanged and locked, so the outside-window churn of a correct
//! replan is always zero.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{locked_blocks, AutoScheduler};
use crate::schedule::{BlockIdGenerator, BlockType, DailyTemplate, ScheduleBlock};
use crate::task::Task;
use crate::timeline::Interval;

/// Default padding around an impacted window, in minutes.
pub const DEFAULT_PADDING_MINUTES: i64 = 15;

/// The region that needs replanning after an external change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactedWindow {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl ImpactedWindow {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self { start_time, end_time }
    }

    /// Half-open intersection with a block.
    pub fn intersects(&self, block: &ScheduleBlock) -> bool {
        block.start_time < self.end_time && block.end_time > self.start_time
    }

    pub fn as_interval(&self) -> Interval {
        Interval::new(self.start_time, self.end_time)
    }
}

/// Detect the window touched by a calendar delta.
///
/// Events are matched by id. Added, removed and reshaped events contribute
/// their own span and their counterpart's. Returns `None` when nothing
/// changed, otherwise the covering span padded on both sides.
pub fn detect_impacted_window_from_calendar_delta(
    previous: &[ScheduleBlock],
    next: &[ScheduleBlock],
    padding_minutes: i64,
) -> Option<ImpactedWindow> {
    let before = index_by_id(previous.iter());
    let after = index_by_id(next.iter());

    let mut span: Option<(DateTime<Utc>, DateTime<Utc>)> = None;
    let mut include = |block: &ScheduleBlock| {
        span = Some(match span {
            Some((lo, hi)) => (lo.min(block.start_time), hi.max(block.end_time)),
            None => (block.start_time, block.end_time),
        });
    };

    for id in before.keys().chain(after.keys()).collect::<BTreeSet<_>>() {
        match (before.get(id), after.get(id)) {
            (Some(old), Some(new)) if !old.same_shape(new) => {
                include(*old);
                include(*new);
            }
            (Some(old), None) => include(*old),
            (None, Some(new)) => include(*new),
            _ => {}
        }
    }

    let padding = Duration::minutes(padding_minutes.max(0));
    span.map(|(lo, hi)| ImpactedWindow::new(lo - padding, hi + padding))
}

/// Merge a local replan into the current block list.
///
/// Current blocks outside the window are kept verbatim but locked; replanned
/// blocks that intersect the window replace everything inside it.
pub fn merge_local_replan(
    current: &[ScheduleBlock],
    replanned: &[ScheduleBlock],
    window: &ImpactedWindow,
) -> Vec<ScheduleBlock> {
    let mut merged: Vec<ScheduleBlock> = current
        .iter()
        .filter(|block| !window.intersects(block))
        .map(|block| ScheduleBlock {
            locked: true,
            ..block.clone()
        })
        .chain(replanned.iter().filter(|block| window.intersects(block)).cloned())
        .collect();
    merged.sort_by_key(|b| b.start_time);
    merged
}

/// Kind of change between two plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplanChange {
    Added,
    Removed,
    Updated,
}

/// One changed block id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplanDiffItem {
    pub block_id: String,
    pub change: ReplanChange,
    pub before: Option<ScheduleBlock>,
    pub after: Option<ScheduleBlock>,
}

/// Diff the blocks that intersect the window on either side, ordered by id.
pub fn build_replan_diff(
    before: &[ScheduleBlock],
    after: &[ScheduleBlock],
    window: &ImpactedWindow,
) -> Vec<ReplanDiffItem> {
    let old = index_by_id(before.iter().filter(|b| window.intersects(b)));
    let new = index_by_id(after.iter().filter(|b| window.intersects(b)));
    diff_indexed(&old, &new)
}

/// Count ids outside the window that were added, removed or reshaped.
pub fn calculate_churn_outside_window(
    before: &[ScheduleBlock],
    after: &[ScheduleBlock],
    window: &ImpactedWindow,
) -> usize {
    let old = index_by_id(before.iter().filter(|b| !window.intersects(b)));
    let new = index_by_id(after.iter().filter(|b| !window.intersects(b)));
    diff_indexed(&old, &new).len()
}

fn index_by_id<'a>(
    blocks: impl Iterator<Item = &'a ScheduleBlock>,
) -> BTreeMap<&'a str, &'a ScheduleBlock> {
    blocks.map(|b| (b.id.as_str(), b)).collect()
}

fn diff_indexed(
    old: &BTreeMap<&str, &ScheduleBlock>,
    new: &BTreeMap<&str, &ScheduleBlock>,
) -> Vec<ReplanDiffItem> {
    let ids: BTreeSet<&str> = old.keys().chain(new.keys()).copied().collect();
    ids.into_iter()
        .filter_map(|id| {
            let change = match (old.get(id), new.get(id)) {
                (Some(a), Some(b)) if a.same_shape(b) => return None,
                (Some(_), Some(_)) => ReplanChange::Updated,
                (Some(_), None) => ReplanChange::Removed,
                (None, Some(_)) => ReplanChange::Added,
                (None, None) => return None,
            };
            Some(ReplanDiffItem {
                block_id: id.to_string(),
                change,
                before: old.get(id).map(|b| (*b).clone()),
                after: new.get(id).map(|b| (*b).clone()),
            })
        })
        .collect()
}

/// Inputs for one replan.
#[derive(Debug, Clone, Copy)]
pub struct ReplanRequest<'a> {
    pub current_blocks: &'a [ScheduleBlock],
    pub previous_calendar: &'a [ScheduleBlock],
    pub next_calendar: &'a [ScheduleBlock],
    pub template: &'a DailyTemplate,
    pub tasks: &'a [Task],
    pub now: DateTime<Utc>,
    pub max_parallel_lanes: Option<i32>,
}

/// Result of a replan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplanOutcome {
    /// `None` when the calendar delta was empty.
    pub window: Option<ImpactedWindow>,
    pub blocks: Vec<ScheduleBlock>,
    pub diff: Vec<ReplanDiffItem>,
    pub churn_outside_window: usize,
}

/// Reschedules only the window touched by a calendar delta.
#[derive(Debug, Clone)]
pub struct EventDrivenReplanner {
    scheduler: AutoScheduler,
    padding_minutes: i64,
}

impl EventDrivenReplanner {
    pub fn new(scheduler: AutoScheduler) -> Self {
        Self {
            scheduler,
            padding_minutes: DEFAULT_PADDING_MINUTES,
        }
    }

    pub fn with_padding(mut self, minutes: i64) -> Self {
        self.padding_minutes = minutes.max(0);
        self
    }

    /// Detect, reschedule inside the window, merge, diff.
    ///
    /// `ids` is advanced past every id already in `current_blocks`, so the
    /// merged plan never repeats an id even when the same prefix is reused
    /// across replans.
    pub fn replan(&self, request: &ReplanRequest<'_>, ids: &mut BlockIdGenerator) -> ReplanOutcome {
        ids.resume_after(request.current_blocks);
        let Some(window) = detect_impacted_window_from_calendar_delta(
            request.previous_calendar,
            request.next_calendar,
            self.padding_minutes,
        ) else {
            debug!("calendar delta is empty; keeping current plan");
            return ReplanOutcome {
                window: None,
                blocks: request.current_blocks.to_vec(),
                diff: Vec::new(),
                churn_outside_window: 0,
            };
        };

        let replanned = self.replan_window(request, &window, ids);
        let blocks = merge_local_replan(request.current_blocks, &replanned, &window);
        let diff = build_replan_diff(request.current_blocks, &blocks, &window);
        let churn = calculate_churn_outside_window(request.current_blocks, &blocks, &window);

        if churn != 0 {
            warn!(churn, "incremental replan changed blocks outside its window");
        }
        debug!(
            window_start = %window.start_time,
            window_end = %window.end_time,
            changes = diff.len(),
            "replanned impacted window"
        );

        ReplanOutcome {
            window: Some(window),
            blocks,
            diff,
            churn_outside_window: churn,
        }
    }

    /// Locked blocks touching the window plus freshly generated focus/break blocks.
    fn replan_window(
        &self,
        request: &ReplanRequest<'_>,
        window: &ImpactedWindow,
        ids: &mut BlockIdGenerator,
    ) -> Vec<ScheduleBlock> {
        let locked: Vec<ScheduleBlock> =
            locked_blocks(request.template, request.next_calendar, request.now)
                .into_iter()
                .filter(|b| window.intersects(b))
                .collect();

        let range = match request.template.day_bounds(request.now) {
            Some(day) => Interval::new(
                window.start_time.max(day.start),
                window.end_time.min(day.end),
            ),
            None => return locked,
        };

        let tasks = credit_preserved_pomodoros(request.tasks, request.current_blocks, window);
        let lanes = self
            .scheduler
            .resolve_lanes(request.max_parallel_lanes, request.template);
        let generated = self.scheduler.schedule_range(range, &locked, &tasks, lanes, ids);

        locked.into_iter().chain(generated).collect()
    }
}

/// Count focus blocks kept outside the window as already-planned pomodoros.
fn credit_preserved_pomodoros(
    tasks: &[Task],
    current: &[ScheduleBlock],
    window: &ImpactedWindow,
) -> Vec<Task> {
    let mut planned: BTreeMap<&str, i32> = BTreeMap::new();
    for block in current
        .iter()
        .filter(|b| b.block_type == BlockType::Focus && !window.intersects(b))
    {
        if let Some(task_id) = block.task_id.as_deref() {
            *planned.entry(task_id).or_default() += 1;
        }
    }

    tasks
        .iter()
        .map(|task| {
            let mut task = task.clone();
            if let Some(count) = planned.get(task.id.as_str()) {
                task.completed_pomodoros += count;
            }
            task
        })
        .collect()
}
