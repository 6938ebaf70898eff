//! Estimated start times for unscheduled tasks.
//!
//! Movable tasks (READY/PAUSED without fixed or window times) are packed
//! back to back from the next quarter hour, hopping over the intervals
//! occupied by locked tasks. The result feeds the unscheduled-task
//! dashboard and the auto-break projector.

pub mod projector;

use chrono::{DateTime, Duration, Utc};
use tracing::trace;

use crate::task::Task;
use crate::timeline::Interval;

pub use projector::{
    build_projected_tasks_with_auto_breaks, recommend_break_minutes, AutoBreakProjector,
    BreakPlacement, ProjectedTask, ProjectorConfig, SyntheticBreak, SyntheticSegment,
};

const QUARTER_HOUR_SECS: i64 = 15 * 60;

/// Round `now` up to the next quarter hour; exact quarters are kept.
pub fn round_up_to_quarter_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    let secs = now.timestamp();
    if now.timestamp_subsec_nanos() == 0 && secs.rem_euclid(QUARTER_HOUR_SECS) == 0 {
        return now;
    }
    let rounded = (secs.div_euclid(QUARTER_HOUR_SECS) + 1) * QUARTER_HOUR_SECS;
    DateTime::from_timestamp(rounded, 0).unwrap_or(now)
}

/// Sorted intervals occupied by locked tasks; invalid ranges are dropped.
pub fn collect_anchors(tasks: &[Task]) -> Vec<Interval> {
    let mut anchors: Vec<Interval> = tasks
        .iter()
        .filter(|task| task.is_locked())
        .filter_map(|task| {
            let interval = task.anchor_interval();
            if interval.is_none() {
                trace!(task_id = %task.id, "skipping locked task with empty time range");
            }
            interval.map(|(start, end)| Interval::new(start, end))
        })
        .collect();
    anchors.sort_by_key(|a| (a.start, a.end));
    anchors
}

/// Recompute `estimated_start_at` for every movable task.
///
/// Movable tasks keep their input order. Each starts at the shared cursor,
/// is pushed past any anchor it would overlap, and advances the cursor to
/// its end. Locked and frozen tasks are returned untouched.
pub fn recalculate_estimated_starts(tasks: &[Task], now: DateTime<Utc>) -> Vec<Task> {
    let anchors = collect_anchors(tasks);
    let mut cursor = round_up_to_quarter_hour(now);

    tasks
        .iter()
        .map(|task| {
            if !task.is_movable() {
                return task.clone();
            }

            let duration = Duration::minutes(task.required_minutes_or_default());
            let start = place_after_anchors(cursor, duration, &anchors);
            cursor = start + duration;

            let mut placed = task.clone();
            placed.estimated_start_at = Some(start);
            placed
        })
        .collect()
}

/// Earliest start at or after `candidate` whose span avoids every anchor.
fn place_after_anchors(
    mut candidate: DateTime<Utc>,
    duration: Duration,
    anchors: &[Interval],
) -> DateTime<Utc> {
    // The candidate only moves forward, so each anchor can push it at most once.
    for _ in 0..=anchors.len() {
        let end = candidate + duration;
        match anchors
            .iter()
            .take_while(|a| a.start < end)
            .find(|a| a.end > candidate)
        {
            Some(anchor) => candidate = anchor.end,
            None => break,
        }
    }
    candidate
}

/// Start time to display for `task`.
///
/// Fixed start, then window start, then the stored estimate, then a fresh
/// estimate computed over `all_tasks`. `None` when the task cannot be placed.
pub fn get_display_start_time(
    task: &Task,
    all_tasks: &[Task],
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if let Some(start) = task.resolved_start() {
        return Some(start);
    }
    recalculate_estimated_starts(all_tasks, now)
        .into_iter()
        .find(|t| t.id == task.id)
        .and_then(|t| t.estimated_start_at)
}
