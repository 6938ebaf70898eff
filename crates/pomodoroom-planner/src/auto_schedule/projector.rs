//! Display projection with automatic breaks.
//!
//! Expands the estimated schedule into a list that also contains
//! auto-split focus segments and synthetic breaks. The output is a view;
//! synthetic entries are never real tasks and carry `auto-split-` /
//! `auto-break-` ids.
//!
//! Focus segments follow the progressive stage tables. A streak counter
//! grows with every segment and lengthens inter-task breaks; it resets after
//! a long idle gap or on a context-switch task.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::recalculate_estimated_starts;
use crate::break_debt::BreakDebtLedger;
use crate::progression::{Progression, StageTables};
use crate::task::{Task, TaskKind, TaskState};

const MIN_BREAK_MINUTES: i64 = 5;
const MAX_BREAK_MINUTES: i64 = 25;

/// Projector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectorConfig {
    /// Idle gap before a task that resets the streak.
    #[serde(default = "default_idle_reset_minutes")]
    pub idle_reset_minutes: i64,
    /// Smallest gap between tasks that receives a break.
    #[serde(default = "default_min_gap_for_break")]
    pub min_gap_for_break: i64,
    /// Tags marking a context switch.
    #[serde(default = "default_reset_tags")]
    pub reset_tags: Vec<String>,
    #[serde(default = "default_max_streak")]
    pub max_streak: u32,
}

fn default_idle_reset_minutes() -> i64 {
    40
}
fn default_min_gap_for_break() -> i64 {
    5
}
fn default_reset_tags() -> Vec<String> {
    [
        "reset_focus",
        "context_switch",
        "interrupt",
        "interruption",
        "meeting",
        "会議",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_max_streak() -> u32 {
    10
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            idle_reset_minutes: default_idle_reset_minutes(),
            min_gap_for_break: default_min_gap_for_break(),
            reset_tags: default_reset_tags(),
            max_streak: default_max_streak(),
        }
    }
}

/// Where a synthetic break sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakPlacement {
    /// Between two segments of the same task.
    Internal,
    /// In the gap before the next task.
    BetweenTasks,
}

/// One focus segment of a task split by the projector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSegment {
    pub id: String,
    pub parent_task_id: String,
    pub title: String,
    /// 1-based position within the parent task.
    pub index: u32,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticBreak {
    pub id: String,
    /// Task the break follows.
    pub after_task_id: String,
    pub placement: BreakPlacement,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub minutes: i64,
}

/// An entry of the projected list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ProjectedTask {
    Real(Task),
    Segment(SyntheticSegment),
    Break(SyntheticBreak),
}

impl ProjectedTask {
    pub fn id(&self) -> &str {
        match self {
            ProjectedTask::Real(task) => &task.id,
            ProjectedTask::Segment(segment) => &segment.id,
            ProjectedTask::Break(brk) => &brk.id,
        }
    }

    /// Effective start used for ordering.
    pub fn start_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ProjectedTask::Real(task) => task.resolved_start(),
            ProjectedTask::Segment(segment) => Some(segment.start_at),
            ProjectedTask::Break(brk) => Some(brk.start_at),
        }
    }

    pub fn is_break(&self) -> bool {
        match self {
            ProjectedTask::Real(task) => task.kind == TaskKind::Break,
            ProjectedTask::Segment(_) => false,
            ProjectedTask::Break(_) => true,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        !matches!(self, ProjectedTask::Real(_))
    }
}

/// Break length after `task`, given the free gap and the current streak.
///
/// A fifth of the task, at least five minutes, plus two minutes for every
/// streak level above one. The result is kept within 5..=25 and never
/// exceeds the gap.
pub fn recommend_break_minutes(task: &Task, available_gap_minutes: i64, streak_level: u32) -> i64 {
    let required = task.required_minutes_or_default() as f64;
    let base = ((required * 0.2).round() as i64).max(MIN_BREAK_MINUTES);
    let bonus = i64::from(streak_level.saturating_sub(1)) * 2;
    (base + bonus)
        .clamp(MIN_BREAK_MINUTES, MAX_BREAK_MINUTES)
        .min(available_gap_minutes.max(0))
}

/// Projects tasks into a display list with automatic breaks.
#[derive(Debug, Clone)]
pub struct AutoBreakProjector {
    config: ProjectorConfig,
    tables: StageTables,
    ledger: Option<BreakDebtLedger>,
}

impl Default for AutoBreakProjector {
    fn default() -> Self {
        Self::new()
    }
}

/// Running streak state while walking the schedule.
#[derive(Debug, Clone, Copy, Default)]
struct Streak {
    level: u32,
    stage: usize,
}

impl AutoBreakProjector {
    pub fn new() -> Self {
        Self::with_config(ProjectorConfig::default(), &Progression::default_progressive())
    }

    pub fn with_config(config: ProjectorConfig, progression: &Progression) -> Self {
        Self {
            config,
            tables: progression.tables(),
            ledger: None,
        }
    }

    /// Lengthen inter-task breaks to repay outstanding break debt.
    pub fn with_ledger(mut self, ledger: BreakDebtLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    fn is_reset_task(&self, task: &Task) -> bool {
        task.kind == TaskKind::FixedEvent
            || self.config.reset_tags.iter().any(|tag| task.has_tag(tag))
    }

    /// Build the projected list for `tasks` as of `now`.
    ///
    /// DONE tasks pass through. READY/PAUSED non-break tasks with a start
    /// are expanded into segments and breaks. Everything else is carried
    /// through unchanged. The result is ordered by start time, breaks first
    /// on ties, then by id.
    pub fn project(&self, tasks: &[Task], now: DateTime<Utc>) -> Vec<ProjectedTask> {
        let planned = recalculate_estimated_starts(tasks, now);

        let mut output = Vec::with_capacity(planned.len());
        let mut active: Vec<(DateTime<Utc>, Task)> = Vec::new();
        for task in planned {
            let start = task.resolved_start();
            match (task.state, start) {
                (TaskState::Done, _) => output.push(ProjectedTask::Real(task)),
                (TaskState::Ready | TaskState::Paused, Some(start))
                    if task.kind != TaskKind::Break =>
                {
                    active.push((start, task))
                }
                _ => output.push(ProjectedTask::Real(task)),
            }
        }
        active.sort_by(|(a, ta), (b, tb)| a.cmp(b).then_with(|| ta.id.cmp(&tb.id)));

        let mut ledger = self.ledger.clone();
        let mut streak = Streak::default();
        let mut previous_end: Option<DateTime<Utc>> = None;

        for (index, (start, task)) in active.iter().enumerate() {
            if self.is_reset_task(task) {
                trace!(task_id = %task.id, "context switch resets streak");
                streak = Streak::default();
            } else if let Some(prev) = previous_end {
                if (*start - prev).num_minutes() >= self.config.idle_reset_minutes {
                    trace!(task_id = %task.id, "idle gap resets streak");
                    streak = Streak::default();
                }
            }

            let end = self.expand_task(task, *start, &mut streak, &mut output);
            previous_end = Some(end);

            let Some((next_start, next)) = active.get(index + 1) else {
                continue;
            };
            if next.id == task.id {
                continue;
            }
            let gap = (*next_start - end).num_minutes();
            if gap < self.config.min_gap_for_break {
                continue;
            }
            let mut minutes = recommend_break_minutes(task, gap, streak.level);
            if let Some(ledger) = ledger.as_mut() {
                let bonus = ledger
                    .repayment_minutes(gap - minutes)
                    .min(MAX_BREAK_MINUTES - minutes)
                    .max(0);
                ledger.repay(bonus);
                minutes += bonus;
            }
            if minutes > 0 {
                output.push(ProjectedTask::Break(SyntheticBreak {
                    id: format!("auto-break-{}-gap", task.id),
                    after_task_id: task.id.clone(),
                    placement: BreakPlacement::BetweenTasks,
                    start_at: end,
                    end_at: end + Duration::minutes(minutes),
                    minutes,
                }));
            }
        }

        output.sort_by(|a, b| {
            let key = |p: &ProjectedTask| (p.start_at().is_none(), p.start_at(), !p.is_break());
            key(a).cmp(&key(b)).then_with(|| a.id().cmp(b.id()))
        });
        output
    }

    /// Emit the segments of one task; returns where the task ends.
    fn expand_task(
        &self,
        task: &Task,
        start: DateTime<Utc>,
        streak: &mut Streak,
        output: &mut Vec<ProjectedTask>,
    ) -> DateTime<Utc> {
        let mut remaining = task.required_minutes_or_default();
        let mut cursor = start;
        let mut pieces: Vec<(DateTime<Utc>, i64)> = Vec::new();
        let mut internal_breaks: Vec<(DateTime<Utc>, i64)> = Vec::new();

        while remaining > 0 {
            let focus = self.tables.focus_at(streak.stage).max(1).min(remaining);
            pieces.push((cursor, focus));
            cursor += Duration::minutes(focus);
            remaining -= focus;

            let brk = self.tables.break_at(streak.stage);
            streak.level = (streak.level + 1).min(self.config.max_streak);
            streak.stage = (streak.stage + 1).min(self.tables.last_stage());

            if remaining > 0 && brk > 0 {
                internal_breaks.push((cursor, brk));
                cursor += Duration::minutes(brk);
            }
        }

        if let [(seg_start, minutes)] = pieces.as_slice() {
            let mut single = task.clone();
            single.fixed_start_at = Some(*seg_start);
            single.fixed_end_at = Some(*seg_start + Duration::minutes(*minutes));
            output.push(ProjectedTask::Real(single));
            return cursor;
        }

        for (n, (seg_start, minutes)) in pieces.iter().enumerate() {
            let n = n + 1;
            output.push(ProjectedTask::Segment(SyntheticSegment {
                id: format!("auto-split-{}-{}", task.id, n),
                parent_task_id: task.id.clone(),
                title: format!("{} ({})", task.title, n),
                index: n as u32,
                start_at: *seg_start,
                end_at: *seg_start + Duration::minutes(*minutes),
                minutes: *minutes,
            }));
        }
        for (n, (brk_start, minutes)) in internal_breaks.iter().enumerate() {
            output.push(ProjectedTask::Break(SyntheticBreak {
                id: format!("auto-break-{}-{}", task.id, n + 1),
                after_task_id: task.id.clone(),
                placement: BreakPlacement::Internal,
                start_at: *brk_start,
                end_at: *brk_start + Duration::minutes(*minutes),
                minutes: *minutes,
            }));
        }
        cursor
    }
}

/// Project `tasks` with the default progression and settings.
pub fn build_projected_tasks_with_auto_breaks(
    tasks: &[Task],
    now: DateTime<Utc>,
) -> Vec<ProjectedTask> {
    AutoBreakProjector::new().project(tasks, now)
}
