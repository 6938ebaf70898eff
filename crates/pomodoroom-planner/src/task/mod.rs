//! Task types as seen by the planner.
//!
//! The task repository owns the full record; the planner reads the
//! scheduling subset (state, kind, time fields, duration, priority, tags)
//! and writes back only `estimated_start_at`.

pub mod split_preview;

use chrono::{DateTime, Duration, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::schedule::parse_instant;

/// Default duration for tasks without `required_minutes`.
pub const DEFAULT_REQUIRED_MINUTES: i64 = 25;

/// Default priority for tasks without an explicit one.
pub const DEFAULT_PRIORITY: i32 = 50;

/// Task state enumeration.
///
/// Valid transitions:
/// - READY → RUNNING (start)
/// - READY → READY (defer)
/// - RUNNING → DONE (complete)
/// - RUNNING → RUNNING (extend)
/// - RUNNING → PAUSED (pause)
/// - RUNNING → READY (postpone)
/// - PAUSED → RUNNING (resume)
///
/// Only READY and PAUSED tasks are re-placed by the planner; RUNNING and
/// DONE tasks are frozen inputs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    /// Task is ready to start (initial state / task creation)
    #[default]
    Ready,
    /// Task is currently running
    Running,
    /// Task is paused (temporarily stopped)
    Paused,
    /// Task is completed (terminal state)
    Done,
}

impl TaskState {
    /// Check if a transition is valid.
    pub fn can_transition_to(&self, to: &TaskState) -> bool {
        match self {
            TaskState::Ready => matches!(to, TaskState::Running | TaskState::Ready),
            TaskState::Running => matches!(
                to,
                TaskState::Done | TaskState::Running | TaskState::Paused | TaskState::Ready
            ),
            TaskState::Paused => matches!(to, TaskState::Running),
            TaskState::Done => false,
        }
    }

    /// Whether the planner may move a task in this state.
    pub fn is_movable(&self) -> bool {
        matches!(self, TaskState::Ready | TaskState::Paused)
    }
}

/// Energy level for task scheduling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Low,
    #[default]
    Medium,
    High,
}

/// Kind of task scheduling semantics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Absolute-time event with fixed start/end.
    FixedEvent,
    /// Task with flexible execution window and required duration.
    FlexWindow,
    /// Duration-only task without explicit time bounds.
    #[default]
    DurationOnly,
    /// Break task counted as a task item.
    Break,
}

/// Category of task for organizing work.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    /// Active tasks that should be scheduled now.
    #[default]
    Active,
    /// Someday/maybe tasks for future consideration.
    Someday,
}

/// A task record, restricted to the fields the planner touches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, stable across edits
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Estimated number of pomodoros
    #[serde(default = "default_estimated_pomodoros")]
    pub estimated_pomodoros: i32,
    #[serde(default)]
    pub completed_pomodoros: i32,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub state: TaskState,
    #[serde(default)]
    pub kind: TaskKind,
    /// Required duration in minutes (25 when absent).
    #[serde(default)]
    pub required_minutes: Option<u32>,
    /// Fixed start timestamp for absolute-time events.
    #[serde(default, deserialize_with = "lenient_instant")]
    pub fixed_start_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_instant")]
    pub fixed_end_at: Option<DateTime<Utc>>,
    /// Flexible window start bound.
    #[serde(default, deserialize_with = "lenient_instant")]
    pub window_start_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_instant")]
    pub window_end_at: Option<DateTime<Utc>>,
    /// Planner-computed start; never authoritative.
    #[serde(default, deserialize_with = "lenient_instant")]
    pub estimated_start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Priority value (0-100, null for default priority of 50)
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub category: TaskCategory,
    #[serde(default)]
    pub energy: EnergyLevel,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_instant")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_instant")]
    pub paused_at: Option<DateTime<Utc>>,
}

fn default_estimated_pomodoros() -> i32 {
    1
}

/// Optional timestamp that tolerates unreadable values.
///
/// Anything other than a parseable timestamp string reads as `None`, so one
/// malformed record never rejects the whole task list.
fn lenient_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Other(IgnoredAny),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(raw)) => {
            let parsed = parse_instant(&raw);
            if parsed.is_none() {
                debug!(value = %raw, "ignoring unparseable task timestamp");
            }
            parsed
        }
        Some(Raw::Other(_)) => {
            debug!("ignoring non-string task timestamp");
            None
        }
        None => None,
    })
}

impl Task {
    /// Create a new READY task with a caller-supplied id.
    pub fn with_id(id: impl Into<String>, title: impl Into<String>) -> Self {
        Task {
            id: id.into(),
            title: title.into(),
            description: None,
            estimated_pomodoros: 1,
            completed_pomodoros: 0,
            completed: false,
            state: TaskState::Ready,
            kind: TaskKind::DurationOnly,
            required_minutes: None,
            fixed_start_at: None,
            fixed_end_at: None,
            window_start_at: None,
            window_end_at: None,
            estimated_start_at: None,
            tags: Vec::new(),
            priority: None,
            category: TaskCategory::Active,
            energy: EnergyLevel::Medium,
            project_id: None,
            completed_at: None,
            paused_at: None,
        }
    }

    pub fn with_required_minutes(mut self, minutes: u32) -> Self {
        self.required_minutes = Some(minutes);
        self
    }

    pub fn with_state(mut self, state: TaskState) -> Self {
        self.state = state;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_pomodoros(mut self, estimated: i32, completed: i32) -> Self {
        self.estimated_pomodoros = estimated;
        self.completed_pomodoros = completed;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Pin the task to an absolute time range.
    pub fn with_fixed(mut self, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Self {
        self.kind = TaskKind::FixedEvent;
        self.fixed_start_at = Some(start);
        self.fixed_end_at = end;
        self
    }

    /// Restrict the task to a flexible window.
    pub fn with_window(mut self, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Self {
        self.kind = TaskKind::FlexWindow;
        self.window_start_at = Some(start);
        self.window_end_at = end;
        self
    }

    /// Duration used for every computation, floored to one minute.
    pub fn required_minutes_or_default(&self) -> i64 {
        self.required_minutes
            .map(i64::from)
            .unwrap_or(DEFAULT_REQUIRED_MINUTES)
            .max(1)
    }

    pub fn priority_or_default(&self) -> i32 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    /// A task is locked iff it carries a fixed start or a window start.
    pub fn is_locked(&self) -> bool {
        self.fixed_start_at.is_some() || self.window_start_at.is_some()
    }

    /// READY/PAUSED, not locked, and not a fixed event.
    ///
    /// A fixed event whose start is missing or unreadable is neither an
    /// anchor nor movable; the planner leaves it unplaced.
    pub fn is_movable(&self) -> bool {
        self.state.is_movable() && !self.is_locked() && self.kind != TaskKind::FixedEvent
    }

    /// The authoritative start of a locked task.
    pub fn anchor_start(&self) -> Option<DateTime<Utc>> {
        self.fixed_start_at.or(self.window_start_at)
    }

    /// The interval a locked task occupies.
    ///
    /// The end is the explicit end field paired with the start that was
    /// used, else `start + required_minutes`. Inverted ranges yield `None`.
    pub fn anchor_interval(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let (start, explicit_end) = match (self.fixed_start_at, self.window_start_at) {
            (Some(start), _) => (start, self.fixed_end_at),
            (None, Some(start)) => (start, self.window_end_at),
            (None, None) => return None,
        };
        let end = explicit_end
            .unwrap_or_else(|| start + Duration::minutes(self.required_minutes_or_default()));
        (end > start).then_some((start, end))
    }

    /// Start used for display: fixed, then window, then estimated.
    pub fn resolved_start(&self) -> Option<DateTime<Utc>> {
        self.fixed_start_at
            .or(self.window_start_at)
            .or(self.estimated_start_at)
    }

    /// Pomodoros still to be planned.
    pub fn remaining_pomodoros(&self) -> i32 {
        (self.estimated_pomodoros - self.completed_pomodoros).max(0)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Transition to a new state.
    ///
    /// `now` stamps the completion and pause timestamps.
    pub fn transition_to(
        &mut self,
        new_state: TaskState,
        now: DateTime<Utc>,
    ) -> Result<(), TaskTransitionError> {
        if !self.state.can_transition_to(&new_state) {
            return Err(TaskTransitionError {
                from: self.state,
                to: new_state,
            });
        }

        match new_state {
            TaskState::Done => {
                self.completed = true;
                self.completed_at = Some(now);
                self.paused_at = None;
            }
            TaskState::Paused => {
                self.paused_at = Some(now);
            }
            TaskState::Running | TaskState::Ready => {
                self.paused_at = None;
            }
        }

        self.state = new_state;
        Ok(())
    }
}

/// Error returned when an invalid state transition is attempted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskTransitionError {
    pub from: TaskState,
    pub to: TaskState,
}

impl std::fmt::Display for TaskTransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Invalid state transition: {:?} → {:?}",
            self.from, self.to
        )
    }
}

impl std::error::Error for TaskTransitionError {}
