//! Schedule types: daily templates, fixed routine events and timeline blocks.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ValidationError;
use crate::timeline::Interval;

/// A fixed event that occurs at specific times on specific days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedEvent {
    pub id: String,
    pub name: String,
    pub start_time: String, // HH:mm
    pub duration_minutes: i32,
    pub days: Vec<u8>, // 0=Sun ... 6=Sat
    pub enabled: bool,
}

impl FixedEvent {
    /// Whether the event recurs on the weekday of `day`.
    pub fn occurs_on(&self, day: DateTime<Utc>) -> bool {
        let weekday = day.weekday().num_days_from_sunday() as u8;
        self.enabled && self.days.contains(&weekday)
    }

    /// Resolve the event to a concrete interval on the date of `day`.
    pub fn interval_on(&self, day: DateTime<Utc>) -> Option<Interval> {
        let start = at_time_of_day(day, &self.start_time)?;
        let end = start + Duration::minutes(i64::from(self.duration_minutes.max(1)));
        Some(Interval::new(start, end))
    }
}

/// Daily template defining wake/sleep times and fixed events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyTemplate {
    pub wake_up: String, // HH:mm
    pub sleep: String,   // HH:mm
    #[serde(default)]
    pub fixed_events: Vec<FixedEvent>,
    #[serde(default)]
    pub max_parallel_lanes: Option<i32>,
}

impl DailyTemplate {
    /// Schedulable bounds of the day containing `day`.
    ///
    /// A sleep time at or before the wake time rolls over to the next day.
    pub fn day_bounds(&self, day: DateTime<Utc>) -> Option<Interval> {
        let start = at_time_of_day(day, &self.wake_up)?;
        let mut end = at_time_of_day(day, &self.sleep)?;
        if end <= start {
            end += Duration::days(1);
        }
        Some(Interval::new(start, end))
    }

    /// Routine blocks for every enabled fixed event that occurs on `day`.
    pub fn routine_blocks(&self, day: DateTime<Utc>) -> Vec<ScheduleBlock> {
        let date_key = day.format("%Y%m%d");
        self.fixed_events
            .iter()
            .filter(|event| event.occurs_on(day))
            .filter_map(|event| {
                let interval = event.interval_on(day);
                if interval.is_none() {
                    debug!(event_id = %event.id, start = %event.start_time, "skipping fixed event with unparseable start");
                }
                interval.map(|iv| ScheduleBlock {
                    id: format!("routine-{}-{}", event.id, date_key),
                    block_type: BlockType::Routine,
                    task_id: None,
                    start_time: iv.start,
                    end_time: iv.end,
                    locked: true,
                    label: Some(event.name.clone()),
                    lane: None,
                })
            })
            .collect()
    }
}

/// Parse an `HH:MM` string onto the UTC date of `day`.
pub fn at_time_of_day(day: DateTime<Utc>, hhmm: &str) -> Option<DateTime<Utc>> {
    let time = NaiveTime::parse_from_str(hhmm.trim(), "%H:%M").ok()?;
    Some(day.date_naive().and_time(time).and_utc())
}

/// Type of schedule block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    /// Focus block for deep work
    Focus,
    /// Break block for rest
    Break,
    /// Routine block for recurring events
    Routine,
    /// Calendar event block
    Calendar,
}

/// A scheduled block on the timeline.
///
/// Blocks within one lane never overlap; blocks in different lanes may.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleBlock {
    pub id: String,
    pub block_type: BlockType,
    #[serde(default)]
    pub task_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub lane: Option<i32>,
}

impl ScheduleBlock {
    /// Create an unlocked block, rejecting empty or inverted ranges.
    pub fn new(
        id: impl Into<String>,
        block_type: BlockType,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if end_time <= start_time {
            return Err(ValidationError::InvalidTimeRange {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            id: id.into(),
            block_type,
            task_id: None,
            start_time,
            end_time,
            locked: false,
            label: None,
            lane: None,
        })
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_lane(mut self, lane: i32) -> Self {
        self.lane = Some(lane);
        self
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.start_time, self.end_time)
    }

    /// Get total duration in minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// Half-open overlap test against `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }

    /// Compare everything except `id` and `locked`.
    pub fn same_shape(&self, other: &ScheduleBlock) -> bool {
        self.start_time == other.start_time
            && self.end_time == other.end_time
            && self.block_type == other.block_type
            && self.task_id == other.task_id
            && self.label == other.label
            && self.lane == other.lane
    }
}

/// Sequential block identifiers, threaded explicitly through scheduling calls.
#[derive(Debug, Clone)]
pub struct BlockIdGenerator {
    prefix: String,
    next: u64,
}

impl BlockIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }

    /// Produce the next id, `{prefix}-{kind}-{seq}`.
    pub fn next_id(&mut self, kind: BlockType) -> String {
        let id = format!("{}-{}-{}", self.prefix, block_type_key(kind), self.next);
        self.next += 1;
        id
    }

    /// Skip past every sequence number `blocks` already uses under this prefix.
    pub fn resume_after<'a>(&mut self, blocks: impl IntoIterator<Item = &'a ScheduleBlock>) {
        let marker = format!("{}-", self.prefix);
        let highest = blocks
            .into_iter()
            .filter_map(|b| b.id.strip_prefix(marker.as_str()))
            .filter_map(|rest| rest.rsplit_once('-'))
            .filter_map(|(_, seq)| seq.parse::<u64>().ok())
            .max();
        if let Some(seq) = highest {
            self.next = self.next.max(seq.saturating_add(1));
        }
    }
}

impl Default for BlockIdGenerator {
    fn default() -> Self {
        Self::new("block")
    }
}

fn block_type_key(kind: BlockType) -> &'static str {
    match kind {
        BlockType::Focus => "focus",
        BlockType::Break => "break",
        BlockType::Routine => "routine",
        BlockType::Calendar => "calendar",
    }
}

/// Raw calendar row as delivered by the calendar-sync layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEventRecord {
    pub id: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub summary: Option<String>,
}

impl CalendarEventRecord {
    /// Convert to a locked calendar block; unparseable or empty rows yield `None`.
    pub fn to_block(&self) -> Option<ScheduleBlock> {
        let start = parse_instant(&self.start)?;
        let end = parse_instant(&self.end)?;
        let block = ScheduleBlock::new(self.id.clone(), BlockType::Calendar, start, end).ok()?;
        let block = match &self.summary {
            Some(summary) => block.with_label(summary.clone()),
            None => block,
        };
        Some(block.locked())
    }
}

/// Convert calendar rows to locked blocks, dropping malformed rows.
pub fn calendar_blocks_from_records(records: &[CalendarEventRecord]) -> Vec<ScheduleBlock> {
    records
        .iter()
        .filter_map(|record| {
            let block = record.to_block();
            if block.is_none() {
                debug!(event_id = %record.id, "dropping calendar event with invalid time range");
            }
            block
        })
        .collect()
}

/// Parse an RFC 3339 instant, or a bare `YYYY-MM-DDTHH:MM[:SS]` read as UTC.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
