//! Break debt accounting.
//!
//! Breaks that were cut short, and time spent drifting past the end of a
//! break, accumulate as debt. The projector repays a bounded share of it by
//! lengthening inter-task breaks.

use serde::{Deserialize, Serialize};

const MS_PER_MINUTE: u64 = 60_000;

/// Default upper bound on minutes repaid by a single break.
pub const DEFAULT_MAX_REPAY_PER_BREAK: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakDebtLedger {
    /// Minutes of planned break not taken.
    #[serde(default)]
    pub skipped_minutes: i64,
    /// Accumulated drift in milliseconds.
    #[serde(default)]
    pub drift_ms: u64,
    #[serde(default = "default_max_repay_per_break")]
    pub max_repay_per_break: i64,
}

fn default_max_repay_per_break() -> i64 {
    DEFAULT_MAX_REPAY_PER_BREAK
}

impl Default for BreakDebtLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakDebtLedger {
    pub fn new() -> Self {
        Self {
            skipped_minutes: 0,
            drift_ms: 0,
            max_repay_per_break: DEFAULT_MAX_REPAY_PER_BREAK,
        }
    }

    pub fn with_max_repay_per_break(mut self, minutes: i64) -> Self {
        self.max_repay_per_break = minutes.max(0);
        self
    }

    /// Record a break that was planned for `planned` minutes and lasted `taken`.
    ///
    /// A longer-than-planned break pays existing debt down.
    pub fn record_break(&mut self, planned_minutes: i64, taken_minutes: i64) {
        let delta = planned_minutes.max(0) - taken_minutes.max(0);
        if delta >= 0 {
            self.skipped_minutes += delta;
        } else {
            self.repay(-delta);
        }
    }

    /// Add drift time accumulated while ignoring a break prompt.
    pub fn record_drift_ms(&mut self, drift_ms: u64) {
        self.drift_ms = self.drift_ms.saturating_add(drift_ms);
    }

    /// Total outstanding debt in whole minutes.
    pub fn outstanding(&self) -> i64 {
        let drift_minutes = i64::try_from(self.drift_ms / MS_PER_MINUTE).unwrap_or(i64::MAX);
        self.skipped_minutes.saturating_add(drift_minutes)
    }

    pub fn is_clear(&self) -> bool {
        self.outstanding() == 0
    }

    /// Bonus minutes a break in a gap of `available_gap` minutes can absorb.
    pub fn repayment_minutes(&self, available_gap: i64) -> i64 {
        self.outstanding()
            .min(self.max_repay_per_break)
            .min(available_gap)
            .max(0)
    }

    /// Pay down `minutes` of debt, skipped breaks first.
    pub fn repay(&mut self, minutes: i64) {
        let mut left = minutes.max(0);

        let from_skipped = left.min(self.skipped_minutes);
        self.skipped_minutes -= from_skipped;
        left -= from_skipped;

        if left > 0 {
            let ms = u64::try_from(left)
                .unwrap_or(0)
                .saturating_mul(MS_PER_MINUTE);
            self.drift_ms = self.drift_ms.saturating_sub(ms);
        }
    }
}
