//! Progressive focus-duration selection for the full-day grid.
//!
//! Each placement in a lane is a "session". The session index picks the
//! preferred focus length from a cyclic step table and decides whether the
//! following break is short or long.

use serde::{Deserialize, Serialize};

/// Selector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Focus lengths visited cyclically by session index.
    #[serde(default = "default_focus_steps")]
    pub focus_steps: Vec<i64>,
    #[serde(default = "default_short_break")]
    pub short_break: i64,
    #[serde(default = "default_long_break")]
    pub long_break: i64,
    /// Every Nth session takes the long break.
    #[serde(default = "default_long_break_every")]
    pub long_break_every: u32,
    /// Smallest focus block worth placing.
    #[serde(default = "default_min_focus")]
    pub min_focus: i64,
}

fn default_focus_steps() -> Vec<i64> {
    vec![75, 60, 45, 30, 15]
}
fn default_short_break() -> i64 {
    5
}
fn default_long_break() -> i64 {
    15
}
fn default_long_break_every() -> u32 {
    5
}
fn default_min_focus() -> i64 {
    15
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            focus_steps: default_focus_steps(),
            short_break: default_short_break(),
            long_break: default_long_break(),
            long_break_every: default_long_break_every(),
            min_focus: default_min_focus(),
        }
    }
}

/// Picks focus durations that fit a gap together with their break.
#[derive(Debug, Clone)]
pub struct ProgressiveSelector {
    config: SelectorConfig,
}

impl ProgressiveSelector {
    pub fn new() -> Self {
        Self::with_config(SelectorConfig::default())
    }

    /// Create with custom config; non-positive values are clamped.
    pub fn with_config(mut config: SelectorConfig) -> Self {
        config.min_focus = config.min_focus.max(1);
        config.short_break = config.short_break.max(0);
        config.long_break = config.long_break.max(0);
        config.focus_steps.retain(|&m| m > 0);
        Self { config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// A copy whose focus steps never exceed `max_focus`.
    pub fn capped_at(&self, max_focus: i64) -> Self {
        let cap = max_focus.max(self.config.min_focus);
        let mut config = self.config.clone();
        config.focus_steps.retain(|&m| m <= cap);
        if config.focus_steps.is_empty() {
            config.focus_steps.push(cap);
        }
        Self::with_config(config)
    }

    /// Whether the break after this session is the long one.
    pub fn is_long_break(&self, session_index: usize) -> bool {
        let every = self.config.long_break_every as usize;
        every > 0 && (session_index + 1) % every == 0
    }

    pub fn break_for(&self, session_index: usize) -> i64 {
        if self.is_long_break(session_index) {
            self.config.long_break
        } else {
            self.config.short_break
        }
    }

    /// Preferred focus length for a session.
    pub fn preferred_focus(&self, session_index: usize) -> Option<i64> {
        let steps = &self.config.focus_steps;
        if steps.is_empty() {
            None
        } else {
            Some(steps[session_index % steps.len()])
        }
    }

    /// Pick a focus duration for `available_minutes` at `session_index`.
    ///
    /// Tries the preferred step, then every strictly shorter step in
    /// descending order, then `available - break` when that still reaches
    /// the minimum focus length. Returns `None` when the gap is too small.
    /// The returned duration plus its break never exceeds `available_minutes`.
    pub fn pick_focus_duration(&self, available_minutes: i64, session_index: usize) -> Option<i64> {
        let brk = self.break_for(session_index);
        let min_focus = self.config.min_focus;
        let fits = |focus: i64| focus >= min_focus && focus + brk <= available_minutes;

        if let Some(preferred) = self.preferred_focus(session_index) {
            if fits(preferred) {
                return Some(preferred);
            }

            let mut shorter: Vec<i64> = self
                .config
                .focus_steps
                .iter()
                .copied()
                .filter(|&m| m < preferred)
                .collect();
            shorter.sort_unstable_by(|a, b| b.cmp(a));
            shorter.dedup();
            if let Some(focus) = shorter.into_iter().find(|&m| fits(m)) {
                return Some(focus);
            }
        }

        let remainder = available_minutes - brk;
        (remainder >= min_focus).then_some(remainder)
    }
}

impl Default for ProgressiveSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ninety_five_minutes_fits_the_longest_step_on_first_session() {
        let selector = ProgressiveSelector::new();
        assert!(!selector.is_long_break(0));
        assert_eq!(selector.pick_focus_duration(95, 0), Some(75));
    }

    #[test]
    fn gap_below_minimum_returns_none() {
        let selector = ProgressiveSelector::new();
        assert_eq!(selector.pick_focus_duration(18, 0), None);
        assert_eq!(selector.pick_focus_duration(20, 0), Some(15));
    }

    #[test]
    fn falls_back_to_shorter_steps_in_descending_order() {
        let selector = ProgressiveSelector::new();
        // Preferred 75 does not fit; 60 + 5 does.
        assert_eq!(selector.pick_focus_duration(66, 0), Some(60));
        // Session 1 prefers 60; 45 + 5 fits 52.
        assert_eq!(selector.pick_focus_duration(52, 1), Some(45));
    }

    #[test]
    fn residual_fallback_uses_the_remaining_gap() {
        let selector = ProgressiveSelector::with_config(SelectorConfig {
            focus_steps: vec![50, 40],
            ..SelectorConfig::default()
        });
        // Neither 50 nor 40 fits 30; the remainder 25 is used.
        assert_eq!(selector.pick_focus_duration(30, 0), Some(25));
    }

    #[test]
    fn residual_fallback_reserves_the_sessions_own_break() {
        let selector = ProgressiveSelector::with_config(SelectorConfig {
            focus_steps: vec![50, 40],
            ..SelectorConfig::default()
        });
        // Session 4 ends in the 15-minute long break, so 45 leaves 30 of focus.
        assert!(selector.is_long_break(4));
        assert_eq!(selector.pick_focus_duration(45, 4), Some(30));
        assert_eq!(selector.pick_focus_duration(29, 4), None);
    }

    #[test]
    fn every_fifth_session_takes_the_long_break() {
        let selector = ProgressiveSelector::new();
        assert_eq!(selector.break_for(3), 5);
        assert_eq!(selector.break_for(4), 15);
        assert_eq!(selector.break_for(9), 15);
        // Session 4 prefers 15; 15 + 15 needs 30.
        assert_eq!(selector.pick_focus_duration(29, 4), None);
        assert_eq!(selector.pick_focus_duration(30, 4), Some(15));
    }

    #[test]
    fn preferred_step_cycles() {
        let selector = ProgressiveSelector::new();
        assert_eq!(selector.preferred_focus(0), Some(75));
        assert_eq!(selector.preferred_focus(4), Some(15));
        assert_eq!(selector.preferred_focus(5), Some(75));
    }

    #[test]
    fn capped_selector_drops_longer_steps() {
        let capped = ProgressiveSelector::new().capped_at(40);
        assert_eq!(capped.config().focus_steps, vec![30, 15]);
        assert_eq!(capped.pick_focus_duration(200, 0), Some(30));

        let tiny = ProgressiveSelector::new().capped_at(5);
        assert_eq!(tiny.config().focus_steps, vec![15]);
    }
}
