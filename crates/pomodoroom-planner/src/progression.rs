//! Progressive focus/break progression.
//!
//! The default progression ramps focus from a 15-minute warm-up to a
//! 75-minute flow block, each followed by a break. The planner reads it as
//! two parallel tables indexed by "stage".

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Focus,
    Break,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub step_type: StepType,
    /// Duration in minutes.
    pub duration_min: u64,
    pub label: String,
}

impl Step {
    fn new(step_type: StepType, duration_min: u64, label: &str) -> Self {
        Self {
            step_type,
            duration_min,
            label: label.to_string(),
        }
    }
}

/// An ordered focus/break progression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progression {
    pub steps: Vec<Step>,
}

impl Progression {
    /// The default progressive schedule.
    pub fn default_progressive() -> Self {
        Self {
            steps: vec![
                Step::new(StepType::Focus, 15, "Warm Up"),
                Step::new(StepType::Break, 5, "Short Break"),
                Step::new(StepType::Focus, 30, "Deep Work I"),
                Step::new(StepType::Break, 5, "Short Break"),
                Step::new(StepType::Focus, 45, "Deep Work II"),
                Step::new(StepType::Break, 5, "Short Break"),
                Step::new(StepType::Focus, 60, "Flow State I"),
                Step::new(StepType::Break, 5, "Short Break"),
                Step::new(StepType::Focus, 75, "Flow State II"),
                Step::new(StepType::Break, 30, "Long Break"),
            ],
        }
    }

    /// Split into per-stage focus and break tables.
    ///
    /// Stage `i` pairs the i-th focus step with the break that follows it.
    /// A focus step without a following break gets a zero-length break.
    pub fn tables(&self) -> StageTables {
        let mut focus = Vec::new();
        let mut breaks = Vec::new();
        for step in &self.steps {
            match step.step_type {
                StepType::Focus => {
                    if breaks.len() < focus.len() {
                        breaks.push(0);
                    }
                    focus.push(step.duration_min.max(1) as i64);
                }
                StepType::Break => {
                    if breaks.len() < focus.len() {
                        breaks.push(step.duration_min as i64);
                    }
                }
            }
        }
        if breaks.len() < focus.len() {
            breaks.push(0);
        }
        StageTables { focus, breaks }
    }
}

impl Default for Progression {
    fn default() -> Self {
        Self::default_progressive()
    }
}

/// Parallel focus/break minute tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTables {
    pub focus: Vec<i64>,
    pub breaks: Vec<i64>,
}

impl StageTables {
    pub fn last_stage(&self) -> usize {
        self.focus.len().saturating_sub(1)
    }

    /// Focus minutes at `stage`, saturating at the last stage.
    pub fn focus_at(&self, stage: usize) -> i64 {
        self.focus
            .get(stage.min(self.last_stage()))
            .copied()
            .unwrap_or(crate::task::DEFAULT_REQUIRED_MINUTES)
    }

    /// Break minutes at `stage`, saturating at the last stage.
    pub fn break_at(&self, stage: usize) -> i64 {
        self.breaks
            .get(stage.min(self.last_stage()))
            .copied()
            .unwrap_or(0)
    }
}

impl Default for StageTables {
    fn default() -> Self {
        Progression::default_progressive().tables()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables_ramp_focus() {
        let tables = StageTables::default();
        assert_eq!(tables.focus, vec![15, 30, 45, 60, 75]);
        assert_eq!(tables.breaks, vec![5, 5, 5, 5, 30]);
        assert_eq!(tables.last_stage(), 4);
    }

    #[test]
    fn lookups_saturate_at_last_stage() {
        let tables = StageTables::default();
        assert_eq!(tables.focus_at(9), 75);
        assert_eq!(tables.break_at(9), 30);
    }

    #[test]
    fn focus_without_trailing_break_gets_zero() {
        let progression = Progression {
            steps: vec![
                Step::new(StepType::Focus, 20, "A"),
                Step::new(StepType::Focus, 40, "B"),
                Step::new(StepType::Break, 10, "Rest"),
                Step::new(StepType::Focus, 50, "C"),
            ],
        };
        let tables = progression.tables();
        assert_eq!(tables.focus, vec![20, 40, 50]);
        assert_eq!(tables.breaks, vec![0, 10, 0]);
    }

    #[test]
    fn empty_progression_falls_back_to_default_duration() {
        let tables = Progression { steps: vec![] }.tables();
        assert_eq!(tables.focus_at(0), 25);
        assert_eq!(tables.break_at(0), 0);
    }
}
