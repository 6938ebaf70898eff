//! Uncertainty scoring and adaptive segment granularity.
//!
//! Uncertain work is split into shorter segments with more frequent
//! checkpoints. The advisor scores a task's uncertainty, maps the score to a
//! tiered policy and turns that policy into a concrete segment length.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scheduler::ProgressiveSelector;

/// Signals describing how predictable a task is. All ratios are in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskMetrics {
    /// Spread of past actual vs. estimated durations.
    #[serde(default)]
    pub historical_variance: f64,
    /// 1.0 means the deadline can move freely.
    #[serde(default)]
    pub deadline_flexibility: f64,
    #[serde(default)]
    pub complexity: f64,
    #[serde(default)]
    pub familiarity: f64,
    /// Interruptions seen on similar tasks.
    #[serde(default)]
    pub interruption_history: u32,
}

/// Weighted uncertainty in [0, 1].
pub fn calculate_uncertainty_score(metrics: &TaskMetrics) -> f64 {
    let unit = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
    let interruptions = (f64::from(metrics.interruption_history) / 5.0).min(1.0);

    let score = unit(metrics.historical_variance) * 0.3
        + (1.0 - unit(metrics.deadline_flexibility)) * 0.15
        + unit(metrics.complexity) * 0.25
        + (1.0 - unit(metrics.familiarity)) * 0.2
        + interruptions * 0.2;
    score.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GranularityTier {
    Coarse,
    Normal,
    Fine,
    VeryFine,
}

impl GranularityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            GranularityTier::Coarse => "coarse",
            GranularityTier::Normal => "normal",
            GranularityTier::Fine => "fine",
            GranularityTier::VeryFine => "very_fine",
        }
    }
}

impl std::fmt::Display for GranularityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open score range `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyRange {
    pub min: f64,
    pub max: f64,
}

impl UncertaintyRange {
    pub fn contains(&self, score: f64) -> bool {
        score >= self.min && score < self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentConfig {
    pub minutes: i64,
    pub checkpoint_interval: i64,
    /// Multiplier applied to the base segment length.
    pub adjustment_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GranularityPolicy {
    pub tier: GranularityTier,
    pub uncertainty_range: UncertaintyRange,
    pub segment_config: SegmentConfig,
    pub description: String,
}

impl GranularityPolicy {
    fn new(
        tier: GranularityTier,
        range: (f64, f64),
        segment: (i64, i64, f64),
        description: &str,
    ) -> Self {
        Self {
            tier,
            uncertainty_range: UncertaintyRange {
                min: range.0,
                max: range.1,
            },
            segment_config: SegmentConfig {
                minutes: segment.0,
                checkpoint_interval: segment.1,
                adjustment_factor: segment.2,
            },
            description: description.to_string(),
        }
    }
}

/// The built-in four-tier policy table.
pub fn default_policies() -> Vec<GranularityPolicy> {
    vec![
        GranularityPolicy::new(
            GranularityTier::Coarse,
            (0.0, 0.25),
            (60, 30, 1.2),
            "Predictable work: long uninterrupted segments",
        ),
        GranularityPolicy::new(
            GranularityTier::Normal,
            (0.25, 0.5),
            (45, 20, 1.0),
            "Typical work: standard segments",
        ),
        GranularityPolicy::new(
            GranularityTier::Fine,
            (0.5, 0.75),
            (30, 15, 0.8),
            "Uncertain work: shorter segments with regular checkpoints",
        ),
        GranularityPolicy::new(
            GranularityTier::VeryFine,
            (0.75, 1.01),
            (20, 10, 0.6),
            "Highly uncertain work: short segments with frequent checkpoints",
        ),
    ]
}

/// First policy whose range contains `score`.
///
/// Falls back to the `fine` policy from `policies`, then to the built-in
/// `fine` policy, so the lookup always yields a policy.
pub fn get_granularity_tier(score: f64, policies: &[GranularityPolicy]) -> GranularityPolicy {
    if let Some(policy) = policies.iter().find(|p| p.uncertainty_range.contains(score)) {
        return policy.clone();
    }
    debug!(score, "no granularity policy matched; using fine tier");
    policies
        .iter()
        .find(|p| p.tier == GranularityTier::Fine)
        .cloned()
        .unwrap_or_else(|| {
            GranularityPolicy::new(
                GranularityTier::Fine,
                (0.5, 0.75),
                (30, 15, 0.8),
                "Uncertain work: shorter segments with regular checkpoints",
            )
        })
}

/// Bounds for segment recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GranularityConfig {
    #[serde(default = "default_base_minutes")]
    pub base_minutes: i64,
    #[serde(default = "default_min_segment")]
    pub min_segment: i64,
    #[serde(default = "default_max_segment")]
    pub max_segment: i64,
}

fn default_base_minutes() -> i64 {
    45
}
fn default_min_segment() -> i64 {
    15
}
fn default_max_segment() -> i64 {
    90
}

impl Default for GranularityConfig {
    fn default() -> Self {
        Self {
            base_minutes: default_base_minutes(),
            min_segment: default_min_segment(),
            max_segment: default_max_segment(),
        }
    }
}

/// Options for [`recommend_granularity`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendOptions {
    pub config: GranularityConfig,
    pub policies: Vec<GranularityPolicy>,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            config: GranularityConfig::default(),
            policies: default_policies(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GranularityRecommendation {
    pub tier: GranularityTier,
    pub uncertainty_score: f64,
    pub segment_minutes: i64,
    pub checkpoint_interval: i64,
    pub confidence: f64,
    /// Human-readable notes for each adjustment applied.
    pub adjustments: Vec<String>,
}

impl GranularityRecommendation {
    /// `base` with focus steps capped at the recommended segment length.
    pub fn apply_to(&self, base: &ProgressiveSelector) -> ProgressiveSelector {
        base.capped_at(self.segment_minutes)
    }

    /// Default selector capped at the recommended segment length.
    pub fn selector(&self) -> ProgressiveSelector {
        self.apply_to(&ProgressiveSelector::new())
    }
}

/// Recommend a segment length for a task.
pub fn recommend_granularity(
    metrics: &TaskMetrics,
    options: &RecommendOptions,
) -> GranularityRecommendation {
    let score = calculate_uncertainty_score(metrics);
    let policy = get_granularity_tier(score, &options.policies);

    let lo = options.config.min_segment.max(1);
    let hi = options.config.max_segment.max(lo);
    let clamp = |m: i64| m.clamp(lo, hi);

    let base = options.config.base_minutes as f64 * policy.segment_config.adjustment_factor;
    let mut minutes = clamp(base.round() as i64);
    let mut adjustments = Vec::new();

    if metrics.historical_variance > 0.5 {
        minutes = clamp(minutes - 10);
        adjustments.push("high variance: -10 min".to_string());
    }
    if metrics.familiarity > 0.8 {
        minutes = clamp(minutes + 5);
        adjustments.push("familiar task: +5 min".to_string());
    }
    if metrics.interruption_history > 3 {
        minutes = clamp(minutes - 15);
        adjustments.push("frequent interruptions: -15 min".to_string());
    }

    GranularityRecommendation {
        tier: policy.tier,
        uncertainty_score: score,
        segment_minutes: minutes,
        checkpoint_interval: policy.segment_config.checkpoint_interval.min(minutes),
        confidence: 1.0 - score * 0.3,
        adjustments,
    }
}

/// Outcome of one executed segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentFeedback {
    /// Share of the segment actually completed, in [0, 1].
    pub completion_rate: f64,
    pub interruptions: u32,
}

const MIN_FEEDBACK_SAMPLES: usize = 3;

/// Tune a policy's adjustment factor from execution history.
///
/// Needs at least three samples. A low completion rate shrinks segments,
/// near-perfect uninterrupted runs grow them. The factor stays in [0.5, 1.2].
pub fn update_policy_from_feedback(
    policy: &GranularityPolicy,
    history: &[SegmentFeedback],
) -> GranularityPolicy {
    let mut updated = policy.clone();
    if history.len() < MIN_FEEDBACK_SAMPLES {
        return updated;
    }

    let n = history.len() as f64;
    let completion = history.iter().map(|f| f.completion_rate).sum::<f64>() / n;
    let interruptions = history.iter().map(|f| f64::from(f.interruptions)).sum::<f64>() / n;

    let factor = &mut updated.segment_config.adjustment_factor;
    if completion < 0.7 {
        *factor *= 0.9;
    } else if completion > 0.95 && interruptions < 1.0 {
        *factor *= 1.1;
    }
    *factor = factor.clamp(0.5, 1.2);
    updated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn score_is_weighted_sum() {
        let metrics = TaskMetrics {
            historical_variance: 0.5,
            deadline_flexibility: 1.0,
            complexity: 0.4,
            familiarity: 0.5,
            interruption_history: 2,
        };
        // 0.15 + 0 + 0.1 + 0.1 + 0.08
        assert!(approx(calculate_uncertainty_score(&metrics), 0.43));
    }

    #[test]
    fn score_is_clamped_and_interruptions_capped() {
        let worst = TaskMetrics {
            historical_variance: 3.0,
            deadline_flexibility: -1.0,
            complexity: 2.0,
            familiarity: -5.0,
            interruption_history: 50,
        };
        assert!(approx(calculate_uncertainty_score(&worst), 1.0));

        let best = TaskMetrics {
            deadline_flexibility: 1.0,
            familiarity: 1.0,
            ..TaskMetrics::default()
        };
        assert!(approx(calculate_uncertainty_score(&best), 0.0));
    }

    #[test]
    fn tier_lookup_uses_half_open_ranges() {
        let policies = default_policies();
        assert_eq!(get_granularity_tier(0.0, &policies).tier, GranularityTier::Coarse);
        assert_eq!(get_granularity_tier(0.25, &policies).tier, GranularityTier::Normal);
        assert_eq!(get_granularity_tier(0.74, &policies).tier, GranularityTier::Fine);
        assert_eq!(get_granularity_tier(1.0, &policies).tier, GranularityTier::VeryFine);
    }

    #[test]
    fn tier_lookup_falls_back_to_fine() {
        assert_eq!(get_granularity_tier(-0.5, &default_policies()).tier, GranularityTier::Fine);
        assert_eq!(get_granularity_tier(0.1, &[]).tier, GranularityTier::Fine);
        assert_eq!(get_granularity_tier(f64::NAN, &default_policies()).tier, GranularityTier::Fine);
    }

    #[test]
    fn predictable_task_gets_coarse_segments() {
        let metrics = TaskMetrics {
            deadline_flexibility: 1.0,
            familiarity: 0.9,
            ..TaskMetrics::default()
        };
        let rec = recommend_granularity(&metrics, &RecommendOptions::default());
        assert_eq!(rec.tier, GranularityTier::Coarse);
        // 45 * 1.2 = 54, +5 for familiarity.
        assert_eq!(rec.segment_minutes, 59);
        assert_eq!(rec.checkpoint_interval, 30);
        assert_eq!(rec.adjustments.len(), 1);
    }

    #[test]
    fn adjustments_clamp_after_each_step() {
        let metrics = TaskMetrics {
            historical_variance: 0.9,
            deadline_flexibility: 0.0,
            complexity: 1.0,
            familiarity: 0.0,
            interruption_history: 6,
        };
        let rec = recommend_granularity(&metrics, &RecommendOptions::default());
        assert_eq!(rec.tier, GranularityTier::VeryFine);
        // 45 * 0.6 = 27, -10 → 17, -15 → clamped to 15.
        assert_eq!(rec.segment_minutes, 15);
        assert_eq!(rec.checkpoint_interval, 10);
        assert_eq!(rec.adjustments.len(), 2);
        assert!(rec.confidence < 0.8);
    }

    #[test]
    fn recommendation_bridges_to_selector() {
        let rec = GranularityRecommendation {
            tier: GranularityTier::Fine,
            uncertainty_score: 0.6,
            segment_minutes: 30,
            checkpoint_interval: 15,
            confidence: 0.82,
            adjustments: vec![],
        };
        let selector = rec.selector();
        assert_eq!(selector.config().focus_steps, vec![30, 15]);
    }

    #[test]
    fn feedback_requires_three_samples() {
        let policy = default_policies().remove(1);
        let poor = SegmentFeedback {
            completion_rate: 0.2,
            interruptions: 3,
        };
        let unchanged = update_policy_from_feedback(&policy, &[poor, poor]);
        assert_eq!(unchanged, policy);

        let shrunk = update_policy_from_feedback(&policy, &[poor, poor, poor]);
        assert!(approx(shrunk.segment_config.adjustment_factor, 0.9));
    }

    #[test]
    fn feedback_growth_is_clamped() {
        let coarse = default_policies().remove(0);
        let perfect = SegmentFeedback {
            completion_rate: 1.0,
            interruptions: 0,
        };
        let grown = update_policy_from_feedback(&coarse, &[perfect; 4]);
        assert!(approx(grown.segment_config.adjustment_factor, 1.2));

        let normal = default_policies().remove(1);
        let grown = update_policy_from_feedback(&normal, &[perfect; 3]);
        assert!(approx(grown.segment_config.adjustment_factor, 1.1));
    }

    #[test]
    fn tier_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&GranularityTier::VeryFine).unwrap(),
            "\"very_fine\""
        );
    }
}
