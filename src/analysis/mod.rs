//! Multi-signal fusion and caregiver-facing assessment types
//!
//! Both orchestrators fuse their detector outputs the same way: a weighted
//! sum over the sub-scores whose detector actually produced a signal,
//! renormalized by the weights in play, plus a flat corroboration bonus when
//! two or more areas cross their thresholds at once. The types here are what
//! the application layer consumes: priorities, recommendations, and the
//! change-from-baseline summary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod fraud_abuse;
pub mod wellness;

/// Combined patient text below this many characters short-circuits analysis
pub const MIN_ANALYSIS_CHARS: usize = 100;

/// Flat bonus applied when two or more areas corroborate each other
pub(crate) const CORROBORATION_BONUS: f64 = 15.0;

// ============================================================================
// Fusion
// ============================================================================

/// One detector's contribution to an overall risk score
#[derive(Debug, Clone, Copy)]
pub(crate) struct WeightedSignal {
    pub score: f64,
    pub weight: f64,
    /// False when the detector never triggered; the weight then drops out of
    /// the normalization instead of diluting the score
    pub present: bool,
}

impl WeightedSignal {
    pub fn new(score: f64, weight: f64, present: bool) -> Self {
        Self {
            score,
            weight,
            present,
        }
    }
}

/// Weighted sum over present signals, renormalized by the weights in play.
/// An analyzed-but-clean area dilutes risk; an absent area does not.
pub(crate) fn fuse_signals(signals: &[WeightedSignal]) -> f64 {
    let weight_in_play: f64 = signals
        .iter()
        .filter(|s| s.present)
        .map(|s| s.weight)
        .sum();
    if weight_in_play <= 0.0 {
        return 0.0;
    }
    signals
        .iter()
        .filter(|s| s.present)
        .map(|s| s.score * s.weight)
        .sum::<f64>()
        / weight_in_play
}

// ============================================================================
// Recommendations
// ============================================================================

/// Ordered urgency tier for recommendations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Lowercase string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(format!("Unknown priority: {s}")),
        }
    }
}

/// A concrete next step for the caregiver, tied to a threshold crossing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Area of concern, e.g. "financial" or "cognitive"
    pub category: String,
    pub priority: Priority,
    /// Short imperative, e.g. "Review recent account activity"
    pub action: String,
    /// What was observed and why the action follows from it
    pub description: String,
}

impl Recommendation {
    /// Build a recommendation
    pub fn new(
        category: impl Into<String>,
        priority: Priority,
        action: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            priority,
            action: action.into(),
            description: description.into(),
        }
    }

    /// The fallback emitted when no threshold was crossed
    pub fn continue_monitoring() -> Self {
        Self::new(
            "monitoring",
            Priority::Low,
            "Continue regular conversations",
            "No risk indicators crossed a threshold in this analysis window",
        )
    }
}

// ============================================================================
// Baseline comparison
// ============================================================================

/// Risk scores from a previous assessment, supplied for delta comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSnapshot {
    pub financial: f64,
    pub abuse: f64,
    pub relationship: f64,
    pub overall: f64,
}

/// Per-area movement since the supplied previous assessment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineChange {
    pub financial_delta: f64,
    pub abuse_delta: f64,
    pub relationship_delta: f64,
    pub overall_delta: f64,
    /// Overall moved more than 20 points, or financial/abuse more than 15
    pub increased_significantly: bool,
}

impl BaselineChange {
    /// Compare current area scores against a prior snapshot
    pub fn compute(
        prior: &RiskSnapshot,
        financial: f64,
        abuse: f64,
        relationship: f64,
        overall: f64,
    ) -> Self {
        let financial_delta = financial - prior.financial;
        let abuse_delta = abuse - prior.abuse;
        let relationship_delta = relationship - prior.relationship;
        let overall_delta = overall - prior.overall;
        Self {
            financial_delta,
            abuse_delta,
            relationship_delta,
            overall_delta,
            increased_significantly: overall_delta > 20.0
                || financial_delta > 15.0
                || abuse_delta > 15.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_fuse_all_present_is_plain_weighted_sum() {
        let signals = [
            WeightedSignal::new(50.0, 0.35, true),
            WeightedSignal::new(80.0, 0.40, true),
            WeightedSignal::new(20.0, 0.25, true),
        ];
        let fused = fuse_signals(&signals);
        assert!((fused - (50.0 * 0.35 + 80.0 * 0.40 + 20.0 * 0.25)).abs() < 1e-9);
    }

    #[test]
    fn test_fuse_renormalizes_over_present_weights() {
        // relationship never triggered: its 0.25 drops out of the denominator
        let signals = [
            WeightedSignal::new(60.0, 0.35, true),
            WeightedSignal::new(60.0, 0.40, true),
            WeightedSignal::new(0.0, 0.25, false),
        ];
        assert!((fuse_signals(&signals) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_fuse_present_zero_score_dilutes() {
        // abuse analyzed and clean: it stays in the denominator
        let signals = [
            WeightedSignal::new(60.0, 0.35, true),
            WeightedSignal::new(0.0, 0.40, true),
            WeightedSignal::new(0.0, 0.25, false),
        ];
        let expected = 60.0 * 0.35 / 0.75;
        assert!((fuse_signals(&signals) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_fuse_nothing_present_is_zero() {
        let signals = [
            WeightedSignal::new(90.0, 0.5, false),
            WeightedSignal::new(90.0, 0.5, false),
        ];
        assert_eq!(fuse_signals(&signals), 0.0);
    }

    #[test]
    fn test_priority_ordering_and_display() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert_eq!(Priority::High.to_string(), "high");
        assert_eq!("medium".parse::<Priority>().unwrap(), Priority::Medium);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_recommendation_serializes_camel_case() {
        let rec = Recommendation::new("financial", Priority::High, "Act", "Because");
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["category"], "financial");
        assert_eq!(json["priority"], "high");
    }

    #[test]
    fn test_baseline_change_flags_overall_jump() {
        let prior = RiskSnapshot {
            financial: 10.0,
            abuse: 10.0,
            relationship: 10.0,
            overall: 10.0,
        };
        let change = BaselineChange::compute(&prior, 12.0, 14.0, 40.0, 31.0);
        assert_eq!(change.overall_delta, 21.0);
        assert!(change.increased_significantly);
    }

    #[test]
    fn test_baseline_change_flags_abuse_jump() {
        let prior = RiskSnapshot {
            financial: 5.0,
            abuse: 20.0,
            relationship: 0.0,
            overall: 15.0,
        };
        let change = BaselineChange::compute(&prior, 6.0, 36.0, 0.0, 20.0);
        assert_eq!(change.abuse_delta, 16.0);
        assert!(change.increased_significantly);
    }

    #[test]
    fn test_baseline_change_small_moves_not_flagged() {
        let prior = RiskSnapshot {
            financial: 10.0,
            abuse: 10.0,
            relationship: 10.0,
            overall: 10.0,
        };
        let change = BaselineChange::compute(&prior, 20.0, 20.0, 40.0, 25.0);
        assert!(!change.increased_significantly);
    }
}
