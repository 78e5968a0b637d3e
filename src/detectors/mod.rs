//! Detector building blocks shared across all analyzers
//!
//! - [`Severity`] and [`Confidence`]: the named, ordered tiers every detector
//!   reports in
//! - [`Indicator`]: a severity-tagged finding raised at a threshold crossing
//! - Score helpers enforcing the [0,100] clamp

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod abuse;
pub mod financial;
pub mod psychiatric;
pub mod relationship;
pub mod repetition;
pub mod vocabulary;

/// Ordered severity tier for indicators and repeated phrases
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    /// Tier a score against medium/high cut points; below medium is no tier
    pub fn from_thresholds(score: f64, medium_above: f64, high_above: f64) -> Option<Severity> {
        if score > high_above {
            Some(Severity::High)
        } else if score > medium_above {
            Some(Severity::Medium)
        } else {
            None
        }
    }

    /// Tier a value against inclusive low/medium/high cut points
    pub fn from_tiers(value: f64, low_at: f64, medium_at: f64, high_at: f64) -> Option<Severity> {
        if value >= high_at {
            Some(Severity::High)
        } else if value >= medium_at {
            Some(Severity::Medium)
        } else if value >= low_at {
            Some(Severity::Low)
        } else {
            None
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(format!("Unknown severity: {s}")),
        }
    }
}

/// Ordered confidence tier, monotonic in text length and sample count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    None,
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::None => "none",
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }

    /// Confidence from analyzed volume: the lower of the text-length tier and
    /// the conversation-count tier wins
    pub fn from_volume(text_chars: usize, conversation_count: usize) -> Confidence {
        if text_chars < 500 || conversation_count < 3 {
            Confidence::Low
        } else if text_chars < 2000 || conversation_count < 10 {
            Confidence::Medium
        } else {
            Confidence::High
        }
    }

    /// Confidence from the number of historical baseline points
    pub fn from_sample_count(points: usize) -> Confidence {
        if points < 5 {
            Confidence::Low
        } else if points < 10 {
            Confidence::Medium
        } else {
            Confidence::High
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Confidence::None),
            "low" => Ok(Confidence::Low),
            "medium" => Ok(Confidence::Medium),
            "high" => Ok(Confidence::High),
            _ => Err(format!("Unknown confidence: {s}")),
        }
    }
}

/// A threshold-crossing finding surfaced to caregivers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub message: String,
}

impl Indicator {
    pub fn new(kind: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            severity,
            message: message.into(),
        }
    }
}

/// Clamp any risk or composite score to [0,100]
pub fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Keyword-category sub-score: matches scaled by a per-match weight, capped
pub(crate) fn match_score(matches: usize, per_match: f64) -> f64 {
    (matches as f64 * per_match).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[test]
    fn test_severity_from_thresholds() {
        assert_eq!(Severity::from_thresholds(25.0, 30.0, 60.0), None);
        assert_eq!(
            Severity::from_thresholds(45.0, 30.0, 60.0),
            Some(Severity::Medium)
        );
        assert_eq!(
            Severity::from_thresholds(61.0, 30.0, 60.0),
            Some(Severity::High)
        );
        // Boundary values do not cross a strict threshold
        assert_eq!(Severity::from_thresholds(30.0, 30.0, 60.0), None);
        assert_eq!(
            Severity::from_thresholds(60.0, 30.0, 60.0),
            Some(Severity::Medium)
        );
    }

    #[test]
    fn test_severity_from_tiers_inclusive() {
        assert_eq!(Severity::from_tiers(0.4, 0.5, 1.0, 2.0), None);
        assert_eq!(Severity::from_tiers(0.5, 0.5, 1.0, 2.0), Some(Severity::Low));
        assert_eq!(
            Severity::from_tiers(1.5, 0.5, 1.0, 2.0),
            Some(Severity::Medium)
        );
        assert_eq!(
            Severity::from_tiers(2.0, 0.5, 1.0, 2.0),
            Some(Severity::High)
        );
    }

    #[test]
    fn test_severity_display_and_parse() {
        assert_eq!(Severity::High.to_string(), "high");
        assert_eq!("medium".parse::<Severity>().unwrap(), Severity::Medium);
        assert!("critical".parse::<Severity>().is_err());
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::None < Confidence::Low);
        assert!(Confidence::Low < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::High);
    }

    #[test]
    fn test_confidence_from_volume_tiers() {
        assert_eq!(Confidence::from_volume(50, 1), Confidence::Low);
        assert_eq!(Confidence::from_volume(499, 20), Confidence::Low);
        assert_eq!(Confidence::from_volume(5000, 2), Confidence::Low);
        assert_eq!(Confidence::from_volume(1500, 5), Confidence::Medium);
        assert_eq!(Confidence::from_volume(5000, 9), Confidence::Medium);
        assert_eq!(Confidence::from_volume(2500, 12), Confidence::High);
    }

    #[test]
    fn test_confidence_from_sample_count() {
        assert_eq!(Confidence::from_sample_count(1), Confidence::Low);
        assert_eq!(Confidence::from_sample_count(5), Confidence::Medium);
        assert_eq!(Confidence::from_sample_count(10), Confidence::High);
    }

    #[test]
    fn test_clamp_score_bounds() {
        assert_eq!(clamp_score(-5.0), 0.0);
        assert_eq!(clamp_score(42.5), 42.5);
        assert_eq!(clamp_score(130.0), 100.0);
    }

    #[test]
    fn test_match_score_caps_at_100() {
        assert_eq!(match_score(0, 25.0), 0.0);
        assert_eq!(match_score(2, 25.0), 50.0);
        assert_eq!(match_score(9, 25.0), 100.0);
    }

    #[test]
    fn test_indicator_serializes_kind_as_type() {
        let indicator = Indicator::new("financial", Severity::Medium, "elevated");
        let json = serde_json::to_value(&indicator).unwrap();
        assert_eq!(json["type"], "financial");
        assert_eq!(json["severity"], "medium");
    }
}
