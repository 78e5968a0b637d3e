//! Social isolation and relationship-change indicators
//!
//! Tracks mentions of isolation, lost contact with family or friends, and a
//! third party controlling the patient's social access. The raw isolation
//! mention count feeds the orchestrator's network-loss rule directly.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::detectors::{clamp_score, match_score, Indicator, Severity};
use crate::text::KeywordSet;

const PER_MATCH: f64 = 25.0;

static ISOLATION: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &["lonely", "isolated"],
        &[
            "nobody visits",
            "no one visits",
            "no one calls",
            "never see anyone",
            "stopped visiting",
            "all alone",
        ],
    )
});

static LOST_CONTACT: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &[],
        &[
            "haven't heard from",
            "stopped calling",
            "don't see my friends",
            "lost touch",
            "moved away",
            "passed away",
            "no longer comes",
        ],
    )
});

static CONTROLLING_INFLUENCE: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &[],
        &[
            "won't let me",
            "doesn't want me to",
            "keeps me from",
            "has to be there",
            "listens to my calls",
            "reads my mail",
        ],
    )
});

/// Relationship pattern metrics for combined patient text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipMetrics {
    pub isolation_mentions: usize,
    pub lost_contact_mentions: usize,
    pub controlling_mentions: usize,
    pub matched_terms: Vec<String>,
    pub risk_score: f64,
    /// True when any table matched at all, even at negligible score
    pub signal: bool,
    pub indicators: Vec<Indicator>,
}

/// Score relationship and isolation patterns over combined patient text
pub fn analyze(combined_text: &str) -> RelationshipMetrics {
    let lower = combined_text.to_lowercase();

    let isolation_mentions = ISOLATION.match_count(&lower);
    let lost_contact_mentions = LOST_CONTACT.match_count(&lower);
    let controlling_mentions = CONTROLLING_INFLUENCE.match_count(&lower);

    let risk_score = clamp_score(
        0.40 * match_score(isolation_mentions, PER_MATCH)
            + 0.30 * match_score(lost_contact_mentions, PER_MATCH)
            + 0.30 * match_score(controlling_mentions, PER_MATCH),
    );

    let mut matched_terms = Vec::new();
    for table in [&ISOLATION, &LOST_CONTACT, &CONTROLLING_INFLUENCE] {
        for term in table.matched_terms(&lower) {
            if !matched_terms.contains(&term) {
                matched_terms.push(term);
            }
        }
    }

    let signal = isolation_mentions + lost_contact_mentions + controlling_mentions > 0;

    let mut indicators = Vec::new();
    if let Some(severity) = Severity::from_thresholds(risk_score, 30.0, 60.0) {
        indicators.push(Indicator::new(
            "relationship-pattern",
            severity,
            format!(
                "Isolation and relationship-change indicators at {:.0} (matched: {})",
                risk_score,
                matched_terms.join(", ")
            ),
        ));
    }

    RelationshipMetrics {
        isolation_mentions,
        lost_contact_mentions,
        controlling_mentions,
        matched_terms,
        risk_score,
        signal,
        indicators,
    }
}
