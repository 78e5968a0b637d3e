//! Depression and anxiety language markers
//!
//! Scores patient utterances on pronoun distribution, temporal focus,
//! absolutist language, social references and withdrawal, catastrophizing,
//! and mood marker vocabularies. Composites follow fixed weighted formulas
//! with per-term caps so no single channel saturates the score.

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::conversation::{combined_patient_text, ResolvedConversation};
use crate::detectors::{clamp_score, Indicator, Severity};
use crate::text::{self, KeywordSet};

/// Minimum combined patient text before markers are meaningful
pub const MIN_TEXT_CHARS: usize = 100;

// ============================================================================
// Lexicons
// ============================================================================

static FIRST_PERSON: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["i", "me", "my", "mine", "myself"].into_iter().collect());

static SECOND_PERSON: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["you", "your", "yours", "yourself"].into_iter().collect());

static THIRD_PERSON: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "he", "she", "him", "her", "his", "hers", "they", "them", "their", "theirs",
    ]
    .into_iter()
    .collect()
});

static PAST_FOCUS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &["was", "were", "had", "did", "yesterday", "ago", "remembered"],
        &["used to", "back then", "when i was", "in those days"],
    )
});

static PRESENT_FOCUS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &["is", "am", "are", "now", "today", "currently"],
        &["these days", "right now"],
    )
});

static FUTURE_FOCUS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &["will", "tomorrow", "soon", "later"],
        &["going to", "next week", "next month", "one day"],
    )
});

static ABSOLUTIST: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &[
            "always",
            "never",
            "nothing",
            "everything",
            "completely",
            "totally",
            "entirely",
            "absolutely",
            "constantly",
            "definitely",
            "impossible",
            "must",
            "everyone",
            "nobody",
        ],
        &["no one"],
    )
});

static SOCIAL_REFERENCE: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &[
            "daughter",
            "son",
            "granddaughter",
            "grandson",
            "grandchildren",
            "family",
            "friend",
            "friends",
            "neighbor",
            "neighbors",
            "sister",
            "brother",
            "church",
            "visitors",
        ],
        &[],
    )
});

static SOCIAL_WITHDRAWAL: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &["lonely", "isolated"],
        &[
            "nobody visits",
            "no one calls",
            "no one visits",
            "all alone",
            "by myself",
            "never see anyone",
            "stopped going out",
            "keep to myself",
        ],
    )
});

static DEPRESSION_MARKERS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &[
            "sad",
            "hopeless",
            "worthless",
            "empty",
            "tired",
            "exhausted",
            "crying",
            "depressed",
            "miserable",
            "useless",
        ],
        &[
            "no point",
            "give up",
            "cannot sleep",
            "can't sleep",
            "no energy",
            "don't care anymore",
        ],
    )
});

static ANXIETY_MARKERS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &[
            "worried",
            "anxious",
            "nervous",
            "scared",
            "afraid",
            "panic",
            "frightened",
            "terrified",
            "uneasy",
            "restless",
        ],
        &["can't stop thinking", "on edge", "heart races", "heart racing"],
    )
});

static UNCERTAINTY: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &["maybe", "perhaps", "possibly", "unsure", "confused", "forget", "forgot"],
        &[
            "i think",
            "i guess",
            "i suppose",
            "not sure",
            "can't remember",
            "cannot remember",
        ],
    )
});

static CATASTROPHIZING: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &["disaster", "catastrophe", "unbearable"],
        &[
            "worst thing",
            "end of the world",
            "everything is ruined",
            "nothing will ever",
            "always goes wrong",
            "never get better",
            "falling apart",
            "can't take it anymore",
        ],
    )
});

// ============================================================================
// Result types
// ============================================================================

/// Pronoun usage distribution over patient text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PronounProfile {
    pub first_person: usize,
    pub second_person: usize,
    pub third_person: usize,
    /// First-person share of all tracked pronouns, as a percentage
    pub first_person_dominance: f64,
}

/// Dominant temporal orientation of the patient's language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalOrientation {
    Past,
    Present,
    Future,
}

impl Default for TemporalOrientation {
    fn default() -> Self {
        TemporalOrientation::Present
    }
}

impl TemporalOrientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemporalOrientation::Past => "past",
            TemporalOrientation::Present => "present",
            TemporalOrientation::Future => "future",
        }
    }
}

impl fmt::Display for TemporalOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Past/present/future marker distribution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalProfile {
    pub past: usize,
    pub present: usize,
    pub future: usize,
    pub past_pct: f64,
    pub present_pct: f64,
    pub future_pct: f64,
    pub dominant: TemporalOrientation,
}

/// Psychiatric language metrics for a batch of conversations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PsychiatricMetrics {
    pub pronouns: PronounProfile,
    pub temporal: TemporalProfile,
    pub absolutist_count: usize,
    pub absolutist_density: f64,
    pub absolutist_tier: Option<Severity>,
    pub social_reference_count: usize,
    pub social_reference_density: f64,
    pub social_reference_tier: Option<Severity>,
    pub social_withdrawal_count: usize,
    pub catastrophizing_count: usize,
    pub catastrophizing_tier: Option<Severity>,
    pub depression_marker_count: usize,
    pub anxiety_marker_count: usize,
    pub uncertainty_count: usize,
    pub depression_score: f64,
    pub anxiety_score: f64,
    pub indicators: Vec<Indicator>,
    pub total_words: usize,
}

// ============================================================================
// Analysis
// ============================================================================

/// Analyze psychiatric language markers across patient utterances.
///
/// Under [`MIN_TEXT_CHARS`] combined characters the default all-zero shape is
/// returned; there is not enough language to score.
pub fn analyze_markers(conversations: &[ResolvedConversation]) -> PsychiatricMetrics {
    let combined = combined_patient_text(conversations);
    if combined.chars().count() < MIN_TEXT_CHARS {
        return PsychiatricMetrics::default();
    }

    let lower = combined.to_lowercase();
    let tokens = text::words(&combined);
    let total_words = tokens.len();

    let pronouns = pronoun_profile(&tokens);
    let temporal = temporal_profile(&lower);

    let absolutist_count = ABSOLUTIST.match_count(&lower);
    let absolutist_density = density(absolutist_count, total_words);
    let social_reference_count = SOCIAL_REFERENCE.match_count(&lower);
    let social_reference_density = density(social_reference_count, total_words);
    let social_withdrawal_count = SOCIAL_WITHDRAWAL.match_count(&lower);
    let catastrophizing_count = CATASTROPHIZING.match_count(&lower);
    let depression_marker_count = DEPRESSION_MARKERS.match_count(&lower);
    let anxiety_marker_count = ANXIETY_MARKERS.match_count(&lower);
    let uncertainty_count = UNCERTAINTY.match_count(&lower);

    let depression_score = clamp_score(
        (0.5 * pronouns.first_person_dominance).min(25.0)
            + (10.0 * absolutist_density).min(30.0)
            + (5.0 * social_withdrawal_count as f64).min(20.0)
            + (3.0 * depression_marker_count as f64).min(25.0),
    );
    let anxiety_score = clamp_score(
        (0.3 * temporal.future_pct).min(25.0)
            + (8.0 * catastrophizing_count as f64).min(30.0)
            + (4.0 * anxiety_marker_count as f64).min(25.0)
            + (3.0 * uncertainty_count as f64).min(20.0),
    );

    let mut indicators = Vec::new();
    if depression_score > 70.0 {
        indicators.push(Indicator::new(
            "depression-language",
            Severity::High,
            format!("Depression language score {depression_score:.0} exceeds 70"),
        ));
    }
    if anxiety_score > 70.0 {
        indicators.push(Indicator::new(
            "anxiety-language",
            Severity::High,
            format!("Anxiety language score {anxiety_score:.0} exceeds 70"),
        ));
    }
    if pronouns.first_person_dominance > 80.0 {
        indicators.push(Indicator::new(
            "self-focus",
            Severity::Medium,
            format!(
                "First-person pronouns dominate at {:.0}% of tracked pronoun use",
                pronouns.first_person_dominance
            ),
        ));
    }
    if absolutist_density > 2.0 {
        indicators.push(Indicator::new(
            "absolutist-language",
            Severity::Medium,
            format!("Absolutist word density {absolutist_density:.1}% exceeds 2.0%"),
        ));
    }

    PsychiatricMetrics {
        pronouns,
        temporal,
        absolutist_count,
        absolutist_density,
        absolutist_tier: Severity::from_tiers(absolutist_density, 0.5, 1.0, 2.0),
        social_reference_count,
        social_reference_density,
        social_reference_tier: Severity::from_tiers(social_reference_density, 0.5, 1.5, 3.0),
        social_withdrawal_count,
        catastrophizing_count,
        catastrophizing_tier: Severity::from_tiers(catastrophizing_count as f64, 1.0, 2.0, 4.0),
        depression_marker_count,
        anxiety_marker_count,
        uncertainty_count,
        depression_score,
        anxiety_score,
        indicators,
        total_words,
    }
}

fn density(count: usize, total_words: usize) -> f64 {
    if total_words == 0 {
        return 0.0;
    }
    count as f64 / total_words as f64 * 100.0
}

fn pronoun_profile(tokens: &[String]) -> PronounProfile {
    let mut first_person = 0;
    let mut second_person = 0;
    let mut third_person = 0;
    for token in tokens {
        let token = token.as_str();
        if FIRST_PERSON.contains(token) {
            first_person += 1;
        } else if SECOND_PERSON.contains(token) {
            second_person += 1;
        } else if THIRD_PERSON.contains(token) {
            third_person += 1;
        }
    }
    let tracked = first_person + second_person + third_person;
    let first_person_dominance = if tracked > 0 {
        first_person as f64 / tracked as f64 * 100.0
    } else {
        0.0
    };
    PronounProfile {
        first_person,
        second_person,
        third_person,
        first_person_dominance,
    }
}

fn temporal_profile(lower: &str) -> TemporalProfile {
    let past = PAST_FOCUS.match_count(lower);
    let present = PRESENT_FOCUS.match_count(lower);
    let future = FUTURE_FOCUS.match_count(lower);
    let total = past + present + future;

    let pct = |count: usize| {
        if total > 0 {
            count as f64 / total as f64 * 100.0
        } else {
            0.0
        }
    };

    // Ties resolve toward the earlier bucket; no markers at all reads present
    let dominant = if total == 0 {
        TemporalOrientation::Present
    } else if past >= present && past >= future {
        TemporalOrientation::Past
    } else if present >= future {
        TemporalOrientation::Present
    } else {
        TemporalOrientation::Future
    };

    TemporalProfile {
        past,
        present,
        future,
        past_pct: pct(past),
        present_pct: pct(present),
        future_pct: pct(future),
        dominant,
    }
}
