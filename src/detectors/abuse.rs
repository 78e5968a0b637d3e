//! Physical abuse, emotional abuse, and neglect indicators
//!
//! Three independently weighted categories scored from keyword and phrase
//! tables over patient text, plus a temporal escalation check comparing
//! keyword density in the most recent third of messages against the earlier
//! average. Injury mentions paired with vague-cause explanations raise the
//! inconsistent-explanation sub-score.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::conversation::Message;
use crate::detectors::{clamp_score, match_score, Indicator, Severity};
use crate::text::KeywordSet;

const PER_MATCH: f64 = 25.0;
const INCONSISTENT_PER_MATCH: f64 = 50.0;
const ESCALATION_BONUS: f64 = 15.0;
const ESCALATION_RATIO: f64 = 1.5;
const ESCALATION_MIN_MESSAGES: usize = 3;

// ============================================================================
// Keyword tables
// ============================================================================

static INJURY: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &[
            "hit", "slapped", "punched", "kicked", "pushed", "shoved", "grabbed", "bruise",
            "bruises", "bruised",
        ],
        &["black eye", "broken bone", "sprained wrist"],
    )
});

static FEAR_OF_PERSON: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &[],
        &[
            "afraid of him",
            "afraid of her",
            "afraid of them",
            "scared of him",
            "scared of her",
            "scares me",
            "frightens me",
            "when he gets angry",
            "when she gets angry",
        ],
    )
});

static PUNISHMENT: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &["punish", "punished", "punishes"],
        &["locked me in", "in trouble if", "made me stay"],
    )
});

static VAGUE_CAUSE: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &["clumsy", "tripped"],
        &["fell down", "bumped into", "walked into", "ran into the door"],
    )
});

static ISOLATION_TACTICS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &["isolated"],
        &[
            "won't let me see",
            "keeps me from",
            "cut off from",
            "not allowed to talk",
        ],
    )
});

static CONTROLLING: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &["controls", "controlling"],
        &[
            "won't let me",
            "has to approve",
            "takes my money",
            "makes all the decisions",
            "checks my phone",
        ],
    )
});

static THREATS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(&["threatened", "threatens"], &["or else", "warned me"])
});

static BELITTLING: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &[],
        &[
            "calls me names",
            "says i'm stupid",
            "makes fun of me",
            "yells at me",
            "screams at me",
        ],
    )
});

static FEAR_LANGUAGE: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &["afraid", "scared", "frightened", "terrified"],
        &["walking on eggshells"],
    )
});

static BASIC_NEEDS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &["hungry", "starving"],
        &[
            "no food",
            "nothing to eat",
            "haven't eaten",
            "not been eating",
            "dirty clothes",
            "no clean clothes",
            "no heat",
        ],
    )
});

static MEDICAL_CARE: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &[],
        &[
            "no medicine",
            "out of medication",
            "ran out of pills",
            "missed my appointment",
            "can't get my prescription",
            "no one takes me to the doctor",
        ],
    )
});

static NEGLECT_ISOLATION: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &[],
        &[
            "left alone",
            "no one checks",
            "nobody checks on me",
            "no one comes",
        ],
    )
});

static TIME_ALONE: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &[],
        &["hours alone", "alone all day", "alone all night", "by myself all"],
    )
});

static ALL_TABLES: [&Lazy<KeywordSet>; 13] = [
    &INJURY,
    &FEAR_OF_PERSON,
    &PUNISHMENT,
    &VAGUE_CAUSE,
    &ISOLATION_TACTICS,
    &CONTROLLING,
    &THREATS,
    &BELITTLING,
    &FEAR_LANGUAGE,
    &BASIC_NEEDS,
    &MEDICAL_CARE,
    &NEGLECT_ISOLATION,
    &TIME_ALONE,
];

// ============================================================================
// Result types
// ============================================================================

/// Score and matched terms for one abuse category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub score: f64,
    pub matched_terms: Vec<String>,
}

/// Abuse and neglect metrics for a batch of patient messages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbuseMetrics {
    pub physical: CategoryBreakdown,
    pub emotional: CategoryBreakdown,
    pub neglect: CategoryBreakdown,
    pub inconsistent_explanations: usize,
    pub escalation_detected: bool,
    pub risk_score: f64,
    /// True when any table matched at all, even at negligible score
    pub signal: bool,
    pub indicators: Vec<Indicator>,
}

// ============================================================================
// Detection
// ============================================================================

/// Score abuse and neglect indicators over patient messages.
///
/// `combined_text` is the concatenated patient utterances; `messages` carries
/// the per-message ordering the escalation check needs.
pub fn detect(messages: &[&Message], combined_text: &str) -> AbuseMetrics {
    let lower = combined_text.to_lowercase();

    let injury = INJURY.match_count(&lower);
    let fear = FEAR_OF_PERSON.match_count(&lower);
    let punishment = PUNISHMENT.match_count(&lower);
    let vague = VAGUE_CAUSE.match_count(&lower);
    let inconsistent_explanations = if injury > 0 && vague > 0 {
        injury.min(vague)
    } else {
        0
    };

    let physical_score = 0.3 * match_score(injury, PER_MATCH)
        + 0.3 * match_score(fear, PER_MATCH)
        + 0.3 * match_score(punishment, PER_MATCH)
        + 0.1 * match_score(inconsistent_explanations, INCONSISTENT_PER_MATCH);
    let physical = CategoryBreakdown {
        score: physical_score,
        matched_terms: collect_terms(&lower, &[&INJURY, &FEAR_OF_PERSON, &PUNISHMENT]),
    };

    let isolation = ISOLATION_TACTICS.match_count(&lower);
    let control = CONTROLLING.match_count(&lower);
    let threat = THREATS.match_count(&lower);
    let belittling = BELITTLING.match_count(&lower);
    let fear_language = FEAR_LANGUAGE.match_count(&lower);

    let emotional_score = 0.25 * match_score(isolation, PER_MATCH)
        + 0.25 * match_score(control, PER_MATCH)
        + 0.20 * match_score(threat, PER_MATCH)
        + 0.15 * match_score(belittling, PER_MATCH)
        + 0.15 * match_score(fear_language, PER_MATCH);
    let emotional = CategoryBreakdown {
        score: emotional_score,
        matched_terms: collect_terms(
            &lower,
            &[
                &ISOLATION_TACTICS,
                &CONTROLLING,
                &THREATS,
                &BELITTLING,
                &FEAR_LANGUAGE,
            ],
        ),
    };

    let basic_needs = BASIC_NEEDS.match_count(&lower);
    let medical = MEDICAL_CARE.match_count(&lower);
    let neglect_isolation = NEGLECT_ISOLATION.match_count(&lower);
    let time_alone = TIME_ALONE.match_count(&lower);

    let neglect_score = 0.30 * match_score(basic_needs, PER_MATCH)
        + 0.35 * match_score(medical, PER_MATCH)
        + 0.20 * match_score(neglect_isolation, PER_MATCH)
        + 0.15 * match_score(time_alone, PER_MATCH);
    let neglect = CategoryBreakdown {
        score: neglect_score,
        matched_terms: collect_terms(
            &lower,
            &[&BASIC_NEEDS, &MEDICAL_CARE, &NEGLECT_ISOLATION, &TIME_ALONE],
        ),
    };

    let escalation_detected = detect_escalation(messages);

    let mut risk_score = 0.40 * physical_score + 0.35 * emotional_score + 0.25 * neglect_score;
    if escalation_detected {
        risk_score += ESCALATION_BONUS;
    }
    let risk_score = clamp_score(risk_score);

    let signal = injury + fear + punishment + vague + isolation + control + threat + belittling
        + fear_language
        + basic_needs
        + medical
        + neglect_isolation
        + time_alone
        > 0;

    let mut indicators = Vec::new();
    push_category_indicator(&mut indicators, "physical-abuse", &physical);
    push_category_indicator(&mut indicators, "emotional-abuse", &emotional);
    push_category_indicator(&mut indicators, "neglect", &neglect);
    if escalation_detected {
        indicators.push(Indicator::new(
            "escalation",
            Severity::High,
            "Abuse-related language is escalating in recent messages",
        ));
    }

    AbuseMetrics {
        physical,
        emotional,
        neglect,
        inconsistent_explanations,
        escalation_detected,
        risk_score,
        signal,
        indicators,
    }
}

fn collect_terms(lower: &str, tables: &[&Lazy<KeywordSet>]) -> Vec<String> {
    let mut terms = Vec::new();
    for table in tables {
        for term in table.matched_terms(lower) {
            if !terms.contains(&term) {
                terms.push(term);
            }
        }
    }
    terms
}

fn push_category_indicator(indicators: &mut Vec<Indicator>, kind: &str, category: &CategoryBreakdown) {
    if let Some(severity) = Severity::from_thresholds(category.score, 30.0, 60.0) {
        indicators.push(Indicator::new(
            kind,
            severity,
            format!(
                "{} indicators at {:.0} (matched: {})",
                kind,
                category.score,
                category.matched_terms.join(", ")
            ),
        ));
    }
}

/// Keyword density in the most recent third of messages versus the earlier
/// average; fires when recent exceeds 1.5x earlier
fn detect_escalation(messages: &[&Message]) -> bool {
    if messages.len() < ESCALATION_MIN_MESSAGES {
        return false;
    }
    let counts: Vec<usize> = messages
        .iter()
        .map(|m| {
            let lower = m.content.to_lowercase();
            ALL_TABLES.iter().map(|t| t.match_count(&lower)).sum()
        })
        .collect();

    let recent_len = (messages.len() / 3).max(1);
    let split = counts.len() - recent_len;
    let earlier = &counts[..split];
    let recent = &counts[split..];

    let earlier_avg = earlier.iter().sum::<usize>() as f64 / earlier.len() as f64;
    let recent_avg = recent.iter().sum::<usize>() as f64 / recent.len() as f64;
    recent_avg > earlier_avg * ESCALATION_RATIO && recent_avg > 0.0
}
