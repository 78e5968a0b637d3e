//! Repeated-phrase detection within and across conversations
//!
//! Builds word n-grams (4 to 10 words) from patient utterances and flags
//! phrases the patient keeps returning to. The same phrase echoed inside one
//! conversation is tracked separately from phrases shared across
//! conversations; shorter n-grams wholly contained in an equally frequent
//! longer phrase are suppressed so one repeated sentence surfaces once.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::ResolvedConversation;
use crate::detectors::Severity;
use crate::text;

const MIN_NGRAM_WORDS: usize = 4;
const MAX_NGRAM_WORDS: usize = 10;
const MIN_PHRASE_CHARS: usize = 20;
const MIN_REPEAT_COUNT: usize = 2;
const INDEX_SCALE: f64 = 25.0;

/// A phrase recurring across the analyzed history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatedPhrase {
    pub phrase: String,
    pub count: usize,
    pub frequency_per_day: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    pub day_span: i64,
    pub conversation_count: usize,
    pub severity: Severity,
}

/// A phrase echoed at least twice inside a single conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithinConversationRepeat {
    pub phrase: String,
    pub conversation_index: usize,
    pub count: usize,
}

/// A phrase appearing in two or more distinct conversations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossConversationPhrase {
    pub phrase: String,
    pub conversation_count: usize,
    pub total_count: usize,
}

/// Coarse direction of the repetition signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Stable,
    Decreasing,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Increasing => "increasing",
            Trend::Stable => "stable",
            Trend::Decreasing => "decreasing",
        }
    }
}

impl Default for Trend {
    fn default() -> Self {
        Trend::Stable
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Repetition metrics for a batch of conversations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepetitionMetrics {
    pub repeated_phrases: Vec<RepeatedPhrase>,
    pub within_conversation: Vec<WithinConversationRepeat>,
    pub cross_conversation: Vec<CrossConversationPhrase>,
    pub concerning_phrases: Vec<String>,
    pub very_concerning_phrases: Vec<String>,
    pub repetition_index: f64,
    pub trend: Trend,
    pub message_count: usize,
}

#[derive(Default)]
struct PhraseStats {
    count: usize,
    word_len: usize,
    per_conversation: HashMap<usize, usize>,
    first_seen: Option<DateTime<Utc>>,
    last_seen: Option<DateTime<Utc>>,
}

/// Find repeated phrases across the patient's conversation history
pub fn find_repetitions(conversations: &[ResolvedConversation]) -> RepetitionMetrics {
    let mut stats: HashMap<String, PhraseStats> = HashMap::new();
    let mut message_count = 0usize;

    for (conversation_index, conversation) in conversations.iter().enumerate() {
        for message in conversation.patient_messages() {
            message_count += 1;
            let timestamp = message.created_at.or(conversation.created_at);
            let tokens = text::phrase_tokens(&message.content);
            for n in MIN_NGRAM_WORDS..=MAX_NGRAM_WORDS {
                if tokens.len() < n {
                    break;
                }
                for window in tokens.windows(n) {
                    if window.iter().all(|w| text::is_stopword(w)) {
                        continue;
                    }
                    let phrase = window.join(" ");
                    if phrase.chars().count() < MIN_PHRASE_CHARS {
                        continue;
                    }
                    let entry = stats.entry(phrase).or_default();
                    entry.count += 1;
                    entry.word_len = n;
                    *entry
                        .per_conversation
                        .entry(conversation_index)
                        .or_insert(0) += 1;
                    if let Some(at) = timestamp {
                        entry.first_seen = Some(entry.first_seen.map_or(at, |f| f.min(at)));
                        entry.last_seen = Some(entry.last_seen.map_or(at, |l| l.max(at)));
                    }
                }
            }
        }
    }

    let kept = suppress_subphrases(stats);

    let mut repeated_phrases: Vec<RepeatedPhrase> = Vec::with_capacity(kept.len());
    let mut within_conversation = Vec::new();
    let mut cross_conversation = Vec::new();

    for (phrase, entry) in &kept {
        let day_span = match (entry.first_seen, entry.last_seen) {
            (Some(first), Some(last)) => (last - first).num_days().max(0),
            _ => 0,
        };
        let frequency_per_day = entry.count as f64 / day_span.max(1) as f64;
        repeated_phrases.push(RepeatedPhrase {
            phrase: phrase.clone(),
            count: entry.count,
            frequency_per_day,
            first_seen: entry.first_seen,
            last_seen: entry.last_seen,
            day_span,
            conversation_count: entry.per_conversation.len(),
            severity: phrase_severity(entry.count, frequency_per_day),
        });

        for (&conversation_index, &count) in &entry.per_conversation {
            if count >= MIN_REPEAT_COUNT {
                within_conversation.push(WithinConversationRepeat {
                    phrase: phrase.clone(),
                    conversation_index,
                    count,
                });
            }
        }
        if entry.per_conversation.len() >= 2 {
            cross_conversation.push(CrossConversationPhrase {
                phrase: phrase.clone(),
                conversation_count: entry.per_conversation.len(),
                total_count: entry.count,
            });
        }
    }

    repeated_phrases.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| {
                b.frequency_per_day
                    .partial_cmp(&a.frequency_per_day)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.phrase.cmp(&b.phrase))
    });
    within_conversation.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.conversation_index.cmp(&b.conversation_index))
            .then_with(|| a.phrase.cmp(&b.phrase))
    });
    cross_conversation.sort_by(|a, b| {
        b.conversation_count
            .cmp(&a.conversation_count)
            .then_with(|| b.total_count.cmp(&a.total_count))
            .then_with(|| a.phrase.cmp(&b.phrase))
    });

    let concerning_phrases: Vec<String> = repeated_phrases
        .iter()
        .filter(|p| is_concerning(p))
        .map(|p| p.phrase.clone())
        .collect();
    let very_concerning_phrases: Vec<String> = repeated_phrases
        .iter()
        .filter(|p| is_concerning(p) && p.conversation_count > 2)
        .map(|p| p.phrase.clone())
        .collect();

    let repetition_index = repetition_index(&repeated_phrases, &within_conversation, message_count);
    let trend = frequency_trend(&repeated_phrases);

    RepetitionMetrics {
        repeated_phrases,
        within_conversation,
        cross_conversation,
        concerning_phrases,
        very_concerning_phrases,
        repetition_index,
        trend,
        message_count,
    }
}

/// Drop sub-phrases contained in an equally-or-more frequent longer phrase
fn suppress_subphrases(stats: HashMap<String, PhraseStats>) -> Vec<(String, PhraseStats)> {
    let mut candidates: Vec<(String, PhraseStats)> = stats
        .into_iter()
        .filter(|(_, s)| s.count >= MIN_REPEAT_COUNT)
        .collect();
    candidates.sort_by(|a, b| {
        b.1.word_len
            .cmp(&a.1.word_len)
            .then_with(|| b.1.count.cmp(&a.1.count))
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut kept: Vec<(String, PhraseStats)> = Vec::new();
    for (phrase, entry) in candidates {
        let padded = format!(" {phrase} ");
        let contained = kept.iter().any(|(longer, longer_entry)| {
            longer_entry.count >= entry.count && format!(" {longer} ").contains(&padded)
        });
        if !contained {
            kept.push((phrase, entry));
        }
    }
    kept
}

fn phrase_severity(count: usize, frequency_per_day: f64) -> Severity {
    if count >= 10 || frequency_per_day >= 2.0 {
        Severity::High
    } else if count >= 5 || frequency_per_day >= 1.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn is_concerning(phrase: &RepeatedPhrase) -> bool {
    phrase.severity == Severity::High || phrase.frequency_per_day > 1.0 || phrase.count > 5
}

/// Severity-weighted repeat counts normalized by message volume, capped 100.
/// Within-conversation echoes count extra: they are the stronger signal.
fn repetition_index(
    repeated: &[RepeatedPhrase],
    within: &[WithinConversationRepeat],
    message_count: usize,
) -> f64 {
    let severity_weight = |s: Severity| match s {
        Severity::Low => 1.0,
        Severity::Medium => 2.0,
        Severity::High => 3.0,
    };
    let mut weighted: f64 = repeated
        .iter()
        .map(|p| p.count as f64 * severity_weight(p.severity))
        .sum();
    weighted += within
        .iter()
        .map(|w| (w.count - 1) as f64 * 2.0)
        .sum::<f64>();
    (weighted / message_count.max(1) as f64 * INDEX_SCALE).min(100.0)
}

fn frequency_trend(repeated: &[RepeatedPhrase]) -> Trend {
    if repeated.is_empty() {
        return Trend::Stable;
    }
    let mean_frequency =
        repeated.iter().map(|p| p.frequency_per_day).sum::<f64>() / repeated.len() as f64;
    if mean_frequency >= 1.0 {
        Trend::Increasing
    } else if mean_frequency < 0.2 {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}
