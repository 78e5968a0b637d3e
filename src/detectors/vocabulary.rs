//! Lexical diversity and complexity metrics for a text blob
//!
//! Word counts run over content words (stopwords and words under 3 chars
//! removed); sentence length and readability run over the unfiltered token
//! stream so they reflect what the patient actually said.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::detectors::clamp_score;
use crate::text;

/// One row of the most-common-word table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordFrequency {
    pub word: String,
    pub count: usize,
}

/// Lexical metrics for one text blob
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyMetrics {
    pub total_words: usize,
    pub unique_words: usize,
    pub type_token_ratio: f64,
    pub avg_word_length: f64,
    pub avg_sentence_length: f64,
    pub readability: f64,
    pub most_common_words: Vec<WordFrequency>,
    pub complexity_score: f64,
}

const MOST_COMMON_LIMIT: usize = 10;

/// Calculate vocabulary metrics for a text blob.
///
/// Empty or whitespace-only input returns the all-zero default shape.
pub fn calculate_metrics(text: &str) -> VocabularyMetrics {
    if text.trim().is_empty() {
        return VocabularyMetrics::default();
    }

    let raw_words = text::words(text);
    if raw_words.is_empty() {
        return VocabularyMetrics::default();
    }
    let content = text::content_words(text);
    let sentence_count = text::sentences(text).len().max(1);

    let total_words = content.len();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in &content {
        *counts.entry(word.as_str()).or_insert(0) += 1;
    }
    let unique_words = counts.len();

    let type_token_ratio = if total_words > 0 {
        unique_words as f64 / total_words as f64
    } else {
        0.0
    };
    let avg_word_length = if total_words > 0 {
        content.iter().map(|w| w.len()).sum::<usize>() as f64 / total_words as f64
    } else {
        0.0
    };
    let avg_sentence_length = raw_words.len() as f64 / sentence_count as f64;

    let mut most_common_words: Vec<WordFrequency> = counts
        .into_iter()
        .map(|(word, count)| WordFrequency {
            word: word.to_string(),
            count,
        })
        .collect();
    most_common_words.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    most_common_words.truncate(MOST_COMMON_LIMIT);

    VocabularyMetrics {
        total_words,
        unique_words,
        type_token_ratio,
        avg_word_length,
        avg_sentence_length,
        readability: readability_score(&raw_words, sentence_count),
        most_common_words,
        complexity_score: complexity(type_token_ratio, avg_word_length, avg_sentence_length),
    }
}

/// Simplified Flesch reading-ease over unfiltered words, clamped to [0,100]
fn readability_score(raw_words: &[String], sentence_count: usize) -> f64 {
    let word_count = raw_words.len() as f64;
    let syllables: usize = raw_words.iter().map(|w| text::count_syllables(w)).sum();
    let score = 206.835
        - 1.015 * (word_count / sentence_count as f64)
        - 84.6 * (syllables as f64 / word_count);
    clamp_score(score)
}

/// Composite complexity: 0.4×diversity + 0.3×wordLength + 0.3×sentenceLength,
/// each sub-term normalized to [0,100] before weighting
fn complexity(type_token_ratio: f64, avg_word_length: f64, avg_sentence_length: f64) -> f64 {
    let diversity = (type_token_ratio * 100.0).min(100.0);
    let word_length = (avg_word_length / 8.0 * 100.0).min(100.0);
    let sentence_length = (avg_sentence_length / 20.0 * 100.0).min(100.0);
    clamp_score(0.4 * diversity + 0.3 * word_length + 0.3 * sentence_length)
}
