//! Text utilities shared by all detectors
//!
//! - Whitespace tokenization with punctuation stripping
//! - Stopword table and content-word filtering
//! - Sentence splitting and syllable estimation for readability
//! - Pre-compiled keyword/phrase matching (`KeywordSet`)

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Common English stopwords excluded from content-word metrics
pub static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "the", "and", "or", "but", "if", "then", "than", "so", "as", "at", "by",
        "for", "from", "in", "into", "of", "on", "onto", "to", "up", "out", "with", "about",
        "over", "under", "again", "also", "just", "very", "too", "own", "same", "such", "only",
        "both", "each", "few", "more", "most", "other", "some", "any", "all", "no", "nor",
        "not", "is", "am", "are", "was", "were", "be", "been", "being", "have", "has", "had",
        "having", "do", "does", "did", "doing", "will", "would", "should", "could", "can",
        "may", "might", "must", "shall", "i", "me", "my", "mine", "we", "us", "our", "ours",
        "you", "your", "yours", "he", "him", "his", "she", "her", "hers", "it", "its", "they",
        "them", "their", "theirs", "this", "that", "these", "those", "what", "which", "who",
        "whom", "when", "where", "why", "how", "there", "here", "because", "while", "during",
        "before", "after", "above", "below", "between", "through", "well", "now",
    ]
    .into_iter()
    .collect()
});

/// Returns true when the word sits in the stopword table
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

/// Lowercased whitespace tokens with leading/trailing punctuation stripped
pub fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

/// Content words: stopwords and words shorter than 3 characters removed
pub fn content_words(text: &str) -> Vec<String> {
    words(text)
        .into_iter()
        .filter(|w| w.len() >= 3 && !is_stopword(w))
        .collect()
}

/// Tokens eligible for phrase n-grams: purely alphabetic, at least 2 chars
pub fn phrase_tokens(text: &str) -> Vec<String> {
    words(text)
        .into_iter()
        .filter(|w| w.len() >= 2 && w.chars().all(|c| c.is_alphabetic()))
        .collect()
}

/// Sentences split on terminal punctuation, trimmed, empties dropped
pub fn sentences(text: &str) -> Vec<&str> {
    text.split(|c| matches!(c, '.' | '!' | '?'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Vowel-group syllable estimate with trailing-silent-e correction, floor 1
pub fn count_syllables(word: &str) -> usize {
    let lower = word.to_lowercase();
    let mut count = 0;
    let mut prev_vowel = false;
    for c in lower.chars() {
        let vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if vowel && !prev_vowel {
            count += 1;
        }
        prev_vowel = vowel;
    }
    if count > 1 && lower.ends_with('e') && !lower.ends_with("le") {
        count -= 1;
    }
    count.max(1)
}

/// Pre-compiled keyword matcher for one detector category.
///
/// Single words match on word boundaries; multi-word phrases match as
/// literal substrings. Both sides expect lowercased input text.
pub struct KeywordSet {
    pattern: Option<Regex>,
    phrases: Vec<&'static str>,
}

impl KeywordSet {
    /// Compile a matcher from single-word and multi-word tables
    pub fn new(single_words: &[&str], phrases: &[&'static str]) -> Self {
        let pattern = if single_words.is_empty() {
            None
        } else {
            let escaped: Vec<String> = single_words.iter().map(|w| regex::escape(w)).collect();
            let joined = escaped.join("|");
            Some(Regex::new(&format!(r"\b(?:{joined})\b")).expect("static keyword pattern"))
        };
        Self {
            pattern,
            phrases: phrases.to_vec(),
        }
    }

    /// Total occurrences of any word or phrase in the (lowercased) text
    pub fn match_count(&self, lower_text: &str) -> usize {
        let word_hits = self
            .pattern
            .as_ref()
            .map(|p| p.find_iter(lower_text).count())
            .unwrap_or(0);
        let phrase_hits: usize = self
            .phrases
            .iter()
            .map(|p| lower_text.match_indices(p).count())
            .sum();
        word_hits + phrase_hits
    }

    /// Distinct matched terms, in first-occurrence order
    pub fn matched_terms(&self, lower_text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut terms = Vec::new();
        if let Some(pattern) = &self.pattern {
            for m in pattern.find_iter(lower_text) {
                if seen.insert(m.as_str().to_string()) {
                    terms.push(m.as_str().to_string());
                }
            }
        }
        for phrase in &self.phrases {
            if lower_text.contains(phrase) && seen.insert((*phrase).to_string()) {
                terms.push((*phrase).to_string());
            }
        }
        terms
    }

    /// True when at least one word or phrase occurs
    pub fn has_match(&self, lower_text: &str) -> bool {
        self.match_count(lower_text) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_strips_punctuation_and_lowercases() {
        let tokens = words("Hello, World! It's fine.");
        assert_eq!(tokens, vec!["hello", "world", "it's", "fine"]);
    }

    #[test]
    fn test_content_words_filters_stopwords_and_short_words() {
        let tokens = content_words("I am not feeling so good at my home");
        assert_eq!(tokens, vec!["feeling", "good", "home"]);
    }

    #[test]
    fn test_phrase_tokens_drop_single_letters_and_numbers() {
        let tokens = phrase_tokens("I have not been eating well lately since 2020");
        assert_eq!(
            tokens,
            vec!["have", "not", "been", "eating", "well", "lately", "since"]
        );
    }

    #[test]
    fn test_sentences_split_on_terminal_punctuation() {
        let parts = sentences("First one. Second one! Third one? ");
        assert_eq!(parts, vec!["First one", "Second one", "Third one"]);
    }

    #[test]
    fn test_count_syllables_vowel_groups() {
        assert_eq!(count_syllables("cat"), 1);
        assert_eq!(count_syllables("hello"), 2);
        assert_eq!(count_syllables("eating"), 2);
        assert_eq!(count_syllables("analysis"), 4);
    }

    #[test]
    fn test_count_syllables_silent_e() {
        assert_eq!(count_syllables("cake"), 1);
        assert_eq!(count_syllables("table"), 2);
        assert_eq!(count_syllables("e"), 1);
    }

    #[test]
    fn test_keyword_set_word_boundaries() {
        let set = KeywordSet::new(&["hit", "scam"], &[]);
        assert_eq!(set.match_count("he hit me"), 1);
        assert_eq!(set.match_count("the white shirt"), 0);
        assert_eq!(set.match_count("scam scam scam"), 3);
    }

    #[test]
    fn test_keyword_set_phrase_substrings() {
        let set = KeywordSet::new(&[], &["gift card", "wire transfer"]);
        let text = "they asked for a gift card and then another gift card";
        assert_eq!(set.match_count(text), 2);
        assert_eq!(set.matched_terms(text), vec!["gift card"]);
    }

    #[test]
    fn test_keyword_set_mixed_terms_in_order() {
        let set = KeywordSet::new(&["lonely"], &["nobody visits"]);
        let text = "i feel lonely and nobody visits anymore";
        assert_eq!(set.match_count(text), 2);
        assert_eq!(set.matched_terms(text), vec!["lonely", "nobody visits"]);
    }
}
