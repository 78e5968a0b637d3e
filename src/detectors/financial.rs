//! Financial exploitation indicators
//!
//! Five weighted categories over patient text: scam vocabulary, requests for
//! money, new-person influence, account access, and transfer methods. Any
//! transfer-method mention also raises a dedicated flag; ask-for-gift-cards
//! language is the strongest single scam signal the orchestrator acts on.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::detectors::{clamp_score, match_score, Indicator, Severity};
use crate::text::KeywordSet;

const PER_MATCH: f64 = 25.0;

static SCAM: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &["scam", "scammer", "lottery", "sweepstakes"],
        &[
            "won a prize",
            "claim your",
            "irs called",
            "social security called",
            "microsoft called",
            "tech support called",
            "computer virus",
            "warranty expired",
            "acting on my behalf",
        ],
    )
});

static MONEY_REQUESTS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &[],
        &[
            "asked me for money",
            "asked for money",
            "needs money",
            "lend him money",
            "lend her money",
            "borrow money",
            "send money",
            "help him out financially",
            "help her out financially",
            "pay her bills",
            "pay his bills",
        ],
    )
});

static NEW_PERSON: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &[],
        &[
            "new friend",
            "met online",
            "someone i met",
            "nice man called",
            "nice woman called",
            "new boyfriend",
            "new girlfriend",
            "just met",
        ],
    )
});

static ACCOUNT_ACCESS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &[],
        &[
            "my password",
            "my pin",
            "my bank account",
            "bank account number",
            "my credit card number",
            "social security number",
            "added to my account",
            "signed something",
        ],
    )
});

static TRANSFER_METHODS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(
        &["bitcoin", "crypto", "cryptocurrency", "moneygram", "zelle", "venmo"],
        &[
            "gift card",
            "wire transfer",
            "western union",
            "prepaid card",
            "money order",
            "cash app",
        ],
    )
});

/// Financial exploitation metrics for combined patient text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialMetrics {
    pub scam_mentions: usize,
    pub money_request_mentions: usize,
    pub new_person_mentions: usize,
    pub account_access_mentions: usize,
    pub transfer_method_mentions: usize,
    pub transfer_method_mentioned: bool,
    pub matched_terms: Vec<String>,
    pub risk_score: f64,
    /// True when any table matched at all, even at negligible score
    pub signal: bool,
    pub indicators: Vec<Indicator>,
}

/// Score financial exploitation indicators over combined patient text
pub fn detect(combined_text: &str) -> FinancialMetrics {
    let lower = combined_text.to_lowercase();

    let scam_mentions = SCAM.match_count(&lower);
    let money_request_mentions = MONEY_REQUESTS.match_count(&lower);
    let new_person_mentions = NEW_PERSON.match_count(&lower);
    let account_access_mentions = ACCOUNT_ACCESS.match_count(&lower);
    let transfer_method_mentions = TRANSFER_METHODS.match_count(&lower);

    let risk_score = clamp_score(
        0.30 * match_score(scam_mentions, PER_MATCH)
            + 0.25 * match_score(money_request_mentions, PER_MATCH)
            + 0.20 * match_score(new_person_mentions, PER_MATCH)
            + 0.15 * match_score(account_access_mentions, PER_MATCH)
            + 0.10 * match_score(transfer_method_mentions, PER_MATCH),
    );

    let mut matched_terms = Vec::new();
    for table in [
        &SCAM,
        &MONEY_REQUESTS,
        &NEW_PERSON,
        &ACCOUNT_ACCESS,
        &TRANSFER_METHODS,
    ] {
        for term in table.matched_terms(&lower) {
            if !matched_terms.contains(&term) {
                matched_terms.push(term);
            }
        }
    }

    let transfer_method_mentioned = transfer_method_mentions > 0;
    let signal = scam_mentions
        + money_request_mentions
        + new_person_mentions
        + account_access_mentions
        + transfer_method_mentions
        > 0;

    let mut indicators = Vec::new();
    if let Some(severity) = Severity::from_thresholds(risk_score, 40.0, 70.0) {
        indicators.push(Indicator::new(
            "financial-exploitation",
            severity,
            format!(
                "Financial exploitation indicators at {:.0} (matched: {})",
                risk_score,
                matched_terms.join(", ")
            ),
        ));
    }
    if transfer_method_mentioned {
        indicators.push(Indicator::new(
            "transfer-method",
            Severity::High,
            "Untraceable transfer method mentioned (gift cards, wires, or similar)",
        ));
    }

    FinancialMetrics {
        scam_mentions,
        money_request_mentions,
        new_person_mentions,
        account_access_mentions,
        transfer_method_mentions,
        transfer_method_mentioned,
        matched_terms,
        risk_score,
        signal,
        indicators,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_empty_input_is_all_default() {
        let metrics = detect("");
        assert_eq!(metrics, FinancialMetrics::default());
        assert!(!metrics.signal);
    }

    #[test]
    fn test_benign_text_produces_no_signal() {
        let metrics = detect("We talked about the garden and my granddaughter's visit");
        assert_eq!(metrics.risk_score, 0.0);
        assert!(!metrics.signal);
        assert!(metrics.indicators.is_empty());
    }

    #[test]
    fn test_tech_support_scam_with_gift_cards() {
        let metrics = detect(
            "A nice man called about a computer virus on my machine and said I should \
             buy gift cards to fix it. He asked for money and wanted my bank account.",
        );

        assert_eq!(metrics.scam_mentions, 1);
        assert_eq!(metrics.new_person_mentions, 1);
        assert_eq!(metrics.transfer_method_mentions, 1);
        assert!(metrics.transfer_method_mentioned);
        assert_eq!(metrics.money_request_mentions, 1);
        assert_eq!(metrics.account_access_mentions, 1);
        assert!(metrics.risk_score > 20.0);
        assert!(metrics
            .indicators
            .iter()
            .any(|i| i.kind == "transfer-method" && i.severity == Severity::High));
    }

    #[test]
    fn test_indicator_tiers_at_40_and_70() {
        // Two matches in each of the three heaviest categories: 50 per
        // sub-score, weighted 0.30+0.25+0.20 => 37.5, below the 40 cut
        let below = detect(
            "There was a lottery letter and a sweepstakes call. My new friend from \
             the club, someone i met last month, asked for money and needs money.",
        );
        assert!(below.risk_score < 40.0);
        assert!(!below
            .indicators
            .iter()
            .any(|i| i.kind == "financial-exploitation"));

        let above = detect(
            "The lottery people and a scammer called about a sweepstakes prize I won. \
             My new friend, someone i met online, a nice man called too. He asked for \
             money and needs money and wants to borrow money. He knows my password and \
             my pin and my bank account. He wants a wire transfer through western union \
             and a gift card and bitcoin.",
        );
        assert!(above.risk_score > 70.0, "{}", above.risk_score);
        assert!(above
            .indicators
            .iter()
            .any(|i| i.kind == "financial-exploitation" && i.severity == Severity::High));
    }

    #[test]
    fn test_risk_score_clamped() {
        let loaded = "scam scammer lottery sweepstakes won a prize irs called microsoft \
                      called computer virus asked for money needs money borrow money send \
                      money new friend met online just met my password my pin my bank \
                      account signed something gift card wire transfer western union \
                      bitcoin zelle venmo money order"
            .repeat(3);
        let metrics = detect(&loaded);
        assert_eq!(metrics.risk_score, 100.0);
    }
}
