//! Fraud and abuse risk orchestration
//!
//! Runs the financial, abuse, and relationship detectors over a batch of
//! conversations and fuses their scores into one assessment with warnings
//! and recommendations. This is the single recovery boundary: resolution
//! failures are logged and converted into a default result carrying the
//! error text, never surfaced as errors to the caller.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use super::{
    fuse_signals, BaselineChange, Priority, Recommendation, RiskSnapshot, WeightedSignal,
    CORROBORATION_BONUS, MIN_ANALYSIS_CHARS,
};
use crate::conversation::{
    combined_patient_text, patient_messages, resolve_conversations, Conversation, MessageResolver,
    ResolvedConversation,
};
use crate::detectors::abuse::{self, AbuseMetrics};
use crate::detectors::financial::{self, FinancialMetrics};
use crate::detectors::relationship::{self, RelationshipMetrics};
use crate::detectors::{clamp_score, Confidence};
use crate::text;

const FINANCIAL_WEIGHT: f64 = 0.35;
const ABUSE_WEIGHT: f64 = 0.40;
const RELATIONSHIP_WEIGHT: f64 = 0.25;

const FINANCIAL_THRESHOLD: f64 = 40.0;
const ABUSE_THRESHOLD: f64 = 40.0;
const RELATIONSHIP_THRESHOLD: f64 = 30.0;

// ============================================================================
// Assessment
// ============================================================================

/// One fraud/abuse risk assessment over a conversation batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudAbuseAssessment {
    /// Unique id for this assessment run
    pub id: Uuid,
    /// Full financial detector output
    pub financial: FinancialMetrics,
    /// Full abuse/neglect detector output
    pub abuse: AbuseMetrics,
    /// Full relationship detector output
    pub relationship: RelationshipMetrics,
    /// Financial exploitation risk, [0,100]
    pub financial_risk: f64,
    /// Abuse/neglect risk, [0,100]
    pub abuse_risk: f64,
    /// Relationship/isolation risk, [0,100]
    pub relationship_risk: f64,
    /// Fused overall risk, [0,100]
    pub overall_risk_score: f64,
    /// Movement since a prior assessment, when one was supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_from_baseline: Option<BaselineChange>,
    /// Ordered human-readable warnings
    pub warnings: Vec<String>,
    /// Caregiver recommendations tied to threshold crossings
    pub recommendations: Vec<Recommendation>,
    /// Confidence in this assessment given analyzed volume
    pub confidence: Confidence,
    /// When the analysis ran
    pub analysis_date: DateTime<Utc>,
    /// Conversations in the batch
    pub conversation_count: usize,
    /// Patient messages analyzed
    pub message_count: usize,
    /// Words in the combined patient text
    pub total_words: usize,
}

impl FraudAbuseAssessment {
    /// All-default assessment carrying the given warning.
    /// Used for the insufficient-data and recovered-failure paths.
    fn empty(warning: String, confidence: Confidence, conversation_count: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            financial: FinancialMetrics::default(),
            abuse: AbuseMetrics::default(),
            relationship: RelationshipMetrics::default(),
            financial_risk: 0.0,
            abuse_risk: 0.0,
            relationship_risk: 0.0,
            overall_risk_score: 0.0,
            change_from_baseline: None,
            warnings: vec![warning],
            recommendations: Vec::new(),
            confidence,
            analysis_date: Utc::now(),
            conversation_count,
            message_count: 0,
            total_words: 0,
        }
    }
}

// ============================================================================
// Analyzer
// ============================================================================

/// Orchestrates the financial, abuse, and relationship detectors.
///
/// Detectors run independently over the same patient text; their scores are
/// fused by [`fuse_signals`] over the detectors that produced a signal, with
/// a corroboration bonus when two or more areas cross their thresholds.
///
/// # Example
///
/// ```rust,ignore
/// use wellness_risk_engine::analysis::fraud_abuse::FraudAbuseAnalyzer;
///
/// let analyzer = FraudAbuseAnalyzer::new();
/// let assessment = analyzer.analyze_conversations(&conversations, None).await;
/// for recommendation in &assessment.recommendations {
///     println!("[{}] {}", recommendation.priority, recommendation.action);
/// }
/// ```
#[derive(Default)]
pub struct FraudAbuseAnalyzer {
    resolver: Option<Arc<dyn MessageResolver>>,
}

impl FraudAbuseAnalyzer {
    /// Analyzer for batches whose messages arrive fully populated
    pub fn new() -> Self {
        Self { resolver: None }
    }

    /// Analyzer that resolves message references through the given lookup
    pub fn with_resolver(resolver: Arc<dyn MessageResolver>) -> Self {
        Self {
            resolver: Some(resolver),
        }
    }

    /// Analyze a conversation batch, optionally against a prior assessment.
    ///
    /// Always returns a well-formed assessment: insufficient data and
    /// collaborator failures come back as default scores plus a warning.
    pub async fn analyze_conversations(
        &self,
        conversations: &[Conversation],
        prior: Option<&RiskSnapshot>,
    ) -> FraudAbuseAssessment {
        let resolved = match resolve_conversations(conversations, self.resolver.as_deref()).await {
            Ok(resolved) => resolved,
            Err(e) => {
                error!(error = %e, conversations = conversations.len(), "fraud/abuse analysis failed during message resolution");
                return FraudAbuseAssessment::empty(
                    format!("Analysis failed: {e}"),
                    Confidence::None,
                    conversations.len(),
                );
            }
        };
        self.analyze_resolved(&resolved, prior)
    }

    /// Analyze pre-resolved conversations
    pub fn analyze_resolved(
        &self,
        conversations: &[ResolvedConversation],
        prior: Option<&RiskSnapshot>,
    ) -> FraudAbuseAssessment {
        let messages = patient_messages(conversations);
        let combined = combined_patient_text(conversations);

        if combined.chars().count() < MIN_ANALYSIS_CHARS {
            return FraudAbuseAssessment::empty(
                "Insufficient conversation data for a reliable risk assessment".to_string(),
                Confidence::Low,
                conversations.len(),
            );
        }

        let financial = financial::detect(&combined);
        let abuse = abuse::detect(&messages, &combined);
        let relationship = relationship::analyze(&combined);

        let fused = fuse_signals(&[
            WeightedSignal::new(financial.risk_score, FINANCIAL_WEIGHT, financial.signal),
            WeightedSignal::new(abuse.risk_score, ABUSE_WEIGHT, abuse.signal),
            WeightedSignal::new(
                relationship.risk_score,
                RELATIONSHIP_WEIGHT,
                relationship.signal,
            ),
        ]);

        let crossings = [
            financial.risk_score > FINANCIAL_THRESHOLD,
            abuse.risk_score > ABUSE_THRESHOLD,
            relationship.risk_score > RELATIONSHIP_THRESHOLD,
        ]
        .iter()
        .filter(|&&crossed| crossed)
        .count();

        let overall_risk_score = clamp_score(if crossings >= 2 {
            fused + CORROBORATION_BONUS
        } else {
            fused
        });

        let change_from_baseline = prior.map(|prior| {
            BaselineChange::compute(
                prior,
                financial.risk_score,
                abuse.risk_score,
                relationship.risk_score,
                overall_risk_score,
            )
        });

        let warnings = build_warnings(&financial, &abuse, &relationship, change_from_baseline);
        let recommendations =
            build_recommendations(&financial, &abuse, &relationship, overall_risk_score);

        let assessment = FraudAbuseAssessment {
            id: Uuid::new_v4(),
            financial_risk: financial.risk_score,
            abuse_risk: abuse.risk_score,
            relationship_risk: relationship.risk_score,
            financial,
            abuse,
            relationship,
            overall_risk_score,
            change_from_baseline,
            warnings,
            recommendations,
            confidence: Confidence::from_volume(combined.chars().count(), conversations.len()),
            analysis_date: Utc::now(),
            conversation_count: conversations.len(),
            message_count: messages.len(),
            total_words: text::words(&combined).len(),
        };

        info!(
            assessment_id = %assessment.id,
            overall = assessment.overall_risk_score,
            financial = assessment.financial_risk,
            abuse = assessment.abuse_risk,
            relationship = assessment.relationship_risk,
            confidence = %assessment.confidence,
            "fraud/abuse analysis completed"
        );

        assessment
    }
}

// ============================================================================
// Warnings and recommendations
// ============================================================================

fn build_warnings(
    financial: &FinancialMetrics,
    abuse: &AbuseMetrics,
    relationship: &RelationshipMetrics,
    change: Option<BaselineChange>,
) -> Vec<String> {
    let mut warnings = Vec::new();

    if financial.risk_score >= 60.0 {
        warnings.push(format!(
            "High financial exploitation risk ({:.0}): {}",
            financial.risk_score,
            financial.matched_terms.join(", ")
        ));
    } else if financial.risk_score >= FINANCIAL_THRESHOLD {
        warnings.push(format!(
            "Elevated financial exploitation indicators ({:.0})",
            financial.risk_score
        ));
    }
    if financial.transfer_method_mentioned {
        warnings.push(
            "Untraceable transfer methods mentioned (gift cards, wires, or similar)".to_string(),
        );
    }

    if abuse.risk_score >= 60.0 {
        warnings.push(format!(
            "High abuse/neglect risk ({:.0}) across physical, emotional, or neglect indicators",
            abuse.risk_score
        ));
    } else if abuse.risk_score >= ABUSE_THRESHOLD {
        warnings.push(format!(
            "Elevated abuse/neglect indicators ({:.0})",
            abuse.risk_score
        ));
    }
    if abuse.escalation_detected {
        warnings.push("Abuse-related language is escalating in recent conversations".to_string());
    }

    if relationship.risk_score >= RELATIONSHIP_THRESHOLD {
        warnings.push(format!(
            "Social isolation indicators elevated ({:.0})",
            relationship.risk_score
        ));
    }

    if let Some(change) = change {
        if change.increased_significantly {
            warnings.push(format!(
                "Risk increased significantly since the previous assessment (overall {:+.0})",
                change.overall_delta
            ));
        }
    }

    warnings
}

fn build_recommendations(
    financial: &FinancialMetrics,
    abuse: &AbuseMetrics,
    relationship: &RelationshipMetrics,
    overall: f64,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if financial.risk_score >= FINANCIAL_THRESHOLD {
        let priority = if financial.risk_score >= 60.0 {
            Priority::High
        } else {
            Priority::Medium
        };
        recommendations.push(Recommendation::new(
            "financial",
            priority,
            "Review recent account activity",
            "Financial exploitation indicators crossed the review threshold; check statements and recent transfers with the patient",
        ));
    }
    if financial.transfer_method_mentioned {
        recommendations.push(Recommendation::new(
            "financial",
            Priority::High,
            "Discuss common scam patterns",
            "Gift cards, wires, or similar untraceable transfer methods came up; walk through how these scams work before money moves",
        ));
    }

    if abuse.risk_score >= ABUSE_THRESHOLD {
        let priority = if abuse.risk_score >= 60.0 {
            Priority::High
        } else {
            Priority::Medium
        };
        recommendations.push(Recommendation::new(
            "safety",
            priority,
            "Schedule an in-person visit",
            "Abuse or neglect indicators crossed the review threshold; an in-person check is more reliable than phone screening",
        ));
    }
    if abuse.physical.score > 40.0 {
        recommendations.push(Recommendation::new(
            "safety",
            Priority::High,
            "Consider a protective-services report",
            "Physical abuse indicators are high enough to warrant contacting adult protective services",
        ));
    }
    if abuse.neglect.score > 40.0 {
        recommendations.push(Recommendation::new(
            "care",
            Priority::Medium,
            "Verify basic needs are met",
            "Neglect indicators suggest checking food, medication, heat, and hygiene directly",
        ));
    }

    if relationship.risk_score >= RELATIONSHIP_THRESHOLD {
        recommendations.push(Recommendation::new(
            "social",
            Priority::Medium,
            "Review the patient's social connections",
            "Isolation or relationship-change indicators crossed the review threshold",
        ));
    }
    if relationship.isolation_mentions > 2 {
        recommendations.push(Recommendation::new(
            "social",
            Priority::Medium,
            "Investigate loss of social network",
            "Repeated isolation mentions suggest the patient's usual contacts have dropped off",
        ));
    }

    if overall >= 50.0 {
        recommendations.push(Recommendation::new(
            "general",
            Priority::High,
            "Arrange an immediate assessment",
            "Overall risk crossed the urgent threshold; combine financial review and a welfare visit promptly",
        ));
    }

    if recommendations.is_empty() {
        recommendations.push(Recommendation::continue_monitoring());
    }

    recommendations
}
