//! Cognitive and mood wellness orchestration
//!
//! Runs the vocabulary, repetition, and psychiatric detectors over a batch of
//! conversations, folds the run into the patient's statistical baseline, and
//! fuses the signals into one assessment. Like the fraud/abuse side this is a
//! recovery boundary: baseline store failures are logged and reported as
//! warnings while the linguistic analysis still completes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    fuse_signals, Priority, Recommendation, WeightedSignal, CORROBORATION_BONUS,
    MIN_ANALYSIS_CHARS,
};
use crate::baseline::{BaselineManager, BaselineTrend, BaselineUpdate, DeviationReport, MetricSnapshot};
use crate::conversation::{
    combined_patient_text, patient_messages, resolve_conversations, Conversation, MessageResolver,
    ResolvedConversation,
};
use crate::detectors::psychiatric::{self, PsychiatricMetrics};
use crate::detectors::repetition::{self, RepetitionMetrics};
use crate::detectors::vocabulary::{self, VocabularyMetrics};
use crate::detectors::{clamp_score, Confidence};

const MEMORY_WEIGHT: f64 = 0.40;
const MOOD_WEIGHT: f64 = 0.35;
const LEXICAL_WEIGHT: f64 = 0.25;

const MEMORY_THRESHOLD: f64 = 40.0;
const MOOD_THRESHOLD: f64 = 40.0;
const LEXICAL_THRESHOLD: f64 = 30.0;

const MOOD_SCREENING_CUT: f64 = 70.0;
const Z_RISK_SCALE: f64 = 25.0;

// ============================================================================
// Assessment
// ============================================================================

/// One wellness assessment over a patient's conversation batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellnessAssessment {
    /// Unique id for this assessment run
    pub id: Uuid,
    /// Patient the batch belongs to
    pub patient_id: String,
    /// Full vocabulary detector output
    pub vocabulary: VocabularyMetrics,
    /// Full repetition detector output
    pub repetition: RepetitionMetrics,
    /// Full psychiatric detector output
    pub psychiatric: PsychiatricMetrics,
    /// Memory/repetition risk, [0,100]
    pub memory_risk: f64,
    /// Mood risk, the higher of the depression and anxiety scores
    pub mood_risk: f64,
    /// Lexical decline risk scored against the patient's own baseline
    pub lexical_risk: f64,
    /// Fused overall risk, [0,100]
    pub overall_risk_score: f64,
    /// This run scored against the baseline as it stood beforehand
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_deviation: Option<DeviationReport>,
    /// Result of folding this run into the baseline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_update: Option<BaselineUpdate>,
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

impl WellnessAssessment {
    /// All-default assessment carrying the given warning.
    /// Used for the insufficient-data and recovered-failure paths; no
    /// baseline operation runs for these, so short batches cannot skew stats.
    fn empty(
        patient_id: &str,
        warning: String,
        confidence: Confidence,
        conversation_count: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: patient_id.to_string(),
            vocabulary: VocabularyMetrics::default(),
            repetition: RepetitionMetrics::default(),
            psychiatric: PsychiatricMetrics::default(),
            memory_risk: 0.0,
            mood_risk: 0.0,
            lexical_risk: 0.0,
            overall_risk_score: 0.0,
            baseline_deviation: None,
            baseline_update: None,
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

/// Nested metrics record folded into the patient's baseline.
///
/// Only numeric leaves survive flattening; the `risks` block exists so the
/// mood composite lands under a key the seasonal mood family matches.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotMetrics<'a> {
    vocabulary: &'a VocabularyMetrics,
    repetition: &'a RepetitionMetrics,
    psychiatric: &'a PsychiatricMetrics,
    risks: RiskBlock,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RiskBlock {
    memory: f64,
    mood: f64,
}

// ============================================================================
// Analyzer
// ============================================================================

/// Orchestrates the vocabulary, repetition, and psychiatric detectors and the
/// per-patient baseline lifecycle.
///
/// Each analysis first scores the run against the baseline as it stood, then
/// folds the run in. The first analysis for a patient establishes the
/// baseline, so no deviation report exists until the second run.
pub struct WellnessAnalyzer {
    baselines: Arc<BaselineManager>,
    resolver: Option<Arc<dyn MessageResolver>>,
}

impl WellnessAnalyzer {
    /// Analyzer for batches whose messages arrive fully populated
    pub fn new(baselines: Arc<BaselineManager>) -> Self {
        Self {
            baselines,
            resolver: None,
        }
    }

    /// Analyzer that resolves message references through the given lookup
    pub fn with_resolver(
        baselines: Arc<BaselineManager>,
        resolver: Arc<dyn MessageResolver>,
    ) -> Self {
        Self {
            baselines,
            resolver: Some(resolver),
        }
    }

    /// Analyze a patient's conversation batch.
    ///
    /// Always returns a well-formed assessment: insufficient data and
    /// collaborator failures come back as warnings, never as errors.
    pub async fn analyze_conversations(
        &self,
        patient_id: &str,
        conversations: &[Conversation],
    ) -> WellnessAssessment {
        let resolved = match resolve_conversations(conversations, self.resolver.as_deref()).await {
            Ok(resolved) => resolved,
            Err(e) => {
                error!(patient_id, error = %e, conversations = conversations.len(), "wellness analysis failed during message resolution");
                return WellnessAssessment::empty(
                    patient_id,
                    format!("Analysis failed: {e}"),
                    Confidence::None,
                    conversations.len(),
                );
            }
        };
        self.analyze_resolved(patient_id, &resolved).await
    }

    /// Analyze pre-resolved conversations
    pub async fn analyze_resolved(
        &self,
        patient_id: &str,
        conversations: &[ResolvedConversation],
    ) -> WellnessAssessment {
        let messages = patient_messages(conversations);
        let combined = combined_patient_text(conversations);

        if combined.chars().count() < MIN_ANALYSIS_CHARS {
            return WellnessAssessment::empty(
                patient_id,
                "Insufficient conversation data for a reliable wellness assessment".to_string(),
                Confidence::Low,
                conversations.len(),
            );
        }

        let vocabulary = vocabulary::calculate_metrics(&combined);
        let repetition = repetition::find_repetitions(conversations);
        let psychiatric = psychiatric::analyze_markers(conversations);

        let memory_risk = repetition.repetition_index;
        let mood_risk = psychiatric.depression_score.max(psychiatric.anxiety_score);

        let mut failures = Vec::new();
        let snapshot = match MetricSnapshot::from_serialize(&SnapshotMetrics {
            vocabulary: &vocabulary,
            repetition: &repetition,
            psychiatric: &psychiatric,
            risks: RiskBlock {
                memory: memory_risk,
                mood: mood_risk,
            },
        }) {
            Ok(snapshot) => Some(match latest_timestamp(conversations) {
                Some(at) => snapshot.with_timestamp(at),
                None => snapshot,
            }),
            Err(e) => {
                warn!(patient_id, error = %e, "could not build baseline snapshot from metrics");
                failures.push("Baseline skipped: metrics snapshot could not be built".to_string());
                None
            }
        };

        // Score against the baseline as it stood, then fold this run in
        let baseline_deviation = match &snapshot {
            Some(snapshot) => match self.baselines.deviation(patient_id, snapshot).await {
                Ok(report) => report,
                Err(e) => {
                    error!(patient_id, error = %e, "baseline comparison failed");
                    failures.push(format!("Baseline comparison unavailable: {e}"));
                    None
                }
            },
            None => None,
        };
        let baseline_update = match &snapshot {
            Some(snapshot) => match self.baselines.update(patient_id, snapshot).await {
                Ok(update) => Some(update),
                Err(e) => {
                    error!(patient_id, error = %e, "baseline update failed");
                    failures.push(format!("Baseline update failed: {e}"));
                    None
                }
            },
            None => None,
        };

        let lexical_risk = baseline_deviation.as_ref().map_or(0.0, lexical_decline);

        let fused = fuse_signals(&[
            WeightedSignal::new(memory_risk, MEMORY_WEIGHT, repetition.message_count > 0),
            WeightedSignal::new(mood_risk, MOOD_WEIGHT, psychiatric.total_words > 0),
            WeightedSignal::new(lexical_risk, LEXICAL_WEIGHT, baseline_deviation.is_some()),
        ]);

        let crossings = [
            memory_risk > MEMORY_THRESHOLD,
            mood_risk > MOOD_THRESHOLD,
            lexical_risk > LEXICAL_THRESHOLD,
        ]
        .iter()
        .filter(|&&crossed| crossed)
        .count();

        let overall_risk_score = clamp_score(if crossings >= 2 {
            fused + CORROBORATION_BONUS
        } else {
            fused
        });

        let mut warnings = build_warnings(
            &repetition,
            &psychiatric,
            baseline_deviation.as_ref(),
            baseline_update.as_ref(),
        );
        warnings.extend(failures);

        let recommendations = build_recommendations(
            &repetition,
            &psychiatric,
            memory_risk,
            lexical_risk,
            baseline_deviation.as_ref(),
        );

        let assessment = WellnessAssessment {
            id: Uuid::new_v4(),
            patient_id: patient_id.to_string(),
            vocabulary,
            repetition,
            psychiatric,
            memory_risk,
            mood_risk,
            lexical_risk,
            overall_risk_score,
            baseline_deviation,
            baseline_update,
            warnings,
            recommendations,
            confidence: Confidence::from_volume(combined.chars().count(), conversations.len()),
            analysis_date: Utc::now(),
            conversation_count: conversations.len(),
            message_count: messages.len(),
            total_words: crate::text::words(&combined).len(),
        };

        info!(
            patient_id,
            assessment_id = %assessment.id,
            overall = assessment.overall_risk_score,
            memory = assessment.memory_risk,
            mood = assessment.mood_risk,
            lexical = assessment.lexical_risk,
            baseline_version = assessment.baseline_update.as_ref().map(|u| u.version),
            confidence = %assessment.confidence,
            "wellness analysis completed"
        );

        assessment
    }
}

/// Most recent timestamp in the batch, message-level over conversation-level
fn latest_timestamp(conversations: &[ResolvedConversation]) -> Option<DateTime<Utc>> {
    conversations
        .iter()
        .flat_map(|c| {
            c.created_at
                .into_iter()
                .chain(c.messages.iter().filter_map(|m| m.created_at))
        })
        .max()
}

/// Lexical decline scored from significant negative vocabulary z-scores: the
/// worst such z, scaled to [0,100]
fn lexical_decline(report: &DeviationReport) -> f64 {
    report
        .deviations
        .iter()
        .filter(|d| d.metric.starts_with("vocabulary.") && d.is_significant && d.z_score < 0.0)
        .map(|d| (d.z_score.abs() * Z_RISK_SCALE).min(100.0))
        .fold(0.0, f64::max)
}

// ============================================================================
// Warnings and recommendations
// ============================================================================

fn build_warnings(
    repetition: &RepetitionMetrics,
    psychiatric: &PsychiatricMetrics,
    deviation: Option<&DeviationReport>,
    update: Option<&BaselineUpdate>,
) -> Vec<String> {
    let mut warnings = Vec::new();

    if !repetition.very_concerning_phrases.is_empty() {
        warnings.push(format!(
            "Phrases repeated across three or more conversations: {}",
            repetition.very_concerning_phrases.join("; ")
        ));
    }
    if psychiatric.depression_score > MOOD_SCREENING_CUT {
        warnings.push(format!(
            "Depression language score {:.0} exceeds the screening threshold",
            psychiatric.depression_score
        ));
    }
    if psychiatric.anxiety_score > MOOD_SCREENING_CUT {
        warnings.push(format!(
            "Anxiety language score {:.0} exceeds the screening threshold",
            psychiatric.anxiety_score
        ));
    }

    if let Some(report) = deviation {
        if !report.significant_metrics.is_empty() {
            warnings.push(format!(
                "{} metric(s) deviate significantly from this patient's baseline: {}",
                report.significant_metrics.len(),
                report.significant_metrics.join(", ")
            ));
        }
        if report.overall_trend == BaselineTrend::Declining {
            warnings.push("Overall language metrics are trending below baseline".to_string());
        }
    }
    if let Some(update) = update {
        if !update.significant_changes.is_empty() {
            warnings.push(format!(
                "Baseline mean shifted significantly for {} metric(s) after this update",
                update.significant_changes.len()
            ));
        }
    }

    warnings
}

fn build_recommendations(
    repetition: &RepetitionMetrics,
    psychiatric: &PsychiatricMetrics,
    memory_risk: f64,
    lexical_risk: f64,
    deviation: Option<&DeviationReport>,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if !repetition.very_concerning_phrases.is_empty() {
        recommendations.push(Recommendation::new(
            "cognitive",
            Priority::High,
            "Schedule a cognitive evaluation",
            "The same phrases keep surfacing across conversations, a pattern worth clinical review",
        ));
    }
    if memory_risk > MEMORY_THRESHOLD {
        let priority = if memory_risk > 60.0 {
            Priority::High
        } else {
            Priority::Medium
        };
        recommendations.push(Recommendation::new(
            "cognitive",
            priority,
            "Review repeated topics with the care team",
            "Repetition crossed the review threshold; go through the flagged phrases together",
        ));
    }

    if psychiatric.depression_score > MOOD_SCREENING_CUT
        || psychiatric.anxiety_score > MOOD_SCREENING_CUT
    {
        recommendations.push(Recommendation::new(
            "mood",
            Priority::High,
            "Arrange a mood screening",
            "Depression or anxiety language crossed the screening threshold in this batch",
        ));
    }

    if lexical_risk > 0.0 {
        recommendations.push(Recommendation::new(
            "cognitive",
            Priority::Medium,
            "Check in on word-finding and conversation flow",
            "Vocabulary metrics dropped significantly below this patient's own baseline",
        ));
    }
    if deviation.map_or(false, |r| r.overall_trend == BaselineTrend::Declining) {
        recommendations.push(Recommendation::new(
            "monitoring",
            Priority::Medium,
            "Schedule a check-in visit",
            "Language metrics are trending below baseline; a closer look is warranted",
        ));
    }

    if recommendations.is_empty() {
        recommendations.push(Recommendation::continue_monitoring());
    }

    recommendations
}
