//! Model orchestration: fan out to K reasoning models, synthesize whatever
//! subset completes, and fall back deterministically when nothing does.
//!
//! Every per-model failure class (timeout, transport error, unparseable
//! output) lands in the same degraded path and is recorded in
//! `model_metadata.timed_out_models`. The orchestrator itself never fails.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use ai_client::{extract_json_block, truncate_to_char_boundary, ChatModel, ChatPrompt};
use crisiswatch_common::{
    AiAnalysis, CrisisAssessment, DisplacementPrediction, ModelMetadata, ModelSpec,
    Recommendations, RiskLevel,
};

use crate::cache::SingleflightCache;

/// Ceiling on a model-supplied displacement estimate, well above any
/// watchlist country's population. Applied at parse time so downstream
/// arithmetic never sees an absurd figure.
const MAX_ESTIMATED_AFFECTED: u64 = 100_000_000;

/// Byte bound on the assessment JSON embedded in the user prompt.
const ASSESSMENT_JSON_LIMIT: usize = 16 * 1024;

/// The structured block a reasoning model is asked to produce. The schema is
/// generated from this type and embedded in the system prompt.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ModelVerdict {
    pub risk_assessment: RiskLevel,
    pub confidence: f64,
    pub reasoning: String,
    pub key_findings: Vec<String>,
    pub displacement_prediction: DisplacementPrediction,
    pub recommendations: Recommendations,
}

/// Result of one model call: the verdict, or which failure class ate it.
enum Outcome {
    Parsed(String, ModelVerdict),
    Failed(String),
}

pub struct ModelOrchestrator {
    chat: Arc<dyn ChatModel>,
    models: Vec<ModelSpec>,
    analysis_ttl: Duration,
    cache: SingleflightCache<AiAnalysis>,
}

impl ModelOrchestrator {
    pub fn new(chat: Arc<dyn ChatModel>, models: Vec<ModelSpec>, analysis_ttl: Duration) -> Self {
        Self {
            chat,
            models,
            analysis_ttl,
            cache: SingleflightCache::new(),
        }
    }

    /// Analyze one assessment. Infallible: zero model successes produce the
    /// deterministic fallback, shaped identically to a model-backed analysis.
    /// Successful analyses are cached by assessment digest; fallbacks are
    /// not, so a model outage isn't pinned for a TTL.
    pub async fn analyze(&self, assessment: &CrisisAssessment) -> AiAnalysis {
        let key = assessment_digest(assessment);
        let ttl = self.analysis_ttl;
        self.cache
            .get_or_compute_with(&key, || async move {
                let analysis = self.run_models(assessment).await;
                let store = if analysis.model_metadata.responded_models.is_empty() {
                    None
                } else {
                    Some(ttl)
                };
                (analysis, store)
            })
            .await
    }

    async fn run_models(&self, assessment: &CrisisAssessment) -> AiAnalysis {
        let start = Instant::now();
        let outcomes = join_all(
            self.models
                .iter()
                .map(|spec| self.call_model(spec, assessment)),
        )
        .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let mut responded = Vec::new();
        let mut timed_out = Vec::new();
        let mut best: Option<ModelVerdict> = None;
        // Outcomes arrive in priority order; the first parsed verdict wins.
        for outcome in outcomes {
            match outcome {
                Outcome::Parsed(name, verdict) => {
                    if best.is_none() {
                        best = Some(verdict);
                    }
                    responded.push(name);
                }
                Outcome::Failed(name) => timed_out.push(name),
            }
        }

        info!(
            country = assessment.country.as_str(),
            responded = responded.len(),
            failed = timed_out.len(),
            latency_ms,
            "Model fan-out settled"
        );

        match best {
            Some(verdict) => AiAnalysis {
                country: assessment.country.clone(),
                risk_assessment: verdict.risk_assessment,
                confidence: verdict.confidence,
                reasoning: verdict.reasoning,
                key_findings: verdict.key_findings,
                displacement_prediction: verdict.displacement_prediction,
                recommendations: verdict.recommendations,
                model_metadata: ModelMetadata {
                    responded_models: responded,
                    timed_out_models: timed_out,
                    latency_ms,
                },
            },
            None => fallback_analysis(assessment, timed_out, latency_ms),
        }
    }

    /// One model call: prompt, independent timeout, defensive parse. Returns
    /// `Failed` for every non-success; nothing here can abort a sibling.
    async fn call_model(&self, spec: &ModelSpec, assessment: &CrisisAssessment) -> Outcome {
        let prompt = build_prompt(&spec.name, assessment);
        match tokio::time::timeout(spec.timeout, self.chat.complete(&prompt)).await {
            Ok(Ok(text)) => match parse_verdict(&text) {
                Some(verdict) => {
                    debug!(model = spec.name.as_str(), "Model responded with parseable verdict");
                    Outcome::Parsed(spec.name.clone(), verdict)
                }
                None => {
                    warn!(model = spec.name.as_str(), "Model response had no parseable verdict");
                    Outcome::Failed(spec.name.clone())
                }
            },
            Ok(Err(e)) => {
                warn!(model = spec.name.as_str(), error = %e, "Model call failed");
                Outcome::Failed(spec.name.clone())
            }
            Err(_) => {
                warn!(
                    model = spec.name.as_str(),
                    timeout_ms = spec.timeout.as_millis() as u64,
                    "Model call timed out"
                );
                Outcome::Failed(spec.name.clone())
            }
        }
    }
}

fn build_prompt(model: &str, assessment: &CrisisAssessment) -> ChatPrompt {
    let schema = schemars::schema_for!(ModelVerdict);
    let schema_json = serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string());
    let assessment_json =
        serde_json::to_string_pretty(assessment).unwrap_or_else(|_| "{}".to_string());
    let assessment_json = truncate_to_char_boundary(&assessment_json, ASSESSMENT_JSON_LIMIT);

    let system = format!(
        "You are a humanitarian crisis analyst. You will receive a fused \
         multi-source risk assessment for one country. Reply with a single \
         JSON object matching this schema, and nothing else:\n\n{schema_json}"
    );
    let user = format!(
        "Assess the humanitarian crisis risk for {}.\n\nFused assessment:\n{assessment_json}",
        assessment.country
    );

    ChatPrompt::new(model)
        .system(system)
        .user(user)
        .max_tokens(2048)
        .temperature(0.2)
}

/// Defensive parse of free model text into a verdict. Numeric fields are
/// clamped to their legal ranges here so nothing downstream has to.
fn parse_verdict(text: &str) -> Option<ModelVerdict> {
    let block = extract_json_block(text)?;
    let mut verdict: ModelVerdict = serde_json::from_str(block).ok()?;
    verdict.confidence = verdict.confidence.clamp(0.0, 1.0);
    verdict.displacement_prediction.estimated_affected = verdict
        .displacement_prediction
        .estimated_affected
        .min(MAX_ESTIMATED_AFFECTED);
    Some(verdict)
}

/// Deterministic analysis built only from assessment fields. No free text
/// generation; confidence is capped strictly below the assessment's own to
/// signal degraded provenance.
fn fallback_analysis(
    assessment: &CrisisAssessment,
    timed_out: Vec<String>,
    latency_ms: u64,
) -> AiAnalysis {
    let available = assessment.signals.values().filter(|s| s.available).count();
    let reasoning = format!(
        "Automated synthesis for {}: overall risk is {} with {} data quality \
         ({available}/{} sources reporting, trend {}). No reasoning model \
         responded within its deadline; this analysis is derived directly \
         from the fused assessment.",
        assessment.country,
        assessment.overall_risk,
        assessment.data_quality,
        assessment.signals.len(),
        assessment.trend,
    );

    let key_findings: Vec<String> = assessment
        .signals
        .values()
        .filter(|s| s.available)
        .flat_map(|s| s.indicators.first().cloned())
        .take(4)
        .collect();

    AiAnalysis {
        country: assessment.country.clone(),
        risk_assessment: assessment.overall_risk,
        confidence: assessment.confidence * 0.8,
        reasoning,
        key_findings,
        displacement_prediction: DisplacementPrediction {
            likelihood: assessment.displacement.level,
            timeframe: assessment.displacement.timeline.clone(),
            estimated_affected: assessment.displacement.estimated_people,
            destinations: vec!["Neighboring countries".to_string()],
        },
        recommendations: fallback_recommendations(assessment.overall_risk),
        model_metadata: ModelMetadata {
            responded_models: vec![],
            timed_out_models: timed_out,
            latency_ms,
        },
    }
}

fn fallback_recommendations(risk: RiskLevel) -> Recommendations {
    match risk {
        RiskLevel::Critical | RiskLevel::High => Recommendations {
            immediate: vec![
                "Activate emergency coordination with field partners".to_string(),
                "Pre-position relief supplies near likely displacement corridors".to_string(),
            ],
            short_term: vec![
                "Stand up registration and protection screening capacity".to_string(),
                "Secure funding commitments for a six-month response".to_string(),
            ],
            long_term: vec![
                "Plan durable shelter and livelihood programming".to_string(),
            ],
        },
        RiskLevel::Medium => Recommendations {
            immediate: vec!["Increase monitoring cadence for all sources".to_string()],
            short_term: vec!["Draft contingency plans with regional partners".to_string()],
            long_term: vec!["Invest in local resilience programming".to_string()],
        },
        RiskLevel::Low | RiskLevel::Unknown => Recommendations {
            immediate: vec!["Maintain routine monitoring".to_string()],
            short_term: vec!["Re-verify data source coverage".to_string()],
            long_term: vec!["Review assessment thresholds quarterly".to_string()],
        },
    }
}

/// Digest over the material assessment fields. Confidence is rounded to two
/// decimals so jitter in source confidence doesn't defeat the cache.
pub(crate) fn assessment_digest(assessment: &CrisisAssessment) -> String {
    let material = format!(
        "{}|{}|{:.2}|{}",
        assessment.country.to_lowercase(),
        assessment.overall_risk,
        assessment.confidence,
        assessment.data_quality,
    );
    let mut hasher = Sha256::new();
    hasher.update(material.as_bytes());
    hex::encode(hasher.finalize())
}
