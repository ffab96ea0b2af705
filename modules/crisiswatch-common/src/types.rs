use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// --- Risk enums ---

/// Ordered risk scale. `Unknown` is the degraded value and sorts below `Low`
/// so an available-but-contentless signal drags the median down, not up.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// One step up the scale, saturating at `Critical`.
    pub fn step_up(self) -> Self {
        match self {
            RiskLevel::Unknown => RiskLevel::Low,
            RiskLevel::Low => RiskLevel::Medium,
            RiskLevel::Medium => RiskLevel::High,
            RiskLevel::High | RiskLevel::Critical => RiskLevel::Critical,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Unknown => write!(f, "unknown"),
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl std::fmt::Display for DataQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataQuality::Poor => write!(f, "poor"),
            DataQuality::Fair => write!(f, "fair"),
            DataQuality::Good => write!(f, "good"),
            DataQuality::Excellent => write!(f, "excellent"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Deteriorating,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Improving => write!(f, "improving"),
            Trend::Stable => write!(f, "stable"),
            Trend::Deteriorating => write!(f, "deteriorating"),
        }
    }
}

// --- Source identity ---

/// The fixed set of provider families feeding the fusion engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Conflict,
    Economic,
    Climate,
    News,
}

impl SourceId {
    /// Canonical ordering, used for deterministic tie-breaks.
    pub const ALL: [SourceId; 4] = [
        SourceId::Conflict,
        SourceId::Economic,
        SourceId::Climate,
        SourceId::News,
    ];
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceId::Conflict => write!(f, "conflict"),
            SourceId::Economic => write!(f, "economic"),
            SourceId::Climate => write!(f, "climate"),
            SourceId::News => write!(f, "news"),
        }
    }
}

// --- Source signal ---

/// One provider's normalized observation about a country. Produced fresh on
/// every fetch and never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSignal {
    pub source: SourceId,
    pub available: bool,
    pub risk_level: RiskLevel,
    /// 0..100.
    pub score: f64,
    /// 0..1.
    pub confidence: f64,
    pub indicators: Vec<String>,
    /// Provider-native recent change, -1..1. Positive means worsening.
    /// Only used for trend derivation; providers that can't compute one omit it.
    pub momentum: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

impl SourceSignal {
    /// The canonical degraded signal: a remote failure converted into normal data.
    pub fn unavailable(source: SourceId) -> Self {
        Self {
            source,
            available: false,
            risk_level: RiskLevel::Unknown,
            score: 0.0,
            confidence: 0.0,
            indicators: vec![],
            momentum: None,
            observed_at: Utc::now(),
        }
    }
}

// --- Crisis assessment ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplacementEstimate {
    pub level: RiskLevel,
    pub timeline: String,
    pub estimated_people: u64,
    pub primary_causes: Vec<String>,
}

/// The fused per-country risk verdict. Immutable once returned; a later
/// assessment cycle supersedes it rather than mutating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrisisAssessment {
    pub country: String,
    pub generated_at: DateTime<Utc>,
    pub overall_risk: RiskLevel,
    pub confidence: f64,
    pub data_quality: DataQuality,
    pub signals: BTreeMap<SourceId, SourceSignal>,
    pub displacement: DisplacementEstimate,
    pub trend: Trend,
}

// --- AI analysis ---

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DisplacementPrediction {
    pub likelihood: RiskLevel,
    pub timeframe: String,
    pub estimated_affected: u64,
    pub destinations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Recommendations {
    pub immediate: Vec<String>,
    pub short_term: Vec<String>,
    pub long_term: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub responded_models: Vec<String>,
    pub timed_out_models: Vec<String>,
    pub latency_ms: u64,
}

/// Reasoning output over one assessment. When `model_metadata.responded_models`
/// is empty this is the deterministic fallback; the shape is identical either
/// way so consumers never special-case it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub country: String,
    pub risk_assessment: RiskLevel,
    pub confidence: f64,
    pub reasoning: String,
    pub key_findings: Vec<String>,
    pub displacement_prediction: DisplacementPrediction,
    pub recommendations: Recommendations,
    pub model_metadata: ModelMetadata,
}

// --- Response plan ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanPhase {
    pub name: String,
    pub share_pct: u8,
    /// Integer USD.
    pub budget: u64,
    pub activities: Vec<String>,
    pub staff: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanPhases {
    pub emergency: PlanPhase,
    pub stabilization: PlanPhase,
    pub integration: PlanPhase,
}

/// Deterministic expansion of one analysis into a three-phase plan.
/// Phase budgets always sum to `total_cost` exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePlan {
    pub plan_id: String,
    pub country: String,
    pub target_population: u64,
    pub total_cost: u64,
    pub phases: PlanPhases,
    pub cost_per_person: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_ordering_puts_unknown_below_low() {
        assert!(RiskLevel::Unknown < RiskLevel::Low);
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn risk_level_step_up_saturates() {
        assert_eq!(RiskLevel::Unknown.step_up(), RiskLevel::Low);
        assert_eq!(RiskLevel::Low.step_up(), RiskLevel::Medium);
        assert_eq!(RiskLevel::Critical.step_up(), RiskLevel::Critical);
    }

    #[test]
    fn risk_level_serializes_snake_case() {
        let json = serde_json::to_string(&RiskLevel::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }

    #[test]
    fn unavailable_signal_is_fully_degraded() {
        let s = SourceSignal::unavailable(SourceId::Conflict);
        assert!(!s.available);
        assert_eq!(s.risk_level, RiskLevel::Unknown);
        assert_eq!(s.score, 0.0);
        assert_eq!(s.confidence, 0.0);
        assert!(s.indicators.is_empty());
        assert!(s.momentum.is_none());
    }

    #[test]
    fn source_id_all_covers_every_family() {
        assert_eq!(SourceId::ALL.len(), 4);
        let json = serde_json::to_string(&SourceId::Economic).unwrap();
        assert_eq!(json, "\"economic\"");
    }
}
