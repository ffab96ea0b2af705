pub mod config;
pub mod countries;
pub mod error;
pub mod types;

pub use config::{Config, FusionConfig, ModelSpec, SourceWeights};
pub use countries::{country_by_name, CountryProfile, WATCHLIST};
pub use error::CrisisError;
pub use types::{
    AiAnalysis, CrisisAssessment, DataQuality, DisplacementEstimate, DisplacementPrediction,
    ModelMetadata, PlanPhase, PlanPhases, Recommendations, ResponsePlan, RiskLevel, SourceId,
    SourceSignal, Trend,
};
