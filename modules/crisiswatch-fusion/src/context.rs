//! Top-level fusion facade: fan out to source adapters, fuse, cache, and run
//! the model orchestrator. One `FusionContext` is shared across the process.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info};

use ai_client::ChatModel;
use crisiswatch_common::{
    AiAnalysis, CrisisAssessment, CrisisError, FusionConfig, ResponsePlan,
};
use crisiswatch_sources::{FetchOptions, SourceAdapter};

use crate::cache::SingleflightCache;
use crate::engine::fuse;
use crate::orchestrator::ModelOrchestrator;
use crate::planner;

pub struct FusionContext {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    config: FusionConfig,
    assessments: SingleflightCache<CrisisAssessment>,
    orchestrator: ModelOrchestrator,
}

impl FusionContext {
    /// Build the shared context. Configuration is validated here, once, so
    /// every later call can assume a coherent weight table.
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        chat: Arc<dyn ChatModel>,
        config: FusionConfig,
    ) -> Result<Self, CrisisError> {
        config.validate()?;
        let orchestrator =
            ModelOrchestrator::new(chat, config.models.clone(), config.analysis_ttl);
        Ok(Self {
            adapters,
            config,
            assessments: SingleflightCache::new(),
            orchestrator,
        })
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fused assessment for one country. Cached with a singleflight guard, so
    /// a burst of requests for the same country costs one adapter fan-out.
    pub async fn assess(&self, country: &str) -> CrisisAssessment {
        let key = country.to_lowercase();
        self.assessments
            .get_or_compute(&key, self.config.assessment_ttl, || async move {
                self.assess_uncached(country).await
            })
            .await
    }

    async fn assess_uncached(&self, country: &str) -> CrisisAssessment {
        debug!(country, adapters = self.adapters.len(), "Starting adapter fan-out");
        let opts = FetchOptions::default();
        let signals = join_all(
            self.adapters
                .iter()
                .map(|adapter| adapter.fetch(country, &opts)),
        )
        .await;

        let assessment = fuse(country, signals, &self.config);
        info!(
            country,
            risk = %assessment.overall_risk,
            confidence = assessment.confidence,
            quality = %assessment.data_quality,
            "Assessment fused"
        );
        assessment
    }

    /// Assessment plus model analysis plus response plan, the full pipeline
    /// behind the analysis endpoint. Never fails: upstream and model outages
    /// degrade into the assessment and the deterministic fallback analysis.
    pub async fn analyze_and_plan(&self, country: &str) -> (AiAnalysis, ResponsePlan) {
        let assessment = self.assess(country).await;
        let analysis = self.orchestrator.analyze(&assessment).await;
        let plan = planner::generate(&analysis);
        (analysis, plan)
    }
}
