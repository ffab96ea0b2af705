//! HTTP surface over the fusion pipeline.
//!
//! Upstream and model outages never surface as 5xx: `assess` and
//! `analyze_and_plan` are infallible, so these routes always answer 200
//! with a possibly degraded body. Countries outside the watchlist are
//! still assessed; adapters that need registry data degrade on their own.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crisiswatch_common::{country_by_name, AiAnalysis, CrisisAssessment, ResponsePlan, WATCHLIST};
use crisiswatch_fusion::FusionContext;

pub type AppState = Arc<FusionContext>;

pub fn build_router(ctx: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/assessment/{country}", get(get_assessment))
        .route("/api/analysis/{country}", get(get_analysis))
        .route("/api/countries", get(list_countries))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx)
}

#[derive(Serialize)]
struct CountryEntry {
    name: &'static str,
    iso3: &'static str,
    region: &'static str,
    population: u64,
}

#[derive(Serialize)]
struct AnalysisResponse {
    analysis: AiAnalysis,
    plan: ResponsePlan,
}

/// Watchlist entries resolve to their canonical display name so aliases and
/// ISO3 codes share one cache entry; anything else passes through as-is.
fn canonical_name(country: &str) -> String {
    country_by_name(country)
        .map(|p| p.name.to_string())
        .unwrap_or_else(|| country.trim().to_string())
}

async fn get_assessment(
    State(ctx): State<AppState>,
    Path(country): Path<String>,
) -> Json<CrisisAssessment> {
    Json(ctx.assess(&canonical_name(&country)).await)
}

async fn get_analysis(
    State(ctx): State<AppState>,
    Path(country): Path<String>,
) -> Json<AnalysisResponse> {
    let (analysis, plan) = ctx.analyze_and_plan(&canonical_name(&country)).await;
    Json(AnalysisResponse { analysis, plan })
}

async fn list_countries() -> Json<Vec<CountryEntry>> {
    Json(
        WATCHLIST
            .iter()
            .map(|c| CountryEntry {
                name: c.name,
                iso3: c.iso3,
                region: c.region,
                population: c.population,
            })
            .collect(),
    )
}

async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use chrono::Utc;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use ai_client::{ChatModel, ChatPrompt};
    use crisiswatch_common::{FusionConfig, RiskLevel, SourceId, SourceSignal};
    use crisiswatch_sources::{FetchOptions, SourceAdapter};

    struct StubAdapter(SourceId);

    #[async_trait]
    impl SourceAdapter for StubAdapter {
        fn source(&self) -> SourceId {
            self.0
        }

        async fn fetch(&self, _country: &str, _opts: &FetchOptions) -> SourceSignal {
            SourceSignal {
                source: self.0,
                available: true,
                risk_level: RiskLevel::Medium,
                score: 40.0,
                confidence: 0.7,
                indicators: vec!["test indicator".to_string()],
                momentum: None,
                observed_at: Utc::now(),
            }
        }
    }

    struct NoChat;

    #[async_trait]
    impl ChatModel for NoChat {
        async fn complete(&self, _prompt: &ChatPrompt) -> Result<String> {
            Err(anyhow!("offline"))
        }
    }

    fn app() -> Router {
        let adapters: Vec<Arc<dyn SourceAdapter>> = SourceId::ALL
            .into_iter()
            .map(|s| Arc::new(StubAdapter(s)) as Arc<dyn SourceAdapter>)
            .collect();
        let ctx =
            FusionContext::new(adapters, Arc::new(NoChat), FusionConfig::default()).unwrap();
        build_router(Arc::new(ctx))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_plain_ok() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn assessment_resolves_aliases_and_returns_json() {
        let response = app()
            .oneshot(
                Request::get("/api/assessment/burma")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["country"], "Myanmar");
        assert_eq!(body["overall_risk"], "medium");
    }

    #[tokio::test]
    async fn unlisted_country_is_still_assessed() {
        let response = app()
            .oneshot(
                Request::get("/api/assessment/atlantis")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["country"], "atlantis");
    }

    #[tokio::test]
    async fn analysis_carries_plan_with_balanced_budget() {
        let response = app()
            .oneshot(
                Request::get("/api/analysis/sudan")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let plan = &body["plan"];
        let total = plan["total_cost"].as_u64().unwrap();
        let phases = &plan["phases"];
        let sum = phases["emergency"]["budget"].as_u64().unwrap()
            + phases["stabilization"]["budget"].as_u64().unwrap()
            + phases["integration"]["budget"].as_u64().unwrap();
        assert_eq!(sum, total);
    }

    #[tokio::test]
    async fn countries_lists_the_watchlist() {
        let response = app()
            .oneshot(Request::get("/api/countries").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), WATCHLIST.len());
    }
}
