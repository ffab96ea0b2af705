//! Economic-stress adapter against the World Bank indicators API.
//!
//! Stress table (each component clamped to 0–100, score = mean of the
//! components that have data):
//!   inflation (FP.CPI.TOTL.ZG):     stress = inflation × 2.5
//!   GDP growth (NY.GDP.MKTP.KD.ZG): stress = (2 − growth) × 12.5
//!   unemployment (SL.UEM.TOTL.ZS):  stress = unemployment × 3
//!
//! The API is ISO3-keyed, so countries outside the watchlist degrade to
//! unavailable rather than guessing a code.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crisiswatch_common::{country_by_name, SourceId, SourceSignal};

use crate::adapter::{level_for_score, FetchOptions, SourceAdapter};
use crate::cache::ProviderCache;

const WORLD_BANK_API_URL: &str = "https://api.worldbank.org/v2";

const INFLATION: &str = "FP.CPI.TOTL.ZG";
const GDP_GROWTH: &str = "NY.GDP.MKTP.KD.ZG";
const UNEMPLOYMENT: &str = "SL.UEM.TOTL.ZS";

pub struct EconomicAdapter {
    base_url: String,
    http: reqwest::Client,
    cache: ProviderCache,
}

impl EconomicAdapter {
    pub fn new(cache_ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            base_url: WORLD_BANK_API_URL.to_string(),
            http: reqwest::Client::builder()
                .timeout(fetch_timeout)
                .build()
                .expect("failed to build HTTP client"),
            cache: ProviderCache::new(cache_ttl),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn fetch_indicator(&self, iso3: &str, code: &str) -> Result<Vec<WbPoint>> {
        let url = format!("{}/country/{}/indicator/{}", self.base_url, iso3, code);
        let response = self
            .http
            .get(&url)
            .query(&[("format", "json"), ("per_page", "4")])
            .send()
            .await
            .context("World Bank request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            bail!("World Bank API error ({status})");
        }

        // Payload shape is [metadata, entries]; error payloads are a
        // one-element array and fail the tuple parse, which is what we want.
        let (_meta, points): (serde_json::Value, Option<Vec<WbPoint>>) = response
            .json()
            .await
            .context("World Bank payload malformed")?;
        Ok(points.unwrap_or_default())
    }

    async fn fetch_inner(&self, country: &str) -> Result<SourceSignal> {
        let profile = country_by_name(country)
            .ok_or_else(|| anyhow!("no ISO3 code for {country}, skipping World Bank"))?;

        let (inflation, gdp, unemployment) = tokio::join!(
            self.fetch_indicator(profile.iso3, INFLATION),
            self.fetch_indicator(profile.iso3, GDP_GROWTH),
            self.fetch_indicator(profile.iso3, UNEMPLOYMENT),
        );
        // Any single indicator may be down or empty; the mapping works off
        // whichever components are present.
        let signal = signal_from_indicators(
            &inflation.unwrap_or_default(),
            &gdp.unwrap_or_default(),
            &unemployment.unwrap_or_default(),
            Utc::now(),
        )?;
        Ok(signal)
    }
}

#[async_trait]
impl SourceAdapter for EconomicAdapter {
    fn source(&self) -> SourceId {
        SourceId::Economic
    }

    async fn fetch(&self, country: &str, opts: &FetchOptions) -> SourceSignal {
        if !opts.bypass_cache {
            if let Some(signal) = self.cache.get(country).await {
                return signal;
            }
        }
        match self.fetch_inner(country).await {
            Ok(signal) => {
                self.cache.put(country, signal.clone()).await;
                signal
            }
            Err(e) => {
                warn!(country, source = %self.source(), error = %e, "Provider fetch failed, marking unavailable");
                SourceSignal::unavailable(self.source())
            }
        }
    }
}

/// Latest and previous observed values, newest first in the API response.
fn latest_two(points: &[WbPoint]) -> (Option<(f64, &str)>, Option<f64>) {
    let mut present = points.iter().filter_map(|p| p.value.map(|v| (v, p.date.as_str())));
    let latest = present.next();
    let previous = present.next().map(|(v, _)| v);
    (latest, previous)
}

fn inflation_stress(v: f64) -> f64 {
    (v * 2.5).clamp(0.0, 100.0)
}

fn gdp_stress(v: f64) -> f64 {
    ((2.0 - v) * 12.5).clamp(0.0, 100.0)
}

fn unemployment_stress(v: f64) -> f64 {
    (v * 3.0).clamp(0.0, 100.0)
}

/// Pure mapping from the three indicator series to a normalized signal.
/// Errors only when no indicator has any data at all.
pub(crate) fn signal_from_indicators(
    inflation: &[WbPoint],
    gdp: &[WbPoint],
    unemployment: &[WbPoint],
    observed_at: DateTime<Utc>,
) -> Result<SourceSignal> {
    let (infl_latest, infl_prev) = latest_two(inflation);
    let (gdp_latest, gdp_prev) = latest_two(gdp);
    let (unemp_latest, _) = latest_two(unemployment);

    let mut components: Vec<f64> = Vec::new();
    let mut indicators: Vec<String> = Vec::new();

    if let Some((v, year)) = infl_latest {
        components.push(inflation_stress(v));
        indicators.push(format!("Inflation {v:.1}% ({year})"));
    }
    if let Some((v, year)) = gdp_latest {
        components.push(gdp_stress(v));
        indicators.push(format!("GDP growth {v:.1}% ({year})"));
    }
    if let Some((v, year)) = unemp_latest {
        components.push(unemployment_stress(v));
        indicators.push(format!("Unemployment {v:.1}% ({year})"));
    }

    if components.is_empty() {
        bail!("no indicator data");
    }

    let score = components.iter().sum::<f64>() / components.len() as f64;

    // Year-over-year stress shift. Annual series, so this is slow-moving.
    let momentum = match (infl_latest, infl_prev, gdp_latest, gdp_prev) {
        (Some((i1, _)), Some(i0), Some((g1, _)), Some(g0)) => {
            let delta = (inflation_stress(i1) - inflation_stress(i0)
                + gdp_stress(g1) - gdp_stress(g0))
                / 2.0;
            Some((delta / 50.0).clamp(-1.0, 1.0))
        }
        (Some((i1, _)), Some(i0), _, _) => {
            Some(((inflation_stress(i1) - inflation_stress(i0)) / 50.0).clamp(-1.0, 1.0))
        }
        _ => None,
    };

    // Annual data lags reality, so trust tops out below the event providers.
    let confidence = 0.45 + 0.1 * components.len() as f64;

    Ok(SourceSignal {
        source: SourceId::Economic,
        available: true,
        risk_level: level_for_score(score),
        score,
        confidence,
        indicators,
        momentum,
        observed_at,
    })
}

// --- Wire types ---

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WbPoint {
    #[serde(default)]
    pub date: String,
    pub value: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crisiswatch_common::RiskLevel;

    fn series(points: &[(&str, Option<f64>)]) -> Vec<WbPoint> {
        points
            .iter()
            .map(|(date, value)| WbPoint {
                date: date.to_string(),
                value: *value,
            })
            .collect()
    }

    #[test]
    fn parses_world_bank_payload_shape() {
        let json = r#"[
            {"page":1,"pages":1,"per_page":4,"total":2},
            [{"date":"2025","value":63.3},{"date":"2024","value":null}]
        ]"#;
        let (_meta, points): (serde_json::Value, Option<Vec<WbPoint>>) =
            serde_json::from_str(json).unwrap();
        let points = points.unwrap();
        assert_eq!(points[0].value, Some(63.3));
        assert!(points[1].value.is_none());
    }

    #[test]
    fn hyperinflation_and_collapse_map_high() {
        let signal = signal_from_indicators(
            &series(&[("2025", Some(80.0)), ("2024", Some(60.0))]),
            &series(&[("2025", Some(-6.0)), ("2024", Some(-2.0))]),
            &series(&[("2025", Some(25.0))]),
            Utc::now(),
        )
        .unwrap();
        assert!(signal.score >= 75.0, "score was {}", signal.score);
        assert_eq!(signal.risk_level, RiskLevel::Critical);
        assert!(signal.momentum.unwrap() > 0.0);
        assert_eq!(signal.indicators.len(), 3);
    }

    #[test]
    fn healthy_economy_maps_low() {
        let signal = signal_from_indicators(
            &series(&[("2025", Some(2.1))]),
            &series(&[("2025", Some(3.0))]),
            &series(&[("2025", Some(4.0))]),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(signal.risk_level, RiskLevel::Low);
    }

    #[test]
    fn missing_components_are_skipped_not_fatal() {
        let signal = signal_from_indicators(
            &series(&[("2025", Some(12.0))]),
            &[],
            &series(&[("2025", None)]),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(signal.indicators.len(), 1);
        assert!(signal.momentum.is_none());
        assert!(signal.confidence < 0.6);
    }

    #[test]
    fn no_data_at_all_is_an_error() {
        assert!(signal_from_indicators(&[], &[], &[], Utc::now()).is_err());
    }
}
