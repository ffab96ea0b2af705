//! Climate/hazard adapter against the ReliefWeb disasters API.
//!
//! Threshold table (per observation window, severity-weighted):
//!   type weight: drought/famine 3.0; earthquake/cyclone/tsunami 2.5;
//!                epidemic/flood 2.0; anything else 1.0
//!   ongoing or alert status multiplies the weight by 1.5
//!   weighted sum ≥ 12 → critical band (75–100, saturating at 30)
//!                ≥ 6  → high band (50–75)
//!                ≥ 2  → medium band (25–50)
//!                < 2  → low band (0–25)

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crisiswatch_common::{SourceId, SourceSignal};

use crate::adapter::{banded_score, level_for_score, window_momentum, FetchOptions, SourceAdapter};
use crate::cache::ProviderCache;

const RELIEFWEB_API_URL: &str = "https://api.reliefweb.int/v1/disasters";
const APP_NAME: &str = "crisiswatch";

const SEVERITY_BANDS: [f64; 3] = [2.0, 6.0, 12.0];
const SEVERITY_SATURATION: f64 = 30.0;

pub struct ClimateAdapter {
    base_url: String,
    http: reqwest::Client,
    cache: ProviderCache,
}

impl ClimateAdapter {
    pub fn new(cache_ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            base_url: RELIEFWEB_API_URL.to_string(),
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

    async fn fetch_inner(&self, country: &str, opts: &FetchOptions) -> Result<SourceSignal> {
        // One call covering both windows; partitioned locally for momentum.
        let from = Utc::now() - chrono::Duration::days(opts.window_days as i64 * 2);
        let body = json!({
            "appname": APP_NAME,
            "limit": 100,
            "profile": "list",
            "filter": {
                "operator": "AND",
                "conditions": [
                    {"field": "country.name", "value": country},
                    {"field": "date.created", "value": {"from": from.to_rfc3339()}}
                ]
            },
            "fields": {"include": ["name", "status", "type.name", "date.created"]}
        });

        let response = self
            .http
            .post(&self.base_url)
            .json(&body)
            .send()
            .await
            .context("ReliefWeb request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            bail!("ReliefWeb API error ({status}): {text}");
        }

        let parsed: ReliefWebResponse = response
            .json()
            .await
            .context("ReliefWeb payload malformed")?;
        let disasters: Vec<Disaster> = parsed.data.into_iter().map(|e| e.fields).collect();
        Ok(signal_from_disasters(&disasters, opts.window_days, Utc::now()))
    }
}

#[async_trait]
impl SourceAdapter for ClimateAdapter {
    fn source(&self) -> SourceId {
        SourceId::Climate
    }

    async fn fetch(&self, country: &str, opts: &FetchOptions) -> SourceSignal {
        if !opts.bypass_cache {
            if let Some(signal) = self.cache.get(country).await {
                return signal;
            }
        }
        match self.fetch_inner(country, opts).await {
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

fn type_weight(type_name: &str) -> f64 {
    let t = type_name.to_lowercase();
    if t.contains("drought") || t.contains("famine") {
        3.0
    } else if t.contains("earthquake") || t.contains("cyclone") || t.contains("tsunami") {
        2.5
    } else if t.contains("epidemic") || t.contains("flood") {
        2.0
    } else {
        1.0
    }
}

fn disaster_weight(disaster: &Disaster) -> f64 {
    let base = disaster
        .types
        .iter()
        .map(|t| type_weight(&t.name))
        .fold(0.0, f64::max)
        .max(1.0);
    if disaster.is_active() {
        base * 1.5
    } else {
        base
    }
}

fn weighted_sum(disasters: &[&Disaster]) -> f64 {
    disasters.iter().map(|d| disaster_weight(d)).sum()
}

/// Pure mapping from a two-window disaster list to a normalized signal.
pub(crate) fn signal_from_disasters(
    disasters: &[Disaster],
    window_days: u32,
    observed_at: DateTime<Utc>,
) -> SourceSignal {
    let cutoff = observed_at - chrono::Duration::days(window_days as i64);
    let (current, prior): (Vec<&Disaster>, Vec<&Disaster>) = disasters
        .iter()
        .partition(|d| d.created().map(|c| c >= cutoff).unwrap_or(true));

    let current_weight = weighted_sum(&current);
    let score = banded_score(current_weight, SEVERITY_BANDS, SEVERITY_SATURATION);

    let mut ranked: Vec<&Disaster> = current.clone();
    ranked.sort_by(|a, b| {
        disaster_weight(b)
            .partial_cmp(&disaster_weight(a))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.name.cmp(&b.name))
    });
    let indicators: Vec<String> = ranked
        .iter()
        .take(3)
        .map(|d| {
            if d.is_active() {
                format!("{} (ongoing)", d.name)
            } else {
                d.name.clone()
            }
        })
        .collect();

    SourceSignal {
        source: SourceId::Climate,
        available: true,
        risk_level: level_for_score(score),
        score,
        confidence: 0.6 + 0.05 * current.len().min(6) as f64,
        indicators,
        momentum: window_momentum(current_weight, weighted_sum(&prior)),
        observed_at,
    }
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
struct ReliefWebResponse {
    #[serde(default)]
    data: Vec<ReliefWebEntry>,
}

#[derive(Debug, Deserialize)]
struct ReliefWebEntry {
    fields: Disaster,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Disaster {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "type")]
    pub types: Vec<DisasterType>,
    #[serde(default)]
    pub date: Option<DisasterDate>,
}

impl Disaster {
    fn is_active(&self) -> bool {
        matches!(self.status.as_str(), "ongoing" | "alert" | "current")
    }

    fn created(&self) -> Option<DateTime<Utc>> {
        self.date.as_ref().and_then(|d| d.created)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DisasterType {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DisasterDate {
    pub created: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crisiswatch_common::RiskLevel;

    fn disaster(name: &str, type_name: &str, status: &str, days_ago: i64) -> Disaster {
        Disaster {
            name: name.to_string(),
            status: status.to_string(),
            types: vec![DisasterType {
                name: type_name.to_string(),
            }],
            date: Some(DisasterDate {
                created: Some(Utc::now() - chrono::Duration::days(days_ago)),
            }),
        }
    }

    #[test]
    fn parses_reliefweb_payload_shape() {
        let json = r#"{"data":[{"id":"1","fields":{
            "name":"Sudan: Floods - Aug 2026",
            "status":"ongoing",
            "type":[{"name":"Flash Flood"}],
            "date":{"created":"2026-08-01T00:00:00+00:00"}
        }}]}"#;
        let resp: ReliefWebResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data[0].fields.types[0].name, "Flash Flood");
        assert!(resp.data[0].fields.is_active());
    }

    #[test]
    fn no_disasters_maps_to_low() {
        let signal = signal_from_disasters(&[], 30, Utc::now());
        assert!(signal.available);
        assert_eq!(signal.risk_level, RiskLevel::Low);
        assert_eq!(signal.score, 0.0);
        assert!(signal.momentum.is_none());
    }

    #[test]
    fn stacked_ongoing_disasters_map_high() {
        let disasters = vec![
            disaster("Drought 2026", "Drought", "ongoing", 5),
            disaster("Floods Aug 2026", "Flash Flood", "ongoing", 10),
            disaster("Cholera outbreak", "Epidemic", "ongoing", 2),
        ];
        // 3×1.5 + 2×1.5 + 2×1.5 = 10.5 → high band
        let signal = signal_from_disasters(&disasters, 30, Utc::now());
        assert_eq!(signal.risk_level, RiskLevel::High);
        assert_eq!(signal.indicators[0], "Drought 2026 (ongoing)");
    }

    #[test]
    fn prior_window_drives_momentum_sign() {
        let disasters = vec![
            disaster("Old flood", "Flood", "past", 45),
            disaster("Old drought", "Drought", "past", 50),
        ];
        let signal = signal_from_disasters(&disasters, 30, Utc::now());
        // Everything landed in the prior window: cooling.
        assert!(signal.momentum.unwrap() < 0.0);
        assert_eq!(signal.score, 0.0);
    }

    #[test]
    fn undated_disasters_count_as_current() {
        let mut d = disaster("Mystery event", "Other", "alert", 0);
        d.date = None;
        let signal = signal_from_disasters(&[d], 30, Utc::now());
        assert!(signal.score > 0.0);
    }
}
