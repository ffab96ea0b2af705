//! Conflict-event adapter against the ACLED read API.
//!
//! Threshold table (per observation window):
//!   intensity = events + 2 × fatalities
//!   ≥ 400 → critical band (75–100, saturating at 1200)
//!   ≥ 120 → high band (50–75)
//!   ≥ 30  → medium band (25–50)
//!   < 30  → low band (0–25)

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use tracing::warn;

use crisiswatch_common::{SourceId, SourceSignal};

use crate::adapter::{banded_score, level_for_score, window_momentum, FetchOptions, SourceAdapter};
use crate::cache::ProviderCache;

const ACLED_API_URL: &str = "https://api.acleddata.com/acled/read";

const INTENSITY_BANDS: [f64; 3] = [30.0, 120.0, 400.0];
const INTENSITY_SATURATION: f64 = 1200.0;

pub struct ConflictAdapter {
    api_key: Option<String>,
    email: Option<String>,
    base_url: String,
    http: reqwest::Client,
    cache: ProviderCache,
}

impl ConflictAdapter {
    pub fn new(
        api_key: Option<String>,
        email: Option<String>,
        cache_ttl: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            api_key,
            email,
            base_url: ACLED_API_URL.to_string(),
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

    async fn fetch_window(&self, country: &str, from_days_ago: u32, to_days_ago: u32) -> Result<Vec<AcledEvent>> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("ACLED_API_KEY not configured"))?;
        let email = self
            .email
            .as_deref()
            .ok_or_else(|| anyhow!("ACLED_EMAIL not configured"))?;

        let now = Utc::now().date_naive();
        let from = now - chrono::Days::new(from_days_ago as u64);
        let to = now - chrono::Days::new(to_days_ago as u64);

        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("key", key),
                ("email", email),
                ("country", country),
                ("event_date", &format!("{from}|{to}")),
                ("event_date_where", "BETWEEN"),
                ("fields", "event_type|fatalities"),
                ("limit", "0"),
            ])
            .send()
            .await
            .context("ACLED request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("ACLED API error ({status}): {body}"));
        }

        let parsed: AcledResponse = response.json().await.context("ACLED payload malformed")?;
        Ok(parsed.data)
    }

    async fn fetch_inner(&self, country: &str, opts: &FetchOptions) -> Result<SourceSignal> {
        let window = opts.window_days;
        let (current, prior) = tokio::join!(
            self.fetch_window(country, window, 0),
            self.fetch_window(country, window * 2, window),
        );
        let current = current?;
        // A missing prior window only costs the momentum, not the signal.
        let prior = prior.unwrap_or_default();
        Ok(signal_from_windows(&current, &prior, Utc::now()))
    }
}

#[async_trait]
impl SourceAdapter for ConflictAdapter {
    fn source(&self) -> SourceId {
        SourceId::Conflict
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

fn intensity(events: &[AcledEvent]) -> f64 {
    let fatalities: u64 = events.iter().map(|e| e.fatalities).sum();
    events.len() as f64 + 2.0 * fatalities as f64
}

/// Pure mapping from two event windows to a normalized signal.
pub(crate) fn signal_from_windows(
    current: &[AcledEvent],
    prior: &[AcledEvent],
    observed_at: DateTime<Utc>,
) -> SourceSignal {
    let score = banded_score(intensity(current), INTENSITY_BANDS, INTENSITY_SATURATION);

    let mut by_type: HashMap<&str, usize> = HashMap::new();
    for event in current {
        *by_type.entry(event.event_type.as_str()).or_default() += 1;
    }
    let mut counts: Vec<(&str, usize)> = by_type.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    let indicators: Vec<String> = counts
        .iter()
        .take(3)
        .map(|(event_type, n)| format!("{event_type}: {n} events"))
        .collect();

    // Larger samples earn more trust, up to a curated-data ceiling.
    let confidence = 0.6 + 0.3 * (current.len().min(50) as f64 / 50.0);

    SourceSignal {
        source: SourceId::Conflict,
        available: true,
        risk_level: level_for_score(score),
        score,
        confidence,
        indicators,
        momentum: window_momentum(intensity(current), intensity(prior)),
        observed_at,
    }
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
struct AcledResponse {
    #[serde(default)]
    data: Vec<AcledEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AcledEvent {
    #[serde(default)]
    pub event_type: String,
    /// ACLED serializes counts as strings in some export paths.
    #[serde(default, deserialize_with = "flexible_u64")]
    pub fatalities: u64,
}

fn flexible_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => Ok(s.trim().parse().unwrap_or(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crisiswatch_common::RiskLevel;

    fn events(spec: &[(&str, u64)]) -> Vec<AcledEvent> {
        spec.iter()
            .map(|(event_type, fatalities)| AcledEvent {
                event_type: event_type.to_string(),
                fatalities: *fatalities,
            })
            .collect()
    }

    #[test]
    fn parses_string_fatalities() {
        let json = r#"{"status":200,"count":2,"data":[
            {"event_type":"Battles","fatalities":"12"},
            {"event_type":"Riots","fatalities":0}
        ]}"#;
        let resp: AcledResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data[0].fatalities, 12);
        assert_eq!(resp.data[1].fatalities, 0);
    }

    #[test]
    fn quiet_country_maps_to_low() {
        let current = events(&[("Protests", 0), ("Protests", 0)]);
        let signal = signal_from_windows(&current, &[], Utc::now());
        assert!(signal.available);
        assert_eq!(signal.risk_level, RiskLevel::Low);
        assert!(signal.score < 25.0);
    }

    #[test]
    fn heavy_conflict_maps_to_critical() {
        let current: Vec<AcledEvent> = (0..100)
            .map(|_| AcledEvent {
                event_type: "Battles".to_string(),
                fatalities: 10,
            })
            .collect();
        let signal = signal_from_windows(&current, &[], Utc::now());
        assert_eq!(signal.risk_level, RiskLevel::Critical);
        assert!(signal.score >= 75.0);
    }

    #[test]
    fn indicators_are_top_event_types_deterministically_ordered() {
        let current = events(&[
            ("Riots", 0),
            ("Battles", 1),
            ("Battles", 2),
            ("Protests", 0),
            ("Riots", 0),
            ("Explosions", 0),
        ]);
        let signal = signal_from_windows(&current, &[], Utc::now());
        assert_eq!(
            signal.indicators,
            vec!["Battles: 2 events", "Riots: 2 events", "Explosions: 1 events"]
        );
    }

    #[test]
    fn momentum_reflects_window_growth() {
        let current = events(&[("Battles", 5), ("Battles", 5)]);
        let prior = events(&[("Battles", 1)]);
        let signal = signal_from_windows(&current, &prior, Utc::now());
        assert!(signal.momentum.unwrap() > 0.0);

        let cooled = signal_from_windows(&prior, &current, Utc::now());
        assert!(cooled.momentum.unwrap() < 0.0);
    }

    #[test]
    fn no_events_in_either_window_means_no_momentum() {
        let signal = signal_from_windows(&[], &[], Utc::now());
        assert!(signal.momentum.is_none());
        assert_eq!(signal.score, 0.0);
    }
}
