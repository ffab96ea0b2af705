//! News-sentiment adapter against the GDELT doc API.
//!
//! Threshold table (average tone of crisis-query coverage, sign-inverted
//! since GDELT tone is negative for grim coverage):
//!   −tone ≥ 6.0 → critical band (75–100, saturating at 10)
//!   −tone ≥ 3.5 → high band (50–75)
//!   −tone ≥ 1.5 → medium band (25–50)
//!   −tone < 1.5 → low band (0–25)
//! Confidence scales with article volume; momentum is the tone shift
//! between the first and second half of the window.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crisiswatch_common::{SourceId, SourceSignal};

use crate::adapter::{banded_score, level_for_score, FetchOptions, SourceAdapter};
use crate::cache::ProviderCache;

const GDELT_API_URL: &str = "https://api.gdeltproject.org/api/v2/doc/doc";

const TONE_BANDS: [f64; 3] = [1.5, 3.5, 6.0];
const TONE_SATURATION: f64 = 10.0;

pub struct NewsAdapter {
    base_url: String,
    http: reqwest::Client,
    cache: ProviderCache,
}

impl NewsAdapter {
    pub fn new(cache_ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            base_url: GDELT_API_URL.to_string(),
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

    fn crisis_query(country: &str) -> String {
        format!("\"{country}\" (crisis OR humanitarian OR displacement OR violence)")
    }

    async fn fetch_mode<T: serde::de::DeserializeOwned>(
        &self,
        country: &str,
        mode: &str,
        window_days: u32,
    ) -> Result<T> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("query", Self::crisis_query(country).as_str()),
                ("mode", mode),
                ("format", "json"),
                ("timespan", &format!("{window_days}d")),
            ])
            .send()
            .await
            .context("GDELT request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            bail!("GDELT API error ({status})");
        }
        response.json().await.context("GDELT payload malformed")
    }

    async fn fetch_inner(&self, country: &str, opts: &FetchOptions) -> Result<SourceSignal> {
        let (tonechart, timeline) = tokio::join!(
            self.fetch_mode::<ToneChartResponse>(country, "tonechart", opts.window_days),
            self.fetch_mode::<TimelineResponse>(country, "timelinetone", opts.window_days),
        );
        let tonechart = tonechart?;
        // Momentum is optional; a failed timeline call only costs the trend input.
        let points: Vec<TonePoint> = timeline
            .map(|t| t.timeline.into_iter().flat_map(|s| s.data).collect())
            .unwrap_or_default();
        signal_from_tone(&tonechart.tonechart, &points, Utc::now())
    }
}

#[async_trait]
impl SourceAdapter for NewsAdapter {
    fn source(&self) -> SourceId {
        SourceId::News
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

/// Pure mapping from tone histogram + tone timeline to a normalized signal.
/// Errors when the histogram is empty (no coverage is indistinguishable
/// from a provider-side query failure).
pub(crate) fn signal_from_tone(
    tonechart: &[ToneBin],
    timeline: &[TonePoint],
    observed_at: DateTime<Utc>,
) -> Result<SourceSignal> {
    let volume: u64 = tonechart.iter().map(|b| b.count).sum();
    if volume == 0 {
        bail!("no articles matched the crisis query");
    }

    let avg_tone = tonechart
        .iter()
        .map(|b| b.bin as f64 * b.count as f64)
        .sum::<f64>()
        / volume as f64;

    let score = banded_score(-avg_tone, TONE_BANDS, TONE_SATURATION);

    let momentum = if timeline.len() >= 4 {
        let mid = timeline.len() / 2;
        let half_avg = |points: &[TonePoint]| {
            points.iter().map(|p| p.value).sum::<f64>() / points.len() as f64
        };
        let shift = half_avg(&timeline[..mid]) - half_avg(&timeline[mid..]);
        Some((shift / 3.0).clamp(-1.0, 1.0))
    } else {
        None
    };

    Ok(SourceSignal {
        source: SourceId::News,
        available: true,
        risk_level: level_for_score(score),
        score,
        confidence: 0.4 + 0.4 * (volume.min(100) as f64 / 100.0),
        indicators: vec![format!("{volume} crisis articles, avg tone {avg_tone:.1}")],
        momentum,
        observed_at,
    })
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
struct ToneChartResponse {
    #[serde(default)]
    tonechart: Vec<ToneBin>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ToneBin {
    pub bin: i32,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Deserialize)]
struct TimelineResponse {
    #[serde(default)]
    timeline: Vec<TimelineSeries>,
}

#[derive(Debug, Deserialize)]
struct TimelineSeries {
    #[serde(default)]
    data: Vec<TonePoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TonePoint {
    #[serde(default)]
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crisiswatch_common::RiskLevel;

    #[test]
    fn parses_gdelt_payload_shapes() {
        let json = r#"{"tonechart":[{"bin":-8,"count":12},{"bin":-2,"count":3}]}"#;
        let resp: ToneChartResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.tonechart.len(), 2);

        let json = r#"{"timeline":[{"series":"Average Tone","data":[{"date":"20260801T000000Z","value":-4.5}]}]}"#;
        let resp: TimelineResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.timeline[0].data[0].value, -4.5);
    }

    #[test]
    fn grim_coverage_maps_critical() {
        let bins = vec![ToneBin { bin: -8, count: 90 }, ToneBin { bin: -4, count: 10 }];
        let signal = signal_from_tone(&bins, &[], Utc::now()).unwrap();
        // avg tone -7.6 → deep in the critical band
        assert_eq!(signal.risk_level, RiskLevel::Critical);
        assert!(signal.confidence > 0.7);
        assert!(signal.momentum.is_none());
    }

    #[test]
    fn neutral_coverage_maps_low() {
        let bins = vec![ToneBin { bin: 0, count: 20 }, ToneBin { bin: -1, count: 10 }];
        let signal = signal_from_tone(&bins, &[], Utc::now()).unwrap();
        assert_eq!(signal.risk_level, RiskLevel::Low);
    }

    #[test]
    fn tone_collapse_gives_positive_momentum() {
        let bins = vec![ToneBin { bin: -5, count: 40 }];
        let timeline: Vec<TonePoint> = [-2.0, -2.5, -6.0, -7.0]
            .iter()
            .map(|v| TonePoint { value: *v })
            .collect();
        let signal = signal_from_tone(&bins, &timeline, Utc::now()).unwrap();
        assert!(signal.momentum.unwrap() > 0.0);
    }

    #[test]
    fn empty_histogram_is_an_error() {
        assert!(signal_from_tone(&[], &[], Utc::now()).is_err());
    }
}
