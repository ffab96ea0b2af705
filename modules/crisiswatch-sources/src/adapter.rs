use async_trait::async_trait;
use typed_builder::TypedBuilder;

use crisiswatch_common::{RiskLevel, SourceId, SourceSignal};

/// Options for one adapter fetch.
#[derive(Debug, Clone, TypedBuilder)]
pub struct FetchOptions {
    /// Observation window for event-style providers.
    #[builder(default = 30)]
    pub window_days: u32,
    /// Skip the per-provider response cache and hit the upstream.
    #[builder(default = false)]
    pub bypass_cache: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// One provider family normalized behind a common seam.
///
/// `fetch` is infallible by signature: the adapter boundary is where remote
/// failures stop being errors and become normal degraded data.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> SourceId;

    async fn fetch(&self, country: &str, opts: &FetchOptions) -> SourceSignal;
}

/// Standard score bands shared by all adapters once a provider-native
/// intensity has been positioned on the 0-100 scale.
pub(crate) fn level_for_score(score: f64) -> RiskLevel {
    if score >= 75.0 {
        RiskLevel::Critical
    } else if score >= 50.0 {
        RiskLevel::High
    } else if score >= 25.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Position a provider-native intensity inside the 0-100 score space.
///
/// `bands` are the adapter's [medium, high, critical] intensity thresholds;
/// `saturation` is where the critical band tops out at 100. Each band maps
/// linearly onto its 25-point score slice, so the band thresholds land
/// exactly on 25/50/75.
pub(crate) fn banded_score(intensity: f64, bands: [f64; 3], saturation: f64) -> f64 {
    let i = intensity.max(0.0);
    if i >= bands[2] {
        let span = (saturation - bands[2]).max(f64::EPSILON);
        75.0 + 25.0 * ((i - bands[2]) / span).min(1.0)
    } else if i >= bands[1] {
        50.0 + 25.0 * (i - bands[1]) / (bands[2] - bands[1])
    } else if i >= bands[0] {
        25.0 + 25.0 * (i - bands[0]) / (bands[1] - bands[0])
    } else {
        25.0 * i / bands[0].max(f64::EPSILON)
    }
}

/// Signed relative change between two window counts, clamped to -1..1.
pub(crate) fn window_momentum(current: f64, prior: f64) -> Option<f64> {
    if current == 0.0 && prior == 0.0 {
        return None;
    }
    let delta = (current - prior) / prior.max(1.0);
    Some(delta.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_options_defaults() {
        let opts = FetchOptions::default();
        assert_eq!(opts.window_days, 30);
        assert!(!opts.bypass_cache);
    }

    #[test]
    fn band_thresholds_map_to_band_edges() {
        let bands = [30.0, 120.0, 400.0];
        assert_eq!(banded_score(30.0, bands, 1200.0), 25.0);
        assert_eq!(banded_score(120.0, bands, 1200.0), 50.0);
        assert_eq!(banded_score(400.0, bands, 1200.0), 75.0);
    }

    #[test]
    fn banded_score_saturates_at_100() {
        let bands = [30.0, 120.0, 400.0];
        assert_eq!(banded_score(5000.0, bands, 1200.0), 100.0);
        assert_eq!(banded_score(0.0, bands, 1200.0), 0.0);
    }

    #[test]
    fn level_bands_are_inclusive_at_edges() {
        assert_eq!(level_for_score(75.0), RiskLevel::Critical);
        assert_eq!(level_for_score(74.9), RiskLevel::High);
        assert_eq!(level_for_score(50.0), RiskLevel::High);
        assert_eq!(level_for_score(25.0), RiskLevel::Medium);
        assert_eq!(level_for_score(24.9), RiskLevel::Low);
    }

    #[test]
    fn momentum_clamps_and_handles_empty_windows() {
        assert_eq!(window_momentum(0.0, 0.0), None);
        assert_eq!(window_momentum(20.0, 10.0), Some(1.0));
        assert_eq!(window_momentum(5.0, 10.0), Some(-0.5));
        assert_eq!(window_momentum(0.0, 10.0), Some(-1.0));
    }
}
