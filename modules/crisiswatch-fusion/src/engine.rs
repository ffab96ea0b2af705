//! Risk fusion: combining per-source signals into one assessment.
//!
//! `fuse` is pure, infallible, and order-independent. Zero available sources
//! is a defined degraded state (overall risk unknown), not an error.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crisiswatch_common::{
    CrisisAssessment, DataQuality, DisplacementEstimate, FusionConfig, RiskLevel, SourceId,
    SourceSignal, Trend,
};

/// Momentum dead band: trend stays `Stable` inside ±this.
const TREND_DEAD_BAND: f64 = 0.15;

pub fn fuse(country: &str, signals: Vec<SourceSignal>, config: &FusionConfig) -> CrisisAssessment {
    fuse_at(country, signals, config, Utc::now())
}

/// Fusion with an explicit generation timestamp; everything else about the
/// result is a deterministic function of the inputs.
pub fn fuse_at(
    country: &str,
    signals: Vec<SourceSignal>,
    config: &FusionConfig,
    generated_at: DateTime<Utc>,
) -> CrisisAssessment {
    let signal_map: BTreeMap<SourceId, SourceSignal> =
        signals.into_iter().map(|s| (s.source, s)).collect();

    let available: Vec<&SourceSignal> =
        signal_map.values().filter(|s| s.available).collect();
    let total = signal_map.len().max(1);

    let weighted_score = weighted_score(&available, config);
    let overall_risk = if available.is_empty() {
        RiskLevel::Unknown
    } else {
        let banded = level_for_band(weighted_score);
        let capped = banded
            .min(median_cap(&available))
            .min(contribution_cap(&available, config));
        debug_assert!(capped <= banded);
        capped
    };

    let availability = available.len() as f64 / total as f64;
    let confidence = if available.is_empty() {
        0.0
    } else {
        let mean = available.iter().map(|s| s.confidence).sum::<f64>() / available.len() as f64;
        mean * availability
    };

    let displacement = displacement_estimate(overall_risk, weighted_score, &available, config);

    CrisisAssessment {
        country: country.to_string(),
        generated_at,
        overall_risk,
        confidence,
        data_quality: data_quality(availability, &available),
        trend: trend(&available, config),
        displacement,
        signals: signal_map,
    }
}

/// Σ(score × confidence × weight) / Σ(confidence × weight) over available
/// signals. Zero available signals yields 0 by definition.
fn weighted_score(available: &[&SourceSignal], config: &FusionConfig) -> f64 {
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for signal in available {
        let weight = config.weights.weight_for(signal.source);
        numerator += signal.score * signal.confidence * weight;
        denominator += signal.confidence * weight;
    }
    if denominator <= f64::EPSILON {
        return 0.0;
    }
    numerator / denominator
}

fn level_for_band(score: f64) -> RiskLevel {
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

/// Risk may not exceed one level above the median available signal, so a
/// single noisy high-confidence outlier can't dominate. Even counts take
/// the lower middle value, the conservative choice.
fn median_cap(available: &[&SourceSignal]) -> RiskLevel {
    let mut levels: Vec<RiskLevel> = available.iter().map(|s| s.risk_level).collect();
    levels.sort();
    levels[(levels.len() - 1) / 2].step_up()
}

/// Risk may not exceed the highest level among available sources whose
/// weight clears the minimum-contribution floor. Vacuous when nothing
/// clears the floor.
fn contribution_cap(available: &[&SourceSignal], config: &FusionConfig) -> RiskLevel {
    available
        .iter()
        .filter(|s| config.weights.weight_for(s.source) >= config.min_contribution_weight)
        .map(|s| s.risk_level)
        .max()
        .unwrap_or(RiskLevel::Critical)
}

fn data_quality(availability: f64, available: &[&SourceSignal]) -> DataQuality {
    if available.is_empty() {
        DataQuality::Poor
    } else if availability >= 1.0 {
        DataQuality::Excellent
    } else if availability >= 0.75 {
        DataQuality::Good
    } else if availability >= 0.5 {
        DataQuality::Fair
    } else {
        DataQuality::Poor
    }
}

/// Confidence-and-weight-weighted mean of the momenta providers reported.
/// No momenta means no trend evidence, which reads as `Stable`.
fn trend(available: &[&SourceSignal], config: &FusionConfig) -> Trend {
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for signal in available {
        if let Some(momentum) = signal.momentum {
            let w = signal.confidence * config.weights.weight_for(signal.source);
            numerator += momentum * w;
            denominator += w;
        }
    }
    if denominator <= f64::EPSILON {
        return Trend::Stable;
    }
    let mean = numerator / denominator;
    if mean > TREND_DEAD_BAND {
        Trend::Deteriorating
    } else if mean < -TREND_DEAD_BAND {
        Trend::Improving
    } else {
        Trend::Stable
    }
}

/// Per-band displacement figures, positioned inside the band by the
/// weighted score. Integer math end to end so repeated fusion of the same
/// inputs gives identical numbers.
fn displacement_estimate(
    overall_risk: RiskLevel,
    weighted_score: f64,
    available: &[&SourceSignal],
    config: &FusionConfig,
) -> DisplacementEstimate {
    let (band_floor, base, range, timeline) = match overall_risk {
        RiskLevel::Critical => (75.0, 500_000u64, 1_500_000u64, "0-3 months"),
        RiskLevel::High => (50.0, 100_000, 400_000, "3-6 months"),
        RiskLevel::Medium => (25.0, 20_000, 80_000, "6-12 months"),
        RiskLevel::Low => (0.0, 0, 10_000, "12+ months"),
        RiskLevel::Unknown => (0.0, 0, 0, "indeterminate"),
    };
    let fraction = ((weighted_score - band_floor) / 25.0).clamp(0.0, 1.0);
    let estimated_people = base + (range as f64 * fraction) as u64;

    // Top indicators of the highest-contributing sources; source-order
    // tie-break keeps this stable under input permutation.
    let mut ranked: Vec<&&SourceSignal> = available.iter().collect();
    ranked.sort_by(|a, b| {
        let ca = a.score * a.confidence * config.weights.weight_for(a.source);
        let cb = b.score * b.confidence * config.weights.weight_for(b.source);
        cb.partial_cmp(&ca)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.source.cmp(&b.source))
    });
    let primary_causes: Vec<String> = ranked
        .iter()
        .filter_map(|s| s.indicators.first().cloned())
        .take(3)
        .collect();

    DisplacementEstimate {
        level: overall_risk,
        timeline: timeline.to_string(),
        estimated_people,
        primary_causes,
    }
}
