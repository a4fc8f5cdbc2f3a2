//! Hypoglycemia risk estimation from ECG-derived features.
//!
//! This is the demonstration model: a fixed heuristic standing in for the
//! production forecaster. Low HRV and abnormal heart rate raise risk, two
//! circadian windows (night-time counter-regulation and post-meal afternoon)
//! add a flat bump, the dawn window a smaller one, and a short history mean
//! smooths frame-to-frame jumps.

use chrono::{DateTime, Timelike, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::features::FeatureVector;

/// Output probabilities are hard-clamped to this band.
pub const PROB_FLOOR: f64 = 0.05;
pub const PROB_CEIL: f64 = 0.95;

/// How many trailing history entries feed the smoothing term.
const SMOOTHING_WINDOW: usize = 5;
const SMOOTHING_WEIGHT: f64 = 0.3;

/// Deterministic core of the estimate: everything except the noise draw.
/// Exposed separately so tests can pin the noise term.
pub fn estimate_with_noise(features: &FeatureVector, hour: u32, history: &[f64], noise: f64) -> f64 {
    let base = 0.15;

    // Lower HRV means higher risk; above 50 ms SDNN contributes nothing.
    let hrv_factor = ((50.0 - features.hrv_sdnn) / 100.0).max(0.0);

    let hr_factor = (features.hr_mean - 70.0).abs() / 200.0;

    // 2-4 am and 2-4 pm are the elevated windows; 6-8 am is the dawn window.
    let time_factor = match hour {
        2..=4 | 14..=16 => 0.15,
        6..=8 => 0.10,
        _ => 0.0,
    };

    let smoothing = match history {
        [] => 0.0,
        _ => {
            let take = SMOOTHING_WINDOW.min(history.len());
            let mean: f64 = history[history.len() - take..].iter().sum::<f64>() / take as f64;
            SMOOTHING_WEIGHT * mean
        }
    };

    (base + hrv_factor + hr_factor + time_factor + noise + smoothing).clamp(PROB_FLOOR, PROB_CEIL)
}

/// Stateful estimator owning the noise source.
pub struct RiskEstimator {
    rng: StdRng,
    noise: Normal<f64>,
}

impl RiskEstimator {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self { rng, noise: Normal::new(0.0, 0.05).unwrap() }
    }

    /// Estimate the probability of hypoglycemia in the forecast window.
    /// Always returns a finite value in [`PROB_FLOOR`, `PROB_CEIL`].
    pub fn estimate(&mut self, features: &FeatureVector, at: DateTime<Utc>, history: &[f64]) -> f64 {
        let noise = self.noise.sample(&mut self.rng);
        estimate_with_noise(features, at.hour(), history, noise)
    }
}

impl Default for RiskEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Risk band for display and alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn classify(probability: f64) -> Self {
        if probability < 0.25 {
            RiskLevel::Low
        } else if probability < 0.50 {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Moderate => "Moderate Risk",
            RiskLevel::High => "High Risk - Consider Action",
        }
    }
}

/// Projected probabilities over the standard display horizons, each capped
/// at [`PROB_CEIL`].
pub fn horizons(probability: f64) -> [(&'static str, f64); 4] {
    [
        ("30 min", (probability * 0.7).min(PROB_CEIL)),
        ("1 hour", probability.min(PROB_CEIL)),
        ("2 hours", (probability * 1.1).min(PROB_CEIL)),
        ("4 hours", (probability * 0.85).min(PROB_CEIL)),
    ]
}
