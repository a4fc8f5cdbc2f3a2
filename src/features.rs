//! Synthetic ECG-derived feature vectors.
//!
//! One vector per monitoring tick, each field drawn independently from a
//! fixed Gaussian. A production deployment would compute these from the raw
//! ECG stream; the demo regenerates them every tick and never persists them.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// ECG-derived features for one tick.
#[derive(Debug, Clone, Copy)]
pub struct FeatureVector {
    /// HRV SDNN in ms
    pub hrv_sdnn: f64,
    /// HRV RMSSD in ms
    pub hrv_rmssd: f64,
    /// Mean heart rate in bpm
    pub hr_mean: f64,
    pub hr_variability: f64,
    /// QT interval in ms
    pub qt_interval: f64,
    /// ST segment deviation in mV
    pub st_deviation: f64,
}

/// Draws one `FeatureVector` per call. Distributions are fixed; individual
/// draws are unbounded and can be physiologically implausible, which is
/// acceptable for demo data.
pub struct FeatureSampler {
    rng: StdRng,
    sdnn: Normal<f64>,
    rmssd: Normal<f64>,
    hr: Normal<f64>,
    hr_var: Normal<f64>,
    qt: Normal<f64>,
    st: Normal<f64>,
}

impl FeatureSampler {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        // All std values are positive, so Normal::new cannot fail.
        Self {
            rng,
            sdnn: Normal::new(45.0, 15.0).unwrap(),
            rmssd: Normal::new(35.0, 12.0).unwrap(),
            hr: Normal::new(75.0, 10.0).unwrap(),
            hr_var: Normal::new(8.0, 3.0).unwrap(),
            qt: Normal::new(400.0, 30.0).unwrap(),
            st: Normal::new(0.0, 0.5).unwrap(),
        }
    }

    pub fn sample(&mut self) -> FeatureVector {
        FeatureVector {
            hrv_sdnn: self.sdnn.sample(&mut self.rng),
            hrv_rmssd: self.rmssd.sample(&mut self.rng),
            hr_mean: self.hr.sample(&mut self.rng),
            hr_variability: self.hr_var.sample(&mut self.rng),
            qt_interval: self.qt.sample(&mut self.rng),
            st_deviation: self.st.sample(&mut self.rng),
        }
    }
}

impl Default for FeatureSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_deterministic_with_seed() {
        let mut a = FeatureSampler::with_seed(7);
        let mut b = FeatureSampler::with_seed(7);
        let fa = a.sample();
        let fb = b.sample();
        assert_eq!(fa.hrv_sdnn, fb.hrv_sdnn);
        assert_eq!(fa.hr_mean, fb.hr_mean);
        assert_eq!(fa.st_deviation, fb.st_deviation);
    }

    #[test]
    fn test_sampler_values_finite() {
        let mut sampler = FeatureSampler::with_seed(42);
        for _ in 0..1000 {
            let f = sampler.sample();
            assert!(f.hrv_sdnn.is_finite());
            assert!(f.hrv_rmssd.is_finite());
            assert!(f.hr_mean.is_finite());
            assert!(f.hr_variability.is_finite());
            assert!(f.qt_interval.is_finite());
            assert!(f.st_deviation.is_finite());
        }
    }

    #[test]
    fn test_sampler_tracks_configured_means() {
        let mut sampler = FeatureSampler::with_seed(1);
        let n = 5000;
        let mut sum_sdnn = 0.0;
        let mut sum_hr = 0.0;
        for _ in 0..n {
            let f = sampler.sample();
            sum_sdnn += f.hrv_sdnn;
            sum_hr += f.hr_mean;
        }
        // Sample means should sit near the configured distribution means.
        assert!((sum_sdnn / n as f64 - 45.0).abs() < 2.0);
        assert!((sum_hr / n as f64 - 75.0).abs() < 2.0);
    }
}
