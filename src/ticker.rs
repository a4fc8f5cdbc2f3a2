//! Explicit forecast scheduler.
//!
//! The original dashboard advanced the forecast by sleeping a second and
//! re-running the page. Here the per-minute step is a plain method on a
//! ticker component and the pacing loop is separate, so the step is testable
//! and cancellation means stopping the loop rather than navigating away.

use chrono::{DateTime, Utc};
use tokio::time::{sleep, Duration};

use crate::estimator::{RiskEstimator, RiskLevel};
use crate::features::{FeatureSampler, FeatureVector};
use crate::session::{Page, Session};

/// 16 simulated hours (6am-10pm) at one tick per minute. Reaching the cap
/// stops auto-advancing; it is a scheduling boundary, not a page transition.
pub const MAX_TICKS: u32 = 960;

/// Result of one scheduler step.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// Session is not on the forecast page; nothing to do.
    Idle,
    /// One simulated minute advanced.
    Advanced {
        minute: u32,
        at: DateTime<Utc>,
        features: FeatureVector,
        probability: f64,
        level: RiskLevel,
    },
    /// The monitoring window is exhausted.
    Complete,
}

/// Drives the sample -> estimate -> append step against a session.
pub struct ForecastTicker {
    sampler: FeatureSampler,
    estimator: RiskEstimator,
    interval: Duration,
}

impl ForecastTicker {
    pub fn new(tick_secs: u64) -> Self {
        Self {
            sampler: FeatureSampler::new(),
            estimator: RiskEstimator::new(),
            interval: Duration::from_secs(tick_secs),
        }
    }

    /// Deterministic ticker for tests and replays.
    pub fn with_seed(seed: u64, tick_secs: u64) -> Self {
        Self {
            sampler: FeatureSampler::with_seed(seed),
            estimator: RiskEstimator::with_seed(seed.wrapping_add(1)),
            interval: Duration::from_secs(tick_secs),
        }
    }

    /// Advance the session by one simulated minute.
    pub fn tick(&mut self, session: &mut Session) -> TickOutcome {
        if session.page != Page::Forecast {
            return TickOutcome::Idle;
        }
        if session.current_minute >= MAX_TICKS {
            return TickOutcome::Complete;
        }
        let at = match session.monitoring_time() {
            Some(at) => at,
            None => return TickOutcome::Idle,
        };

        let features = self.sampler.sample();
        let probability = self.estimator.estimate(&features, at, &session.history.values());
        session.history.push(probability);
        let minute = session.current_minute;
        session.current_minute += 1;

        TickOutcome::Advanced {
            minute,
            at,
            features,
            probability,
            level: RiskLevel::classify(probability),
        }
    }

    /// Run up to `max_ticks` steps at the configured wall-clock interval.
    /// `on_tick` sees every outcome and returns `false` to stop the loop.
    /// Returns the number of minutes advanced.
    pub async fn run<F>(&mut self, session: &mut Session, max_ticks: u32, mut on_tick: F) -> u32
    where
        F: FnMut(&TickOutcome) -> bool,
    {
        let mut advanced = 0;
        for _ in 0..max_ticks {
            let outcome = self.tick(session);
            let keep_going = on_tick(&outcome);
            match outcome {
                TickOutcome::Advanced { .. } => advanced += 1,
                TickOutcome::Idle | TickOutcome::Complete => break,
            }
            if !keep_going {
                break;
            }
            sleep(self.interval).await;
        }
        advanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    fn forecast_session() -> Session {
        let mut s = Session::new();
        s.submit_name("Dr. Smith").unwrap();
        s.connect_data_source("https://example.com/ecg").unwrap();
        s
    }

    #[test]
    fn test_tick_idle_off_forecast_page() {
        let mut ticker = ForecastTicker::with_seed(1, 1);
        let mut s = Session::new();
        assert!(matches!(ticker.tick(&mut s), TickOutcome::Idle));
        assert!(s.history.is_empty());
    }

    #[test]
    fn test_tick_appends_and_advances() {
        let mut ticker = ForecastTicker::with_seed(1, 1);
        let mut s = forecast_session();
        let outcome = ticker.tick(&mut s);
        match outcome {
            TickOutcome::Advanced { minute, probability, .. } => {
                assert_eq!(minute, 0);
                assert!((0.05..=0.95).contains(&probability));
            }
            other => panic!("expected Advanced, got {:?}", other),
        }
        assert_eq!(s.current_minute, 1);
        assert_eq!(s.history.len(), 1);
    }

    #[test]
    fn test_tick_complete_at_cap() {
        let mut ticker = ForecastTicker::with_seed(1, 1);
        let mut s = forecast_session();
        s.current_minute = MAX_TICKS;
        assert!(matches!(ticker.tick(&mut s), TickOutcome::Complete));
        // No mutation past the boundary.
        assert_eq!(s.current_minute, MAX_TICKS);
        assert!(s.history.is_empty());
    }

    #[test]
    fn test_history_stays_bounded_over_long_run() {
        let mut ticker = ForecastTicker::with_seed(9, 1);
        let mut s = forecast_session();
        for _ in 0..200 {
            ticker.tick(&mut s);
        }
        assert_eq!(s.history.len(), crate::history::HISTORY_CAP);
        assert_eq!(s.current_minute, 200);
    }

    #[tokio::test]
    async fn test_run_stops_on_callback() {
        let mut ticker = ForecastTicker::with_seed(3, 0);
        let mut s = forecast_session();
        let advanced = ticker.run(&mut s, 50, |outcome| {
            // Stop after the fifth advanced minute.
            !matches!(outcome, TickOutcome::Advanced { minute, .. } if *minute >= 4)
        })
        .await;
        assert_eq!(advanced, 5);
        assert_eq!(s.current_minute, 5);
    }

    #[tokio::test]
    async fn test_run_halts_at_window_end() {
        let mut ticker = ForecastTicker::with_seed(3, 0);
        let mut s = forecast_session();
        s.current_minute = MAX_TICKS - 2;
        let advanced = ticker.run(&mut s, 10, |_| true).await;
        assert_eq!(advanced, 2);
        assert_eq!(s.current_minute, MAX_TICKS);
    }
}
