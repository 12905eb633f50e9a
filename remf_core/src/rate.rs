//! Threshold feedback on the smoothed ramp rate of a thermocouple.

use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::gradient::Nudge;
use crate::moving_average::MovingAverage;

pub const DEFAULT_TARGET_RATE_MV_PER_S: f64 = 0.004;
pub const DEFAULT_RATE_STABILITY_MV_PER_S: f64 = 0.0005;
/// Span of history the rate is averaged over when no window is given.
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(4);

/// Number of ticks covering `span` at the given sampling interval, at least 1.
pub fn window_len(span: Duration, interval: Duration) -> usize {
    let interval_ms = interval.as_millis().max(1);
    let n = (span.as_millis() + interval_ms / 2) / interval_ms;
    usize::try_from(n).unwrap_or(usize::MAX).max(1)
}

/// Keeps a moving average of `|value - last| / interval` and compares it to
/// `target ± stability`.
///
/// Until the window has filled once after construction or [`reset`] the
/// controller holds, so a handful of startup samples cannot swing the supply.
///
/// [`reset`]: RateController::reset
#[derive(Debug, Clone)]
pub struct RateController {
    target: f64,
    stability: f64,
    interval_s: f64,
    rates: MovingAverage,
    last: Option<f64>,
}

impl RateController {
    pub fn new(interval: Duration, window: usize) -> Self {
        Self {
            target: DEFAULT_TARGET_RATE_MV_PER_S,
            stability: DEFAULT_RATE_STABILITY_MV_PER_S,
            interval_s: interval.as_secs_f64().max(f64::EPSILON),
            rates: MovingAverage::new(window),
            last: None,
        }
    }

    pub fn target_rate(&self) -> f64 {
        self.target
    }

    pub fn stability(&self) -> f64 {
        self.stability
    }

    pub fn window(&self) -> usize {
        self.rates.capacity()
    }

    /// Smoothed rate in mV/s; NaN until the first rate was recorded.
    pub fn rate(&self) -> f64 {
        self.rates.average()
    }

    pub fn set_target_rate(&mut self, mv_per_s: f64) -> Result<()> {
        self.target = positive("target rate", mv_per_s)?;
        Ok(())
    }

    pub fn set_stability(&mut self, mv_per_s: f64) -> Result<()> {
        self.stability = positive("rate stability range", mv_per_s)?;
        Ok(())
    }

    /// Change the sampling interval and window. Resets the history.
    pub fn set_interval(&mut self, interval: Duration, window: usize) {
        self.interval_s = interval.as_secs_f64().max(f64::EPSILON);
        self.rates = MovingAverage::new(window);
        self.last = None;
    }

    /// Drop the history; the next sample only primes the baseline.
    pub fn reset(&mut self) {
        self.rates.clear();
        self.last = None;
    }

    /// Feed one reading (mV) and get the resulting decision. A non-finite
    /// reading drops the baseline so no rate spans the gap.
    pub fn add_sample(&mut self, value: f64) -> Nudge {
        if !value.is_finite() {
            self.last = None;
            return Nudge::Hold;
        }
        match self.last.replace(value) {
            None => Nudge::Hold,
            Some(last) => {
                self.rates.add((value - last).abs() / self.interval_s);
                self.direction()
            }
        }
    }

    /// Decision for the current smoothed rate.
    pub fn direction(&self) -> Nudge {
        if !self.rates.is_full() {
            return Nudge::Hold;
        }
        let rate = self.rates.average();
        if rate < self.target - self.stability {
            Nudge::Raise
        } else if rate > self.target + self.stability {
            Nudge::Lower
        } else {
            Nudge::Hold
        }
    }
}

fn positive(what: &str, v: f64) -> Result<f64> {
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(eyre::Report::new(CoreError::InvalidArgument(format!(
            "{what} must be > 0, got {v}"
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_len_rounds_to_ticks() {
        assert_eq!(window_len(DEFAULT_RATE_WINDOW, Duration::from_millis(1000)), 4);
        assert_eq!(window_len(DEFAULT_RATE_WINDOW, Duration::from_millis(300)), 13);
        assert_eq!(window_len(Duration::ZERO, Duration::from_millis(300)), 1);
    }

    #[test]
    fn holds_until_window_full() {
        let mut rc = RateController::new(Duration::from_secs(1), 3);
        assert_eq!(rc.add_sample(0.0), Nudge::Hold);
        assert_eq!(rc.add_sample(0.0), Nudge::Hold);
        assert_eq!(rc.add_sample(0.0), Nudge::Hold);
        assert_eq!(rc.add_sample(0.0), Nudge::Raise);
    }

    #[test]
    fn nan_reading_restarts_baseline() {
        let mut rc = RateController::new(Duration::from_secs(1), 1);
        rc.add_sample(0.0);
        assert_eq!(rc.add_sample(0.001), Nudge::Raise);
        assert_eq!(rc.add_sample(f64::NAN), Nudge::Hold);
        // No rate is taken across the gap.
        assert_eq!(rc.add_sample(10.0), Nudge::Hold);
        assert!((rc.rate() - 0.001).abs() < 1e-12);
        assert_eq!(rc.add_sample(10.0), Nudge::Raise);
        assert_eq!(rc.rate(), 0.0);
    }

    #[test]
    fn rejects_non_positive_settings() {
        let mut rc = RateController::new(Duration::from_secs(1), 4);
        for bad in [0.0, -1.0, f64::NAN] {
            let err = rc.set_target_rate(bad).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<CoreError>(),
                Some(CoreError::InvalidArgument(_))
            ));
            assert!(rc.set_stability(bad).is_err());
        }
        assert_eq!(rc.target_rate(), DEFAULT_TARGET_RATE_MV_PER_S);
        assert_eq!(rc.stability(), DEFAULT_RATE_STABILITY_MV_PER_S);
    }

    #[test]
    fn fast_ramp_lowers() {
        let mut rc = RateController::new(Duration::from_millis(500), 2);
        let mut v = 0.0;
        let mut last = Nudge::Hold;
        for _ in 0..4 {
            last = rc.add_sample(v);
            v += 0.01;
        }
        assert_eq!(last, Nudge::Lower);
        assert!((rc.rate() - 0.02).abs() < 1e-9);
    }
}
