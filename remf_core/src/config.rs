//! Runtime configuration for the measurement engine.
//!
//! These are separate from the TOML-deserialized types in `remf_config`;
//! `conversions` maps one onto the other.

use std::time::Duration;

use crate::rate::{DEFAULT_RATE_STABILITY_MV_PER_S, DEFAULT_RATE_WINDOW, DEFAULT_TARGET_RATE_MV_PER_S};

/// Shortest accepted sampling interval.
pub const MIN_INTERVAL: Duration = Duration::from_millis(200);
/// Longest accepted sampling interval.
pub const MAX_INTERVAL: Duration = Duration::from_millis(10_000);
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Clamp a requested interval into [`MIN_INTERVAL`, `MAX_INTERVAL`].
#[inline]
pub fn clamp_interval(interval: Duration) -> Duration {
    interval.clamp(MIN_INTERVAL, MAX_INTERVAL)
}

/// Gradient feedback settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientCfg {
    /// Target `top - bottom` (mV).
    pub size_mv: f64,
    /// Tolerance band (mV); `None` means 10% of `size_mv`.
    pub stability_mv: Option<f64>,
}

impl Default for GradientCfg {
    fn default() -> Self {
        Self {
            size_mv: 0.1,
            stability_mv: None,
        }
    }
}

/// Ramp-rate feedback settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RateCfg {
    pub target_mv_per_s: f64,
    pub stability_mv_per_s: f64,
    /// History span the rate is averaged over.
    pub window: Duration,
}

impl Default for RateCfg {
    fn default() -> Self {
        Self {
            target_mv_per_s: DEFAULT_TARGET_RATE_MV_PER_S,
            stability_mv_per_s: DEFAULT_RATE_STABILITY_MV_PER_S,
            window: DEFAULT_RATE_WINDOW,
        }
    }
}

/// Power supply presets and the per-tick current nudge.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplyCfg {
    pub furnace_voltage: f64,
    pub gradient_voltage: f64,
    /// Current change applied per out-of-band tick (A).
    pub current_step_a: f64,
}

impl Default for SupplyCfg {
    fn default() -> Self {
        Self {
            furnace_voltage: 220.0,
            gradient_voltage: 220.0,
            current_step_a: 0.01,
        }
    }
}

/// Which measurements run at a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementCfg {
    pub resistance: bool,
    /// Only effective when a gradient supply is present.
    pub thermo_emf: bool,
}

impl Default for MeasurementCfg {
    fn default() -> Self {
        Self {
            resistance: true,
            thermo_emf: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoreCfg {
    /// Sampling period; clamped on use.
    pub interval: Duration,
    pub gradient: GradientCfg,
    pub rate: RateCfg,
    pub supply: SupplyCfg,
    pub measurement: MeasurementCfg,
}

impl Default for CoreCfg {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            gradient: GradientCfg::default(),
            rate: RateCfg::default(),
            supply: SupplyCfg::default(),
            measurement: MeasurementCfg::default(),
        }
    }
}
