//! `From` implementations bridging `remf_config` types to `remf_core` types.

use std::time::Duration;

use crate::config::{CoreCfg, GradientCfg, MeasurementCfg, RateCfg, SupplyCfg};
use crate::step::{StepKind, StepSettings};

// ── Steps ────────────────────────────────────────────────────────────────────

impl From<remf_config::StepKind> for StepKind {
    fn from(k: remf_config::StepKind) -> Self {
        match k {
            remf_config::StepKind::NotAssigned => Self::NotAssigned,
            remf_config::StepKind::Waiting => Self::Waiting,
            remf_config::StepKind::Heating => Self::Heating,
            remf_config::StepKind::Cooling => Self::Cooling,
            remf_config::StepKind::Done => Self::Done,
        }
    }
}

impl From<&remf_config::StepRow> for StepSettings {
    fn from(r: &remf_config::StepRow) -> Self {
        Self::new(r.kind.into(), r.from_mv, r.to_mv, r.step_mv, r.point_range_mv)
    }
}

// ── GradientCfg ──────────────────────────────────────────────────────────────

impl From<&remf_config::GradientCfg> for GradientCfg {
    fn from(c: &remf_config::GradientCfg) -> Self {
        Self {
            size_mv: c.size_mv,
            stability_mv: c.stability_mv,
        }
    }
}

// ── RateCfg ──────────────────────────────────────────────────────────────────

impl From<&remf_config::RateCfg> for RateCfg {
    fn from(c: &remf_config::RateCfg) -> Self {
        // Validated configs always carry a positive finite window.
        let window =
            Duration::try_from_secs_f64(c.window_s).unwrap_or(crate::rate::DEFAULT_RATE_WINDOW);
        Self {
            target_mv_per_s: c.target_mv_per_s,
            stability_mv_per_s: c.stability_mv_per_s,
            window,
        }
    }
}

// ── SupplyCfg ────────────────────────────────────────────────────────────────

impl From<&remf_config::SupplyCfg> for SupplyCfg {
    fn from(c: &remf_config::SupplyCfg) -> Self {
        Self {
            furnace_voltage: c.furnace_voltage,
            gradient_voltage: c.gradient_voltage,
            current_step_a: c.current_step_a,
        }
    }
}

// ── MeasurementCfg ───────────────────────────────────────────────────────────

impl From<&remf_config::MeasurementCfg> for MeasurementCfg {
    fn from(c: &remf_config::MeasurementCfg) -> Self {
        Self {
            resistance: c.resistance,
            thermo_emf: c.thermo_emf,
        }
    }
}

// ── CoreCfg ──────────────────────────────────────────────────────────────────

impl From<&remf_config::Config> for CoreCfg {
    fn from(c: &remf_config::Config) -> Self {
        Self {
            interval: Duration::from_millis(c.sampling.interval_ms),
            gradient: (&c.gradient).into(),
            rate: (&c.rate).into(),
            supply: (&c.supply).into(),
            measurement: (&c.measurement).into(),
        }
    }
}

/// Step program of a config, in order.
pub fn steps_from_config(c: &remf_config::Config) -> Vec<StepSettings> {
    c.steps.iter().map(Into::into).collect()
}
