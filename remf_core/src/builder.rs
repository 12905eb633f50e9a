//! Type-state builder for `MeasurementEngine`.
//!
//! Thermocouples, ohmmeter and furnace supply must be provided before
//! `build()` is available. `try_build()` is always available for dynamic
//! checks and reports what is missing as a typed `BuildError`.

use std::marker::PhantomData;

use remf_traits::{PolarityRelay, PowerSupply, ResistanceMeter, VoltageMeter};

use crate::config::{CoreCfg, clamp_interval};
use crate::engine::{MeasurementEngine, Ohmmeter, Relay, Supply, Thermocouple};
use crate::error::{BuildError, Result};
use crate::gradient::GradientController;
use crate::rate::{RateController, window_len};
use crate::selection::Selection;
use crate::step::StepSettings;
use crate::tracker::StepTracker;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `MeasurementEngine`. Type parameters track thermocouples,
/// ohmmeter and furnace.
pub struct EngineBuilder<T, O, F> {
    top: Option<Thermocouple>,
    bottom: Option<Thermocouple>,
    ohmmeter: Option<Ohmmeter>,
    furnace: Option<Supply>,
    gradient_supply: Option<Supply>,
    relay: Option<Relay>,
    cfg: CoreCfg,
    steps: Vec<StepSettings>,
    _t: PhantomData<T>,
    _o: PhantomData<O>,
    _f: PhantomData<F>,
}

impl Default for EngineBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            top: None,
            bottom: None,
            ohmmeter: None,
            furnace: None,
            gradient_supply: None,
            relay: None,
            cfg: CoreCfg::default(),
            steps: Vec::new(),
            _t: PhantomData,
            _o: PhantomData,
            _f: PhantomData,
        }
    }
}

impl MeasurementEngine {
    pub fn builder() -> EngineBuilder<Missing, Missing, Missing> {
        EngineBuilder::default()
    }
}

impl<T, O, F> EngineBuilder<T, O, F> {
    fn retype<T2, O2, F2>(self) -> EngineBuilder<T2, O2, F2> {
        EngineBuilder {
            top: self.top,
            bottom: self.bottom,
            ohmmeter: self.ohmmeter,
            furnace: self.furnace,
            gradient_supply: self.gradient_supply,
            relay: self.relay,
            cfg: self.cfg,
            steps: self.steps,
            _t: PhantomData,
            _o: PhantomData,
            _f: PhantomData,
        }
    }

    /// Top and bottom thermocouple meters.
    pub fn with_thermocouples(
        mut self,
        top: impl VoltageMeter + Send + 'static,
        bottom: impl VoltageMeter + Send + 'static,
    ) -> EngineBuilder<Set, O, F> {
        self.top = Some(Box::new(top));
        self.bottom = Some(Box::new(bottom));
        self.retype()
    }

    pub fn with_ohmmeter(mut self, ohmmeter: impl ResistanceMeter + Send + 'static) -> EngineBuilder<T, Set, F> {
        self.ohmmeter = Some(Box::new(ohmmeter));
        self.retype()
    }

    pub fn with_furnace(mut self, supply: impl PowerSupply + Send + 'static) -> EngineBuilder<T, O, Set> {
        self.furnace = Some(Box::new(supply));
        self.retype()
    }

    /// Optional supply for the gradient heater. Thermo-EMF measurement needs it.
    pub fn with_gradient_supply(mut self, supply: impl PowerSupply + Send + 'static) -> Self {
        self.gradient_supply = Some(Box::new(supply));
        self
    }

    /// Optional polarity relay for reverse-resistance readings.
    pub fn with_relay(mut self, relay: impl PolarityRelay + Send + 'static) -> Self {
        self.relay = Some(Box::new(relay));
        self
    }

    pub fn with_config(mut self, cfg: CoreCfg) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn with_steps(mut self, steps: impl IntoIterator<Item = StepSettings>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Validate and build regardless of type state.
    pub fn try_build(self) -> Result<MeasurementEngine> {
        let top = self
            .top
            .ok_or_else(|| eyre::Report::new(BuildError::MissingThermocouples))?;
        let bottom = self
            .bottom
            .ok_or_else(|| eyre::Report::new(BuildError::MissingThermocouples))?;
        let ohmmeter = self
            .ohmmeter
            .ok_or_else(|| eyre::Report::new(BuildError::MissingOhmmeter))?;
        let furnace = self
            .furnace
            .ok_or_else(|| eyre::Report::new(BuildError::MissingFurnace))?;
        validate_and_build(
            Devices {
                top,
                bottom,
                ohmmeter,
                furnace,
                gradient_supply: self.gradient_supply,
                relay: self.relay,
            },
            self.cfg,
            self.steps,
        )
    }
}

impl EngineBuilder<Set, Set, Set> {
    /// Build; only available once every required device is set.
    pub fn build(self) -> Result<MeasurementEngine> {
        self.try_build()
    }
}

struct Devices {
    top: Thermocouple,
    bottom: Thermocouple,
    ohmmeter: Ohmmeter,
    furnace: Supply,
    gradient_supply: Option<Supply>,
    relay: Option<Relay>,
}

/// Validate configuration and device readiness and assemble the engine.
fn validate_and_build(
    mut dev: Devices,
    mut cfg: CoreCfg,
    steps: Vec<StepSettings>,
) -> Result<MeasurementEngine> {
    // ── Validation ───────────────────────────────────────────────────────────
    if !cfg.gradient.size_mv.is_finite() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "gradient size must be finite",
        )));
    }
    if !(cfg.rate.target_mv_per_s.is_finite() && cfg.rate.target_mv_per_s > 0.0) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "target rate must be > 0",
        )));
    }
    if !(cfg.rate.stability_mv_per_s.is_finite() && cfg.rate.stability_mv_per_s > 0.0) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "rate stability range must be > 0",
        )));
    }
    if !(cfg.supply.current_step_a.is_finite() && cfg.supply.current_step_a > 0.0) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "current step must be > 0",
        )));
    }
    if !(cfg.supply.furnace_voltage >= 0.0 && cfg.supply.gradient_voltage >= 0.0) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "supply voltages must be >= 0",
        )));
    }

    // ── Readiness ────────────────────────────────────────────────────────────
    if !dev.top.is_ready() {
        return Err(eyre::Report::new(BuildError::NotReady("top thermocouple")));
    }
    if !dev.bottom.is_ready() {
        return Err(eyre::Report::new(BuildError::NotReady(
            "bottom thermocouple",
        )));
    }
    if !dev.ohmmeter.is_ready() {
        return Err(eyre::Report::new(BuildError::NotReady("ohmmeter")));
    }
    if !dev.furnace.is_ready() {
        return Err(eyre::Report::new(BuildError::NotReady("furnace supply")));
    }
    if dev.gradient_supply.as_ref().is_some_and(|g| !g.is_ready()) {
        return Err(eyre::Report::new(BuildError::NotReady("gradient supply")));
    }

    // ── Construction ─────────────────────────────────────────────────────────
    cfg.interval = clamp_interval(cfg.interval);
    let gradient = match cfg.gradient.stability_mv {
        Some(s) => GradientController::with_stability(cfg.gradient.size_mv, s),
        None => GradientController::new(cfg.gradient.size_mv),
    };
    let mut rate = RateController::new(cfg.interval, window_len(cfg.rate.window, cfg.interval));
    rate.set_target_rate(cfg.rate.target_mv_per_s)?;
    rate.set_stability(cfg.rate.stability_mv_per_s)?;

    if let Some(g) = dev.gradient_supply.as_mut() {
        g.set_voltage(cfg.supply.gradient_voltage);
    }
    dev.furnace.set_voltage(cfg.supply.furnace_voltage);

    tracing::info!(
        interval_ms = cfg.interval.as_millis() as u64,
        steps = steps.len(),
        gradient_supply = dev.gradient_supply.is_some(),
        relay = dev.relay.is_some(),
        "measurement engine built"
    );

    Ok(MeasurementEngine::assemble(
        dev.top,
        dev.bottom,
        dev.ohmmeter,
        dev.furnace,
        dev.gradient_supply,
        dev.relay,
        StepTracker::new(Selection::from_items(steps)),
        gradient,
        rate,
        cfg,
    ))
}
