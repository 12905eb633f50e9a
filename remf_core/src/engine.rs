//! The per-tick measurement and control loop (`MeasurementEngine`).
//!
//! One `tick()` samples both thermocouples, asks the step tracker whether a
//! checkpoint was reached, runs the resistance/thermo-EMF measurement when it
//! was, and then nudges both supplies. The engine itself is single-threaded;
//! `MeasurementCore` drives it from a worker thread.

use std::time::Duration;

use crossbeam_channel as xch;
use remf_traits::{PolarityRelay, PowerSupply, ResistanceMeter, VoltageMeter};

use crate::config::{CoreCfg, clamp_interval};
use crate::gradient::{GradientController, Nudge};
use crate::hw_error::{map_device_error, reading_or_nan};
use crate::measured::MeasuredValues;
use crate::rate::{RateController, window_len};
use crate::selection::SelectionChanged;
use crate::step::{StepKind, StepSettings};
use crate::tracker::StepTracker;

pub type Thermocouple = Box<dyn VoltageMeter + Send>;
pub type Ohmmeter = Box<dyn ResistanceMeter + Send>;
pub type Supply = Box<dyn PowerSupply + Send>;
pub type Relay = Box<dyn PolarityRelay + Send>;

/// Thermocouples are read on the 100 mV range.
const THERMOCOUPLE_RANGE_V: f64 = 0.1;
/// Thermo-EMF is read on the 100 mV range too.
const THERMO_EMF_RANGE_V: f64 = 0.1;
/// Assumed resistance before the first measurement (selects the 10 MΩ range).
const FALLBACK_RESISTANCE_OHM: f64 = 1_000_000.0;

/// Events published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementEvent {
    /// Every tick: both thermocouples.
    VoltageSampled(MeasuredValues),
    /// At a checkpoint: thermocouples plus resistance (and thermo-EMF).
    ResistanceMeasured(MeasuredValues),
    /// The active step changed; `to == None` means the program finished.
    StepChanged {
        from: Option<usize>,
        to: Option<usize>,
        kind: Option<StepKind>,
    },
}

/// What one tick produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub sample: MeasuredValues,
    pub measurement: Option<MeasuredValues>,
}

/// Point-in-time copy of the engine state for display and queries.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    pub started: bool,
    pub thermo_emf: bool,
    pub resistance: bool,
    pub interval: Duration,
    pub selected_step: Option<usize>,
    pub steps: usize,
    pub done: bool,
    pub next_checkpoint_mv: f64,
    pub bottom_mv: f64,
    pub top_mv: f64,
    pub last_resistance: f64,
    pub ramp_rate_mv_per_s: f64,
    pub furnace_current_a: f64,
    pub gradient_current_a: Option<f64>,
}

pub struct MeasurementEngine {
    pub(crate) top: Thermocouple,
    pub(crate) bottom: Thermocouple,
    pub(crate) ohmmeter: Ohmmeter,
    pub(crate) furnace: Supply,
    pub(crate) gradient_supply: Option<Supply>,
    pub(crate) relay: Option<Relay>,
    pub(crate) tracker: StepTracker,
    pub(crate) gradient: GradientController,
    pub(crate) rate: RateController,
    pub(crate) cfg: CoreCfg,
    pub(crate) started: bool,
    pub(crate) thermo_emf: bool,
    pub(crate) furnace_current: f64,
    pub(crate) gradient_current: f64,
    pub(crate) top_mv: f64,
    pub(crate) bottom_mv: f64,
    pub(crate) resistance: f64,
    pub(crate) subscribers: Vec<xch::Sender<MeasurementEvent>>,
    pub(crate) step_events: xch::Receiver<SelectionChanged<StepSettings>>,
}

impl core::fmt::Debug for MeasurementEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MeasurementEngine")
            .field("started", &self.started)
            .field("thermo_emf", &self.thermo_emf)
            .field("step", &self.tracker.selected_index())
            .field("bottom_mv", &self.bottom_mv)
            .field("top_mv", &self.top_mv)
            .finish()
    }
}

impl MeasurementEngine {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        top: Thermocouple,
        bottom: Thermocouple,
        ohmmeter: Ohmmeter,
        furnace: Supply,
        gradient_supply: Option<Supply>,
        relay: Option<Relay>,
        mut tracker: StepTracker,
        gradient: GradientController,
        rate: RateController,
        cfg: CoreCfg,
    ) -> Self {
        let (step_tx, step_events) = xch::unbounded();
        tracker.subscribe(move |change| {
            let _ = step_tx.send(change.clone());
        });
        let thermo_emf = cfg.measurement.thermo_emf && gradient_supply.is_some();
        Self {
            top,
            bottom,
            ohmmeter,
            furnace,
            gradient_supply,
            relay,
            tracker,
            gradient,
            rate,
            cfg,
            started: false,
            thermo_emf,
            furnace_current: 0.0,
            gradient_current: 0.0,
            top_mv: f64::NAN,
            bottom_mv: f64::NAN,
            resistance: f64::NAN,
            subscribers: Vec::new(),
            step_events,
        }
    }

    /// Subscribe to published events. Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> xch::Receiver<MeasurementEvent> {
        let (tx, rx) = xch::unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn thermo_emf(&self) -> bool {
        self.thermo_emf
    }

    pub fn interval(&self) -> Duration {
        self.cfg.interval
    }

    /// Enable thermo-EMF measurement. Only takes effect with a gradient
    /// supply; returns the resulting state.
    pub fn set_measure_thermo_emf(&mut self, on: bool) -> bool {
        self.thermo_emf = on && self.gradient_supply.is_some();
        if self.started {
            if let Some(g) = self.gradient_supply.as_mut().filter(|g| g.is_ready()) {
                g.turn_on(self.thermo_emf);
            }
        }
        self.thermo_emf
    }

    pub fn set_measure_resistance(&mut self, on: bool) {
        self.cfg.measurement.resistance = on;
    }

    /// Set the sampling interval (clamped) and re-derive the rate window.
    /// Returns the interval actually applied.
    pub fn set_interval(&mut self, interval: Duration) -> Duration {
        let interval = clamp_interval(interval);
        self.cfg.interval = interval;
        self.rate
            .set_interval(interval, window_len(self.cfg.rate.window, interval));
        tracing::info!(interval_ms = interval.as_millis() as u64, "sampling interval changed");
        interval
    }

    /// Power up and begin regulating. Selects the first step when nothing is
    /// selected. Idempotent.
    pub fn start_measurements(&mut self) -> bool {
        if self.started {
            return true;
        }
        if let Some(g) = self.gradient_supply.as_mut().filter(|g| g.is_ready()) {
            g.turn_on(self.thermo_emf);
        }
        if self.furnace.is_ready() {
            self.furnace.turn_on(true);
        }
        self.rate.reset();
        if self.tracker.selected_index().is_none() && !self.tracker.program().is_empty() {
            self.tracker.advance();
        }
        self.started = true;
        tracing::info!(
            thermo_emf = self.thermo_emf,
            step = ?self.tracker.selected_index(),
            "measurements started"
        );
        self.flush_step_events();
        true
    }

    /// Power down both supplies and stop regulating. Idempotent.
    pub fn stop_measurements(&mut self) -> bool {
        if !self.started {
            return false;
        }
        if let Some(g) = self.gradient_supply.as_mut().filter(|g| g.is_ready()) {
            g.turn_on(false);
        }
        if self.furnace.is_ready() {
            self.furnace.turn_on(false);
        }
        self.started = false;
        tracing::info!("measurements stopped");
        false
    }

    /// Run `f` against the step program and publish any step change it caused.
    pub fn with_steps<R>(&mut self, f: impl FnOnce(&mut StepTracker) -> R) -> R {
        let r = f(&mut self.tracker);
        self.flush_step_events();
        r
    }

    pub fn steps(&self) -> &StepTracker {
        &self.tracker
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            started: self.started,
            thermo_emf: self.thermo_emf,
            resistance: self.cfg.measurement.resistance,
            interval: self.cfg.interval,
            selected_step: self.tracker.selected_index(),
            steps: self.tracker.program().len(),
            done: self.tracker.is_done(),
            next_checkpoint_mv: self.tracker.next_checkpoint(),
            bottom_mv: self.bottom_mv,
            top_mv: self.top_mv,
            last_resistance: self.resistance,
            ramp_rate_mv_per_s: self.rate.rate(),
            furnace_current_a: self.furnace_current,
            gradient_current_a: self.gradient_supply.as_ref().map(|_| self.gradient_current),
        }
    }

    /// One iteration of the loop.
    pub fn tick(&mut self) -> Tick {
        self.top_mv = read_millivolts("top thermocouple", self.top.as_mut());
        self.bottom_mv = read_millivolts("bottom thermocouple", self.bottom.as_mut());
        let sample = MeasuredValues::temperatures(self.bottom_mv, self.top_mv);
        self.publish(MeasurementEvent::VoltageSampled(sample.clone()));

        let due = self.tracker.should_measure(self.bottom_mv);
        let measurement = if due && self.cfg.measurement.resistance {
            let m = self.measure(&sample);
            self.publish(MeasurementEvent::ResistanceMeasured(m.clone()));
            Some(m)
        } else {
            None
        };
        self.flush_step_events();

        if self.started {
            if self.bottom_mv.is_finite() && self.top_mv.is_finite() {
                self.adjust_gradient();
            }
            // NaN breaks the rate baseline; the controller re-primes on the next reading.
            self.adjust_furnace();
        }
        tracing::debug!(
            bottom_mv = self.bottom_mv,
            top_mv = self.top_mv,
            measured = measurement.is_some(),
            next_checkpoint_mv = self.tracker.next_checkpoint(),
            "tick"
        );
        Tick {
            sample,
            measurement,
        }
    }

    /// Stop regulating and release the relay. Called once on shutdown.
    pub fn release(&mut self) {
        self.stop_measurements();
        if let Some(relay) = self.relay.as_mut() {
            relay.release();
        }
        self.subscribers.clear();
    }

    fn measure(&mut self, sample: &MeasuredValues) -> MeasuredValues {
        let range = resistance_range(self.resistance);
        let (forward, reverse) = self.measure_resistance(range);
        self.resistance = forward;
        let emf = if self.thermo_emf {
            self.measure_thermo_emf()
        } else {
            f64::NAN
        };
        tracing::debug!(range, forward, reverse, emf, "checkpoint measurement");
        sample
            .clone()
            .with_resistance(forward, reverse)
            .with_thermo_emf(emf)
    }

    /// Forward reading, then the reversed-polarity reading when a relay is
    /// fitted.
    fn measure_resistance(&mut self, range: f64) -> (f64, f64) {
        if !self.ohmmeter.is_ready() {
            return (f64::NAN, f64::NAN);
        }
        let forward = reading_or_nan("ohmmeter", self.ohmmeter.read_resistance(range));
        let Some(relay) = self.relay.as_mut() else {
            return (forward, f64::NAN);
        };
        if let Err(e) = relay.set_channels(true) {
            tracing::warn!(error = %map_device_error(e.as_ref()), "failed to reverse polarity");
            return (forward, f64::NAN);
        }
        let reverse = reading_or_nan("ohmmeter", self.ohmmeter.read_resistance(range));
        if let Err(e) = relay.set_channels(false) {
            tracing::warn!(error = %map_device_error(e.as_ref()), "failed to restore polarity");
        }
        (forward, reverse)
    }

    /// Thermo-EMF in µV through the ohmmeter's voltmeter function.
    fn measure_thermo_emf(&mut self) -> f64 {
        match self.ohmmeter.voltage_meter() {
            Some(vm) if vm.is_ready() => {
                reading_or_nan("thermo-emf", vm.read_voltage(THERMO_EMF_RANGE_V)) * 1e6
            }
            _ => f64::NAN,
        }
    }

    fn adjust_gradient(&mut self) {
        if !self.thermo_emf {
            return;
        }
        let nudge = self.gradient.direction(self.bottom_mv, self.top_mv);
        let step = self.cfg.supply.current_step_a;
        let Some(supply) = self.gradient_supply.as_mut() else {
            return;
        };
        if let Some(a) = nudge_current(supply.as_mut(), self.gradient_current, nudge, step) {
            tracing::debug!(?nudge, current_a = a, "gradient current");
            self.gradient_current = a;
        }
    }

    fn adjust_furnace(&mut self) {
        let nudge = self.rate.add_sample(self.bottom_mv);
        let step = self.cfg.supply.current_step_a;
        if let Some(a) = nudge_current(self.furnace.as_mut(), self.furnace_current, nudge, step) {
            tracing::debug!(?nudge, current_a = a, "furnace current");
            self.furnace_current = a;
        }
    }

    fn flush_step_events(&mut self) {
        let changes: Vec<_> = self.step_events.try_iter().collect();
        for c in changes {
            tracing::info!(from = ?c.old_index, to = ?c.new_index, "step changed");
            self.publish(MeasurementEvent::StepChanged {
                from: c.old_index,
                to: c.new_index,
                kind: c.new.as_ref().map(StepSettings::kind),
            });
        }
    }

    fn publish(&mut self, ev: MeasurementEvent) {
        self.subscribers.retain(|tx| tx.send(ev.clone()).is_ok());
    }
}

/// Read a thermocouple in mV; NaN when the meter is not ready or fails.
fn read_millivolts(name: &'static str, meter: &mut (dyn VoltageMeter + Send)) -> f64 {
    if !meter.is_ready() {
        return f64::NAN;
    }
    reading_or_nan(name, meter.read_voltage(THERMOCOUPLE_RANGE_V)) * 1000.0
}

/// Apply one current step. `None` when holding or when the supply rejected
/// the new value.
fn nudge_current(
    supply: &mut (dyn PowerSupply + Send),
    current: f64,
    nudge: Nudge,
    step: f64,
) -> Option<f64> {
    if nudge == Nudge::Hold {
        return None;
    }
    let want = (current + nudge.sign() * step).max(0.0);
    supply.set_current(want)
}

/// Ohmmeter range for the next reading: the power of ten just above the
/// integer part of the previous resistance.
pub fn resistance_range(previous: f64) -> f64 {
    let r = previous.ceil();
    let r = if r.is_finite() && r > 0.0 {
        r
    } else {
        FALLBACK_RESISTANCE_OHM
    };
    let digits = (r as u64).to_string().len();
    10f64.powi(i32::try_from(digits).unwrap_or(i32::MAX))
}
