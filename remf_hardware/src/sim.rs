use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use remf_traits::{DeviceError, PolarityRelay, PowerSupply, ResistanceMeter, VoltageMeter};

use crate::error::HwError;
use crate::util::wait_until_settled_with_timeout;

/// How long the ohmmeter waits for the relay contacts before giving up.
const SETTLE_TIMEOUT: Duration = Duration::from_millis(500);
const SETTLE_POLL: Duration = Duration::from_millis(1);

/// Physical constants of the simulated rig.
#[derive(Debug, Clone, PartialEq)]
pub struct SimParams {
    /// Ambient (and starting) thermocouple reading, mV.
    pub ambient_mv: f64,
    /// Heating per furnace amp, mV/s.
    pub heat_gain_mv_per_a_s: f64,
    /// Fraction of the excess over ambient lost per second.
    pub loss_per_s: f64,
    /// Top-minus-bottom difference per gradient amp, mV.
    pub gradient_gain_mv_per_a: f64,
    /// Sample resistance at 0 mV, ohm.
    pub resistance_ohm: f64,
    /// Relative resistance change per mV.
    pub resistance_coeff_per_mv: f64,
    /// Parasitic contact offset; added forward, subtracted reversed.
    pub polarity_offset_ohm: f64,
    /// Sample Seebeck coefficient, µV per mV of gradient.
    pub seebeck_uv_per_mv: f64,
    pub max_current_a: f64,
    /// Time the relay contacts need after switching.
    pub relay_settle: Duration,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            ambient_mv: 0.0,
            heat_gain_mv_per_a_s: 0.05,
            loss_per_s: 0.001,
            gradient_gain_mv_per_a: 1.0,
            resistance_ohm: 120.0,
            resistance_coeff_per_mv: 0.004,
            polarity_offset_ohm: 0.5,
            seebeck_uv_per_mv: 40.0,
            max_current_a: 10.0,
            relay_settle: Duration::ZERO,
        }
    }
}

#[derive(Debug)]
struct RigState {
    params: SimParams,
    bottom_mv: f64,
    furnace_a: f64,
    gradient_a: f64,
    furnace_on: bool,
    gradient_on: bool,
    reversed: bool,
    switched_at: Option<Instant>,
    online: bool,
    failing_reads: u32,
}

impl RigState {
    fn gradient_mv(&self) -> f64 {
        if self.gradient_on {
            self.params.gradient_gain_mv_per_a * self.gradient_a
        } else {
            0.0
        }
    }

    fn top_mv(&self) -> f64 {
        self.bottom_mv + self.gradient_mv()
    }

    fn resistance(&self) -> f64 {
        let p = &self.params;
        let r = p.resistance_ohm * (1.0 + p.resistance_coeff_per_mv * self.bottom_mv);
        if self.reversed {
            r - p.polarity_offset_ohm
        } else {
            r + p.polarity_offset_ohm
        }
    }

    fn advance(&mut self, dt: Duration) {
        let p = &self.params;
        let heating = if self.furnace_on {
            p.heat_gain_mv_per_a_s * self.furnace_a
        } else {
            0.0
        };
        let loss = p.loss_per_s * (self.bottom_mv - p.ambient_mv);
        self.bottom_mv += (heating - loss) * dt.as_secs_f64();
    }

    /// Consume one injected failure, if any.
    fn take_failure(&mut self) -> Option<HwError> {
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            Some(HwError::Timeout)
        } else {
            None
        }
    }

    fn settled(&self) -> bool {
        self.switched_at
            .is_none_or(|t| t.elapsed() >= self.params.relay_settle)
    }
}

/// Shared state of the simulated rig. Cloning gives another handle to the
/// same model.
#[derive(Debug, Clone)]
pub struct ThermalModel {
    state: Arc<Mutex<RigState>>,
}

impl ThermalModel {
    pub fn new(params: SimParams) -> Self {
        let bottom_mv = params.ambient_mv;
        Self {
            state: Arc::new(Mutex::new(RigState {
                params,
                bottom_mv,
                furnace_a: 0.0,
                gradient_a: 0.0,
                furnace_on: false,
                gradient_on: false,
                reversed: false,
                switched_at: None,
                online: true,
                failing_reads: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RigState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn bottom_mv(&self) -> f64 {
        self.lock().bottom_mv
    }

    pub fn top_mv(&self) -> f64 {
        self.lock().top_mv()
    }

    pub fn furnace_current(&self) -> f64 {
        self.lock().furnace_a
    }

    pub fn gradient_current(&self) -> f64 {
        self.lock().gradient_a
    }

    pub fn is_reversed(&self) -> bool {
        self.lock().reversed
    }

    /// Integrate the model over `dt`.
    pub fn advance(&self, dt: Duration) {
        self.lock().advance(dt);
    }

    /// Take every instrument offline (or back online).
    pub fn set_online(&self, online: bool) {
        self.lock().online = online;
    }

    /// The next `n` instrument reads fail with [`HwError::Timeout`].
    pub fn fail_next_reads(&self, n: u32) {
        self.lock().failing_reads = n;
    }

    pub fn top_thermocouple(&self) -> SimThermocouple {
        SimThermocouple {
            model: self.clone(),
            position: Position::Top,
        }
    }

    /// The bottom thermocouple advances the model by `tick` on every read,
    /// so one engine tick is one integration step.
    pub fn bottom_thermocouple(&self, tick: Duration) -> SimThermocouple {
        SimThermocouple {
            model: self.clone(),
            position: Position::Bottom(tick),
        }
    }

    pub fn ohmmeter(&self) -> SimOhmmeter {
        SimOhmmeter {
            model: self.clone(),
        }
    }

    pub fn furnace(&self) -> SimSupply {
        SimSupply {
            model: self.clone(),
            channel: Channel::Furnace,
            volts: 0.0,
        }
    }

    pub fn gradient_supply(&self) -> SimSupply {
        SimSupply {
            model: self.clone(),
            channel: Channel::Gradient,
            volts: 0.0,
        }
    }

    pub fn relay(&self) -> SimRelay {
        SimRelay {
            model: self.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Position {
    Top,
    Bottom(Duration),
}

/// Thermocouple voltmeter. Reads in volts.
#[derive(Debug, Clone)]
pub struct SimThermocouple {
    model: ThermalModel,
    position: Position,
}

impl VoltageMeter for SimThermocouple {
    fn is_ready(&self) -> bool {
        self.model.lock().online
    }

    fn read_voltage(&mut self, range_volts: f64) -> Result<f64, DeviceError> {
        let mut s = self.model.lock();
        if let Some(e) = s.take_failure() {
            return Err(Box::new(e));
        }
        let mv = match self.position {
            Position::Top => s.top_mv(),
            Position::Bottom(tick) => {
                s.advance(tick);
                s.bottom_mv
            }
        };
        let volts = mv / 1000.0;
        if volts.abs() > range_volts {
            return Err(Box::new(HwError::OutOfRange {
                value: volts,
                range: range_volts,
            }));
        }
        tracing::trace!(position = ?self.position, mv, "thermocouple sample");
        Ok(volts)
    }
}

/// Ohmmeter across the sample. Its voltmeter function reads the sample's
/// thermo-EMF.
#[derive(Debug, Clone)]
pub struct SimOhmmeter {
    model: ThermalModel,
}

impl ResistanceMeter for SimOhmmeter {
    fn is_ready(&self) -> bool {
        self.model.lock().online
    }

    fn read_resistance(&mut self, range_ohms: f64) -> Result<f64, DeviceError> {
        let (settle, switched) = {
            let s = self.model.lock();
            (s.params.relay_settle, s.switched_at.is_some())
        };
        if switched && !settle.is_zero() {
            let model = self.model.clone();
            wait_until_settled_with_timeout(
                || model.lock().settled(),
                SETTLE_TIMEOUT,
                SETTLE_POLL,
            )?;
        }
        let mut s = self.model.lock();
        if let Some(e) = s.take_failure() {
            return Err(Box::new(e));
        }
        let r = s.resistance();
        if r > range_ohms {
            return Err(Box::new(HwError::OutOfRange {
                value: r,
                range: range_ohms,
            }));
        }
        tracing::trace!(ohm = r, reversed = s.reversed, "resistance sample");
        Ok(r)
    }

    fn voltage_meter(&mut self) -> Option<&mut dyn VoltageMeter> {
        Some(self)
    }
}

impl VoltageMeter for SimOhmmeter {
    fn is_ready(&self) -> bool {
        self.model.lock().online
    }

    fn read_voltage(&mut self, range_volts: f64) -> Result<f64, DeviceError> {
        let mut s = self.model.lock();
        if let Some(e) = s.take_failure() {
            return Err(Box::new(e));
        }
        let volts = s.params.seebeck_uv_per_mv * s.gradient_mv() * 1e-6;
        if volts.abs() > range_volts {
            return Err(Box::new(HwError::OutOfRange {
                value: volts,
                range: range_volts,
            }));
        }
        Ok(volts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Furnace,
    Gradient,
}

/// One DC supply channel.
#[derive(Debug, Clone)]
pub struct SimSupply {
    model: ThermalModel,
    channel: Channel,
    volts: f64,
}

impl SimSupply {
    pub fn voltage(&self) -> f64 {
        self.volts
    }
}

impl PowerSupply for SimSupply {
    fn is_ready(&self) -> bool {
        self.model.lock().online
    }

    fn set_current(&mut self, amps: f64) -> Option<f64> {
        let mut s = self.model.lock();
        if !amps.is_finite() || amps < 0.0 || amps > s.params.max_current_a {
            tracing::warn!(channel = ?self.channel, amps, "current rejected");
            return None;
        }
        match self.channel {
            Channel::Furnace => s.furnace_a = amps,
            Channel::Gradient => s.gradient_a = amps,
        }
        Some(amps)
    }

    fn set_voltage(&mut self, volts: f64) -> Option<f64> {
        if !volts.is_finite() || volts < 0.0 {
            tracing::warn!(channel = ?self.channel, volts, "voltage rejected");
            return None;
        }
        self.volts = volts;
        Some(volts)
    }

    fn set_power(&mut self, volts: f64, amps: f64) {
        self.set_voltage(volts);
        self.set_current(amps);
    }

    fn turn_on(&mut self, on: bool) -> bool {
        let mut s = self.model.lock();
        match self.channel {
            Channel::Furnace => s.furnace_on = on,
            Channel::Gradient => s.gradient_on = on,
        }
        tracing::debug!(channel = ?self.channel, on, "supply output");
        on
    }
}

/// Polarity relay in front of the ohmmeter.
#[derive(Debug, Clone)]
pub struct SimRelay {
    model: ThermalModel,
}

impl PolarityRelay for SimRelay {
    fn set_channels(&mut self, reversed: bool) -> Result<(), DeviceError> {
        let mut s = self.model.lock();
        if !s.online {
            return Err(Box::new(HwError::NotReady("relay".into())));
        }
        if s.reversed != reversed {
            s.reversed = reversed;
            s.switched_at = Some(Instant::now());
        }
        Ok(())
    }

    fn release(&mut self) {
        let mut s = self.model.lock();
        s.reversed = false;
        s.switched_at = None;
        tracing::debug!("relay released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn furnace_heats_only_when_on() {
        let model = ThermalModel::new(SimParams::default());
        let mut furnace = model.furnace();
        assert_eq!(furnace.set_current(1.0), Some(1.0));
        model.advance(Duration::from_secs(10));
        assert_eq!(model.bottom_mv(), 0.0);

        furnace.turn_on(true);
        model.advance(Duration::from_secs(10));
        assert!((model.bottom_mv() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn current_above_limit_is_rejected() {
        let model = ThermalModel::new(SimParams {
            max_current_a: 2.0,
            ..SimParams::default()
        });
        let mut supply = model.gradient_supply();
        assert_eq!(supply.set_current(2.5), None);
        assert_eq!(supply.set_current(-0.1), None);
        assert_eq!(supply.set_current(1.5), Some(1.5));
        assert_eq!(model.gradient_current(), 1.5);
    }

    #[test]
    fn reversed_polarity_removes_offset() {
        let model = ThermalModel::new(SimParams::default());
        let mut ohm = model.ohmmeter();
        let mut relay = model.relay();
        let fwd = ohm.read_resistance(1000.0).unwrap();
        relay.set_channels(true).unwrap();
        let rev = ohm.read_resistance(1000.0).unwrap();
        assert!((fwd - 120.5).abs() < 1e-9);
        assert!((rev - 119.5).abs() < 1e-9);
        relay.release();
        assert!(!model.is_reversed());
    }
}
