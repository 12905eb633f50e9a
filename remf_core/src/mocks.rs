//! Test and helper mocks for remf_core.
//!
//! Every mock that needs to be inspected after it was moved into an engine
//! shares a [`RigLog`], which records instrument calls in order.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use remf_traits::{DeviceError, PolarityRelay, PowerSupply, ResistanceMeter, VoltageMeter};

/// One recorded instrument call.
#[derive(Debug, Clone, PartialEq)]
pub enum RigEvent {
    Resistance { range: f64, reversed: bool },
    ThermoEmf,
    Polarity(bool),
    RelayReleased,
    Voltage { supply: &'static str, volts: f64 },
    Current { supply: &'static str, amps: f64 },
    Output { supply: &'static str, on: bool },
}

#[derive(Debug, Default)]
struct LogState {
    events: Vec<RigEvent>,
    reversed: bool,
}

/// Shared, cloneable call log plus the relay position.
#[derive(Debug, Clone, Default)]
pub struct RigLog {
    inner: Arc<Mutex<LogState>>,
}

impl RigLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RigEvent> {
        self.lock().events.clone()
    }

    /// Currents sent to the named supply, in order.
    pub fn currents(&self, supply: &str) -> Vec<f64> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                RigEvent::Current { supply: s, amps } if *s == supply => Some(*amps),
                _ => None,
            })
            .collect()
    }

    pub fn is_reversed(&self) -> bool {
        self.lock().reversed
    }

    fn push(&self, e: RigEvent) {
        self.lock().events.push(e);
    }

    fn set_reversed(&self, reversed: bool) {
        self.lock().reversed = reversed;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LogState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Voltmeter that replays a script of readings and then repeats the last one.
#[derive(Debug, Clone)]
pub struct ScriptedMeter {
    volts: VecDeque<f64>,
    last: f64,
    ready: bool,
    failing: bool,
}

impl ScriptedMeter {
    /// Script given in thermocouple millivolts.
    pub fn millivolts(mv: impl IntoIterator<Item = f64>) -> Self {
        Self {
            volts: mv.into_iter().map(|x| x / 1000.0).collect(),
            last: 0.0,
            ready: true,
            failing: false,
        }
    }

    pub fn constant_mv(mv: f64) -> Self {
        let mut m = Self::millivolts(std::iter::empty());
        m.last = mv / 1000.0;
        m
    }

    pub fn not_ready() -> Self {
        Self {
            ready: false,
            ..Self::millivolts(std::iter::empty())
        }
    }

    /// Every read fails with a timeout error.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::millivolts(std::iter::empty())
        }
    }
}

impl VoltageMeter for ScriptedMeter {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn read_voltage(&mut self, _range_volts: f64) -> Result<f64, DeviceError> {
        if self.failing {
            return Err(Box::new(std::io::Error::other("read timeout")));
        }
        if let Some(v) = self.volts.pop_front() {
            self.last = v;
        }
        Ok(self.last)
    }
}

/// Ohmmeter returning `forward` or `reverse` depending on the relay position
/// in the shared log. Doubles as the thermo-EMF voltmeter.
#[derive(Debug, Clone)]
pub struct MockOhmmeter {
    log: RigLog,
    forward: f64,
    reverse: f64,
    emf_volts: f64,
    ready: bool,
}

impl MockOhmmeter {
    pub fn new(log: &RigLog, forward: f64, reverse: f64) -> Self {
        Self {
            log: log.clone(),
            forward,
            reverse,
            emf_volts: 0.0,
            ready: true,
        }
    }

    pub fn with_thermo_emf_volts(mut self, volts: f64) -> Self {
        self.emf_volts = volts;
        self
    }

    pub fn not_ready(mut self) -> Self {
        self.ready = false;
        self
    }
}

impl ResistanceMeter for MockOhmmeter {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn read_resistance(&mut self, range_ohms: f64) -> Result<f64, DeviceError> {
        let reversed = self.log.is_reversed();
        self.log.push(RigEvent::Resistance {
            range: range_ohms,
            reversed,
        });
        Ok(if reversed { self.reverse } else { self.forward })
    }

    fn voltage_meter(&mut self) -> Option<&mut dyn VoltageMeter> {
        Some(self)
    }
}

impl VoltageMeter for MockOhmmeter {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn read_voltage(&mut self, _range_volts: f64) -> Result<f64, DeviceError> {
        self.log.push(RigEvent::ThermoEmf);
        Ok(self.emf_volts)
    }
}

/// Supply that accepts currents up to `max_current` and logs every command.
#[derive(Debug, Clone)]
pub struct MockSupply {
    log: RigLog,
    name: &'static str,
    max_current: f64,
    ready: bool,
    on: bool,
}

impl MockSupply {
    pub fn new(log: &RigLog, name: &'static str) -> Self {
        Self {
            log: log.clone(),
            name,
            max_current: f64::INFINITY,
            ready: true,
            on: false,
        }
    }

    pub fn with_max_current(mut self, amps: f64) -> Self {
        self.max_current = amps;
        self
    }

    pub fn not_ready(mut self) -> Self {
        self.ready = false;
        self
    }
}

impl PowerSupply for MockSupply {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn set_current(&mut self, amps: f64) -> Option<f64> {
        if !(0.0..=self.max_current).contains(&amps) {
            return None;
        }
        self.log.push(RigEvent::Current {
            supply: self.name,
            amps,
        });
        Some(amps)
    }

    fn set_voltage(&mut self, volts: f64) -> Option<f64> {
        self.log.push(RigEvent::Voltage {
            supply: self.name,
            volts,
        });
        Some(volts)
    }

    fn set_power(&mut self, volts: f64, amps: f64) {
        self.set_voltage(volts);
        self.set_current(amps);
    }

    fn turn_on(&mut self, on: bool) -> bool {
        self.on = on;
        self.log.push(RigEvent::Output {
            supply: self.name,
            on,
        });
        self.on
    }
}

/// Relay that flips the shared polarity flag.
#[derive(Debug, Clone)]
pub struct MockRelay {
    log: RigLog,
    failing: bool,
}

impl MockRelay {
    pub fn new(log: &RigLog) -> Self {
        Self {
            log: log.clone(),
            failing: false,
        }
    }

    /// Every switch attempt fails.
    pub fn failing(log: &RigLog) -> Self {
        Self {
            log: log.clone(),
            failing: true,
        }
    }
}

impl PolarityRelay for MockRelay {
    fn set_channels(&mut self, reversed: bool) -> Result<(), DeviceError> {
        if self.failing {
            return Err(Box::new(std::io::Error::other("relay stuck")));
        }
        self.log.set_reversed(reversed);
        self.log.push(RigEvent::Polarity(reversed));
        Ok(())
    }

    fn release(&mut self) {
        self.log.set_reversed(false);
        self.log.push(RigEvent::RelayReleased);
    }
}
