//! Instrument boundaries used by the measurement core.
//!
//! Drivers live outside the workspace; the core only sees these traits.
//! Fallible reads return a boxed error so any driver error type can cross
//! the boundary; `remf_core::hw_error` classifies them.

pub type DeviceError = Box<dyn std::error::Error + Send + Sync>;

/// A voltmeter channel. Thermocouples are read through this.
pub trait VoltageMeter {
    fn is_ready(&self) -> bool;

    /// Read a voltage in volts using the given measurement range (volts).
    fn read_voltage(&mut self, range_volts: f64) -> Result<f64, DeviceError>;
}

/// An ohmmeter, optionally able to double as a voltmeter for thermo-EMF.
pub trait ResistanceMeter {
    fn is_ready(&self) -> bool;

    /// Read a resistance in ohms using the given range (ohms).
    fn read_resistance(&mut self, range_ohms: f64) -> Result<f64, DeviceError>;

    /// Voltage capability of the same instrument, if it has one.
    fn voltage_meter(&mut self) -> Option<&mut dyn VoltageMeter> {
        None
    }
}

/// A programmable DC supply.
///
/// Setters return the value the supply actually accepted, or `None` when the
/// command was rejected.
pub trait PowerSupply {
    fn is_ready(&self) -> bool;
    fn set_current(&mut self, amps: f64) -> Option<f64>;
    fn set_voltage(&mut self, volts: f64) -> Option<f64>;
    fn set_power(&mut self, volts: f64, amps: f64);
    /// Switch the output. Returns the resulting output state.
    fn turn_on(&mut self, on: bool) -> bool;
}

/// Relay that swaps the polarity of the measurement current.
pub trait PolarityRelay {
    fn set_channels(&mut self, reversed: bool) -> Result<(), DeviceError>;

    /// Release the relay. Called once when the core shuts down.
    fn release(&mut self) {}
}
