//! Simulated instruments for the measurement rig.
//!
//! [`sim::ThermalModel`] is a small lumped model of the furnace, the
//! gradient heater and the sample. Every device handed out by the model
//! shares its state, so the thermocouples see what the supplies did.
pub mod error;
pub mod sim;
pub mod util;

pub use sim::{SimOhmmeter, SimParams, SimRelay, SimSupply, SimThermocouple, ThermalModel};
