use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("invalid state: {0}")]
    State(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("measurement worker is not running")]
    Disconnected,
    #[error("device timeout")]
    Timeout,
    #[error("device error: {0}")]
    Device(String),
    #[error("device fault: {0}")]
    DeviceFault(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing thermocouples")]
    MissingThermocouples,
    #[error("missing ohmmeter")]
    MissingOhmmeter,
    #[error("missing furnace supply")]
    MissingFurnace,
    #[error("{0} is not ready")]
    NotReady(&'static str),
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
