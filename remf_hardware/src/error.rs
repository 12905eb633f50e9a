use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("instrument timeout")]
    Timeout,
    #[error("{0} is not ready")]
    NotReady(String),
    #[error("reading {value} exceeds range {range}")]
    OutOfRange { value: f64, range: f64 },
    #[error("relay settle timeout")]
    SettleTimeout,
}

pub type Result<T> = std::result::Result<T, HwError>;
