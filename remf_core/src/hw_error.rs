//! Maps `Box<dyn Error>` from instrument boundaries to typed `CoreError`.
//!
//! With the `hardware-errors` feature the simulated rig's `HwError` is
//! downcast for a precise mapping; anything else falls back to string
//! heuristics.

use crate::error::CoreError;

/// Map a trait-boundary error to a typed `CoreError`.
pub fn map_device_error(e: &(dyn std::error::Error + 'static)) -> CoreError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<remf_hardware::error::HwError>() {
            return match hw {
                remf_hardware::error::HwError::Timeout => CoreError::Timeout,
                other => CoreError::DeviceFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        CoreError::Timeout
    } else {
        CoreError::Device(s)
    }
}

/// Unwrap a device reading, logging and substituting NaN on failure.
///
/// A single bad reading must never abort the program; NaN propagates to the
/// snapshot and the feedback loops skip it.
pub(crate) fn reading_or_nan(
    device: &'static str,
    r: Result<f64, remf_traits::DeviceError>,
) -> f64 {
    match r {
        Ok(v) => v,
        Err(e) => {
            let mapped = map_device_error(e.as_ref());
            tracing::warn!(device, error = %mapped, "device read failed");
            f64::NAN
        }
    }
}
