//! Immutable measurement snapshots.

use chrono::{DateTime, Utc};

use crate::thermocouple;

/// One sample of the rig. Fields not measured on a tick are NaN.
///
/// Thermocouple readings are in mV, resistances in ohms and the thermo-EMF in
/// µV.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredValues {
    timestamp: DateTime<Utc>,
    top_mv: f64,
    bottom_mv: f64,
    resistance: f64,
    reverse_resistance: f64,
    thermo_emf_uv: f64,
}

impl MeasuredValues {
    /// A temperature-only sample.
    pub fn temperatures(bottom_mv: f64, top_mv: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            top_mv,
            bottom_mv,
            resistance: f64::NAN,
            reverse_resistance: f64::NAN,
            thermo_emf_uv: f64::NAN,
        }
    }

    pub fn with_resistance(self, resistance: f64, reverse_resistance: f64) -> Self {
        Self {
            resistance,
            reverse_resistance,
            ..self
        }
    }

    pub fn with_thermo_emf(self, thermo_emf_uv: f64) -> Self {
        Self {
            thermo_emf_uv,
            ..self
        }
    }

    pub fn at(self, timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, ..self }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
    pub fn top_mv(&self) -> f64 {
        self.top_mv
    }
    pub fn bottom_mv(&self) -> f64 {
        self.bottom_mv
    }
    pub fn resistance(&self) -> f64 {
        self.resistance
    }
    pub fn reverse_resistance(&self) -> f64 {
        self.reverse_resistance
    }
    pub fn thermo_emf_uv(&self) -> f64 {
        self.thermo_emf_uv
    }

    /// Top minus bottom (mV).
    pub fn gradient_mv(&self) -> f64 {
        self.top_mv - self.bottom_mv
    }

    pub fn bottom_celsius(&self) -> f64 {
        thermocouple::mv_to_celsius(self.bottom_mv)
    }

    pub fn top_celsius(&self) -> f64 {
        thermocouple::mv_to_celsius(self.top_mv)
    }

    /// Column names matching the `Display` line.
    pub fn header() -> &'static str {
        "Time\tBottomTemperature(mV)\tTopTemperature(mV)\tResistance(Ohm)\tReverseResistance(Ohm)\tThermoEMF(uV)"
    }
}

/// Tab separated, in `header()` order.
impl core::fmt::Display for MeasuredValues {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.timestamp.to_rfc3339(),
            self.bottom_mv,
            self.top_mv,
            self.resistance,
            self.reverse_resistance,
            self.thermo_emf_uv
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_has_one_field_per_column() {
        let m = MeasuredValues::temperatures(1.0, 1.5).with_resistance(10.0, 10.5);
        let cols = MeasuredValues::header().split('\t').count();
        assert_eq!(m.to_string().split('\t').count(), cols);
        assert!(m.to_string().ends_with("\t1\t1.5\t10\t10.5\tNaN"));
    }

    #[test]
    fn gradient_is_top_minus_bottom() {
        let m = MeasuredValues::temperatures(1.0, 1.25);
        assert_eq!(m.gradient_mv(), 0.25);
        assert!(m.thermo_emf_uv().is_nan());
    }
}
