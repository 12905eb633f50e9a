//! Type K thermocouple voltage to temperature (NIST ITS-90 inverse
//! polynomials, cold junction at 0 °C).
//!
//! Exact between -5.891 mV (-200 °C) and 54.886 mV (1372 °C); values outside
//! that span are extrapolated and should not be trusted.

const KELVIN_OFFSET: f64 = 273.15;
/// Upper edge of the middle range (500 °C).
const MIDDLE_RANGE_END_MV: f64 = 20.644;

const LOW: [f64; 9] = [
    0.0,
    2.517_346_2e1,
    -1.166_287_8,
    -1.083_363_8,
    -8.977_354_0e-1,
    -3.734_237_7e-1,
    -8.663_264_3e-2,
    -1.045_059_8e-2,
    -5.192_057_7e-4,
];

const MIDDLE: [f64; 10] = [
    0.0,
    2.508_355e1,
    7.860_106e-2,
    -2.503_131e-1,
    8.315_270e-2,
    -1.228_034e-2,
    9.804_036e-4,
    -4.413_030e-5,
    1.057_734e-6,
    -1.052_755e-8,
];

const HIGH: [f64; 7] = [
    -1.318_058e2,
    4.830_222e1,
    -1.646_031,
    5.464_731e-2,
    -9.650_715e-4,
    8.802_193e-6,
    -3.110_810e-8,
];

#[inline]
fn horner(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc.mul_add(x, c))
}

pub fn mv_to_celsius(mv: f64) -> f64 {
    if mv < 0.0 {
        horner(&LOW, mv)
    } else if mv < MIDDLE_RANGE_END_MV {
        horner(&MIDDLE, mv)
    } else {
        horner(&HIGH, mv)
    }
}

pub fn mv_to_kelvin(mv: f64) -> f64 {
    mv_to_celsius(mv) + KELVIN_OFFSET
}
