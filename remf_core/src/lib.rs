#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Measurement and control loop for a resistance / thermo-EMF rig
//! (hardware-agnostic).
//!
//! All instrument access goes through the `remf_traits` boundaries
//! (`VoltageMeter`, `ResistanceMeter`, `PowerSupply`, `PolarityRelay`).
//!
//! ## Architecture
//!
//! - **Program**: `Selection` of `StepSettings`, walked by `StepTracker`
//! - **Feedback**: `GradientController` (top vs bottom) and `RateController`
//!   (smoothed ramp rate, built on `MovingAverage`)
//! - **Engine**: `MeasurementEngine::tick` samples, measures at checkpoints
//!   and nudges both supplies
//! - **Worker**: `MeasurementCore` runs ticks on a dedicated thread
//! - **Output**: `MeasuredValues` snapshots and the tab-separated
//!   `ResultRecorder`
//!
//! All temperatures are thermocouple millivolts; `thermocouple` converts to
//! degrees for display.

pub mod builder;
pub mod config;
pub mod conversions;
pub mod engine;
pub mod error;
pub mod gradient;
pub mod hw_error;
pub mod measured;
pub mod mocks;
pub mod moving_average;
pub mod rate;
pub mod recorder;
pub mod selection;
pub mod step;
pub mod thermocouple;
pub mod tracker;
pub mod worker;

pub use crate::builder::{EngineBuilder, Missing, Set};
pub use crate::config::CoreCfg;
pub use crate::engine::{EngineStatus, MeasurementEngine, MeasurementEvent, Tick};
pub use crate::error::{BuildError, CoreError, Report, Result};
pub use crate::gradient::{GradientController, Nudge};
pub use crate::measured::MeasuredValues;
pub use crate::moving_average::MovingAverage;
pub use crate::rate::RateController;
pub use crate::recorder::ResultRecorder;
pub use crate::selection::{Selection, SelectionChanged};
pub use crate::step::{Ramp, StepKind, StepSettings};
pub use crate::tracker::StepTracker;
pub use crate::worker::MeasurementCore;
