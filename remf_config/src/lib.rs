#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and step-program parsing for the measurement rig.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - A step program can come from `[[steps]]` tables or from a CSV file with
//!   a strict header.
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    #[default]
    NotAssigned,
    Waiting,
    Heating,
    Cooling,
    Done,
}

/// One program step. Voltages are thermocouple millivolts.
///
/// CSV schema, expected headers:
/// kind,from_mv,to_mv,step_mv,point_range_mv
///
/// Example:
/// kind,from_mv,to_mv,step_mv,point_range_mv
/// heating,0.0,4.0,0.1,0.01
/// cooling,4.0,0.0,0.1,0.01
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StepRow {
    pub kind: StepKind,
    pub from_mv: f64,
    pub to_mv: f64,
    #[serde(default = "default_step_mv")]
    pub step_mv: f64,
    #[serde(default = "default_point_range_mv")]
    pub point_range_mv: f64,
}

fn default_step_mv() -> f64 {
    0.1
}

fn default_point_range_mv() -> f64 {
    0.01
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sampling {
    /// Tick period in ms; the core clamps it to 200..=10000.
    pub interval_ms: u64,
}

impl Default for Sampling {
    fn default() -> Self {
        Self { interval_ms: 500 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GradientCfg {
    /// Target top-minus-bottom difference (mV)
    pub size_mv: f64,
    /// Tolerance band (mV); defaults to 10% of size_mv
    pub stability_mv: Option<f64>,
}

impl Default for GradientCfg {
    fn default() -> Self {
        Self {
            size_mv: 0.1,
            stability_mv: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RateCfg {
    pub target_mv_per_s: f64,
    pub stability_mv_per_s: f64,
    /// History span (s) the ramp rate is averaged over
    pub window_s: f64,
}

impl Default for RateCfg {
    fn default() -> Self {
        Self {
            target_mv_per_s: 0.004,
            stability_mv_per_s: 0.0005,
            window_s: 4.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SupplyCfg {
    pub furnace_voltage: f64,
    pub gradient_voltage: f64,
    /// Current change per out-of-band tick (A)
    pub current_step_a: f64,
}

impl Default for SupplyCfg {
    fn default() -> Self {
        Self {
            furnace_voltage: 220.0,
            gradient_voltage: 220.0,
            current_step_a: 0.01,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MeasurementCfg {
    pub resistance: bool,
    pub thermo_emf: bool,
}

impl Default for MeasurementCfg {
    fn default() -> Self {
        Self {
            resistance: true,
            thermo_emf: false,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Parameters of the simulated rig used by `remf run`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Simulation {
    /// Starting (and ambient) thermocouple reading (mV)
    pub ambient_mv: f64,
    /// Heating per furnace amp, mV/s
    pub heat_gain_mv_per_a_s: f64,
    /// Fraction of the excess over ambient lost per second
    pub loss_per_s: f64,
    /// Top-minus-bottom difference per gradient amp (mV)
    pub gradient_gain_mv_per_a: f64,
    /// Sample resistance at 0 mV (ohm)
    pub resistance_ohm: f64,
    /// Relative resistance change per mV
    pub resistance_coeff_per_mv: f64,
    /// Parasitic offset removed by the reversed-polarity reading (ohm)
    pub polarity_offset_ohm: f64,
    /// Seebeck coefficient of the sample, µV per mV of gradient
    pub seebeck_uv_per_mv: f64,
    /// Supply current limit (A)
    pub max_current_a: f64,
    /// Simulated seconds per tick second; >1 runs the model faster
    pub time_scale: f64,
    /// Contact settle time of the polarity relay (ms)
    pub relay_settle_ms: u64,
    pub gradient_supply: bool,
    pub relay: bool,
}

impl Default for Simulation {
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
            time_scale: 1.0,
            relay_settle_ms: 0,
            gradient_supply: true,
            relay: true,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub sampling: Sampling,
    pub gradient: GradientCfg,
    pub rate: RateCfg,
    pub supply: SupplyCfg,
    pub measurement: MeasurementCfg,
    pub logging: Logging,
    pub simulation: Simulation,
    /// Ordered step program
    pub steps: Vec<StepRow>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_steps_csv(path: &std::path::Path) -> eyre::Result<Vec<StepRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open steps CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["kind", "from_mv", "to_mv", "step_mv", "point_range_mv"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "steps CSV must have headers 'kind,from_mv,to_mv,step_mv,point_range_mv', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<StepRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    validate_steps(&rows)?;
    Ok(rows)
}

fn positive(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

fn non_negative(x: f64) -> bool {
    x.is_finite() && x >= 0.0
}

/// Checks shared by `[[steps]]` tables and the CSV loader.
pub fn validate_steps(steps: &[StepRow]) -> eyre::Result<()> {
    for (i, s) in steps.iter().enumerate() {
        if matches!(s.kind, StepKind::NotAssigned | StepKind::Done) {
            eyre::bail!("steps[{i}].kind must be waiting, heating or cooling");
        }
        if !(s.from_mv.is_finite() && s.to_mv.is_finite()) {
            eyre::bail!("steps[{i}] from_mv/to_mv must be finite");
        }
        match s.kind {
            StepKind::Heating | StepKind::Waiting if s.to_mv < s.from_mv => {
                eyre::bail!("steps[{i}] ramps up, so to_mv must be >= from_mv");
            }
            StepKind::Cooling if s.to_mv > s.from_mv => {
                eyre::bail!("steps[{i}] ramps down, so to_mv must be <= from_mv");
            }
            _ => {}
        }
        if !positive(s.step_mv) {
            eyre::bail!("steps[{i}].step_mv must be > 0");
        }
        if !positive(s.point_range_mv) {
            eyre::bail!("steps[{i}].point_range_mv must be > 0");
        }
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sampling
        if self.sampling.interval_ms == 0 {
            eyre::bail!("sampling.interval_ms must be >= 1");
        }

        // Gradient
        if !self.gradient.size_mv.is_finite() {
            eyre::bail!("gradient.size_mv must be finite");
        }
        if let Some(s) = self.gradient.stability_mv
            && !s.is_finite()
        {
            eyre::bail!("gradient.stability_mv must be finite");
        }

        // Rate
        if !positive(self.rate.target_mv_per_s) {
            eyre::bail!("rate.target_mv_per_s must be > 0");
        }
        if !positive(self.rate.stability_mv_per_s) {
            eyre::bail!("rate.stability_mv_per_s must be > 0");
        }
        if !positive(self.rate.window_s) || self.rate.window_s > 3600.0 {
            eyre::bail!("rate.window_s must be in (0, 3600]");
        }

        // Supply
        if !positive(self.supply.current_step_a) || self.supply.current_step_a > 1.0 {
            eyre::bail!("supply.current_step_a must be in (0.0, 1.0]");
        }
        if !non_negative(self.supply.furnace_voltage) || !non_negative(self.supply.gradient_voltage) {
            eyre::bail!("supply voltages must be >= 0");
        }

        // Simulation
        if !positive(self.simulation.time_scale) {
            eyre::bail!("simulation.time_scale must be > 0");
        }
        if !positive(self.simulation.max_current_a) {
            eyre::bail!("simulation.max_current_a must be > 0");
        }
        if self.simulation.relay_settle_ms > 1000 {
            eyre::bail!("simulation.relay_settle_ms must be <= 1000");
        }
        if self.measurement.thermo_emf && !self.simulation.gradient_supply {
            eyre::bail!("measurement.thermo_emf requires simulation.gradient_supply");
        }

        validate_steps(&self.steps)
    }
}
