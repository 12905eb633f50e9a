//! `remf run`: drive the step program against the simulated rig.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use remf_config::{Config, Simulation};
use remf_core::config::clamp_interval;
use remf_core::error::Result;
use remf_core::thermocouple::mv_to_celsius;
use remf_core::{
    CoreCfg, MeasuredValues, MeasurementCore, MeasurementEngine, MeasurementEvent, ResultRecorder,
    StepSettings,
};
use remf_hardware::{SimParams, ThermalModel};
use serde_json::json;

/// Options of one `run` invocation.
#[derive(Debug, Clone, Default)]
pub struct RunOpts<'a> {
    pub max_ticks: Option<u64>,
    pub output: Option<&'a Path>,
    pub interval_ms: Option<u64>,
    pub samples: bool,
    pub json: bool,
}

/// Totals reported when the run ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub measurements: u64,
    pub finished: bool,
    pub interrupted: bool,
}

pub fn sim_params(sim: &Simulation) -> SimParams {
    SimParams {
        ambient_mv: sim.ambient_mv,
        heat_gain_mv_per_a_s: sim.heat_gain_mv_per_a_s,
        loss_per_s: sim.loss_per_s,
        gradient_gain_mv_per_a: sim.gradient_gain_mv_per_a,
        resistance_ohm: sim.resistance_ohm,
        resistance_coeff_per_mv: sim.resistance_coeff_per_mv,
        polarity_offset_ohm: sim.polarity_offset_ohm,
        seebeck_uv_per_mv: sim.seebeck_uv_per_mv,
        max_current_a: sim.max_current_a,
        relay_settle: Duration::from_millis(sim.relay_settle_ms),
    }
}

/// Wire the simulated instruments into an engine.
pub fn build_engine(
    cfg: &Config,
    steps: Vec<StepSettings>,
    interval_ms: Option<u64>,
) -> Result<(MeasurementEngine, ThermalModel)> {
    let mut core_cfg = CoreCfg::from(cfg);
    if let Some(ms) = interval_ms {
        core_cfg.interval = Duration::from_millis(ms);
    }
    let interval = clamp_interval(core_cfg.interval);
    let model = ThermalModel::new(sim_params(&cfg.simulation));
    let sim_tick = interval.mul_f64(cfg.simulation.time_scale);

    let mut builder = MeasurementEngine::builder()
        .with_thermocouples(model.top_thermocouple(), model.bottom_thermocouple(sim_tick))
        .with_ohmmeter(model.ohmmeter())
        .with_furnace(model.furnace())
        .with_config(core_cfg)
        .with_steps(steps);
    if cfg.simulation.gradient_supply {
        builder = builder.with_gradient_supply(model.gradient_supply());
    }
    if cfg.simulation.relay {
        builder = builder.with_relay(model.relay());
    }
    Ok((builder.build()?, model))
}

fn finite(x: f64) -> Option<f64> {
    x.is_finite().then_some(x)
}

fn values_json(kind: &str, m: &MeasuredValues) -> serde_json::Value {
    json!({
        "event": kind,
        "timestamp": m.timestamp().to_rfc3339(),
        "bottom_mv": finite(m.bottom_mv()),
        "top_mv": finite(m.top_mv()),
        "bottom_c": finite(m.bottom_celsius()),
        "resistance_ohm": finite(m.resistance()),
        "reverse_resistance_ohm": finite(m.reverse_resistance()),
        "thermo_emf_uv": finite(m.thermo_emf_uv()),
    })
}

fn print_event(ev: &MeasurementEvent, opts: &RunOpts<'_>) {
    match ev {
        MeasurementEvent::VoltageSampled(m) if opts.samples => {
            if opts.json {
                println!("{}", values_json("sample", m));
            } else {
                println!(
                    "sample      bottom={:>8.4} mV ({:>7.2} °C)  top={:>8.4} mV",
                    m.bottom_mv(),
                    mv_to_celsius(m.bottom_mv()),
                    m.top_mv()
                );
            }
        }
        MeasurementEvent::VoltageSampled(_) => {}
        MeasurementEvent::ResistanceMeasured(m) => {
            if opts.json {
                println!("{}", values_json("measurement", m));
            } else {
                println!(
                    "measurement bottom={:>8.4} mV ({:>7.2} °C)  R={:.4} Ω  R_rev={:.4} Ω  EMF={:.3} µV",
                    m.bottom_mv(),
                    m.bottom_celsius(),
                    m.resistance(),
                    m.reverse_resistance(),
                    m.thermo_emf_uv()
                );
            }
        }
        MeasurementEvent::StepChanged { from, to, kind } => {
            if opts.json {
                println!(
                    "{}",
                    json!({
                        "event": "step_changed",
                        "from": from,
                        "to": to,
                        "kind": kind.map(|k| k.as_str()),
                    })
                );
            } else {
                match (to, kind) {
                    (Some(i), Some(k)) => println!("step        -> {i} ({})", k.as_str()),
                    _ => println!("step        program finished"),
                }
            }
        }
    }
}

/// Run until the program finishes, `max_ticks` elapse or `shutdown` is set.
pub fn run(
    cfg: &Config,
    steps: Vec<StepSettings>,
    opts: &RunOpts<'_>,
    shutdown: &Arc<AtomicBool>,
) -> Result<RunSummary> {
    let mut recorder = opts
        .output
        .map(ResultRecorder::<std::fs::File>::create)
        .transpose()?;
    let (engine, _model) = build_engine(cfg, steps, opts.interval_ms)?;
    let mut core = MeasurementCore::spawn(engine)?;
    let rx = core.subscribe()?;
    let interval = core.status()?.interval;
    core.start_measurements()?;
    tracing::info!(interval_ms = interval.as_millis() as u64, "run start");

    let mut summary = RunSummary::default();
    let wait = interval.saturating_mul(4);
    loop {
        if shutdown.load(Ordering::Relaxed) {
            summary.interrupted = true;
            break;
        }
        if opts.max_ticks.is_some_and(|n| summary.ticks >= n) {
            break;
        }
        let ev = match rx.recv_timeout(wait) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(wait_ms = wait.as_millis() as u64, "no sample from the worker");
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(remf_core::CoreError::Disconnected.into());
            }
        };
        print_event(&ev, opts);
        match &ev {
            MeasurementEvent::VoltageSampled(_) => summary.ticks += 1,
            MeasurementEvent::ResistanceMeasured(m) => {
                summary.measurements += 1;
                if let Some(rec) = recorder.as_mut() {
                    rec.record(m)?;
                }
            }
            MeasurementEvent::StepChanged { to: None, .. } => {
                summary.finished = true;
                break;
            }
            MeasurementEvent::StepChanged { .. } => {}
        }
    }

    core.shutdown()?;
    tracing::info!(
        ticks = summary.ticks,
        measurements = summary.measurements,
        finished = summary.finished,
        "run end"
    );
    if opts.json {
        println!(
            "{}",
            json!({
                "event": "summary",
                "ticks": summary.ticks,
                "measurements": summary.measurements,
                "finished": summary.finished,
                "interrupted": summary.interrupted,
            })
        );
    } else {
        println!(
            "run complete: {} ticks, {} measurements{}",
            summary.ticks,
            summary.measurements,
            if summary.finished { ", program finished" } else { "" }
        );
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_params_follow_config() {
        let sim = Simulation {
            relay_settle_ms: 20,
            resistance_ohm: 50.0,
            ..Simulation::default()
        };
        let p = sim_params(&sim);
        assert_eq!(p.relay_settle, Duration::from_millis(20));
        assert_eq!(p.resistance_ohm, 50.0);
    }

    #[test]
    fn engine_without_optional_devices() {
        let mut cfg = Config::default();
        cfg.simulation.gradient_supply = false;
        cfg.simulation.relay = false;
        let (engine, _model) = build_engine(&cfg, Vec::new(), Some(50)).unwrap();
        let status = engine.status();
        assert_eq!(status.interval, Duration::from_millis(200));
        assert_eq!(status.gradient_current_a, None);
    }

    #[test]
    fn nan_fields_become_null() {
        let m = MeasuredValues::temperatures(1.0, 1.1);
        let v = values_json("sample", &m);
        assert_eq!(v["bottom_mv"], 1.0);
        assert!(v["resistance_ohm"].is_null());
    }
}
