mod cli;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use remf_core::conversions::steps_from_config;
use remf_core::thermocouple::{mv_to_celsius, mv_to_kelvin};
use serde_json::json;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::RunOpts;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if !cli.json {
        let _ = color_eyre::install();
    }

    if let Err(e) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    // Convert needs neither config nor logging
    if let Commands::Convert { mv } = cli.cmd {
        return convert(mv, cli.json);
    }

    let cfg = load_config(&cli.config, cli.steps.as_deref())?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging);
    tracing::debug!(config = %cli.config.display(), steps = cfg.steps.len(), "config loaded");

    match cli.cmd {
        Commands::Run {
            max_ticks,
            output,
            interval_ms,
            samples,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "failed to install Ctrl-C handler");
            }
            let opts = RunOpts {
                max_ticks,
                output: output.as_deref(),
                interval_ms,
                samples,
                json: cli.json,
            };
            run::run(&cfg, steps_from_config(&cfg), &opts, &shutdown)?;
            Ok(())
        }
        Commands::Check => check(&cfg, cli.json),
        Commands::Convert { .. } => Ok(()),
    }
}

/// Read, parse and validate the TOML; a steps CSV replaces `[[steps]]`.
fn load_config(path: &Path, steps_csv: Option<&Path>) -> eyre::Result<remf_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let mut cfg = remf_config::load_toml(&text)
        .wrap_err_with(|| format!("parse config {}", path.display()))?;
    if let Some(csv) = steps_csv {
        cfg.steps = remf_config::load_steps_csv(csv)?;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn init_tracing(json: bool, console_level: &str, logging: &remf_config::Logging) {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(console_level));
    let console = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    };

    let file_layer = logging.file.as_deref().map(|file| {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path.file_name().map_or_else(
            || std::ffi::OsString::from("remf.log"),
            std::ffi::OsStr::to_os_string,
        );
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let level = logging.level.as_deref().unwrap_or("info");
        tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(EnvFilter::new(level))
    });

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init();
}

fn check(cfg: &remf_config::Config, json: bool) -> eyre::Result<()> {
    let steps = steps_from_config(cfg);
    if json {
        let rows: Vec<_> = steps
            .iter()
            .map(|s| {
                json!({
                    "kind": s.kind().as_str(),
                    "from_mv": s.from(),
                    "to_mv": s.to(),
                    "step_mv": s.step(),
                    "point_range_mv": s.point_range(),
                })
            })
            .collect();
        println!(
            "{}",
            json!({
                "ok": true,
                "interval_ms": cfg.sampling.interval_ms,
                "steps": rows,
            })
        );
        return Ok(());
    }
    println!("config ok: {} steps, interval {} ms", steps.len(), cfg.sampling.interval_ms);
    if !steps.is_empty() {
        println!(
            "{:>3}  {:<8} {:>9} {:>9} {:>8} {:>8}",
            "#", "kind", "from_mv", "to_mv", "step", "range"
        );
    }
    for (i, s) in steps.iter().enumerate() {
        println!(
            "{:>3}  {:<8} {:>9.3} {:>9.3} {:>8.3} {:>8.3}",
            i,
            s.kind().as_str(),
            s.from(),
            s.to(),
            s.step(),
            s.point_range()
        );
    }
    Ok(())
}

fn convert(mv: f64, json: bool) -> eyre::Result<()> {
    if !mv.is_finite() {
        eyre::bail!("--mv is not a finite number: {mv}");
    }
    let c = mv_to_celsius(mv);
    let k = mv_to_kelvin(mv);
    if json {
        println!("{}", json!({ "mv": mv, "celsius": c, "kelvin": k }));
    } else {
        println!("{mv} mV = {c:.2} °C = {k:.2} K");
    }
    Ok(())
}
