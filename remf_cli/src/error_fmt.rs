//! Human-readable error descriptions and structured JSON error formatting.

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use remf_core::error::{BuildError, CoreError};

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingThermocouples => {
                "What happened: No thermocouples were provided to the measurement engine.\nLikely causes: The rig was not wired into the builder.\nHow to fix: Pass both meters via with_thermocouples(top, bottom).".to_string()
            }
            BuildError::MissingOhmmeter => {
                "What happened: No ohmmeter was provided to the measurement engine.\nLikely causes: The rig was not wired into the builder.\nHow to fix: Pass the meter via with_ohmmeter(...).".to_string()
            }
            BuildError::MissingFurnace => {
                "What happened: No furnace supply was provided to the measurement engine.\nLikely causes: The rig was not wired into the builder.\nHow to fix: Pass the supply via with_furnace(...).".to_string()
            }
            BuildError::NotReady(device) => format!(
                "What happened: The {device} is not ready.\nLikely causes: Instrument powered off, disconnected or still initializing.\nHow to fix: Check power and cabling of the {device}, then rerun."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `remf check`."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<CoreError>() {
        return match ce {
            CoreError::Timeout => "What happened: An instrument read timed out.\nLikely causes: Instrument busy, disconnected or configured with a too short timeout.\nHow to fix: Check the instrument connection and rerun.".to_string(),
            CoreError::Disconnected => "What happened: The measurement worker stopped unexpectedly.\nLikely causes: A panic inside the measurement loop.\nHow to fix: Re-run with --log-level=debug and check the log.".to_string(),
            CoreError::IndexOutOfRange { index, len } => format!(
                "What happened: Step {index} does not exist (the program has {len} steps).\nLikely causes: Wrong step index.\nHow to fix: Run `remf check` to list the program."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from config loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("steps csv must have headers") {
        return "Invalid headers in steps CSV. Expected 'kind,from_mv,to_mv,step_mv,point_range_mv'.".to_string();
    }

    if lower.contains("invalid csv row") {
        return format!(
            "What happened: The steps CSV could not be parsed ({msg}).\nLikely causes: A non-numeric voltage or an unknown kind (waiting, heating, cooling).\nHow to fix: Fix the reported row and rerun."
        );
    }

    if lower.contains("read config") || lower.contains("open steps csv") {
        let cause = err.root_cause();
        return format!(
            "What happened: {msg}.\nLikely causes: Wrong path or missing file ({cause}).\nHow to fix: Pass an existing file via --config / --steps."
        );
    }

    if lower.contains("parse config") {
        let cause = err.root_cause();
        return format!(
            "What happened: The config file is not valid TOML for this tool.\nLikely causes: {cause}\nHow to fix: Fix the reported line and rerun `remf check`."
        );
    }

    if lower.contains("must be") {
        return format!(
            "What happened: Invalid configuration: {msg}.\nLikely causes: Out-of-range value in the TOML or the steps CSV.\nHow to fix: Edit the value, then rerun `remf check`."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 for build/instrument problems, 4 for worker faults,
/// 1 for everything else (config, I/O).
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use remf_core::error::{BuildError, CoreError};
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    match err.downcast_ref::<CoreError>() {
        Some(CoreError::Disconnected | CoreError::State(_)) => 4,
        Some(_) => 3,
        None => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    use remf_core::error::{BuildError, CoreError};
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingThermocouples
            | BuildError::MissingOhmmeter
            | BuildError::MissingFurnace => "MissingDevice",
            BuildError::NotReady(_) => "NotReady",
            BuildError::InvalidConfig(_) => "InvalidConfig",
        };
    }
    match err.downcast_ref::<CoreError>() {
        Some(CoreError::Timeout) => "Timeout",
        Some(CoreError::Disconnected) => "Disconnected",
        Some(_) => "CoreError",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
