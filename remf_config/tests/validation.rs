use remf_config::{StepKind, load_toml};
use rstest::rstest;

const BASE: &str = r#"
[sampling]
interval_ms = 500

[gradient]
size_mv = 0.1

[rate]
target_mv_per_s = 0.004
stability_mv_per_s = 0.0005

[[steps]]
kind = "heating"
from_mv = 0.0
to_mv = 1.0
step_mv = 0.2
point_range_mv = 0.05

[[steps]]
kind = "cooling"
from_mv = 1.0
to_mv = 0.0
"#;

#[test]
fn accepts_typical_program() {
    let cfg = load_toml(BASE).expect("parse TOML");
    cfg.validate().expect("valid config");
    assert_eq!(cfg.steps.len(), 2);
    assert_eq!(cfg.steps[1].kind, StepKind::Cooling);
    // Defaults fill the omitted columns
    assert_eq!(cfg.steps[1].step_mv, 0.1);
    assert_eq!(cfg.steps[1].point_range_mv, 0.01);
    assert_eq!(cfg.supply.furnace_voltage, 220.0);
}

#[test]
fn empty_document_uses_defaults() {
    let cfg = load_toml("").expect("parse TOML");
    cfg.validate().expect("defaults are valid");
    assert_eq!(cfg.sampling.interval_ms, 500);
    assert!(cfg.measurement.resistance);
    assert!(!cfg.measurement.thermo_emf);
    assert!(cfg.steps.is_empty());
}

#[rstest]
#[case("[rate]\ntarget_mv_per_s = 0.0", "rate.target_mv_per_s must be > 0")]
#[case("[rate]\nstability_mv_per_s = -1.0", "rate.stability_mv_per_s must be > 0")]
#[case("[rate]\nwindow_s = 0.0", "rate.window_s")]
#[case("[sampling]\ninterval_ms = 0", "sampling.interval_ms must be >= 1")]
#[case("[supply]\ncurrent_step_a = 0.0", "supply.current_step_a")]
#[case("[supply]\nfurnace_voltage = -5.0", "supply voltages must be >= 0")]
#[case(
    "[measurement]\nthermo_emf = true\n[simulation]\ngradient_supply = false",
    "requires simulation.gradient_supply"
)]
#[case(
    "[[steps]]\nkind = \"done\"\nfrom_mv = 0.0\nto_mv = 1.0",
    "steps[0].kind must be"
)]
#[case(
    "[[steps]]\nkind = \"heating\"\nfrom_mv = 1.0\nto_mv = 0.0",
    "to_mv must be >= from_mv"
)]
#[case(
    "[[steps]]\nkind = \"cooling\"\nfrom_mv = 0.0\nto_mv = 1.0",
    "to_mv must be <= from_mv"
)]
#[case(
    "[[steps]]\nkind = \"heating\"\nfrom_mv = 0.0\nto_mv = 1.0\nstep_mv = 0.0",
    "steps[0].step_mv must be > 0"
)]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "expected '{needle}' in '{err}'"
    );
}

#[test]
fn unknown_step_kind_fails_to_parse() {
    let toml = "[[steps]]\nkind = \"boiling\"\nfrom_mv = 0.0\nto_mv = 1.0";
    assert!(load_toml(toml).is_err());
}
