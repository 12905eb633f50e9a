use remf_config::{StepKind, load_steps_csv};
use std::fs;
use tempfile::tempdir;

#[test]
fn loads_program_with_strict_header() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("steps.csv");
    fs::write(
        &path,
        "kind,from_mv,to_mv,step_mv,point_range_mv\nheating, 0.0, 4.0, 0.1, 0.01\ncooling,4.0,0.0,0.2,0.02\n",
    )
    .unwrap();

    let rows = load_steps_csv(&path).expect("load CSV");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].kind, StepKind::Heating);
    assert_eq!(rows[0].to_mv, 4.0);
    assert_eq!(rows[1].kind, StepKind::Cooling);
    assert_eq!(rows[1].point_range_mv, 0.02);
}

#[test]
fn rejects_wrong_header() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("steps.csv");
    fs::write(&path, "type,start,end\nheating,0,1\n").unwrap();

    let err = load_steps_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("steps CSV must have headers"));
}

#[test]
fn reports_bad_row_number() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("steps.csv");
    fs::write(
        &path,
        "kind,from_mv,to_mv,step_mv,point_range_mv\nheating,0,1,0.1,0.01\nheating,zero,1,0.1,0.01\n",
    )
    .unwrap();

    let err = load_steps_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("invalid CSV row 3"), "{err}");
}

#[test]
fn rejects_inactive_kind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("steps.csv");
    fs::write(
        &path,
        "kind,from_mv,to_mv,step_mv,point_range_mv\nnot_assigned,0,1,0.1,0.01\n",
    )
    .unwrap();

    let err = load_steps_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("steps[0].kind"));
}
