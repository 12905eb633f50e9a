use std::time::Duration;

use remf_hardware::error::HwError;
use remf_hardware::util::wait_until_settled_with_timeout;
use remf_hardware::{SimParams, ThermalModel};
use remf_traits::{PolarityRelay, PowerSupply, ResistanceMeter, VoltageMeter};
use rstest::rstest;

#[test]
fn bottom_read_advances_the_model() {
    let model = ThermalModel::new(SimParams::default());
    let mut furnace = model.furnace();
    furnace.set_current(2.0);
    furnace.turn_on(true);

    let mut bottom = model.bottom_thermocouple(Duration::from_secs(1));
    let mut top = model.top_thermocouple();
    let v1 = bottom.read_voltage(0.1).unwrap();
    let v2 = bottom.read_voltage(0.1).unwrap();
    assert!(v2 > v1, "expected heating, got {v1} then {v2}");
    // Top reads never advance time.
    let t1 = top.read_voltage(0.1).unwrap();
    let t2 = top.read_voltage(0.1).unwrap();
    assert_eq!(t1, t2);
}

#[test]
fn gradient_supply_lifts_top_and_thermo_emf() {
    let model = ThermalModel::new(SimParams::default());
    let mut grad = model.gradient_supply();
    grad.set_current(0.1);
    assert_eq!(model.top_mv(), model.bottom_mv());
    grad.turn_on(true);
    assert!((model.top_mv() - model.bottom_mv() - 0.1).abs() < 1e-12);

    let mut ohm = model.ohmmeter();
    let vm = ohm.voltage_meter().unwrap();
    // 40 µV/mV * 0.1 mV = 4 µV
    let emf = vm.read_voltage(0.1).unwrap();
    assert!((emf - 4e-6).abs() < 1e-12);
}

#[rstest]
#[case(1, true)]
#[case(0, false)]
fn injected_failures_time_out(#[case] failures: u32, #[case] fails: bool) {
    let model = ThermalModel::new(SimParams::default());
    model.fail_next_reads(failures);
    let mut top = model.top_thermocouple();
    let r = top.read_voltage(0.1);
    assert_eq!(r.is_err(), fails);
    if let Err(e) = r {
        assert!(matches!(e.downcast_ref::<HwError>(), Some(HwError::Timeout)));
    }
    // The failure is consumed.
    assert!(top.read_voltage(0.1).is_ok());
}

#[test]
fn resistance_over_range_is_an_error() {
    let model = ThermalModel::new(SimParams::default());
    let mut ohm = model.ohmmeter();
    let err = ohm.read_resistance(100.0).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HwError>(),
        Some(HwError::OutOfRange { .. })
    ));
}

#[test]
fn offline_rig_reports_not_ready() {
    let model = ThermalModel::new(SimParams::default());
    model.set_online(false);
    assert!(!model.top_thermocouple().is_ready());
    assert!(!ResistanceMeter::is_ready(&model.ohmmeter()));
    assert!(!VoltageMeter::is_ready(&model.ohmmeter()));
    assert!(!model.furnace().is_ready());
    let err = model.relay().set_channels(true).unwrap_err();
    assert!(err.to_string().contains("relay"));
}

#[test]
fn ohmmeter_waits_for_relay_to_settle() {
    let model = ThermalModel::new(SimParams {
        relay_settle: Duration::from_millis(20),
        ..SimParams::default()
    });
    let mut relay = model.relay();
    let mut ohm = model.ohmmeter();
    relay.set_channels(true).unwrap();
    let started = std::time::Instant::now();
    let r = ohm.read_resistance(1000.0).unwrap();
    assert!(started.elapsed() >= Duration::from_millis(15));
    assert!((r - 119.5).abs() < 1e-9);
}

#[test]
fn settle_wait_times_out() {
    let err = wait_until_settled_with_timeout(
        || false,
        Duration::from_millis(5),
        Duration::from_micros(200),
    )
    .unwrap_err();
    assert!(matches!(err, HwError::SettleTimeout));
}
