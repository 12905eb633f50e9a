#![no_main]
use libfuzzer_sys::arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use remf_core::{Selection, StepKind, StepSettings, StepTracker};

#[derive(Debug, Arbitrary)]
struct Input {
    steps: Vec<(u8, f64, f64, f64, f64)>,
    readings: Vec<f64>,
}

fuzz_target!(|input: Input| {
    let steps = input.steps.iter().take(8).map(|&(k, from, to, step, range)| {
        let kind = match k % 5 {
            0 => StepKind::NotAssigned,
            1 => StepKind::Waiting,
            2 => StepKind::Heating,
            3 => StepKind::Cooling,
            _ => StepKind::Done,
        };
        StepSettings::new(kind, from, to, step, range)
    }).collect();
    let mut tracker = StepTracker::new(Selection::from_items(steps));
    tracker.advance();
    for mv in input.readings.iter().take(512) {
        let _ = tracker.should_measure(*mv);
        let _ = tracker.next_checkpoint();
    }
});
