use proptest::prelude::*;
use remf_core::{MovingAverage, Selection, StepKind, StepSettings, StepTracker};

proptest! {
    #[test]
    fn moving_average_matches_mean_of_last_window(
        xs in proptest::collection::vec(-1000.0f64..1000.0, 1..64),
        cap in 1usize..16,
    ) {
        let mut ma = MovingAverage::new(cap);
        for x in &xs {
            ma.add(*x);
        }
        let tail = &xs[xs.len().saturating_sub(cap)..];
        let want = tail.iter().sum::<f64>() / tail.len() as f64;
        prop_assert!((ma.average() - want).abs() < 1e-6);
        prop_assert_eq!(ma.len(), tail.len());
    }

    #[test]
    fn slow_heating_sweep_measures_every_checkpoint_once(
        incs in proptest::collection::vec(0.001f64..0.09, 1..50),
    ) {
        // Checkpoints 0.0, 0.2, ..., 2.0 with ±0.05 windows; no increment
        // can jump over a whole window.
        let step = StepSettings::new(StepKind::Heating, 0.0, 2.0, 0.2, 0.05);
        let mut t = StepTracker::new(Selection::from_items(vec![step]));
        t.advance();
        let mut x = 0.0;
        let mut measured = Vec::new();
        let mut i = 0;
        while !t.is_done() {
            if t.should_measure(x) {
                measured.push(x);
            }
            x += incs[i % incs.len()];
            i += 1;
            prop_assert!(x < 3.0, "program never finished");
        }
        prop_assert_eq!(measured.len(), 11, "measured at {:?}", measured);
        for (k, m) in measured.iter().enumerate() {
            prop_assert!((m - 0.2 * k as f64).abs() <= 0.05 + 1e-9);
        }
    }

    #[test]
    fn tracker_ignores_nan_and_never_measures_behind_start(
        xs in proptest::collection::vec(-5.0f64..0.99, 1..40),
    ) {
        let step = StepSettings::new(StepKind::Heating, 1.0, 2.0, 0.2, 0.05);
        let mut t = StepTracker::new(Selection::from_items(vec![step]));
        t.advance();
        for x in xs {
            prop_assert!(!t.should_measure(x));
            prop_assert!(!t.should_measure(f64::NAN));
        }
        prop_assert_eq!(t.selected_index(), Some(0));
        prop_assert_eq!(t.next_checkpoint(), 1.0);
    }
}
