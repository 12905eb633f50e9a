//! Step state machine: decides when a checkpoint is reached and when the
//! program moves on to the next step.

use crate::error::Result;
use crate::selection::{Selection, SelectionChanged};
use crate::step::{Ramp, StepSettings};

/// Walks a step program against incoming thermocouple readings.
///
/// Each active step has a ladder of checkpoints `from, from ± step, ...` in
/// its ramp direction. A reading inside `checkpoint ± point_range` asks for a
/// measurement; a reading past the window skips the checkpoint. Once a reading
/// passes `to` the program advances, so the last checkpoint before `to` fires
/// before (or on the same sample as) the transition.
#[derive(Debug)]
pub struct StepTracker {
    program: Selection<StepSettings>,
    current: f64,
    next: f64,
    ramp: Option<Ramp>,
    done: bool,
}

impl StepTracker {
    pub fn new(program: Selection<StepSettings>) -> Self {
        let mut t = Self {
            program,
            current: 0.0,
            next: 0.0,
            ramp: None,
            done: false,
        };
        t.sync();
        t
    }

    pub fn program(&self) -> &Selection<StepSettings> {
        &self.program
    }

    /// Register an observer of step changes.
    pub fn subscribe(&mut self, f: impl FnMut(&SelectionChanged<StepSettings>) + Send + 'static) {
        self.program.subscribe(f);
    }

    /// Last reading seen (mV).
    pub fn current_temperature(&self) -> f64 {
        self.current
    }

    /// Checkpoint the next measurement is scheduled at (mV).
    pub fn next_checkpoint(&self) -> f64 {
        self.next
    }

    /// True once the program ran past its last step (or was reset).
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.program.selected_index()
    }

    /// Feed one bottom-thermocouple reading. Returns whether a resistance
    /// measurement is due now.
    pub fn should_measure(&mut self, t: f64) -> bool {
        if t.is_nan() {
            return false;
        }
        self.current = t;
        if self.done {
            return false;
        }
        let Some(ramp) = self.ramp else {
            return false;
        };
        let Some(step) = self.program.selected() else {
            return false;
        };
        let (from, to, inc, pr) = (step.from(), step.to(), step.step(), step.point_range());

        if ramp.behind(t, from) {
            return false;
        }

        let is_measure = t >= self.next - pr && t <= self.next + pr;
        if ramp.beyond(t, self.next + pr) || is_measure {
            self.next = ramp.advance(self.next, inc);
        }

        if ramp.beyond(t, to) {
            tracing::info!(
                step = ?self.program.selected_index(),
                temperature_mv = t,
                "step finished"
            );
            self.advance();
        }
        is_measure
    }

    /// Move to the next step (or finish the program).
    pub fn advance(&mut self) -> bool {
        let moved = self.program.advance();
        self.sync();
        moved
    }

    pub fn select(&mut self, index: usize) -> Result<bool> {
        let changed = self.program.select(index)?;
        if changed {
            self.sync();
        }
        Ok(changed)
    }

    /// Clear the selection; the tracker reports done until a step is selected.
    pub fn reset(&mut self) {
        self.program.reset();
        self.sync();
    }

    pub fn push_step(&mut self, step: StepSettings) {
        self.program.push(step);
    }

    pub fn insert_step(&mut self, index: usize, step: StepSettings) -> Result<()> {
        self.program.insert(index, step)
    }

    pub fn remove_step(&mut self, index: usize) -> Result<StepSettings> {
        self.program.remove(index)
    }

    pub fn replace_step(&mut self, index: usize, step: StepSettings) -> Result<StepSettings> {
        self.program.replace(index, step)
    }

    /// Edit a step in place. Editing the active step recomputes its
    /// checkpoint ladder from the last reading.
    pub fn edit_step<R>(&mut self, index: usize, f: impl FnOnce(&mut StepSettings) -> R) -> Result<R> {
        let r = self.program.edit(index, f)?;
        if self.program.selected_index() == Some(index) {
            self.sync();
        }
        Ok(r)
    }

    pub fn clear_steps(&mut self) {
        self.program.clear();
        self.sync();
    }

    fn sync(&mut self) {
        let Some(step) = self.program.selected() else {
            self.done = true;
            self.ramp = None;
            return;
        };
        self.done = false;
        self.ramp = step.kind().ramp();
        let Some(ramp) = self.ramp else {
            tracing::debug!(kind = %step.kind(), "inactive step selected");
            return;
        };
        let next = catch_up(ramp, step.from(), step.step(), self.current);
        self.next = next;
        tracing::debug!(kind = %step.kind(), next_checkpoint_mv = next, "step selected");
    }
}

/// First checkpoint of the ladder `from, from ± step, ...` that is not behind
/// `current`. Closed form, so huge readings cost the same as small ones.
fn catch_up(ramp: Ramp, from: f64, step: f64, current: f64) -> f64 {
    if !(current.is_finite() && from.is_finite()) || step <= 0.0 {
        return from;
    }
    let distance = match ramp {
        Ramp::Up => current - from,
        Ramp::Down => from - current,
    };
    let mut n = (distance / step).ceil();
    if !n.is_finite() || n <= 0.0 {
        return from;
    }
    // Rounding in the division can overshoot by one rung.
    if !ramp.behind(ramp.advance(from, (n - 1.0) * step), current) {
        n -= 1.0;
    }
    let next = ramp.advance(from, n * step);
    if ramp.behind(next, current) {
        ramp.advance(next, step)
    } else {
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepKind;

    fn heating() -> StepSettings {
        StepSettings::new(StepKind::Heating, 0.0, 1.0, 0.2, 0.05)
    }

    #[test]
    fn nothing_selected_means_done() {
        let mut t = StepTracker::new(Selection::from_items(vec![heating()]));
        assert!(t.is_done());
        assert!(!t.should_measure(0.2));
    }

    #[test]
    fn below_start_never_measures() {
        let step = StepSettings::new(StepKind::Heating, 0.5, 1.0, 0.2, 0.05);
        let mut t = StepTracker::new(Selection::from_items(vec![step]));
        t.select(0).unwrap();
        assert!(!t.should_measure(0.3));
        assert_eq!(t.next_checkpoint(), 0.5);
    }

    #[test]
    fn catch_up_skips_checkpoints_already_passed() {
        let mut t = StepTracker::new(Selection::from_items(vec![heating()]));
        t.should_measure(0.5);
        t.select(0).unwrap();
        assert!((t.next_checkpoint() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn overshoot_skips_checkpoint_without_measuring() {
        let mut t = StepTracker::new(Selection::from_items(vec![heating()]));
        t.select(0).unwrap();
        assert!(t.should_measure(0.0));
        assert!(!t.should_measure(0.3));
        assert!((t.next_checkpoint() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn cooling_walks_downwards() {
        let step = StepSettings::new(StepKind::Cooling, 1.0, 0.0, 0.5, 0.1);
        let mut t = StepTracker::new(Selection::from_items(vec![step]));
        t.should_measure(1.2);
        t.select(0).unwrap();
        assert_eq!(t.next_checkpoint(), 1.0);
        assert!(!t.should_measure(1.05));
        assert!(t.should_measure(0.95));
        assert_eq!(t.next_checkpoint(), 0.5);
        assert!(!t.should_measure(0.7));
        assert!(t.should_measure(0.45));
        assert!(!t.should_measure(-0.2));
        assert!(t.is_done());
    }

    #[test]
    fn inactive_kinds_are_inert() {
        let step = StepSettings::new(StepKind::Done, 0.0, 1.0, 0.2, 0.05);
        let mut t = StepTracker::new(Selection::from_items(vec![step]));
        t.select(0).unwrap();
        assert!(!t.is_done());
        assert!(!t.should_measure(0.0));
        assert!(!t.should_measure(5.0));
        assert_eq!(t.selected_index(), Some(0));
    }

    #[test]
    fn nan_reading_is_ignored() {
        let mut t = StepTracker::new(Selection::from_items(vec![heating()]));
        t.select(0).unwrap();
        t.should_measure(0.1);
        assert!(!t.should_measure(f64::NAN));
        assert_eq!(t.current_temperature(), 0.1);
    }

    #[test]
    fn overload_reading_advances_without_stalling() {
        let mut t = StepTracker::new(Selection::from_items(vec![
            heating(),
            StepSettings::new(StepKind::Heating, 1.0, 2.0, 0.2, 0.05),
        ]));
        t.select(0).unwrap();
        // A meter overload scaled to mV
        assert!(!t.should_measure(9.9e40));
        assert_eq!(t.selected_index(), Some(1));
        assert!((t.next_checkpoint() - 9.9e40).abs() <= 9.9e40 * 1e-12);
        t.should_measure(9.9e40);
        assert!(t.is_done());
    }

    #[test]
    fn infinite_bounds_fall_back_to_finite_ladder() {
        let step =
            StepSettings::new(StepKind::Heating, f64::NEG_INFINITY, f64::INFINITY, 0.2, 0.05);
        assert_eq!((step.from(), step.to()), (0.0, 0.0));
        let mut edited = step.clone();
        edited.set_from(f64::NAN);
        edited.set_to(1.0);
        assert_eq!((edited.from(), edited.to()), (0.0, 1.0));
        let mut t = StepTracker::new(Selection::from_items(vec![step]));
        t.should_measure(0.5);
        assert!(t.advance());
        assert!((t.next_checkpoint() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn catch_up_matches_ladder_rungs() {
        assert_eq!(catch_up(Ramp::Up, 0.0, 0.2, 0.0), 0.0);
        assert_eq!(catch_up(Ramp::Up, 1.0, 0.5, 1.7), 2.0);
        assert_eq!(catch_up(Ramp::Up, 0.0, 0.5, 0.5), 0.5);
        assert_eq!(catch_up(Ramp::Down, 1.0, 0.5, 1.2), 1.0);
        assert_eq!(catch_up(Ramp::Down, 1.0, 0.5, 0.2), 0.0);
        assert_eq!(catch_up(Ramp::Up, 0.0, 0.2, f64::INFINITY), 0.0);
    }

    #[test]
    fn editing_active_step_resyncs_ladder() {
        let mut t = StepTracker::new(Selection::from_items(vec![heating()]));
        t.should_measure(0.35);
        t.select(0).unwrap();
        t.edit_step(0, |s| s.set_from(0.3)).unwrap();
        assert_eq!(t.next_checkpoint(), 0.5);
    }
}
