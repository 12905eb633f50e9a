//! Step program entries and ramp direction.

/// Smallest accepted checkpoint tolerance (mV).
pub const MIN_POINT_RANGE_MV: f64 = 0.010;
/// Largest accepted checkpoint tolerance (mV).
pub const MAX_POINT_RANGE_MV: f64 = 0.100;
pub const DEFAULT_STEP_MV: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StepKind {
    #[default]
    NotAssigned,
    Waiting,
    Heating,
    Cooling,
    Done,
}

impl StepKind {
    /// Ramp direction for active kinds; `None` for kinds the tracker ignores.
    pub fn ramp(self) -> Option<Ramp> {
        match self {
            StepKind::Waiting | StepKind::Heating => Some(Ramp::Up),
            StepKind::Cooling => Some(Ramp::Down),
            StepKind::NotAssigned | StepKind::Done => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::NotAssigned => "not_assigned",
            StepKind::Waiting => "waiting",
            StepKind::Heating => "heating",
            StepKind::Cooling => "cooling",
            StepKind::Done => "done",
        }
    }
}

impl core::fmt::Display for StepKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction the sample temperature is driven in.
///
/// `Up` compares values as they are, `Down` compares them mirrored, which is
/// the same as multiplying both sides by -1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ramp {
    Up,
    Down,
}

impl Ramp {
    /// `a` has not reached `b` yet in ramp direction.
    #[inline]
    pub fn behind(self, a: f64, b: f64) -> bool {
        match self {
            Ramp::Up => a < b,
            Ramp::Down => a > b,
        }
    }

    /// `a` is past `b` in ramp direction.
    #[inline]
    pub fn beyond(self, a: f64, b: f64) -> bool {
        match self {
            Ramp::Up => a > b,
            Ramp::Down => a < b,
        }
    }

    /// Move `x` one `step` forward in ramp direction.
    #[inline]
    pub fn advance(self, x: f64, step: f64) -> f64 {
        match self {
            Ramp::Up => x + step,
            Ramp::Down => x - step,
        }
    }
}

/// One phase of the ramp program. Voltages are thermocouple millivolts.
///
/// `point_range` stays within [`MIN_POINT_RANGE_MV`, `MAX_POINT_RANGE_MV`] and
/// `step` never drops below `2 * point_range`, so neighbouring checkpoint
/// windows cannot overlap.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSettings {
    kind: StepKind,
    from: f64,
    to: f64,
    step: f64,
    point_range: f64,
}

impl Default for StepSettings {
    fn default() -> Self {
        Self {
            kind: StepKind::NotAssigned,
            from: 0.0,
            to: 0.0,
            step: DEFAULT_STEP_MV,
            point_range: MIN_POINT_RANGE_MV,
        }
    }
}

impl StepSettings {
    pub fn new(kind: StepKind, from: f64, to: f64, step: f64, point_range: f64) -> Self {
        let mut s = Self {
            kind,
            ..Self::default()
        };
        s.set_from(from);
        s.set_to(to);
        s.set_point_range(point_range);
        s.set_step(step);
        s
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }
    pub fn from(&self) -> f64 {
        self.from
    }
    pub fn to(&self) -> f64 {
        self.to
    }
    pub fn step(&self) -> f64 {
        self.step
    }
    pub fn point_range(&self) -> f64 {
        self.point_range
    }

    pub fn set_kind(&mut self, kind: StepKind) {
        self.kind = kind;
    }

    /// Non-finite bounds are ignored and the previous value is kept.
    pub fn set_from(&mut self, from: f64) {
        if from.is_finite() {
            self.from = from;
        }
    }
    pub fn set_to(&mut self, to: f64) {
        if to.is_finite() {
            self.to = to;
        }
    }

    /// Non-finite input falls back to the default step; values smaller than
    /// twice the point range are raised to it.
    pub fn set_step(&mut self, step: f64) {
        let step = if step.is_finite() {
            step.abs()
        } else {
            DEFAULT_STEP_MV
        };
        self.step = step.max(2.0 * self.point_range);
    }

    /// Clamped into the accepted tolerance band; the step is re-checked.
    pub fn set_point_range(&mut self, point_range: f64) {
        let pr = if point_range.is_finite() {
            point_range.clamp(MIN_POINT_RANGE_MV, MAX_POINT_RANGE_MV)
        } else {
            MIN_POINT_RANGE_MV
        };
        self.point_range = pr;
        self.step = self.step.max(2.0 * pr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_range_is_clamped() {
        let s = StepSettings::new(StepKind::Heating, 0.0, 1.0, 0.5, 5.0);
        assert_eq!(s.point_range(), MAX_POINT_RANGE_MV);
        let s = StepSettings::new(StepKind::Heating, 0.0, 1.0, 0.5, 0.0);
        assert_eq!(s.point_range(), MIN_POINT_RANGE_MV);
    }

    #[test]
    fn step_never_below_twice_point_range() {
        let s = StepSettings::new(StepKind::Cooling, 1.0, 0.0, 0.05, 0.05);
        assert_eq!(s.step(), 0.1);
        let mut s = StepSettings::new(StepKind::Heating, 0.0, 1.0, 0.1, 0.01);
        s.set_point_range(0.08);
        assert_eq!(s.step(), 0.16);
    }

    #[test]
    fn non_finite_step_falls_back() {
        let mut s = StepSettings::default();
        s.set_step(f64::NAN);
        assert_eq!(s.step(), DEFAULT_STEP_MV);
    }

    #[test]
    fn ramp_comparisons_mirror() {
        assert!(Ramp::Up.behind(0.1, 0.2));
        assert!(Ramp::Down.behind(0.2, 0.1));
        assert!(Ramp::Up.beyond(0.3, 0.2));
        assert!(Ramp::Down.beyond(0.1, 0.2));
        assert_eq!(Ramp::Down.advance(1.0, 0.25), 0.75);
    }

    #[test]
    fn only_active_kinds_have_a_ramp() {
        assert_eq!(StepKind::Waiting.ramp(), Some(Ramp::Up));
        assert_eq!(StepKind::Cooling.ramp(), Some(Ramp::Down));
        assert_eq!(StepKind::Done.ramp(), None);
        assert_eq!(StepKind::default().ramp(), None);
    }
}
