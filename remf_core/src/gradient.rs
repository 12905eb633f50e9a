//! Threshold feedback on the top/bottom thermocouple difference.

/// Direction a supply current should be nudged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nudge {
    Raise,
    Hold,
    Lower,
}

impl Nudge {
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Nudge::Raise => 1.0,
            Nudge::Hold => 0.0,
            Nudge::Lower => -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientController {
    size: f64,
    stability: f64,
}

impl GradientController {
    /// Stability defaults to 10% of the gradient size.
    pub fn new(size_mv: f64) -> Self {
        let mut g = Self {
            size: 0.0,
            stability: 0.0,
        };
        g.set_size(size_mv);
        g.set_stability(g.size * 0.1);
        g
    }

    pub fn with_stability(size_mv: f64, stability_mv: f64) -> Self {
        let mut g = Self::new(size_mv);
        g.set_stability(stability_mv);
        g
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn stability(&self) -> f64 {
        self.stability
    }

    pub fn set_size(&mut self, size_mv: f64) {
        if size_mv < 0.0 {
            tracing::warn!(size_mv, "negative gradient size, using its absolute value");
        }
        self.size = size_mv.abs();
    }

    pub fn set_stability(&mut self, stability_mv: f64) {
        if stability_mv < 0.0 {
            tracing::warn!(
                stability_mv,
                "negative gradient stability range, using its absolute value"
            );
        }
        self.stability = stability_mv.abs();
    }

    /// Compare `top - bottom` against `size ± stability`.
    pub fn direction(&self, bottom: f64, top: f64) -> Nudge {
        let diff = top - bottom;
        if diff < self.size - self.stability {
            Nudge::Raise
        } else if diff > self.size + self.stability {
            Nudge::Lower
        } else {
            Nudge::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.08, Nudge::Raise)]
    #[case(0.10, Nudge::Hold)]
    #[case(0.12, Nudge::Lower)]
    fn band_decisions(#[case] diff: f64, #[case] want: Nudge) {
        let g = GradientController::with_stability(0.1, 0.01);
        assert_eq!(g.direction(1.0, 1.0 + diff), want);
    }

    #[test]
    fn negative_inputs_are_made_positive() {
        let g = GradientController::with_stability(-0.2, -0.05);
        assert_eq!(g.size(), 0.2);
        assert_eq!(g.stability(), 0.05);
    }

    #[test]
    fn default_stability_is_ten_percent() {
        let g = GradientController::new(0.5);
        assert!((g.stability() - 0.05).abs() < 1e-12);
    }
}
