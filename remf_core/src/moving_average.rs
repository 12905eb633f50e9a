//! Fixed-window running mean over `f64` samples.

/// Ring buffer of the last `capacity` samples with a running sum.
///
/// Until the ring has wrapped once the mean is taken over the filled slots
/// only, so the first value added is returned unchanged.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    values: Vec<f64>,
    next: usize,
    filled: usize,
    sum: f64,
}

impl MovingAverage {
    /// Capacity 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            values: vec![0.0; capacity.max(1)],
            next: 0,
            filled: 0,
            sum: 0.0,
        }
    }

    /// Push a sample and return the updated mean.
    pub fn add(&mut self, x: f64) -> f64 {
        self.sum -= self.values[self.next];
        self.values[self.next] = x;
        self.sum += x;
        self.next = (self.next + 1) % self.values.len();
        if self.filled < self.values.len() {
            self.filled += 1;
        }
        self.average()
    }

    /// Current mean, NaN before the first sample.
    pub fn average(&self) -> f64 {
        if self.filled == 0 {
            f64::NAN
        } else {
            self.sum / self.filled as f64
        }
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    /// True once every slot holds a sample.
    pub fn is_full(&self) -> bool {
        self.filled == self.values.len()
    }

    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
        self.next = 0;
        self.filled = 0;
        self.sum = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_average_is_nan() {
        let ma = MovingAverage::new(3);
        assert!(ma.average().is_nan());
        assert!(ma.is_empty());
    }

    #[test]
    fn partial_window_uses_filled_slots() {
        let mut ma = MovingAverage::new(4);
        assert_eq!(ma.add(2.0), 2.0);
        assert_eq!(ma.add(4.0), 3.0);
        assert!(!ma.is_full());
    }

    #[test]
    fn evicts_oldest_after_wrap() {
        let mut ma = MovingAverage::new(2);
        ma.add(1.0);
        ma.add(3.0);
        assert_eq!(ma.add(5.0), 4.0);
        assert!(ma.is_full());
    }

    #[test]
    fn zero_capacity_behaves_as_one() {
        let mut ma = MovingAverage::new(0);
        assert_eq!(ma.capacity(), 1);
        ma.add(7.0);
        assert_eq!(ma.add(9.0), 9.0);
    }

    #[test]
    fn clear_resets_window() {
        let mut ma = MovingAverage::new(2);
        ma.add(1.0);
        ma.add(2.0);
        ma.clear();
        assert!(ma.average().is_nan());
        assert_eq!(ma.add(10.0), 10.0);
    }
}
