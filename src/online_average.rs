use std::collections::VecDeque;

/// Running mean that only becomes trustworthy after enough samples.
pub trait RunningAverage: Send {
    fn update(&mut self, value: f64);

    fn is_available(&self) -> bool;

    fn average(&self) -> f64;

    fn reset(&mut self);
}

/// Mean over the last `capacity` values, available once the window is full.
///
/// The running sum is rebuilt from the window every `capacity` evictions, so
/// rounding error from add/subtract pairs cannot build up over long stops.
#[derive(Debug, Clone)]
pub struct OnlineAverage {
    window: VecDeque<f64>,
    capacity: usize,
    sum: f64,
    evictions: usize,
}

impl OnlineAverage {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        OnlineAverage {
            window: VecDeque::new(),
            capacity,
            sum: 0.0,
            evictions: 0,
        }
    }

    /// Window sized to hold `window_secs` of samples at `rate`.
    pub fn with_horizon(rate: f64, window_secs: f64) -> Self {
        Self::new((rate * window_secs).ceil() as usize)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn sample_count(&self) -> usize {
        self.window.len()
    }
}

impl RunningAverage for OnlineAverage {
    fn update(&mut self, value: f64) {
        if self.window.len() == self.capacity {
            if let Some(oldest) = self.window.pop_front() {
                self.sum -= oldest;
                self.evictions += 1;
            }
        }
        self.window.push_back(value);
        self.sum += value;

        if self.evictions >= self.capacity {
            self.sum = self.window.iter().sum();
            self.evictions = 0;
        }
    }

    fn is_available(&self) -> bool {
        self.window.len() >= self.capacity
    }

    fn average(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.sum / self.window.len() as f64
    }

    fn reset(&mut self) {
        self.window.clear();
        self.sum = 0.0;
        self.evictions = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_available_when_full() {
        let mut average = OnlineAverage::with_horizon(10.0, 5.0);
        assert_eq!(average.capacity(), 50);

        for n in 0..49 {
            average.update(n as f64);
            assert!(!average.is_available());
        }
        average.update(49.0);
        assert!(average.is_available());
        assert_relative_eq!(average.average(), 24.5);
    }

    #[test]
    fn test_window_slides() {
        let mut average = OnlineAverage::new(3);
        for value in [1.0, 2.0, 3.0, 10.0] {
            average.update(value);
        }
        assert_eq!(average.sample_count(), 3);
        assert_relative_eq!(average.average(), 5.0);
    }

    #[test]
    fn test_sum_recovers_from_cancellation() {
        let mut average = OnlineAverage::new(4);
        // 1.0 is below the spacing of f64 around 1e16 and is lost in the sum
        average.update(1e16);
        for _ in 0..3 {
            average.update(1.0);
        }

        average.update(1.0);
        assert!(average.average() < 1.0);

        for _ in 0..3 {
            average.update(1.0);
        }
        assert_eq!(average.average(), 1.0);
    }

    #[test]
    fn test_long_stop_stays_exact() {
        let mut average = OnlineAverage::with_horizon(10.0, 5.0);
        for n in 0..100_000 {
            average.update(0.001 + 1e-6 * (n % 7) as f64);
        }
        let exact: f64 = (0..50)
            .map(|k| 0.001 + 1e-6 * ((100_000 - 50 + k) % 7) as f64)
            .sum::<f64>()
            / 50.0;
        assert_relative_eq!(average.average(), exact, epsilon = 1e-15);
    }

    #[test]
    fn test_reset() {
        let mut average = OnlineAverage::new(2);
        average.update(1.0);
        average.update(1.0);
        average.reset();
        assert!(!average.is_available());
        assert_eq!(average.sample_count(), 0);
        assert_eq!(average.average(), 0.0);
    }
}
