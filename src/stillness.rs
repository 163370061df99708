use std::collections::VecDeque;

use crate::types::{AccelerationsFrame, AngularSpeedsFrame};

/// Decides from short-term inertial variability whether the platform is
/// motionless.
pub trait StillnessDetector: Send {
    /// Feed one sample, returns true while the platform looks still.
    fn update(
        &mut self,
        accelerations: &AccelerationsFrame,
        angular_speeds: &AngularSpeedsFrame,
    ) -> bool;

    /// Current acceleration noise std, if enough samples are held.
    fn acceleration_std(&self) -> Option<f64>;

    /// Current angular speed noise std, if enough samples are held.
    fn angular_speed_std(&self) -> Option<f64>;

    fn reset(&mut self);
}

/// Still when both stds stay below this multiple of the sensor noise.
const NOISE_STD_FACTOR: f64 = 2.0;

/// Seconds of history the detector looks at.
pub const STILLNESS_WINDOW_SECS: f64 = 2.0;

/// Sliding-window stillness detector comparing the observed std of each
/// quantity against the sensor's nominal noise.
#[derive(Debug, Clone)]
pub struct ZeroVelocityEstimator {
    window: VecDeque<[f64; 6]>,
    window_size: usize,
    acceleration_threshold: f64,
    angular_speed_threshold: f64,
    acceleration_std: Option<f64>,
    angular_speed_std: Option<f64>,
}

impl ZeroVelocityEstimator {
    pub fn new(rate: f64, acceleration_noise_std: f64, angular_speed_noise_std: f64) -> Self {
        let window_size = ((STILLNESS_WINDOW_SECS * rate).ceil() as usize).max(2);
        ZeroVelocityEstimator {
            window: VecDeque::new(),
            window_size,
            acceleration_threshold: NOISE_STD_FACTOR * acceleration_noise_std,
            angular_speed_threshold: NOISE_STD_FACTOR * angular_speed_noise_std,
            acceleration_std: None,
            angular_speed_std: None,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// RMS of the population std of three consecutive columns.
    fn group_std(&self, offset: usize) -> Option<f64> {
        let n = self.window.len();
        if n < 2 {
            return None;
        }

        let mut variance_sum = 0.0;
        for axis in offset..offset + 3 {
            let mean = self.window.iter().map(|s| s[axis]).sum::<f64>() / n as f64;
            let variance = self
                .window
                .iter()
                .map(|s| (s[axis] - mean).powi(2))
                .sum::<f64>()
                / n as f64;
            variance_sum += variance;
        }

        Some((variance_sum / 3.0).sqrt())
    }
}

impl StillnessDetector for ZeroVelocityEstimator {
    fn update(
        &mut self,
        accelerations: &AccelerationsFrame,
        angular_speeds: &AngularSpeedsFrame,
    ) -> bool {
        self.window.push_back([
            accelerations.x,
            accelerations.y,
            accelerations.z,
            angular_speeds.x,
            angular_speeds.y,
            angular_speeds.z,
        ]);
        while self.window.len() > self.window_size {
            self.window.pop_front();
        }

        self.acceleration_std = self.group_std(0);
        self.angular_speed_std = self.group_std(3);

        if self.window.len() < self.window_size {
            return false;
        }

        // NaN stds compare false and never read as still
        match (self.acceleration_std, self.angular_speed_std) {
            (Some(a), Some(g)) => {
                a < self.acceleration_threshold && g < self.angular_speed_threshold
            }
            _ => false,
        }
    }

    fn acceleration_std(&self) -> Option<f64> {
        self.acceleration_std
    }

    fn angular_speed_std(&self) -> Option<f64> {
        self.angular_speed_std
    }

    fn reset(&mut self) {
        self.window.clear();
        self.acceleration_std = None;
        self.angular_speed_std = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn still_sample(n: usize) -> (AccelerationsFrame, AngularSpeedsFrame) {
        let wiggle = if n % 2 == 0 { 1.0 } else { -1.0 };
        (
            AccelerationsFrame::new(0.0005 * wiggle, -0.0005 * wiggle, 9.81),
            AngularSpeedsFrame::new(0.0, 0.0, 0.002 + 0.005 * wiggle),
        )
    }

    #[test]
    fn test_still_only_once_window_full() {
        let mut detector = ZeroVelocityEstimator::new(10.0, 0.001, 0.01);
        assert_eq!(detector.window_size(), 20);

        for n in 0..19 {
            let (acc, gyro) = still_sample(n);
            assert!(!detector.update(&acc, &gyro));
        }
        let (acc, gyro) = still_sample(19);
        assert!(detector.update(&acc, &gyro));
        assert_eq!(detector.len(), 20);
    }

    #[test]
    fn test_std_values() {
        let mut detector = ZeroVelocityEstimator::new(10.0, 0.001, 0.01);
        assert_eq!(detector.acceleration_std(), None);

        for n in 0..20 {
            let (acc, gyro) = still_sample(n);
            detector.update(&acc, &gyro);
        }

        // x and y alternate ±0.0005, z constant -> sqrt(2/3) * 0.0005
        let expected = (2.0_f64 / 3.0).sqrt() * 0.0005;
        assert_relative_eq!(detector.acceleration_std().unwrap(), expected, epsilon = 1e-12);
        let expected = (1.0_f64 / 3.0).sqrt() * 0.005;
        assert_relative_eq!(detector.angular_speed_std().unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_noisy_gyro_is_not_still() {
        let mut detector = ZeroVelocityEstimator::new(10.0, 0.001, 0.01);
        let mut still = true;
        for n in 0..40 {
            let wiggle = if n % 2 == 0 { 1.0 } else { -1.0 };
            let acc = AccelerationsFrame::new(0.0, 0.0, 9.81);
            let gyro = AngularSpeedsFrame::new(0.05 * wiggle, 0.05 * wiggle, 0.05 * wiggle);
            still = detector.update(&acc, &gyro);
        }
        assert!(!still);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut detector = ZeroVelocityEstimator::new(10.0, 0.001, 0.01);
        for n in 0..20 {
            let (acc, gyro) = still_sample(n);
            detector.update(&acc, &gyro);
        }
        detector.reset();
        assert!(detector.is_empty());
        assert_eq!(detector.angular_speed_std(), None);

        let (acc, gyro) = still_sample(0);
        assert!(!detector.update(&acc, &gyro));
    }
}
