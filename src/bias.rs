//! Online estimation of the gyroscope bias around the vertical axis.
//!
//! The yaw rate is only averaged while the platform is provably stopped:
//! inertial stillness alone cannot tell a parked vehicle from one cruising
//! straight at constant speed, so a near-zero linear speed is required too.

use log::debug;
use std::sync::Mutex;

use crate::diagnostic::{format_info_value, DiagnosticReport, DiagnosticStatus, ReportSource};
use crate::online_average::{OnlineAverage, RunningAverage};
use crate::stillness::{StillnessDetector, ZeroVelocityEstimator, STILLNESS_WINDOW_SECS};
use crate::types::{AccelerationsFrame, AngularSpeedsFrame};

/// Below this absolute linear speed (m/s) the vehicle counts as stopped.
pub const LINEAR_SPEED_EPSILON: f64 = 0.02;

/// Seconds of stopped yaw rate averaged into the bias.
pub const BIAS_WINDOW_SECS: f64 = 5.0;

const LINEAR_SPEED_KEY: &str = "linear_speed";
const ACCELERATION_STD_KEY: &str = "acceleration_std";
const ANGULAR_SPEED_STD_KEY: &str = "angular_speed_std";
const BIAS_KEY: &str = "angular_speed_bias";

pub struct AngularSpeedBias<S = ZeroVelocityEstimator, A = OnlineAverage> {
    inner: Mutex<BiasState<S, A>>,
}

struct BiasState<S, A> {
    stillness: S,
    average: A,
    report: DiagnosticReport,
}

impl AngularSpeedBias {
    pub fn new(rate: f64, acceleration_std: f64, angular_speed_std: f64) -> Self {
        Self::with_estimators(
            ZeroVelocityEstimator::new(rate, acceleration_std, angular_speed_std),
            OnlineAverage::with_horizon(rate, BIAS_WINDOW_SECS),
        )
    }

    /// Number of consecutive stopped samples, from a fresh reset, after which
    /// the default estimators expose a bias.
    pub fn warm_up_samples(rate: f64) -> usize {
        let stillness = (STILLNESS_WINDOW_SECS * rate).ceil() as usize;
        let average = (BIAS_WINDOW_SECS * rate).ceil() as usize;
        stillness + average - 1
    }
}

impl<S: StillnessDetector, A: RunningAverage> AngularSpeedBias<S, A> {
    pub fn with_estimators(stillness: S, average: A) -> Self {
        AngularSpeedBias {
            inner: Mutex::new(BiasState {
                stillness,
                average,
                report: DiagnosticReport::with_info_keys([
                    LINEAR_SPEED_KEY,
                    ACCELERATION_STD_KEY,
                    ANGULAR_SPEED_STD_KEY,
                    BIAS_KEY,
                ]),
            }),
        }
    }

    /// Feed one validated inertial sample. Returns the bias once enough
    /// stopped samples have been averaged.
    pub fn evaluate(
        &self,
        linear_speed: f64,
        accelerations: &AccelerationsFrame,
        angular_speeds: &AngularSpeedsFrame,
    ) -> Option<f64> {
        let mut guard = self.inner.lock().ok()?;
        let state = &mut *guard;

        let still = state.stillness.update(accelerations, angular_speeds);
        let stopped = has_null_linear_speed(linear_speed);

        state.report.set_info_value(LINEAR_SPEED_KEY, linear_speed);
        set_optional_info(
            &mut state.report,
            ACCELERATION_STD_KEY,
            state.stillness.acceleration_std(),
        );
        set_optional_info(
            &mut state.report,
            ANGULAR_SPEED_STD_KEY,
            state.stillness.angular_speed_std(),
        );

        if still && stopped {
            state.average.update(angular_speeds.z);
        }

        if state.average.is_available() {
            let bias = state.average.average();
            state
                .report
                .set_diagnostic(DiagnosticStatus::Ok, "Angular speed bias is OK.");
            state.report.set_info_value(BIAS_KEY, bias);
            Some(bias)
        } else {
            state
                .report
                .set_diagnostic(DiagnosticStatus::Warn, "Angular speed bias not available.");
            state.report.clear_info(BIAS_KEY);
            None
        }
    }

    /// Drop the averaged bias. The stillness history is only discarded when
    /// the inertial stream itself went stale.
    pub fn reset(&self, reset_stillness: bool) {
        let Ok(mut guard) = self.inner.lock() else {
            return;
        };
        let state = &mut *guard;

        debug!("angular speed bias reset (stillness history: {})", !reset_stillness);
        state.report.clear_diagnostics();
        state.average.reset();
        state.report.clear_info(BIAS_KEY);
        state.report.clear_info(LINEAR_SPEED_KEY);

        if reset_stillness {
            state.stillness.reset();
            state.report.clear_info(ACCELERATION_STD_KEY);
            state.report.clear_info(ANGULAR_SPEED_STD_KEY);
        }
    }
}

fn has_null_linear_speed(linear_speed: f64) -> bool {
    linear_speed.is_finite() && linear_speed.abs() < LINEAR_SPEED_EPSILON
}

fn set_optional_info(report: &mut DiagnosticReport, key: &str, value: Option<f64>) {
    match value {
        Some(v) => report.set_info(key, format_info_value(v)),
        None => report.clear_info(key),
    }
}

impl<S: StillnessDetector, A: RunningAverage> ReportSource for AngularSpeedBias<S, A> {
    fn name(&self) -> &str {
        "angular_speed_bias"
    }

    fn report(&self) -> DiagnosticReport {
        self.inner
            .lock()
            .ok()
            .map(|s| s.report.clone())
            .unwrap_or_default()
    }
}
