//! Observation types handed to the localisation filter.

use nalgebra::{SMatrix, SVector};

// ===== Observation Dimensions =====
pub const OBS_DIM_ATTITUDE: usize = 2; // (roll, pitch)

pub type AttitudeVec = SVector<f64, OBS_DIM_ATTITUDE>;
pub type AttitudeCov = SMatrix<f64, OBS_DIM_ATTITUDE, OBS_DIM_ATTITUDE>;

pub const ROLL: usize = 0;
pub const PITCH: usize = 1;

/// Bias-corrected yaw rate with its variance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AngularSpeedObservation {
    pub value: f64,
    pub variance: f64,
}

/// Roll/pitch observation with a diagonal covariance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttitudeObservation {
    pub y: AttitudeVec,
    pub r: AttitudeCov,
}

impl AttitudeObservation {
    pub fn new(roll: f64, pitch: f64, angle_variance: f64) -> Self {
        Self {
            y: AttitudeVec::new(roll, pitch),
            r: AttitudeCov::identity() * angle_variance,
        }
    }

    pub fn roll(&self) -> f64 {
        self.y[ROLL]
    }

    pub fn pitch(&self) -> f64 {
        self.y[PITCH]
    }
}
