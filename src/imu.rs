//! Physical model of the IMU/AHRS feeding the monitor
//! Turns datasheet noise densities into per-sample std and variances, and raw
//! axis values into body-frame frames.

use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_bounded, ensure_non_negative, ensure_positive, MonitorResult};
use crate::types::{AccelerationsFrame, AngularSpeedsFrame, RollPitchCourseFrame};

/// Sensor-to-body mounting angles (rad), applied roll, then pitch, then yaw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountingAngles {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

/// Fastest sample rate (Hz) accepted for any stream.
pub const MAX_RATE: f64 = 10_000.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImuModel {
    pub rate: f64,                        // Hz
    pub acceleration_noise_density: f64,  // m/s²/√Hz
    pub acceleration_range: f64,          // m/s²
    pub angular_speed_noise_density: f64, // rad/s/√Hz
    pub angular_speed_range: f64,         // rad/s
    pub angle_std: f64,                   // rad
    pub mounting: MountingAngles,
}

impl Default for ImuModel {
    fn default() -> Self {
        Self {
            rate: 10.0,
            acceleration_noise_density: 0.0005,
            acceleration_range: 10.0,
            angular_speed_noise_density: 3.4907e-04_f64.to_radians(),
            angular_speed_range: 300.0_f64.to_radians(),
            angle_std: 0.01745,
            mounting: MountingAngles::default(),
        }
    }
}

impl ImuModel {
    pub fn validate(&self) -> MonitorResult<()> {
        ensure_bounded("imu.rate", self.rate, MAX_RATE)?;
        ensure_positive("imu.acceleration_noise_density", self.acceleration_noise_density)?;
        ensure_positive("imu.acceleration_range", self.acceleration_range)?;
        ensure_positive("imu.angular_speed_noise_density", self.angular_speed_noise_density)?;
        ensure_positive("imu.angular_speed_range", self.angular_speed_range)?;
        ensure_non_negative("imu.angle_std", self.angle_std)?;
        Ok(())
    }

    /// Per-sample acceleration std at the configured rate.
    pub fn acceleration_std(&self) -> f64 {
        self.acceleration_noise_density * self.rate.sqrt()
    }

    pub fn angular_speed_std(&self) -> f64 {
        self.angular_speed_noise_density * self.rate.sqrt()
    }

    pub fn angular_speed_variance(&self) -> f64 {
        self.angular_speed_std().powi(2)
    }

    pub fn angle_variance(&self) -> f64 {
        self.angle_std * self.angle_std
    }

    fn mounting_rotation(&self) -> Rotation3<f64> {
        Rotation3::from_euler_angles(self.mounting.roll, self.mounting.pitch, self.mounting.yaw)
    }

    pub fn create_accelerations_frame(&self, x: f64, y: f64, z: f64) -> AccelerationsFrame {
        AccelerationsFrame::from_vector(self.mounting_rotation() * Vector3::new(x, y, z))
    }

    pub fn create_angular_speeds_frame(&self, x: f64, y: f64, z: f64) -> AngularSpeedsFrame {
        AngularSpeedsFrame::from_vector(self.mounting_rotation() * Vector3::new(x, y, z))
    }

    /// The AHRS already reports body-frame angles.
    pub fn create_attitude_frame(
        &self,
        roll: f64,
        pitch: f64,
        course: f64,
    ) -> RollPitchCourseFrame {
        RollPitchCourseFrame::new(roll, pitch, course)
    }
}
