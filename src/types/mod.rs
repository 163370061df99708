pub mod linalg;

pub use linalg::*;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Specific forces along the body axes (m/s²).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AccelerationsFrame {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelerationsFrame {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_vector(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Angular speeds around the body axes (rad/s).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AngularSpeedsFrame {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AngularSpeedsFrame {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_vector(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Attitude angles (rad). Course is carried but never range checked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RollPitchCourseFrame {
    pub roll: f64,
    pub pitch: f64,
    pub course: f64,
}

impl RollPitchCourseFrame {
    pub fn new(roll: f64, pitch: f64, course: f64) -> Self {
        Self {
            roll,
            pitch,
            course,
        }
    }
}
