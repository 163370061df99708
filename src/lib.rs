pub mod bias;
pub mod checkup_attitude;
pub mod checkup_inertial;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod health_monitor;
pub mod imu;
pub mod online_average;
pub mod plugin;
pub mod stillness;
pub mod types;

pub use config::PluginConfig;
pub use diagnostic::{Diagnostic, DiagnosticReport, DiagnosticStatus, ReportSource};
pub use error::{MonitorError, MonitorResult};
pub use imu::ImuModel;
pub use plugin::LocalisationImuPlugin;
pub use types::{AngularSpeedObservation, AttitudeObservation};
