// plugin.rs: health monitoring between the raw IMU streams and the localisation filter
//
// Everything in this module is synchronous and free of I/O. Producers (driver
// callbacks, replay loops, simulated tasks) call in from their own contexts;
// the plugin is shared behind an `Arc` and every method takes `&self`.
//
// Samples go in, accepted observations and a merged diagnostic report come out.

use crossbeam::atomic::AtomicCell;
use log::{debug, info};

use crate::bias::AngularSpeedBias;
use crate::checkup_attitude::AttitudeCheckup;
use crate::checkup_inertial::InertialMeasurementsCheckup;
use crate::config::PluginConfig;
use crate::diagnostic::{DiagnosticReport, DiagnosticStatus, ReportSource};
use crate::error::MonitorResult;
use crate::health_monitor::RateWatchdog;
use crate::imu::ImuModel;
use crate::types::{AngularSpeedObservation, AttitudeObservation};

pub struct LocalisationImuPlugin {
    imu: ImuModel,

    // Written by the speed producer, read by the inertial producer.
    linear_speed: AtomicCell<f64>,

    // Rate watchdogs, one per stream
    linear_speed_rate: RateWatchdog,
    attitude_rate: RateWatchdog,
    inertial_rate: RateWatchdog,

    // Range checkers
    attitude_checkup: AttitudeCheckup,
    inertial_checkup: InertialMeasurementsCheckup,

    angular_speed_bias: AngularSpeedBias,
}

impl LocalisationImuPlugin {
    pub fn new(config: PluginConfig) -> MonitorResult<Self> {
        config.validate()?;

        let imu = config.imu.clone();
        let minimal_rate = config.minimal_rate();
        let tolerance = minimal_rate * config.rate_tolerance_ratio;

        info!(
            "IMU monitor: rate {:.1} Hz, acceleration std {:.2e}, angular speed std {:.2e}",
            imu.rate,
            imu.acceleration_std(),
            imu.angular_speed_std()
        );

        Ok(Self {
            linear_speed: AtomicCell::new(f64::NAN),
            linear_speed_rate: RateWatchdog::new(
                "linear_speed",
                config.linear_speed_rate,
                config.linear_speed_rate * config.linear_speed_rate_tolerance_ratio,
                config.rate_window_secs,
                config.linear_speed_timeout_secs,
            ),
            attitude_rate: RateWatchdog::new(
                "attitude",
                minimal_rate,
                tolerance,
                config.rate_window_secs,
                config.attitude_timeout_secs,
            ),
            inertial_rate: RateWatchdog::new(
                "inertial_measurements",
                minimal_rate,
                tolerance,
                config.rate_window_secs,
                config.inertial_timeout_secs,
            ),
            attitude_checkup: AttitudeCheckup::new(),
            inertial_checkup: InertialMeasurementsCheckup::new(
                imu.acceleration_range,
                imu.angular_speed_range,
            ),
            angular_speed_bias: AngularSpeedBias::new(
                imu.rate,
                imu.acceleration_std(),
                imu.angular_speed_std(),
            ),
            imu,
        })
    }

    pub fn imu(&self) -> &ImuModel {
        &self.imu
    }

    /// Last accepted linear speed, NaN while unknown.
    pub fn linear_speed(&self) -> f64 {
        self.linear_speed.load()
    }

    // ── Sample feeds ─────────────────────────────────────────────────────

    /// Late samples are dropped and the previous speed stays in effect; only
    /// a heartbeat timeout makes it unknown again.
    pub fn process_linear_speed(&self, timestamp: f64, linear_speed: f64) {
        if self.linear_speed_rate.evaluate(timestamp) == DiagnosticStatus::Ok {
            self.linear_speed.store(linear_speed);
        }
    }

    /// Bias-corrected yaw rate, or `None` when the sample is rejected or the
    /// bias is not known yet.
    #[allow(clippy::too_many_arguments)]
    pub fn compute_angular_speed(
        &self,
        timestamp: f64,
        acceleration_x: f64,
        acceleration_y: f64,
        acceleration_z: f64,
        angular_speed_x: f64,
        angular_speed_y: f64,
        angular_speed_z: f64,
    ) -> Option<AngularSpeedObservation> {
        let accelerations =
            self.imu
                .create_accelerations_frame(acceleration_x, acceleration_y, acceleration_z);
        let angular_speeds =
            self.imu
                .create_angular_speeds_frame(angular_speed_x, angular_speed_y, angular_speed_z);

        if self.inertial_rate.evaluate(timestamp) != DiagnosticStatus::Ok
            || self.inertial_checkup.evaluate(&accelerations, &angular_speeds)
                != DiagnosticStatus::Ok
        {
            return None;
        }

        let bias = self.angular_speed_bias.evaluate(
            self.linear_speed.load(),
            &accelerations,
            &angular_speeds,
        )?;

        Some(AngularSpeedObservation {
            value: angular_speeds.z - bias,
            variance: self.imu.angular_speed_variance(),
        })
    }

    pub fn compute_attitude(
        &self,
        timestamp: f64,
        roll: f64,
        pitch: f64,
        course: f64,
    ) -> Option<AttitudeObservation> {
        let frame = self.imu.create_attitude_frame(roll, pitch, course);

        if self.attitude_rate.evaluate(timestamp) != DiagnosticStatus::Ok
            || self.attitude_checkup.evaluate(&frame) != DiagnosticStatus::Ok
        {
            return None;
        }

        Some(AttitudeObservation::new(
            frame.roll,
            frame.pitch,
            self.imu.angle_variance(),
        ))
    }

    // ── Diagnostics ──────────────────────────────────────────────────────

    /// Run the heartbeats, reset whatever depends on a silent stream, then
    /// merge every sub-report in a fixed order.
    pub fn make_diagnostic_report(&self, timestamp: f64) -> DiagnosticReport {
        self.check_heartbeats(timestamp);

        let mut report = DiagnosticReport::new();
        report += &self.linear_speed_rate.report();
        report += &self.attitude_rate.report();
        report += &self.attitude_checkup.report();
        report += &self.inertial_rate.report();
        report += &self.inertial_checkup.report();
        report += &self.angular_speed_bias.report();
        report
    }

    fn check_heartbeats(&self, timestamp: f64) {
        if !self.attitude_rate.heartbeat(timestamp) {
            debug!("attitude stream stale, resetting attitude checkup");
            self.attitude_checkup.reset();
        }

        if !self.linear_speed_rate.heartbeat(timestamp) {
            // Inertial data may still be flowing, so the stillness history
            // stays valid.
            debug!("linear speed stream stale, dropping speed and bias");
            self.linear_speed.store(f64::NAN);
            self.angular_speed_bias.reset(false);
        }

        if !self.inertial_rate.heartbeat(timestamp) {
            debug!("inertial stream stale, resetting range checkup and bias");
            self.inertial_checkup.reset();
            self.angular_speed_bias.reset(true);
        }
    }

    /// Sub-reports in the order they are merged into the aggregate.
    pub fn sources(&self) -> [&dyn ReportSource; 6] {
        [
            &self.linear_speed_rate,
            &self.attitude_rate,
            &self.attitude_checkup,
            &self.inertial_rate,
            &self.inertial_checkup,
            &self.angular_speed_bias,
        ]
    }
}
