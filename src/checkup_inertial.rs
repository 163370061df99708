use std::sync::Mutex;

use crate::diagnostic::{DiagnosticReport, DiagnosticStatus, ReportSource};
use crate::types::{AccelerationsFrame, AngularSpeedsFrame};

const INFO_KEYS: [&str; 6] = [
    "acceleration_x",
    "acceleration_y",
    "acceleration_z",
    "angular_speed_x",
    "angular_speed_y",
    "angular_speed_z",
];

/// Checks accelerations and angular speeds against the sensor's physical
/// range. One finding per quantity group.
#[derive(Debug)]
pub struct InertialMeasurementsCheckup {
    acceleration_range: f64,
    angular_speed_range: f64,
    report: Mutex<DiagnosticReport>,
}

impl InertialMeasurementsCheckup {
    pub fn new(acceleration_range: f64, angular_speed_range: f64) -> Self {
        Self {
            acceleration_range,
            angular_speed_range,
            report: Mutex::new(DiagnosticReport::with_info_keys(INFO_KEYS)),
        }
    }

    pub fn evaluate(
        &self,
        accelerations: &AccelerationsFrame,
        angular_speeds: &AngularSpeedsFrame,
    ) -> DiagnosticStatus {
        let mut report = match self.report.lock() {
            Ok(report) => report,
            Err(_) => return DiagnosticStatus::Error,
        };

        report.clear_diagnostics();

        if within_range(
            [accelerations.x, accelerations.y, accelerations.z],
            self.acceleration_range,
        ) {
            report.add_diagnostic(DiagnosticStatus::Ok, "Acceleration data is OK.");
        } else {
            report.add_diagnostic(DiagnosticStatus::Error, "Acceleration data is out of range.");
        }

        if within_range(
            [angular_speeds.x, angular_speeds.y, angular_speeds.z],
            self.angular_speed_range,
        ) {
            report.add_diagnostic(DiagnosticStatus::Ok, "Angular speed data is OK.");
        } else {
            report.add_diagnostic(DiagnosticStatus::Error, "Angular speed data is out of range.");
        }

        report.set_info_value("acceleration_x", accelerations.x);
        report.set_info_value("acceleration_y", accelerations.y);
        report.set_info_value("acceleration_z", accelerations.z);
        report.set_info_value("angular_speed_x", angular_speeds.x);
        report.set_info_value("angular_speed_y", angular_speeds.y);
        report.set_info_value("angular_speed_z", angular_speeds.z);

        report.worst_status()
    }

    pub fn reset(&self) {
        if let Ok(mut report) = self.report.lock() {
            report.clear_diagnostics();
            report.clear_all_info();
        }
    }
}

// NaN never satisfies the bound.
fn within_range(values: [f64; 3], range: f64) -> bool {
    values.iter().all(|v| v.abs() <= range)
}

impl ReportSource for InertialMeasurementsCheckup {
    fn name(&self) -> &str {
        "inertial_measurements"
    }

    fn report(&self) -> DiagnosticReport {
        self.report
            .lock()
            .ok()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn frames() -> (AccelerationsFrame, AngularSpeedsFrame) {
        (
            AccelerationsFrame::new(-1.0, 1.0, 9.81),
            AngularSpeedsFrame::new(10.0 / 180.0 * PI, -20.0 / 180.0 * PI, 60.0 / 180.0 * PI),
        )
    }

    fn checkup() -> InertialMeasurementsCheckup {
        InertialMeasurementsCheckup::new(10.0, 2.0 * PI)
    }

    #[test]
    fn test_good_frames() {
        let checkup = checkup();
        let (acc, gyro) = frames();

        assert_eq!(checkup.evaluate(&acc, &gyro), DiagnosticStatus::Ok);
        let report = checkup.report();
        assert_eq!(report.diagnostics.len(), 2);
        assert_eq!(report.diagnostics[0].message, "Acceleration data is OK.");
        assert_eq!(report.diagnostics[1].message, "Angular speed data is OK.");
        assert_eq!(report.info["acceleration_x"], "-1");
        assert_eq!(report.info["acceleration_y"], "1");
        assert_eq!(report.info["acceleration_z"], "9.81");
        assert_eq!(report.info["angular_speed_x"], "0.174533");
        assert_eq!(report.info["angular_speed_y"], "-0.349066");
        assert_eq!(report.info["angular_speed_z"], "1.0472");
    }

    #[test]
    fn test_acceleration_out_of_range() {
        let checkup = checkup();
        let (mut acc, gyro) = frames();
        acc.z = 11.0;

        assert_eq!(checkup.evaluate(&acc, &gyro), DiagnosticStatus::Error);
        let report = checkup.report();
        assert_eq!(report.diagnostics[0].status, DiagnosticStatus::Error);
        assert_eq!(report.diagnostics[0].message, "Acceleration data is out of range.");
        assert_eq!(report.diagnostics[1].status, DiagnosticStatus::Ok);
        assert_eq!(report.info["acceleration_z"], "11");
    }

    #[test]
    fn test_angular_speed_out_of_range() {
        let checkup = checkup();
        let (acc, mut gyro) = frames();
        gyro.z = 4.0 * PI;

        assert_eq!(checkup.evaluate(&acc, &gyro), DiagnosticStatus::Error);
        let report = checkup.report();
        assert_eq!(report.diagnostics[0].status, DiagnosticStatus::Ok);
        assert_eq!(report.diagnostics[1].message, "Angular speed data is out of range.");
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let checkup = checkup();
        let acc = AccelerationsFrame::new(10.0, -10.0, 10.0);
        let gyro = AngularSpeedsFrame::new(2.0 * PI, -2.0 * PI, 2.0 * PI);
        assert_eq!(checkup.evaluate(&acc, &gyro), DiagnosticStatus::Ok);

        let acc = AccelerationsFrame::new(10.0 + 1e-9, 0.0, 0.0);
        assert_eq!(checkup.evaluate(&acc, &gyro), DiagnosticStatus::Error);
    }

    #[test]
    fn test_non_finite_is_out_of_range() {
        let checkup = checkup();
        let (acc, mut gyro) = frames();
        gyro.y = f64::NAN;
        assert_eq!(checkup.evaluate(&acc, &gyro), DiagnosticStatus::Error);
        assert_eq!(checkup.report().info["angular_speed_y"], "nan");
    }

    #[test]
    fn test_reset_keeps_placeholders() {
        let checkup = checkup();
        let (acc, gyro) = frames();
        checkup.evaluate(&acc, &gyro);
        checkup.reset();

        let report = checkup.report();
        assert!(report.is_stale());
        assert_eq!(report.info.len(), 6);
        assert!(report.info.values().all(String::is_empty));

        // range survives the reset
        assert_eq!(checkup.evaluate(&acc, &gyro), DiagnosticStatus::Ok);
    }
}
