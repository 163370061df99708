use std::f64::consts::FRAC_PI_2;
use std::sync::Mutex;

use crate::diagnostic::{DiagnosticReport, DiagnosticStatus, ReportSource};
use crate::types::RollPitchCourseFrame;

/// Roll and pitch must stay within ±π/2. Course wraps around and is not
/// checked.
#[derive(Debug)]
pub struct AttitudeCheckup {
    report: Mutex<DiagnosticReport>,
}

impl AttitudeCheckup {
    pub fn new() -> Self {
        Self {
            report: Mutex::new(DiagnosticReport::with_info_keys(["roll", "pitch"])),
        }
    }

    pub fn evaluate(&self, frame: &RollPitchCourseFrame) -> DiagnosticStatus {
        let mut report = match self.report.lock() {
            Ok(report) => report,
            Err(_) => return DiagnosticStatus::Error,
        };

        if check_attitude_angles(frame) {
            report.set_diagnostic(DiagnosticStatus::Ok, "Attitude is OK.");
        } else {
            report.set_diagnostic(DiagnosticStatus::Error, "Attitude angles are out of range.");
        }

        report.set_info_value("roll", frame.roll);
        report.set_info_value("pitch", frame.pitch);
        report.worst_status()
    }

    pub fn reset(&self) {
        if let Ok(mut report) = self.report.lock() {
            report.clear_diagnostics();
            report.clear_all_info();
        }
    }
}

impl Default for AttitudeCheckup {
    fn default() -> Self {
        Self::new()
    }
}

fn check_attitude_angles(frame: &RollPitchCourseFrame) -> bool {
    let bounds = -FRAC_PI_2..=FRAC_PI_2;
    bounds.contains(&frame.roll) && bounds.contains(&frame.pitch)
}

impl ReportSource for AttitudeCheckup {
    fn name(&self) -> &str {
        "attitude"
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

    #[test]
    fn test_good_frame() {
        let checkup = AttitudeCheckup::new();
        let frame = RollPitchCourseFrame::new(1.0472, 0.349, 0.0);

        assert_eq!(checkup.evaluate(&frame), DiagnosticStatus::Ok);
        let report = checkup.report();
        assert_eq!(report.diagnostics[0].message, "Attitude is OK.");
        assert_eq!(report.info["roll"], "1.0472");
        assert_eq!(report.info["pitch"], "0.349");
    }

    #[test]
    fn test_roll_out_of_range() {
        let checkup = AttitudeCheckup::new();
        let frame = RollPitchCourseFrame::new(1.7453, -0.156, 0.0);

        assert_eq!(checkup.evaluate(&frame), DiagnosticStatus::Error);
        let report = checkup.report();
        assert_eq!(report.diagnostics[0].message, "Attitude angles are out of range.");
        assert_eq!(report.info["roll"], "1.7453");
        assert_eq!(report.info["pitch"], "-0.156");
    }

    #[test]
    fn test_pitch_out_of_range() {
        let checkup = AttitudeCheckup::new();
        let frame = RollPitchCourseFrame::new(0.05, -1.903, 0.0);
        assert_eq!(checkup.evaluate(&frame), DiagnosticStatus::Error);
        assert_eq!(checkup.report().info["pitch"], "-1.903");
    }

    #[test]
    fn test_bounds_inclusive_and_course_ignored() {
        let checkup = AttitudeCheckup::new();
        assert_eq!(
            checkup.evaluate(&RollPitchCourseFrame::new(FRAC_PI_2, -FRAC_PI_2, 3.0 * PI)),
            DiagnosticStatus::Ok
        );
        assert_eq!(
            checkup.evaluate(&RollPitchCourseFrame::new(FRAC_PI_2 + 1e-9, 0.0, 0.0)),
            DiagnosticStatus::Error
        );
        assert_eq!(
            checkup.evaluate(&RollPitchCourseFrame::new(0.0, 0.0, f64::NAN)),
            DiagnosticStatus::Ok
        );
    }

    #[test]
    fn test_stale_after_reset() {
        let checkup = AttitudeCheckup::new();
        assert!(checkup.report().is_stale());

        checkup.evaluate(&RollPitchCourseFrame::new(0.1, 0.1, 0.0));
        checkup.reset();

        let report = checkup.report();
        assert!(report.is_stale());
        assert_eq!(report.info["roll"], "");
        assert_eq!(report.info["pitch"], "");
    }
}
