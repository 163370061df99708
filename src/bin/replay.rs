use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::Parser;
use flate2::read::GzDecoder;
use imu_monitor_rs::{DiagnosticReport, LocalisationImuPlugin, PluginConfig};
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(about = "Replay a recorded session through the IMU monitor", long_about = None)]
struct Args {
    /// Path to session_*.json[.gz] log
    #[arg(long, conflicts_with = "session_dir")]
    log: Option<PathBuf>,

    /// Directory of sessions to batch replay (processes session_*.json[.gz])
    #[arg(long)]
    session_dir: Option<PathBuf>,

    /// Plugin configuration (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also build a report every N seconds of session time (0 = only on
    /// recorded report events)
    #[arg(long, default_value = "0")]
    report_period: f64,

    /// Print every generated report as it happens
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Event {
    LinearSpeed {
        timestamp: f64,
        speed: f64,
    },
    Inertial {
        timestamp: f64,
        accel: [f64; 3],
        gyro: [f64; 3],
    },
    Attitude {
        timestamp: f64,
        roll: f64,
        pitch: f64,
        #[serde(default)]
        course: f64,
    },
    Report {
        timestamp: f64,
    },
}

impl Event {
    fn timestamp(&self) -> f64 {
        match self {
            Event::LinearSpeed { timestamp, .. }
            | Event::Inertial { timestamp, .. }
            | Event::Attitude { timestamp, .. }
            | Event::Report { timestamp } => *timestamp,
        }
    }
}

#[derive(Deserialize)]
struct SessionFile {
    events: Vec<Event>,
}

fn load_session(path: &Path) -> anyhow::Result<SessionFile> {
    let file = File::open(path)?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        let gz = GzDecoder::new(file);
        let reader = BufReader::new(gz);
        Ok(serde_json::from_reader(reader)?)
    } else {
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Report statistics accumulated over one session.
#[derive(Default)]
struct ReportHistory {
    count: usize,
    by_status: BTreeMap<String, usize>,
    first_bias_ok: Option<f64>,
    last: Option<DiagnosticReport>,
}

impl ReportHistory {
    fn record(&mut self, timestamp: f64, report: DiagnosticReport, verbose: bool) {
        let status = report.worst_status();
        *self.by_status.entry(status.label().to_string()).or_insert(0) += 1;
        self.count += 1;

        if self.first_bias_ok.is_none()
            && report
                .diagnostics
                .iter()
                .any(|d| d.message == "Angular speed bias is OK.")
        {
            info!("bias available at t={:.3}", timestamp);
            self.first_bias_ok = Some(timestamp);
        }

        if verbose {
            let messages: Vec<&str> =
                report.diagnostics.iter().map(|d| d.message.as_str()).collect();
            println!("[{:10.3}] {:5} {}", timestamp, status, messages.join(" | "));
        }
        self.last = Some(report);
    }
}

/// Report times passed by `ts`, oldest first. The schedule starts one period
/// after the first event; a gap spanning several periods yields all of them.
fn due_reports(next_report: &mut Option<f64>, ts: f64, period: f64) -> Vec<f64> {
    let mut due = Vec::new();
    if period <= 0.0 {
        return due;
    }
    let next = next_report.get_or_insert(ts + period);
    while ts >= *next {
        due.push(*next);
        *next += period;
    }
    due
}

fn run_once(path: &Path, config: &PluginConfig, args: &Args) -> anyhow::Result<serde_json::Value> {
    let session = load_session(path)?;
    let plugin = LocalisationImuPlugin::new(config.clone())?;

    let mut history = ReportHistory::default();
    let mut angular_speed_obs = 0usize;
    let mut attitude_obs = 0usize;
    let mut inertial_samples = 0usize;
    let mut attitude_samples = 0usize;
    let mut speed_samples = 0usize;
    let mut yaw_rate_sum = 0.0;
    let mut next_report: Option<f64> = None;
    let mut last_ts = f64::NEG_INFINITY;

    for event in &session.events {
        let ts = event.timestamp();
        if ts < last_ts {
            warn!("event at t={:.3} is older than t={:.3}", ts, last_ts);
        }
        last_ts = last_ts.max(ts);

        // Periodic reports fire before the event that crosses the boundary
        for due in due_reports(&mut next_report, ts, args.report_period) {
            history.record(due, plugin.make_diagnostic_report(due), args.verbose);
        }

        match event {
            Event::LinearSpeed { timestamp, speed } => {
                plugin.process_linear_speed(*timestamp, *speed);
                speed_samples += 1;
            }
            Event::Inertial { timestamp, accel, gyro } => {
                inertial_samples += 1;
                if let Some(obs) = plugin.compute_angular_speed(
                    *timestamp, accel[0], accel[1], accel[2], gyro[0], gyro[1], gyro[2],
                ) {
                    angular_speed_obs += 1;
                    yaw_rate_sum += obs.value;
                }
            }
            Event::Attitude { timestamp, roll, pitch, course } => {
                attitude_samples += 1;
                if plugin.compute_attitude(*timestamp, *roll, *pitch, *course).is_some() {
                    attitude_obs += 1;
                }
            }
            Event::Report { timestamp } => {
                history.record(*timestamp, plugin.make_diagnostic_report(*timestamp), args.verbose);
            }
        }
    }

    let mean_yaw_rate = if angular_speed_obs > 0 {
        yaw_rate_sum / angular_speed_obs as f64
    } else {
        0.0
    };

    Ok(json!({
        "log": path.display().to_string(),
        "events": session.events.len(),
        "linear_speed_samples": speed_samples,
        "inertial_samples": inertial_samples,
        "attitude_samples": attitude_samples,
        "angular_speed_observations": angular_speed_obs,
        "attitude_observations": attitude_obs,
        "mean_corrected_yaw_rate": mean_yaw_rate,
        "reports": history.count,
        "reports_by_status": history.by_status,
        "first_bias_ok": history.first_bias_ok,
        "final_linear_speed": plugin.linear_speed(),
        "final_report": history.last,
    }))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if !args.report_period.is_finite() || args.report_period < 0.0 {
        anyhow::bail!("--report-period must be a non-negative number of seconds");
    }

    let config = match args.config.as_ref() {
        Some(path) => PluginConfig::from_json_file(path)?,
        None => PluginConfig::default(),
    };

    let mut results = Vec::new();

    if let Some(dir) = args.session_dir.as_ref() {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            let is_session = name.ends_with(".json") || name.ends_with(".json.gz");
            if !(name.starts_with("session_") && is_session) {
                continue;
            }
            match run_once(&path, &config, &args) {
                Ok(res) => results.push(res),
                Err(e) => eprintln!("Failed {}: {}", path.display(), e),
            }
        }
    } else if let Some(log) = args.log.as_ref() {
        results.push(run_once(log, &config, &args)?);
    } else {
        anyhow::bail!("Provide --log or --session-dir");
    }

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagged_events() {
        let session: SessionFile = serde_json::from_str(
            r#"{ "events": [
                { "type": "linear_speed", "timestamp": 0.0, "speed": 0.0 },
                { "type": "inertial", "timestamp": 0.01, "accel": [0, 0, 9.81], "gyro": [0, 0, 0.002] },
                { "type": "attitude", "timestamp": 0.02, "roll": 0.01, "pitch": -0.02 },
                { "type": "report", "timestamp": 0.03 }
            ] }"#,
        )
        .unwrap();

        assert_eq!(session.events.len(), 4);
        assert!(matches!(session.events[1], Event::Inertial { accel, .. } if accel[2] == 9.81));
        assert!(matches!(session.events[2], Event::Attitude { course, .. } if course == 0.0));
        assert_eq!(session.events[3].timestamp(), 0.03);
    }

    #[test]
    fn test_due_reports_cover_gaps() {
        let mut next = None;
        assert!(due_reports(&mut next, 0.0, 1.0).is_empty());
        assert_eq!(next, Some(1.0));
        assert!(due_reports(&mut next, 0.5, 1.0).is_empty());
        assert_eq!(due_reports(&mut next, 1.0, 1.0), vec![1.0]);
        assert_eq!(due_reports(&mut next, 4.5, 1.0), vec![2.0, 3.0, 4.0]);
        assert_eq!(next, Some(5.0));

        let mut next = None;
        assert!(due_reports(&mut next, 3.0, 0.0).is_empty());
        assert_eq!(next, None);
    }

    #[test]
    fn test_gap_reports_trip_heartbeats() {
        let plugin = LocalisationImuPlugin::new(PluginConfig::default()).unwrap();
        let mut history = ReportHistory::default();
        let mut next = None;
        for n in 0..30 {
            let ts = n as f64 * 0.1;
            for due in due_reports(&mut next, ts, 1.0) {
                history.record(due, plugin.make_diagnostic_report(due), false);
            }
            plugin.process_linear_speed(ts, 0.0);
        }
        assert_eq!(history.count, 2);

        // next event arrives after a long gap: reports at 3, 4, 5, 6 and 7 s,
        // the heartbeat trips at 4 s
        for due in due_reports(&mut next, 7.5, 1.0) {
            history.record(due, plugin.make_diagnostic_report(due), false);
        }
        assert_eq!(history.count, 7);
        assert_eq!(history.by_status["ERROR"], 2);
        assert_eq!(history.by_status["OK"], 1);
        assert_eq!(history.by_status["STALE"], 4);
    }

    #[test]
    fn test_history_counts_statuses() {
        let plugin = LocalisationImuPlugin::new(PluginConfig::default()).unwrap();
        let mut history = ReportHistory::default();
        history.record(0.0, plugin.make_diagnostic_report(0.0), false);
        plugin.process_linear_speed(0.1, 0.0);
        history.record(0.1, plugin.make_diagnostic_report(0.1), false);

        assert_eq!(history.count, 2);
        assert_eq!(history.by_status["STALE"], 1);
        assert_eq!(history.by_status["ERROR"], 1);
        assert_eq!(history.first_bias_ok, None);
    }
}
