use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use imu_monitor_rs::{DiagnosticStatus, ImuModel, LocalisationImuPlugin};
use log::{debug, info};
use tokio::time::{interval, Duration, Instant};

/// Simulated gyro offset around z (rad/s).
pub const SIM_YAW_BIAS: f64 = 0.002;

const DRIVE_SPEED: f64 = 5.0;

/// Shared timing for every producer: one monotonic origin, an optional drive
/// start, and per-stream cut-off times.
#[derive(Clone, Debug)]
pub struct Scenario {
    pub start: Instant,
    pub drive_after: Option<f64>,
    pub stop_speed_after: Option<f64>,
    pub stop_inertial_after: Option<f64>,
    pub stop_attitude_after: Option<f64>,
}

impl Scenario {
    pub fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn driving(&self, t: f64) -> bool {
        self.drive_after.map(|after| t >= after).unwrap_or(false)
    }

    fn stopped(limit: Option<f64>, t: f64) -> bool {
        limit.map(|after| t >= after).unwrap_or(false)
    }
}

/// Counters shared between producers and the reporter.
#[derive(Debug, Default)]
pub struct SimStats {
    pub speed_samples: AtomicU64,
    pub inertial_samples: AtomicU64,
    pub angular_speed_obs: AtomicU64,
    pub attitude_samples: AtomicU64,
    pub attitude_obs: AtomicU64,
}

fn period(rate: f64) -> Duration {
    Duration::from_secs_f64(1.0 / rate.max(1e-3))
}

/// Bounded pseudo-noise with roughly `std` spread.
fn noise(std: f64, phase: f64, freq: f64) -> f64 {
    std * (phase * freq).sin()
}

pub async fn linear_speed_loop(
    plugin: Arc<LocalisationImuPlugin>,
    scenario: Scenario,
    stats: Arc<SimStats>,
    rate: f64,
) {
    let mut interval = interval(period(rate));
    let mut sample_count = 0u64;

    loop {
        interval.tick().await;
        let t = scenario.now();
        if Scenario::stopped(scenario.stop_speed_after, t) {
            info!("[speed] stream stopped at t={:.1}s after {} samples", t, sample_count);
            break;
        }

        let speed = if scenario.driving(t) { DRIVE_SPEED } else { 0.0 };
        plugin.process_linear_speed(t, speed);
        stats.speed_samples.fetch_add(1, Ordering::Relaxed);

        sample_count += 1;
        if sample_count % 100 == 0 {
            debug!("[speed] {} samples", sample_count);
        }
    }
}

pub async fn inertial_loop(
    plugin: Arc<LocalisationImuPlugin>,
    scenario: Scenario,
    stats: Arc<SimStats>,
) {
    let imu: ImuModel = plugin.imu().clone();
    let acc_std = imu.acceleration_std();
    let gyro_std = imu.angular_speed_std();
    let mut interval = interval(period(imu.rate));
    let mut sample_count = 0u64;

    loop {
        interval.tick().await;
        let t = scenario.now();
        if Scenario::stopped(scenario.stop_inertial_after, t) {
            info!("[inertial] stream stopped at t={:.1}s after {} samples", t, sample_count);
            break;
        }

        let phase = sample_count as f64;
        // Driving adds engine vibration and a slow weave
        let (vibration, yaw_rate) = if scenario.driving(t) {
            (0.2, 0.1 * (t * 0.5).sin())
        } else {
            (0.0, 0.0)
        };

        let observation = plugin.compute_angular_speed(
            t,
            noise(acc_std, phase, 1.3) + vibration * (phase * 0.41).sin(),
            noise(acc_std, phase, 2.1) + vibration * (phase * 0.23).cos(),
            9.81 + noise(acc_std, phase, 0.7),
            noise(gyro_std, phase, 1.7),
            noise(gyro_std, phase, 0.9),
            SIM_YAW_BIAS + yaw_rate + noise(gyro_std, phase, 3.1),
        );

        stats.inertial_samples.fetch_add(1, Ordering::Relaxed);
        if observation.is_some() {
            stats.angular_speed_obs.fetch_add(1, Ordering::Relaxed);
        }

        sample_count += 1;
        if sample_count % 100 == 0 {
            debug!("[inertial] {} samples", sample_count);
        }
    }
}

pub async fn attitude_loop(
    plugin: Arc<LocalisationImuPlugin>,
    scenario: Scenario,
    stats: Arc<SimStats>,
) {
    let rate = plugin.imu().rate;
    let mut interval = interval(period(rate));
    let mut sample_count = 0u64;

    loop {
        interval.tick().await;
        let t = scenario.now();
        if Scenario::stopped(scenario.stop_attitude_after, t) {
            info!("[attitude] stream stopped at t={:.1}s after {} samples", t, sample_count);
            break;
        }

        let roll = 0.02 + 0.01 * (t * 0.3).sin();
        let pitch = -0.01 + 0.01 * (t * 0.2).cos();
        let course = (t * 0.05).rem_euclid(std::f64::consts::TAU);

        stats.attitude_samples.fetch_add(1, Ordering::Relaxed);
        if plugin.compute_attitude(t, roll, pitch, course).is_some() {
            stats.attitude_obs.fetch_add(1, Ordering::Relaxed);
        }
        sample_count += 1;
    }
}

/// Periodic diagnostics, the way a supervisor would poll the plugin.
pub async fn reporter_loop(
    plugin: Arc<LocalisationImuPlugin>,
    scenario: Scenario,
    stats: Arc<SimStats>,
    report_interval: Duration,
    json: bool,
) {
    let mut interval = interval(report_interval);
    let mut previous = DiagnosticStatus::Stale;

    loop {
        interval.tick().await;
        let t = scenario.now();
        let report = plugin.make_diagnostic_report(t);
        let status = report.worst_status();

        if status != previous {
            info!("[report] status {} -> {} at t={:.1}s", previous, status, t);
            previous = status;
        }

        if json {
            match serde_json::to_string(&report) {
                Ok(line) => println!("{}", line),
                Err(e) => log::error!("[report] serialization failed: {}", e),
            }
            continue;
        }

        let findings: Vec<String> = report
            .diagnostics
            .iter()
            .filter(|d| d.status != DiagnosticStatus::Ok)
            .map(|d| format!("{} {}", d.status, d.message))
            .collect();
        println!(
            "[{}] t={:6.1}s {:5} speed={} bias={} obs(gyro/att)={}/{} {}",
            crate::ts_now(),
            t,
            status,
            report.info.get("linear_speed").map(String::as_str).unwrap_or(""),
            report.info.get("angular_speed_bias").map(String::as_str).unwrap_or(""),
            stats.angular_speed_obs.load(Ordering::Relaxed),
            stats.attitude_obs.load(Ordering::Relaxed),
            findings.join(" | ")
        );
    }
}
