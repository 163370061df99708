use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::time::{sleep, Duration, Instant};

use imu_monitor_rs::{LocalisationImuPlugin, PluginConfig};

mod sim;

use sim::{Scenario, SimStats};

#[derive(Parser, Debug)]
#[command(name = "imu_monitor")]
#[command(about = "Live IMU health monitor on simulated speed, inertial and attitude streams", long_about = None)]
struct Args {
    /// Duration in seconds (0 = continuous)
    #[arg(value_name = "SECONDS", default_value = "30")]
    duration: u64,

    /// Plugin configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start driving after this many seconds
    #[arg(long)]
    drive_after: Option<f64>,

    /// Stop the linear speed stream after this many seconds
    #[arg(long)]
    stop_speed_after: Option<f64>,

    /// Stop the inertial stream after this many seconds
    #[arg(long)]
    stop_inertial_after: Option<f64>,

    /// Stop the attitude stream after this many seconds
    #[arg(long)]
    stop_attitude_after: Option<f64>,

    /// Seconds between diagnostic reports
    #[arg(long, default_value = "1.0")]
    report_interval: f64,

    /// Print each report as a JSON line
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if !(args.report_interval.is_finite() && args.report_interval > 0.0) {
        anyhow::bail!("--report-interval must be positive");
    }

    let config = match args.config.as_ref() {
        Some(path) => PluginConfig::from_json_file(path)?,
        None => PluginConfig::default(),
    };

    println!("[{}] IMU Monitor Starting", ts_now());
    println!("  Duration: {} seconds (0=continuous)", args.duration);
    println!("  IMU rate: {:.1} Hz", config.imu.rate);
    println!("  Linear speed rate: {:.1} Hz", config.linear_speed_rate);
    if let Some(after) = args.drive_after {
        println!("  Driving after: {:.1}s", after);
    }

    let linear_speed_rate = config.linear_speed_rate;
    let plugin = Arc::new(LocalisationImuPlugin::new(config)?);
    let stats = Arc::new(SimStats::default());
    let scenario = Scenario {
        start: Instant::now(),
        drive_after: args.drive_after,
        stop_speed_after: args.stop_speed_after,
        stop_inertial_after: args.stop_inertial_after,
        stop_attitude_after: args.stop_attitude_after,
    };

    // Hold handles so tasks can be aborted on shutdown
    let handles = vec![
        tokio::spawn(sim::linear_speed_loop(
            plugin.clone(),
            scenario.clone(),
            stats.clone(),
            linear_speed_rate,
        )),
        tokio::spawn(sim::inertial_loop(plugin.clone(), scenario.clone(), stats.clone())),
        tokio::spawn(sim::attitude_loop(plugin.clone(), scenario.clone(), stats.clone())),
        tokio::spawn(sim::reporter_loop(
            plugin.clone(),
            scenario.clone(),
            stats.clone(),
            Duration::from_secs_f64(args.report_interval),
            args.json,
        )),
    ];

    if args.duration > 0 {
        sleep(Duration::from_secs(args.duration)).await;
        println!("[{}] Duration reached, stopping...", ts_now());
    } else {
        tokio::signal::ctrl_c().await?;
        println!("[{}] Interrupted, stopping...", ts_now());
    }

    for handle in handles {
        handle.abort();
    }

    let final_report = plugin.make_diagnostic_report(scenario.now());

    println!("\n=== Final Stats ===");
    println!(
        "Linear speed samples: {}",
        stats.speed_samples.load(Ordering::Relaxed)
    );
    println!(
        "Inertial samples: {} ({} angular speed observations)",
        stats.inertial_samples.load(Ordering::Relaxed),
        stats.angular_speed_obs.load(Ordering::Relaxed)
    );
    println!(
        "Attitude samples: {} ({} observations)",
        stats.attitude_samples.load(Ordering::Relaxed),
        stats.attitude_obs.load(Ordering::Relaxed)
    );
    println!("Simulated yaw bias: {:.5} rad/s", sim::SIM_YAW_BIAS);
    println!("Final status: {}", final_report.worst_status());
    println!("{}", serde_json::to_string_pretty(&final_report)?);

    Ok(())
}

pub(crate) fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
