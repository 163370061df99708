use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{
    ensure_bounded, ensure_non_negative, ensure_positive, MonitorError, MonitorResult,
};
use crate::imu::{ImuModel, MAX_RATE};

/// Longest rate-averaging window (s).
pub const MAX_RATE_WINDOW_SECS: f64 = 60.0;

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    // ── Sensor model ──
    pub imu: ImuModel,

    // ── Rate watchdogs ──
    /// Expected inertial/attitude rate; defaults to the IMU rate when unset.
    pub minimal_rate: Option<f64>,
    /// Accepted shortfall, as a fraction of the minimal rate.
    pub rate_tolerance_ratio: f64,
    pub rate_window_secs: f64,
    pub linear_speed_rate: f64,
    pub linear_speed_rate_tolerance_ratio: f64,

    // ── Heartbeat timeouts (s) ──
    pub inertial_timeout_secs: f64,
    pub attitude_timeout_secs: f64,
    pub linear_speed_timeout_secs: f64,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            imu: ImuModel::default(),
            minimal_rate: None,
            rate_tolerance_ratio: 0.1,
            rate_window_secs: 2.0,
            linear_speed_rate: 10.0,
            linear_speed_rate_tolerance_ratio: 0.1,
            inertial_timeout_secs: 1.0,
            attitude_timeout_secs: 1.0,
            linear_speed_timeout_secs: 1.0,
        }
    }
}

impl PluginConfig {
    pub fn from_json_str(json: &str) -> MonitorResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> MonitorResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn minimal_rate(&self) -> f64 {
        self.minimal_rate.unwrap_or(self.imu.rate)
    }

    pub fn validate(&self) -> MonitorResult<()> {
        self.imu.validate()?;
        ensure_bounded("minimal_rate", self.minimal_rate(), MAX_RATE)?;
        ensure_bounded("rate_window_secs", self.rate_window_secs, MAX_RATE_WINDOW_SECS)?;
        ensure_bounded("linear_speed_rate", self.linear_speed_rate, MAX_RATE)?;
        ensure_positive("inertial_timeout_secs", self.inertial_timeout_secs)?;
        ensure_positive("attitude_timeout_secs", self.attitude_timeout_secs)?;
        ensure_positive("linear_speed_timeout_secs", self.linear_speed_timeout_secs)?;

        for (name, ratio) in [
            ("rate_tolerance_ratio", self.rate_tolerance_ratio),
            ("linear_speed_rate_tolerance_ratio", self.linear_speed_rate_tolerance_ratio),
        ] {
            ensure_non_negative(name, ratio)?;
            if ratio >= 1.0 {
                return Err(MonitorError::InvalidParameters(format!(
                    "{} must be below 1, got {}",
                    name, ratio
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PluginConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.minimal_rate(), 10.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PluginConfig::from_json_str(
            r#"{ "imu": { "rate": 50.0 }, "linear_speed_timeout_secs": 2.5 }"#,
        )
        .unwrap();
        assert_eq!(config.imu.rate, 50.0);
        assert_eq!(config.minimal_rate(), 50.0);
        assert_eq!(config.linear_speed_timeout_secs, 2.5);
        assert_eq!(config.rate_window_secs, 2.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = PluginConfig::from_json_str(r#"{ "rate_tolerance_ratio": 1.5 }"#).unwrap_err();
        assert!(matches!(err, MonitorError::InvalidParameters(_)));

        let err = PluginConfig::from_json_str(r#"{ "inertial_timeout_secs": -1 }"#).unwrap_err();
        assert!(err.to_string().contains("inertial_timeout_secs"));

        let err = PluginConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, MonitorError::Json(_)));
    }

    #[test]
    fn test_unbounded_rates_rejected() {
        for json in [
            r#"{ "rate_window_secs": 1e300 }"#,
            r#"{ "imu": { "rate": 1e300 } }"#,
            r#"{ "minimal_rate": 1e300 }"#,
            r#"{ "linear_speed_rate": 1e300 }"#,
        ] {
            let err = PluginConfig::from_json_str(json).unwrap_err();
            assert!(matches!(err, MonitorError::InvalidParameters(_)), "{}", json);
        }

        let config = PluginConfig {
            rate_window_secs: MAX_RATE_WINDOW_SECS,
            minimal_rate: Some(MAX_RATE),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file() {
        let err = PluginConfig::from_json_file("/nonexistent/imu_monitor.json").unwrap_err();
        assert!(matches!(err, MonitorError::Io(_)));
    }
}
