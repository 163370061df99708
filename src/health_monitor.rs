use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::diagnostic::{format_info_value, DiagnosticReport, DiagnosticStatus, ReportSource};

/// Watches the arrival rate of one sample stream.
///
/// `evaluate` judges each sample against the minimal rate, `heartbeat` is the
/// coarse check the diagnostics caller runs to notice a stream that went dark.
#[derive(Debug)]
pub struct RateWatchdog {
    label: String,
    minimal_rate: f64,
    tolerance: f64,
    heartbeat_timeout: f64,
    window_len: usize,
    rate_key: String,
    interval_key: String,
    state: Mutex<RateState>,
}

#[derive(Debug)]
struct RateState {
    last_timestamp: Option<f64>,
    intervals: VecDeque<f64>,
    report: DiagnosticReport,
}

impl RateState {
    fn clear(&mut self) {
        self.last_timestamp = None;
        self.intervals.clear();
        self.report.clear_diagnostics();
        self.report.clear_all_info();
    }

    fn mean_rate(&self, window_len: usize) -> Option<f64> {
        if self.intervals.len() < window_len {
            return None;
        }
        let total: f64 = self.intervals.iter().sum();
        Some(self.intervals.len() as f64 / total)
    }
}

impl RateWatchdog {
    /// `window_secs` of history at the minimal rate are averaged before the
    /// rate is considered known.
    pub fn new(
        label: &str,
        minimal_rate: f64,
        tolerance: f64,
        window_secs: f64,
        heartbeat_timeout: f64,
    ) -> Self {
        let window_len = ((window_secs * minimal_rate).ceil() as usize).max(1);
        let rate_key = format!("{}_rate", label);
        let interval_key = format!("{}_last_interval", label);
        let report = DiagnosticReport::with_info_keys([rate_key.clone(), interval_key.clone()]);

        RateWatchdog {
            label: label.to_string(),
            minimal_rate,
            tolerance,
            heartbeat_timeout,
            window_len,
            rate_key,
            interval_key,
            state: Mutex::new(RateState {
                last_timestamp: None,
                intervals: VecDeque::new(),
                report,
            }),
        }
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Record a sample arrival and judge the current rate.
    pub fn evaluate(&self, timestamp: f64) -> DiagnosticStatus {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(_) => return DiagnosticStatus::Error,
        };

        let mut out_of_order = false;
        let mut interval = None;
        if let Some(previous) = state.last_timestamp {
            let dt = timestamp - previous;
            if dt > 0.0 {
                state.intervals.push_back(dt);
                while state.intervals.len() > self.window_len {
                    state.intervals.pop_front();
                }
                interval = Some(dt);
            } else {
                out_of_order = true;
            }
        }
        // Monitoring continues through errors, the next sample is judged
        // against this one.
        state.last_timestamp = Some(timestamp);

        let rate = state.mean_rate(self.window_len);
        let threshold = self.minimal_rate - self.tolerance;
        let (status, message) = if out_of_order {
            (
                DiagnosticStatus::Error,
                format!("{} timestamps are not increasing.", self.label),
            )
        } else {
            match rate {
                None => (
                    DiagnosticStatus::Error,
                    format!("{} rate not available.", self.label),
                ),
                Some(r) if r < threshold => (
                    DiagnosticStatus::Error,
                    format!("{} rate is too low.", self.label),
                ),
                // A single late sample barely moves the mean
                Some(_) if interval.map(|dt| 1.0 / dt < threshold).unwrap_or(false) => (
                    DiagnosticStatus::Error,
                    format!("{} sample is late.", self.label),
                ),
                Some(_) => (
                    DiagnosticStatus::Ok,
                    format!("{} rate is OK.", self.label),
                ),
            }
        };

        state.report.set_diagnostic(status, message);
        match rate {
            Some(r) => state.report.set_info_value(self.rate_key.as_str(), r),
            None => state.report.clear_info(&self.rate_key),
        }
        if let Some(dt) = interval {
            state.report.set_info_value(self.interval_key.as_str(), dt);
        }

        status
    }

    /// Returns false when the stream has been silent for longer than the
    /// heartbeat timeout. The watchdog then clears itself, so its report reads
    /// STALE until samples come back.
    pub fn heartbeat(&self, timestamp: f64) -> bool {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(_) => return false,
        };

        match state.last_timestamp {
            Some(last) if timestamp - last > self.heartbeat_timeout => {
                warn!(
                    "{} silent for {:.3}s (timeout {:.3}s), resetting",
                    self.label,
                    timestamp - last,
                    self.heartbeat_timeout
                );
                state.clear();
                false
            }
            _ => true,
        }
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.state.lock().ok().and_then(|s| s.last_timestamp)
    }

    pub fn reset(&self) {
        if let Ok(mut state) = self.state.lock() {
            debug!("{} rate watchdog reset", self.label);
            state.clear();
        }
    }
}

impl ReportSource for RateWatchdog {
    fn name(&self) -> &str {
        &self.label
    }

    fn report(&self) -> DiagnosticReport {
        self.state
            .lock()
            .ok()
            .map(|s| s.report.clone())
            .unwrap_or_default()
    }
}
