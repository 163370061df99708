//! Diagnostic report model shared by every checker.
//!
//! A report is an ordered list of findings plus a string map of the last seen
//! values. Each checker owns a disjoint set of info keys, so merging reports is
//! concatenation plus map union.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::AddAssign;

/// Severity of a finding, ordered `Ok < Warn < Error < Stale`.
///
/// `Stale` never appears next to other findings in practice: it is what an
/// empty finding list means (no data), so it dominates any reduction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiagnosticStatus {
    Ok,
    Warn,
    Error,
    Stale,
}

impl DiagnosticStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Stale => "STALE",
        }
    }
}

impl fmt::Display for DiagnosticStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// One (status, message) finding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub status: DiagnosticStatus,
    pub message: String,
}

impl Diagnostic {
    pub fn new(status: DiagnosticStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Reduce findings to the worst status. An empty list means nothing was
/// evaluated since the last reset, which reads as `Stale`.
pub fn worst_status(diagnostics: &[Diagnostic]) -> DiagnosticStatus {
    diagnostics
        .iter()
        .map(|d| d.status)
        .max()
        .unwrap_or(DiagnosticStatus::Stale)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub diagnostics: Vec<Diagnostic>,
    pub info: BTreeMap<String, String>,
}

impl DiagnosticReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report with every key pre-declared as an empty placeholder.
    pub fn with_info_keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let mut report = Self::new();
        for key in keys {
            report.info.insert(key.into(), String::new());
        }
        report
    }

    pub fn set_info(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.info.insert(key.into(), value.into());
    }

    pub fn set_info_value(&mut self, key: impl Into<String>, value: f64) {
        self.set_info(key, format_info_value(value));
    }

    /// Reset a key to its placeholder without removing it.
    pub fn clear_info(&mut self, key: &str) {
        if let Some(value) = self.info.get_mut(key) {
            value.clear();
        }
    }

    pub fn clear_all_info(&mut self) {
        self.info.values_mut().for_each(String::clear);
    }

    pub fn add_diagnostic(&mut self, status: DiagnosticStatus, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::new(status, message));
    }

    /// Replace all findings with a single one.
    pub fn set_diagnostic(&mut self, status: DiagnosticStatus, message: impl Into<String>) {
        self.diagnostics.clear();
        self.add_diagnostic(status, message);
    }

    pub fn clear_diagnostics(&mut self) {
        self.diagnostics.clear();
    }

    pub fn worst_status(&self) -> DiagnosticStatus {
        worst_status(&self.diagnostics)
    }

    pub fn is_stale(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn merge(mut self, other: &DiagnosticReport) -> DiagnosticReport {
        self += other;
        self
    }
}

impl AddAssign<&DiagnosticReport> for DiagnosticReport {
    fn add_assign(&mut self, other: &DiagnosticReport) {
        self.diagnostics.extend(other.diagnostics.iter().cloned());
        self.info
            .extend(other.info.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Anything that exposes a consistent snapshot of its diagnostic report.
pub trait ReportSource {
    fn name(&self) -> &str;

    fn report(&self) -> DiagnosticReport;

    fn status(&self) -> DiagnosticStatus {
        self.report().worst_status()
    }
}

const SIGNIFICANT_DIGITS: i32 = 6;

/// Format a quantity with six significant digits and no trailing zeros
/// (`9.81`, `-1`, `0.174533`, `1.2e-07`).
pub fn format_info_value(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let exponent = value.abs().log10().floor() as i32;
    if !(-5..SIGNIFICANT_DIGITS).contains(&exponent) {
        let formatted = format!("{:.*e}", (SIGNIFICANT_DIGITS - 1) as usize, value);
        return match formatted.split_once('e') {
            Some((mantissa, exp)) => {
                let exp: i32 = exp.parse().unwrap_or(0);
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs())
            }
            None => formatted,
        };
    }

    let decimals = (SIGNIFICANT_DIGITS - 1 - exponent).max(0) as usize;
    let formatted = format!("{:.*}", decimals, value);
    trim_fraction(&formatted).to_string()
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}
