use thiserror::Error;

/// Errors raised while building a monitor. Per-sample problems are never
/// errors; they end up as findings in the diagnostic report.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}

pub type MonitorResult<T> = Result<T, MonitorError>;

pub(crate) fn ensure_positive(name: &str, value: f64) -> MonitorResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MonitorError::InvalidParameters(format!(
            "{} must be positive and finite, got {}",
            name, value
        )))
    }
}

/// Positive, finite and no larger than `max`. Rates and horizons size the
/// sample windows, so unbounded values cannot be allocated.
pub(crate) fn ensure_bounded(name: &str, value: f64, max: f64) -> MonitorResult<()> {
    ensure_positive(name, value)?;
    if value <= max {
        Ok(())
    } else {
        Err(MonitorError::InvalidParameters(format!(
            "{} must be at most {}, got {}",
            name, max, value
        )))
    }
}

pub(crate) fn ensure_non_negative(name: &str, value: f64) -> MonitorResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(MonitorError::InvalidParameters(format!(
            "{} must be non-negative and finite, got {}",
            name, value
        )))
    }
}
