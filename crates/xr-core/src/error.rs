use thiserror::Error;

/// Rejected construction-time settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be positive")]
    NonPositiveDuration { name: &'static str },
    #[error("{name} must be in [{min}, {max}], got {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{name} must not be empty")]
    Empty { name: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("timer {0} is already armed")]
    AlreadyArmed(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DepthError {
    #[error("depth buffer has zero size ({width}x{height})")]
    ZeroSize { width: u32, height: u32 },
    #[error("depth buffer expects {expected} samples, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

pub(crate) fn check_range(
    name: &'static str,
    value: impl Into<f64>,
    min: impl Into<f64>,
    max: impl Into<f64>,
) -> Result<(), ConfigError> {
    let (value, min, max) = (value.into(), min.into(), max.into());
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}
