//! Unified error hierarchy for ClimbRS
//!
//! The analytics path itself never fails: aggregations, load signals,
//! projections, matching and planning always produce a value. Errors only
//! surface at the edges, when raw external input (dates, metric ids, time
//! ranges) is parsed or configuration is loaded.

use thiserror::Error;

/// Top-level error type for all ClimbRS operations
#[derive(Debug, Error)]
pub enum ClimbRsError {
    /// Malformed external input
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Calculation errors
    #[error("Calculation error: {0}")]
    Calculation(#[from] CalculationError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while reading externally sourced records
#[derive(Debug, Error)]
pub enum InputError {
    /// Date string that is neither RFC 3339 nor YYYY-MM-DD
    #[error("Unparseable date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },

    /// Unknown fitness metric identifier
    #[error("Unknown metric: {metric}")]
    UnknownMetric { metric: String },

    /// Time range outside the supported 1/3/6/12 month windows
    #[error("Unsupported time range: {months} months")]
    UnsupportedTimeRange { months: u32 },

    /// Value outside its documented domain
    #[error("Value out of range for {field}: {value}")]
    OutOfRange { field: String, value: String },
}

/// Calculation errors
#[derive(Debug, Error)]
pub enum CalculationError {
    /// Insufficient data for calculation
    #[error("Insufficient data for {calculation}: {reason}")]
    InsufficientData { calculation: String, reason: String },

    /// Invalid parameter
    #[error("Invalid parameter for {calculation}: {parameter}={value}")]
    InvalidParameter {
        calculation: String,
        parameter: String,
        value: String,
    },
}

/// Result type alias for ClimbRS operations
pub type Result<T> = std::result::Result<T, ClimbRsError>;

impl ClimbRsError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ClimbRsError::Input(InputError::InvalidDate { .. })
            | ClimbRsError::Input(InputError::OutOfRange { .. }) => ErrorSeverity::Warning,
            ClimbRsError::Input(_) => ErrorSeverity::Error,
            ClimbRsError::Calculation(CalculationError::InsufficientData { .. }) => {
                ErrorSeverity::Info
            }
            ClimbRsError::Calculation(_) => ErrorSeverity::Error,
            ClimbRsError::Configuration(_) => ErrorSeverity::Error,
            ClimbRsError::Serialization(_) => ErrorSeverity::Error,
            ClimbRsError::Io(_) => ErrorSeverity::Critical,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            ClimbRsError::Input(InputError::InvalidDate { value, .. }) => {
                format!("Could not read the date '{}'. Use YYYY-MM-DD or an RFC 3339 timestamp.", value)
            }
            ClimbRsError::Input(InputError::UnknownMetric { metric }) => {
                format!(
                    "'{}' is not a known metric. Try ftp, vo2max, power_weight, threshold_hr or endurance.",
                    metric
                )
            }
            ClimbRsError::Calculation(CalculationError::InsufficientData {
                calculation,
                ..
            }) => {
                format!(
                    "Not enough data to calculate {}. Log a few more rides and try again.",
                    calculation
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = ClimbRsError::Input(InputError::InvalidDate {
            value: "yesterday".to_string(),
            reason: "no format matched".to_string(),
        });
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::WARN);

        let err = ClimbRsError::Input(InputError::OutOfRange {
            field: "intensity".to_string(),
            value: "12".to_string(),
        });
        assert_eq!(err.severity(), ErrorSeverity::Warning);

        let err = ClimbRsError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_user_messages() {
        let err = ClimbRsError::Input(InputError::UnknownMetric {
            metric: "watts".to_string(),
        });
        assert!(err.user_message().contains("not a known metric"));

        let err = ClimbRsError::Calculation(CalculationError::InsufficientData {
            calculation: "ACWR".to_string(),
            reason: "no activities".to_string(),
        });
        assert!(err.user_message().contains("Not enough data"));
    }
}
