//! Error types for evidence synthesis
//!
//! Provides a unified error type for all evidence-* crates.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Where an error originated: which study and which field, when known
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorContext {
    /// Study identifier
    pub study_id: Option<String>,
    /// Offending field name
    pub field: Option<String>,
}

impl ErrorContext {
    /// Context naming a study
    pub fn study(study_id: impl Into<String>) -> Self {
        Self {
            study_id: Some(study_id.into()),
            field: None,
        }
    }

    /// Context naming a field without a study
    pub fn field(field: impl Into<String>) -> Self {
        Self {
            study_id: None,
            field: Some(field.into()),
        }
    }

    /// Attach a field name
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.study_id, &self.field) {
            (Some(study), Some(field)) => write!(f, "study '{study}', field '{field}'"),
            (Some(study), None) => write!(f, "study '{study}'"),
            (None, Some(field)) => write!(f, "field '{field}'"),
            (None, None) => write!(f, "request"),
        }
    }
}

/// Core error type for evidence synthesis operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed or out-of-range study data
    #[error("Invalid input ({context}): {message}")]
    InvalidInput {
        context: ErrorContext,
        message: String,
    },

    /// Invalid parameter provided to a function
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Fewer studies than the statistic requires
    #[error("Insufficient data for {operation}: expected at least {expected} studies, got {actual}")]
    InsufficientData {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The requested statistic is undefined for this input
    #[error("Degenerate result ({context}): {message}")]
    Degenerate {
        context: ErrorContext,
        message: String,
    },

    /// Numerical computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Invalid value in a study field
    pub fn invalid_field(study_id: &str, field: &str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            context: ErrorContext::study(study_id).with_field(field),
            message: message.into(),
        }
    }

    /// Invalid input attributable to a whole study
    pub fn invalid_study(study_id: &str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            context: ErrorContext::study(study_id),
            message: message.into(),
        }
    }

    /// Not enough studies for an operation
    pub fn insufficient(operation: &'static str, expected: usize, actual: usize) -> Self {
        Self::InsufficientData {
            operation,
            expected,
            actual,
        }
    }

    /// A study with zero or non-finite variance where weighting needs it
    pub fn zero_variance(study_id: &str) -> Self {
        Self::Degenerate {
            context: ErrorContext::study(study_id).with_field("variance"),
            message: "variance must be positive and finite for inverse-variance weighting"
                .to_string(),
        }
    }

    /// Create an error for NaN/Inf values
    pub fn non_finite(context: &str) -> Self {
        Self::Computation(format!("{context} is NaN or infinite"))
    }

    /// Stable error kind name relayed to callers
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "InvalidInputError",
            Self::InvalidParameter(_) => "InvalidParameterError",
            Self::InsufficientData { .. } => "InsufficientDataError",
            Self::Degenerate { .. } => "DegenerateResultError",
            Self::Computation(_) => "ComputationError",
        }
    }
}

/// Reject NaN/Inf in a computed statistic before it leaves the engine
pub fn ensure_finite(value: f64, context: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::non_finite(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_field("Smith 2019", "events_treatment", "must be non-negative");
        assert_eq!(
            err.to_string(),
            "Invalid input (study 'Smith 2019', field 'events_treatment'): must be non-negative"
        );

        let err = Error::insufficient("heterogeneity", 2, 1);
        assert_eq!(
            err.to_string(),
            "Insufficient data for heterogeneity: expected at least 2 studies, got 1"
        );

        let err = Error::InvalidParameter("alpha must be in (0, 1)".to_string());
        assert_eq!(err.to_string(), "Invalid parameter: alpha must be in (0, 1)");

        let err = Error::zero_variance("S3");
        assert!(err.to_string().starts_with("Degenerate result (study 'S3', field 'variance')"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::invalid_study("S1", "x").kind(), "InvalidInputError");
        assert_eq!(Error::insufficient("pooling", 1, 0).kind(), "InsufficientDataError");
        assert_eq!(Error::zero_variance("S1").kind(), "DegenerateResultError");
        assert_eq!(Error::non_finite("z").kind(), "ComputationError");
    }

    #[test]
    fn test_context_display() {
        assert_eq!(ErrorContext::default().to_string(), "request");
        assert_eq!(ErrorContext::field("alpha").to_string(), "field 'alpha'");
        assert_eq!(ErrorContext::study("A").to_string(), "study 'A'");
    }

    #[test]
    fn test_ensure_finite() {
        assert_eq!(ensure_finite(1.5, "estimate").unwrap(), 1.5);
        assert!(ensure_finite(f64::NAN, "estimate").is_err());
        assert!(ensure_finite(f64::INFINITY, "estimate").is_err());
    }
}
