//! Error types for the CAM tools crate.
//!
//! This module provides structured error types for tool parameter
//! validation and for the engine's I/O boundary.

use pcbmill_core::FailKind;
use std::io;
use thiserror::Error;

/// Errors that can occur at the engine boundary.
#[derive(Error, Debug)]
pub enum CamToolError {
    /// Toolpath generation failed.
    #[error(transparent)]
    Generation(#[from] FailKind),

    /// No registered object has the requested name.
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A parameter validation error occurred.
    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),
}

/// Errors related to tool parameter validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// A required parameter is missing.
    #[error("Missing required parameter: {0}")]
    Missing(String),

    /// A parameter value is out of the valid range.
    #[error("Parameter '{name}' out of range: {value} (valid: {min}..{max})")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A parameter value is invalid.
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: String, reason: String },
}

impl From<ParameterError> for FailKind {
    fn from(err: ParameterError) -> Self {
        FailKind::InvalidParameters(err.to_string())
    }
}

/// Result type alias for CAM tool operations.
pub type CamToolResult<T> = Result<T, CamToolError>;

/// Result type alias for parameter validation.
pub type ParameterResult<T> = Result<T, ParameterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_error_display() {
        let err = ParameterError::OutOfRange {
            name: "polish_overlap".to_string(),
            value: 1.5,
            min: 0.0,
            max: 1.0,
        };
        assert_eq!(
            err.to_string(),
            "Parameter 'polish_overlap' out of range: 1.5 (valid: 0..1)"
        );

        let err = ParameterError::Missing("offset_value".to_string());
        assert_eq!(err.to_string(), "Missing required parameter: offset_value");
    }

    #[test]
    fn test_parameter_error_into_fail_kind() {
        let err = ParameterError::InvalidValue {
            name: "diameter".to_string(),
            reason: "must be positive".to_string(),
        };
        let fail: FailKind = err.into();
        assert_eq!(
            fail,
            FailKind::InvalidParameters("Invalid value for 'diameter': must be positive".to_string())
        );
    }

    #[test]
    fn test_error_conversion() {
        let cam_err: CamToolError = FailKind::Cancelled.into();
        assert!(matches!(cam_err, CamToolError::Generation(FailKind::Cancelled)));
        assert_eq!(cam_err.to_string(), "Generation cancelled");

        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let cam_err: CamToolError = io_err.into();
        assert!(matches!(cam_err, CamToolError::IoError(_)));
    }
}
