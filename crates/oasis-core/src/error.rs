//! Unified error type for the OASIS ecosystem.
//!
//! [`OasisError`] represents errors from any part of the planning pipeline so that
//! validation, solver, and configuration failures can be handled uniformly at API
//! boundaries, while still being specific enough to log meaningfully.

use thiserror::Error;

/// Unified error type for all OASIS operations.
#[derive(Error, Debug)]
pub enum OasisError {
    /// I/O errors (scenario file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data validation errors (missing crude grade, empty recipe list, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Solver/algorithm errors (infeasible, no solver available, ...)
    #[error("Solver error: {0}")]
    Solver(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using OasisError.
pub type OasisResult<T> = Result<T, OasisError>;

impl From<anyhow::Error> for OasisError {
    fn from(err: anyhow::Error) -> Self {
        OasisError::Other(err.to_string())
    }
}

impl From<String> for OasisError {
    fn from(s: String) -> Self {
        OasisError::Other(s)
    }
}

impl From<&str> for OasisError {
    fn from(s: &str) -> Self {
        OasisError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for OasisError {
    fn from(err: serde_json::Error) -> Self {
        OasisError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OasisError::Solver("infeasible".into());
        assert!(err.to_string().contains("Solver error"));
        assert!(err.to_string().contains("infeasible"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let oasis_err: OasisError = io_err.into();
        assert!(matches!(oasis_err, OasisError::Io(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn example_fn() -> OasisResult<i32> {
            Ok(42)
        }
        assert_eq!(example_fn().unwrap(), 42);
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> OasisResult<()> {
            Err(OasisError::Validation("test".into()))
        }

        fn outer() -> OasisResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
