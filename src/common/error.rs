//! Error types for rust_mppi

use thiserror::Error;

/// Main error type for the controller.
///
/// Only transient sensing/geometry problems are errors. Infeasible
/// optimizations and cancellations are reported through
/// [`crate::mppi::CycleStatus`] instead.
#[derive(Error, Debug)]
pub enum MppiError {
    /// No usable reference path this cycle
    #[error("Path unavailable: {0}")]
    PathUnavailable(String),

    /// Inputs expressed in different frames
    #[error("Frame mismatch: expected '{expected}', found '{found}'")]
    FrameMismatch { expected: String, found: String },

    /// Robot or goal pose is not usable (non-finite values)
    #[error("Invalid pose: {0}")]
    InvalidPose(String),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for MppiError {
    fn from(e: toml::de::Error) -> Self {
        MppiError::Config(e.to_string())
    }
}

/// Result type alias for controller operations
pub type MppiResult<T> = Result<T, MppiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MppiError::PathUnavailable("empty plan".to_string());
        assert_eq!(format!("{}", err), "Path unavailable: empty plan");

        let err = MppiError::FrameMismatch { expected: "map".into(), found: "odom".into() };
        assert_eq!(format!("{}", err), "Frame mismatch: expected 'map', found 'odom'");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MppiError = io_err.into();
        assert!(matches!(err, MppiError::Io(_)));
    }

    #[test]
    fn test_error_from_toml() {
        let toml_err = toml::from_str::<toml::Value>("a = ").unwrap_err();
        let err: MppiError = toml_err.into();
        assert!(matches!(err, MppiError::Config(_)));
    }
}
