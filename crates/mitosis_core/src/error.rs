//! Error types for mitosis_core.
//!
//! Life events never fail: starvation, stop and mating abandonment are states, and pool
//! exhaustion is a boolean. These errors cover the fallible edges around the engine:
//! configuration files and the controller being driven without a run.

use thiserror::Error;

/// Main error type for simulation operations.
#[derive(Error, Debug)]
pub enum SimError {
    /// Invalid configuration values
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system errors
    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML encoding errors
    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    /// A control operation arrived while no run exists
    #[error("Simulation not started")]
    NotStarted,

    /// Generic error with context
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<SimError>,
    },
}

/// Result type alias for mitosis_core operations.
pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Wraps an error with additional context.
    #[must_use]
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SimError::config("tick_ms must be positive");
        assert_eq!(
            err.to_string(),
            "Configuration error: tick_ms must be positive"
        );
        assert_eq!(SimError::NotStarted.to_string(), "Simulation not started");
    }

    #[test]
    fn test_error_context() {
        let err = SimError::NotStarted.with_context("adding food");
        assert!(err.to_string().starts_with("adding food"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SimError = io_err.into();
        assert!(matches!(err, SimError::FileSystem(_)));
    }
}
