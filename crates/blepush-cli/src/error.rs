//! Error handling for the blepush CLI

use blepush_core::{ErrorKind, SessionError};
use thiserror::Error;

use crate::config::ConfigError;

/// Exit code for failures outside the session error taxonomy
pub const GENERAL_FAILURE_EXIT_CODE: i32 = 1;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid session configuration: {0}")]
    SessionConfig(#[from] blepush_core::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Session error kind, if the failure has one
    ///
    /// Bad configuration is reported like a bad address.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            CliError::Session(e) => Some(e.kind()),
            CliError::Config(_) | CliError::SessionConfig(_) => Some(ErrorKind::Argument),
            CliError::Io(_) => None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind()
            .map(ErrorKind::exit_code)
            .unwrap_or(GENERAL_FAILURE_EXIT_CODE)
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let err = CliError::from(SessionError::Argument {
            input: "nope".to_string(),
            reason: "bad".to_string(),
        });
        assert_eq!(err.exit_code(), 2);

        let err = CliError::from(ConfigError::Validation("chunk".to_string()));
        assert_eq!(err.exit_code(), 2);

        let err = CliError::from(std::io::Error::new(std::io::ErrorKind::Other, "io"));
        assert_eq!(err.exit_code(), GENERAL_FAILURE_EXIT_CODE);
    }
}
