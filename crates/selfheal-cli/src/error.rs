//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Exit code when a stale locator could not be healed
pub const EXIT_NOT_HEALED: u8 = 2;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// No acceptable replacement for a stale locator
    #[error("No replacement found for locator {locator}")]
    NotHealed {
        /// The stale locator
        locator: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Selfheal library error
    #[error("Selfheal error: {0}")]
    Heal(#[from] selfheal::HealError),
}

impl CliError {
    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a not-healed error
    #[must_use]
    pub fn not_healed(locator: impl Into<String>) -> Self {
        Self::NotHealed {
            locator: locator.into(),
        }
    }

    /// Process exit code for this error
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::NotHealed { .. } => EXIT_NOT_HEALED,
            _ => 1,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_error() {
        let err = CliError::invalid_argument("bad arg");
        assert!(err.to_string().contains("Invalid argument"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_not_healed_exit_code() {
        let err = CliError::not_healed("//*[@id='gone']");
        assert!(err.to_string().contains("//*[@id='gone']"));
        assert_eq!(err.exit_code(), EXIT_NOT_HEALED);
    }

    #[test]
    fn test_heal_error_from() {
        let err: CliError = selfheal::HealError::EmptyPage.into();
        assert!(err.to_string().contains("Selfheal"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(cli_err.to_string().contains("I/O"));
    }
}
