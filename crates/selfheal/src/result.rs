//! Result and error types for selfheal.

use thiserror::Error;

/// Result type for selfheal operations
pub type HealResult<T> = Result<T, HealError>;

/// Errors that can occur while recording elements or healing a locator.
///
/// None of these ever escape [`crate::Healer::heal`]; they are surfaced
/// through [`crate::HealOutcome::Failed`] and the log instead.
#[derive(Debug, Error)]
pub enum HealError {
    /// The stale locator has no rows in the historical table
    #[error("Element with locator {locator} has never been found before")]
    NeverObserved {
        /// Locator that was looked up
        locator: String,
    },

    /// The current-page table has no rows
    #[error("Current page snapshot is empty")]
    EmptyPage,

    /// A backing table could not be read
    #[error("Unable to read table {table}: {message}")]
    TableUnavailable {
        /// Table name or path
        table: String,
        /// Error message
        message: String,
    },

    /// Element rows could not be encoded into a feature space
    #[error("Unable to encode web elements: {message}")]
    Encoding {
        /// Error message
        message: String,
    },

    /// Neighbor search could not run
    #[error("Unable to execute nearest-neighbor search: {message}")]
    Matching {
        /// Error message
        message: String,
    },

    /// Configuration value out of range or unsupported
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// Markup could not be parsed into a document tree
    #[error("Unable to parse page source: {message}")]
    Parse {
        /// Error message
        message: String,
    },

    /// Driver could not resolve a locator
    #[error("Element with locator {locator} not found")]
    ElementNotFound {
        /// Locator that failed to resolve
        locator: String,
    },

    /// Browser driver failure other than a missing element
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl HealError {
    /// Create an encoding error
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Create a matching error
    #[must_use]
    pub fn matching(message: impl Into<String>) -> Self {
        Self::Matching {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a parse error
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a table-unavailable error
    #[must_use]
    pub fn table_unavailable(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TableUnavailable {
            table: table.into(),
            message: message.into(),
        }
    }

    /// True for the "nothing to compare against" family: the locator was
    /// never recorded, the page is empty, or a table is missing.
    #[must_use]
    pub const fn is_missing_data(&self) -> bool {
        matches!(
            self,
            Self::NeverObserved { .. } | Self::EmptyPage | Self::TableUnavailable { .. }
        )
    }
}
