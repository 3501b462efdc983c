//! Error types for the drifter pipeline.
//!
//! Every failure that crosses a component boundary is one of the variants
//! below. Fatal variants stop the workflow; [`Error::StoreUnavailable`] is
//! reported as a warning because the generated document is still delivered.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by scanning, cloning, generation, and history storage.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The scan root is missing or is not a directory.
    #[error("scan root '{}' does not exist or is not a directory", path.display())]
    InvalidRoot {
        /// The root that was requested.
        path: PathBuf,
    },

    /// The repository locator was empty.
    #[error("repository locator must not be empty")]
    InvalidLocator,

    /// The repository could not be copied locally.
    #[error("failed to clone '{locator}': {message}")]
    Clone {
        /// The locator that was attempted.
        locator: String,
        /// Upstream detail (usually git's stderr).
        message: String,
    },

    /// The text-generation endpoint failed or returned an unusable response.
    #[error("document generation failed: {message}")]
    Generation {
        /// Upstream error detail.
        message: String,
    },

    /// The history database could not be opened, written, or read.
    #[error("history store '{}' unavailable: {message}", path.display())]
    StoreUnavailable {
        /// Path of the backing database file.
        path: PathBuf,
        /// Underlying I/O or SQL error.
        message: String,
    },

    /// Invalid configuration value.
    #[error("invalid configuration: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },
}

impl Error {
    /// Creates a clone error for `locator`.
    #[must_use]
    pub fn clone_failed(locator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Clone {
            locator: locator.into(),
            message: message.into(),
        }
    }

    /// Creates a generation error.
    #[must_use]
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    /// Creates a store error for the database at `path`.
    #[must_use]
    pub fn store(path: impl Into<PathBuf>, source: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error aborts the workflow.
    ///
    /// Only a failed history save is non-fatal.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::StoreUnavailable { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::generation(err.to_string())
    }
}
