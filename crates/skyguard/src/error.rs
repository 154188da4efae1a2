//! Error types for skyguard.
//!
//! This module defines all error types used throughout the skyguard crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for skyguard operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Register Errors ===
    /// A value read at a boundary is outside its domain.
    #[error("invalid {field}: {value}")]
    InvalidValue {
        /// Name of the field being parsed.
        field: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A record with the same id is already in the register.
    #[error("risk {id} is already registered")]
    DuplicateRisk {
        /// The conflicting id.
        id: String,
    },

    /// A draft is missing a required field.
    #[error("draft is incomplete: {field} is required")]
    IncompleteDraft {
        /// Name of the missing field.
        field: &'static str,
    },

    // === Suggestion Errors ===
    /// The suggestion service could not be reached or returned an error status.
    #[error("suggestion request failed: {0}")]
    SuggestionTransport(String),

    /// The suggestion service answered with something other than the expected shape.
    #[error("malformed suggestion response: {0}")]
    SuggestionResponse(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for skyguard operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an invalid value error.
    #[must_use]
    pub fn invalid_value(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            value: value.into(),
        }
    }

    /// Create a suggestion transport error.
    #[must_use]
    pub fn suggestion_transport(message: impl Into<String>) -> Self {
        Self::SuggestionTransport(message.into())
    }

    /// Create a malformed suggestion response error.
    #[must_use]
    pub fn suggestion_response(message: impl Into<String>) -> Self {
        Self::SuggestionResponse(message.into())
    }

    /// Check if this error was raised while parsing a boundary value.
    #[must_use]
    pub fn is_invalid_value(&self) -> bool {
        matches!(self, Self::InvalidValue { .. })
    }
}
