//! Error types for the money trail pipeline.
//!
//! Only write failures are fatal to a pipeline run. Every other variant is
//! absorbed upstream and routed to the educational fallback dataset; they
//! still exist as typed errors so the individual components stay testable.

use thiserror::Error;

/// Main error type for the money trail library.
#[derive(Debug, Error)]
pub enum MoneyTrailError {
    /// HTTP request failed without being retried (e.g. malformed request).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// All retry attempts were used up on transient failures.
    #[error("Request failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// Invalid election cycle.
    #[error("Invalid election cycle: '{0}'. Expected an even year between 1980 and 2100 (e.g., 2024)")]
    InvalidCycle(String),

    /// Base URL could not be parsed or extended with a path.
    #[error("Invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Party lookup table could not be loaded.
    #[error("Invalid party table {path}: {reason}")]
    PartyTable { path: String, reason: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl MoneyTrailError {
    /// Whether this error ends a pipeline run instead of degrading to fallback data.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Json(_))
    }
}

/// Result type alias for money trail operations.
pub type Result<T> = std::result::Result<T, MoneyTrailError>;
