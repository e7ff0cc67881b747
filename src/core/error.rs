//! Error types for rate retrieval

use crate::store::LoadPanicked;
use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;

/// Failure category carried in log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    InvalidInput,
    SourceUnavailable,
    MalformedSource,
    Timeout,
}

impl Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ErrorCategory::InvalidInput => "InvalidInput",
                ErrorCategory::SourceUnavailable => "SourceUnavailable",
                ErrorCategory::MalformedSource => "MalformedSource",
                ErrorCategory::Timeout => "Timeout",
            }
        )
    }
}

/// Errors returned to callers of the rate service.
///
/// Source-side failures never show up here: they are logged and turned into
/// an empty result instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RatesError {
    #[error("At least one currency must be requested")]
    InvalidInput,
}

impl RatesError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RatesError::InvalidInput => ErrorCategory::InvalidInput,
        }
    }
}

/// Failures while fetching or parsing the rate document.
///
/// `Clone` so a single failed fetch can be handed to every waiter on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("HTTP error: {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Request error: {message} for {url}")]
    Connection { url: String, message: String },

    #[error("Request timed out after {timeout:?} for {url}")]
    Timeout { url: String, timeout: Duration },

    #[error("Failed to parse rate document: {0}")]
    Malformed(String),

    #[error("Rate load aborted: {0}")]
    Aborted(String),
}

impl From<LoadPanicked> for SourceError {
    fn from(err: LoadPanicked) -> Self {
        SourceError::Aborted(err.message)
    }
}

impl SourceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SourceError::HttpStatus { .. }
            | SourceError::Connection { .. }
            | SourceError::Aborted(_) => ErrorCategory::SourceUnavailable,
            SourceError::Timeout { .. } => ErrorCategory::Timeout,
            SourceError::Malformed(_) => ErrorCategory::MalformedSource,
        }
    }
}
