//! Core types and abstractions

pub mod cache;
pub mod config;
pub mod currency;
pub mod error;
pub mod log;

// Re-export main types for cleaner imports
pub use cache::Cache;
pub use currency::{Currency, ExchangeRate, RateSnapshot};
pub use error::{ErrorCategory, RatesError, SourceError};
