//! Core error types for the QuoteDesk application.
//!
//! Market data failures arrive already normalized as [`QuoteFetchError`];
//! this layer only adds the stock-record concerns on top.

use quotedesk_market_data::QuoteFetchError;
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the stock domain.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Stock not found: {0}")]
    StockNotFound(String),

    #[error("Stock already exists: {0}")]
    StockAlreadyExists(String),

    #[error(transparent)]
    QuoteFetch(#[from] QuoteFetchError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Repository error: {0}")]
    Repository(String),
}

/// Input validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Repository(err.to_string())
    }
}
