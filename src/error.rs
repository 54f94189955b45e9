//! Crate-wide error types.

use thiserror::Error;

/// Errors surfaced while loading or validating the application configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Errors produced by venue adapters, following the taxonomy in the trading
/// core's error handling design: transient transport, auth, invalid input,
/// business rejection, and stale state each get a distinct variant so the
/// executor can classify and react without string matching.
#[derive(Error, Debug, Clone)]
pub enum VenueError {
    #[error("network error: {0}")]
    NetworkError(String),

    #[error("rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("venue api error (status {status}): {body}")]
    VenueApi { status: u16, body: String },

    #[error("authentication error: {0}")]
    AuthError(String),

    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("invalid input on field {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("order not found: {0}")]
    OrderNotFound(String),
}

impl VenueError {
    /// Transient transport failures are the only class the retry wrapper
    /// should loop on; everything else is a decision, not a glitch.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError(_) | Self::RateLimited { .. })
    }
}

/// Top-level crate error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Venue(#[from] VenueError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("malformed symbol: {0}")]
    MalformedSymbol(String),

    #[error("stale snapshot for {symbol} on {venue}")]
    Stale { venue: String, symbol: String },

    #[error("internal invariant violation: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
