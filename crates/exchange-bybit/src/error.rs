//! Typed errors for exchange calls.

use thiserror::Error;

/// API code the venue returns from cancel-all when nothing is open.
/// Vacuous rather than a failure; the client maps it to success.
pub const CODE_NO_ACTIVE_ORDERS: i64 = 110008;

/// Errors from talking to the exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Transport-level failure (connect, TLS, body read).
    #[error("http transport failure: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx HTTP response.
    #[error("http status {status}: {body}")]
    Status { status: u16, body: String },

    /// The exchange answered with a non-zero result code.
    #[error("api error {code}: {message}")]
    Api { code: i64, message: String },

    /// Response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),

    /// A lookup that must yield data came back empty.
    #[error("empty result: {0}")]
    Empty(String),
}

impl ExchangeError {
    /// The machine code of an API-level error, if that is what this is.
    #[must_use]
    pub fn api_code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}
