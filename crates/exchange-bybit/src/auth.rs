//! Request signing.
//!
//! Every private call carries an HMAC-SHA256 signature over
//! `timestamp ∥ api_key ∥ recv_window ∥ body-or-query`, hex encoded, keyed
//! by the API secret. The secret is held in a [`SecretString`] so it is
//! zeroized on drop and never shows up in Debug output or logs.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// API credentials for the private endpoints.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    api_secret: SecretString,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: SecretString::from(api_secret.into()),
        }
    }

    /// Hex HMAC-SHA256 of `timestamp ∥ api_key ∥ recv_window ∥ payload`.
    ///
    /// `payload` is the query string for GET requests and the compact JSON
    /// body for POST requests.
    pub(crate) fn sign(&self, timestamp: &str, recv_window: &str, payload: &str) -> String {
        let message = format!("{}{}{}{}", timestamp, self.api_key, recv_window, payload);
        let mut mac = HmacSha256::new_from_slice(self.api_secret.expose_secret().as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}
