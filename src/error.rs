//! Client error types using thiserror 2.0.
//!
//! Every failure of the resolution engine is a typed variant with the root
//! cause attached; retryability classification helps callers decide whether
//! wrapping the resolver in a retry loop makes sense.

use thiserror::Error;

/// Errors produced by the resolver and the authenticated client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level failure (DNS, connection refused, TLS)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Neither health signature answered healthy
    #[error("no healthy backend found at {0}")]
    Unreachable(String),

    /// A token or onboarding endpoint answered non-2xx
    #[error("grant rejected (status {status}): {body}")]
    GrantRejected {
        /// HTTP status returned by the endpoint
        status: u16,
        /// Raw response body, kept for diagnostics
        body: String,
    },

    /// No vault is marked both default and active
    #[error("no vault is marked both default and active")]
    NoDefaultVault,

    /// The vault listing call answered non-2xx
    #[error("vault listing failed (status {status}): {body}")]
    VaultFetchFailed {
        /// HTTP status returned by the vault broker
        status: u16,
        /// Raw response body, kept for diagnostics
        body: String,
    },

    /// Required credential fields are missing for the selected mode
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A 2xx response carried a payload that did not deserialize
    #[error("malformed response payload: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Secret not found
    #[error("secret {0} not found")]
    SecretNotFound(i32),

    /// The secrets API answered non-2xx
    #[error("secrets API request failed (status {status}): {body}")]
    Api {
        /// HTTP status returned by the secrets API
        status: u16,
        /// Raw response body, kept for diagnostics
        body: String,
    },
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Check if error is retryable.
    ///
    /// Transport failures and unreachable backends are transient; a rejected
    /// grant or a missing vault will not succeed on retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Unreachable(_))
    }

    /// Create an unreachable error for the given server URL.
    #[must_use]
    pub fn unreachable(server_url: impl Into<String>) -> Self {
        Self::Unreachable(server_url.into())
    }

    /// Create a rejected-grant error carrying the response body.
    #[must_use]
    pub fn grant_rejected(status: u16, body: impl Into<String>) -> Self {
        Self::GrantRejected {
            status,
            body: body.into(),
        }
    }

    /// Create a vault-fetch error carrying the response body.
    #[must_use]
    pub fn vault_fetch_failed(status: u16, body: impl Into<String>) -> Self {
        Self::VaultFetchFailed {
            status,
            body: body.into(),
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a secrets API error carrying the response body.
    #[must_use]
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }
}
