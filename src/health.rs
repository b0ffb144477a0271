//! Health probing and backend classification.
//!
//! A deployment answers one of two health signatures: Secret Server exposes
//! `/api/v1/healthcheck`, the Platform exposes `/health`. Probing both, in
//! that order, tells the resolver which personality it is talking to.

use crate::error::ClientResult;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Which backend personality answered the health probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendClassification {
    /// The URL is a Secret Server REST API
    SecretServerDirect,
    /// The URL is a Platform deployment fronting a vault
    PlatformFronted,
    /// Neither health signature answered healthy
    Unreachable,
}

/// Wire shape of the health endpoints. Deployments report more component
/// flags than this; only `healthy` matters here.
#[derive(Debug, Deserialize)]
struct HealthStatus {
    healthy: Option<bool>,
}

/// Probes the well-known health endpoints of a deployment.
#[derive(Debug)]
pub struct BackendClassifier {
    http: Client,
}

impl BackendClassifier {
    /// Create a classifier using the given transport.
    #[must_use]
    pub const fn new(http: Client) -> Self {
        Self { http }
    }

    /// Decide which backend personality lives at `base_url`.
    ///
    /// The Secret Server signature is probed first and wins ties; the
    /// Platform signature is only consulted when the first probe reports
    /// unhealthy.
    ///
    /// # Errors
    ///
    /// Fails only on transport-level errors; unhealthy answers are data,
    /// not failures.
    #[instrument(skip(self))]
    pub async fn classify(&self, base_url: &str) -> ClientResult<BackendClassification> {
        let base = base_url.trim_end_matches('/');
        if self.probe(&format!("{base}/api/v1/healthcheck")).await? {
            return Ok(BackendClassification::SecretServerDirect);
        }
        if self.probe(&format!("{base}/health")).await? {
            return Ok(BackendClassification::PlatformFronted);
        }
        Ok(BackendClassification::Unreachable)
    }

    /// Probe a single health URL.
    ///
    /// Any non-2xx answer is an unhealthy signal, not an error. A 2xx body
    /// is interpreted as JSON with a boolean `healthy` field, falling back
    /// to a raw substring check for deployments that answer in plain text.
    ///
    /// # Errors
    ///
    /// Fails on transport-level errors (DNS, connection refused, TLS).
    #[instrument(skip(self))]
    pub async fn probe(&self, url: &str) -> ClientResult<bool> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!(%status, "health probe answered non-2xx");
            return Ok(false);
        }
        let body = response.text().await?;
        Ok(body_indicates_healthy(&body))
    }
}

fn body_indicates_healthy(body: &str) -> bool {
    if body.is_empty() {
        return false;
    }
    match serde_json::from_str::<HealthStatus>(body) {
        Ok(HealthStatus { healthy: Some(healthy) }) => healthy,
        _ => body.contains("Healthy"),
    }
}
