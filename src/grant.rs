//! OAuth2 token acquisition.
//!
//! Three interchangeable strategies produce an [`AccessGrant`]: a password
//! grant for direct Secret Server logins, a client-credentials grant used
//! both for Platform headless auth and SDK clients, and the one-time SDK
//! client registration that mints the id/secret pair the latter needs.

use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use gethostname::gethostname;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Scope requested for Platform headless authentication.
pub const PLATFORM_HEADLESS_SCOPE: &str = "xpmheadless";

/// Prefix the token endpoint expects on self-registered client ids.
pub const SDK_CLIENT_ID_PREFIX: &str = "sdk-client-";

/// A token issued by an OAuth2 token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessGrant {
    /// The bearer token
    pub access_token: SecretString,
    /// Refresh token, when the endpoint issues one
    #[serde(default)]
    pub refresh_token: Option<SecretString>,
    /// Token type, normally `Bearer`
    #[serde(default)]
    pub token_type: Option<String>,
    /// Token lifetime in seconds from issuance
    #[serde(default)]
    pub expires_in: u64,
}

impl AccessGrant {
    /// Absolute expiry instant for a grant issued at `issued_at`.
    #[must_use]
    pub fn expiry_from(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        issued_at + TimeDelta::seconds(i64::try_from(self.expires_in).unwrap_or(i64::MAX))
    }
}

/// A token-acquisition algorithm.
#[async_trait]
pub trait GrantStrategy: Send + Sync {
    /// Run the token exchange and return the issued grant.
    ///
    /// # Errors
    ///
    /// `GrantRejected` on a non-2xx answer, `Transport` on network failure,
    /// `Serialization` when a 2xx payload does not deserialize.
    async fn acquire(&self, http: &Client) -> ClientResult<AccessGrant>;
}

/// Resource-owner password grant against a Secret Server token endpoint.
#[derive(Debug, Clone)]
pub struct PasswordGrant {
    /// Full token endpoint URL
    pub token_url: String,
    /// Account username
    pub username: String,
    /// Account password
    pub password: SecretString,
}

#[async_trait]
impl GrantStrategy for PasswordGrant {
    #[instrument(skip(self, http), fields(token_url = %self.token_url, username = %self.username))]
    async fn acquire(&self, http: &Client) -> ClientResult<AccessGrant> {
        let form = [
            ("grant_type", "password"),
            ("username", self.username.as_str()),
            ("password", self.password.expose_secret()),
        ];
        let response = http.post(&self.token_url).form(&form).send().await?;
        read_grant(response).await
    }
}

/// Client-credentials grant, with an optional scope.
#[derive(Debug, Clone)]
pub struct ClientCredentialsGrant {
    /// Full token endpoint URL
    pub token_url: String,
    /// OAuth2 client id
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: SecretString,
    /// Scope to request, when the endpoint expects one
    pub scope: Option<String>,
}

#[async_trait]
impl GrantStrategy for ClientCredentialsGrant {
    #[instrument(skip(self, http), fields(token_url = %self.token_url, client_id = %self.client_id))]
    async fn acquire(&self, http: &Client) -> ClientResult<AccessGrant> {
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
        ];
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.as_str()));
        }
        let response = http.post(&self.token_url).form(&form).send().await?;
        read_grant(response).await
    }
}

/// The id/secret pair minted by SDK client registration. Held only for the
/// current resolution, never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct SdkClientCredentials {
    /// Issued client id, without the `sdk-client-` prefix
    #[serde(rename = "clientId")]
    pub client_id: String,
    /// Issued client secret
    #[serde(rename = "clientSecret")]
    pub client_secret: SecretString,
}

/// One-time machine registration against the onboarding endpoint.
#[derive(Debug, Clone)]
pub struct SdkClientRegistration {
    /// Versioned API root, e.g. `{server}/api/v1`
    pub api_base_url: String,
    /// Onboarding rule name
    pub rule_name: String,
    /// Onboarding key issued for the rule
    pub onboarding_key: SecretString,
}

impl SdkClientRegistration {
    /// Register this machine and return the minted credential pair.
    ///
    /// The payload identifies the caller with opaque diagnostics (hostname,
    /// OS, architecture) and a freshly generated client identifier.
    ///
    /// # Errors
    ///
    /// `GrantRejected` on a non-2xx answer, `Transport` on network failure,
    /// `Serialization` when a 2xx payload does not deserialize.
    #[instrument(skip(self, http), fields(rule_name = %self.rule_name))]
    pub async fn register(&self, http: &Client) -> ClientResult<SdkClientCredentials> {
        let machine = gethostname().to_string_lossy().into_owned();
        let payload = serde_json::json!({
            "Description": format!(
                "Machine: {machine}, OS: {} - {}",
                std::env::consts::OS,
                std::env::consts::ARCH
            ),
            "Name": machine,
            "OnboardingKey": self.onboarding_key.expose_secret(),
            "RuleName": self.rule_name,
            "ClientId": Uuid::new_v4().to_string(),
        });

        let response = http
            .post(format!("{}/sdk-client-accounts", self.api_base_url))
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::grant_rejected(status.as_u16(), body));
        }
        debug!("sdk client registered");
        Ok(serde_json::from_str(&body)?)
    }
}

async fn read_grant(response: Response) -> ClientResult<AccessGrant> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ClientError::grant_rejected(status.as_u16(), body));
    }
    let grant: AccessGrant = serde_json::from_str(&body)?;
    if grant.access_token.expose_secret().is_empty() {
        return Err(ClientError::grant_rejected(
            status.as_u16(),
            "token endpoint returned an empty access_token",
        ));
    }
    debug!(expires_in = grant.expires_in, "access grant obtained");
    Ok(grant)
}
