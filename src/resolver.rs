//! Authentication resolution.
//!
//! The orchestrator: classify the backend, run the grant flow the selected
//! mode requires, resolve the vault when a Platform fronts the server, and
//! produce the [`ResolvedSession`] the authenticated client consumes.
//! Stateless between invocations; every call re-runs the whole sequence.

use crate::config::{AuthenticationMode, ClientConfig, Credentials};
use crate::error::{ClientError, ClientResult};
use crate::grant::{
    AccessGrant, ClientCredentialsGrant, GrantStrategy, PasswordGrant, SdkClientRegistration,
    PLATFORM_HEADLESS_SCOPE, SDK_CLIENT_ID_PREFIX,
};
use crate::health::{BackendClassification, BackendClassifier};
use crate::http::build_http_client;
use crate::vault::VaultResolver;
use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use tracing::{debug, info, instrument, warn};

const TOKEN_PATH: &str = "/oauth2/token";
const PLATFORM_TOKEN_PATH: &str = "/identity/api/oauth2/token/xpmplatform";

/// The terminal artifact of a resolution: a bearer token bound to the URL
/// data calls must target, plus its expiry instant.
#[derive(Clone)]
pub struct ResolvedSession {
    bearer_token: SecretString,
    effective_base_url: String,
    expires_at: DateTime<Utc>,
}

impl ResolvedSession {
    /// Assemble a session from its parts.
    #[must_use]
    pub fn new(
        bearer_token: SecretString,
        effective_base_url: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            bearer_token,
            effective_base_url: effective_base_url.into(),
            expires_at,
        }
    }

    /// The bearer token to attach to outbound requests.
    #[must_use]
    pub const fn bearer_token(&self) -> &SecretString {
        &self.bearer_token
    }

    /// The URL data calls must target: the Secret Server's own URL for a
    /// direct deployment, the vault connection URL behind a Platform.
    #[must_use]
    pub fn effective_base_url(&self) -> &str {
        &self.effective_base_url
    }

    /// When the bearer token expires.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the bearer token has already expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

impl fmt::Debug for ResolvedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSession")
            .field("bearer_token", &"[REDACTED]")
            .field("effective_base_url", &self.effective_base_url)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Runs the resolution state machine for one configuration.
#[derive(Debug)]
pub struct AuthenticationResolver {
    config: ClientConfig,
    http: Client,
    classifier: BackendClassifier,
    vaults: VaultResolver,
}

impl AuthenticationResolver {
    /// Validate the configuration and build the transport.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` for a bad configuration, `Transport` when the
    /// HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let http = build_http_client(&config.http)?;
        Ok(Self {
            classifier: BackendClassifier::new(http.clone()),
            vaults: VaultResolver::new(http.clone()),
            config,
            http,
        })
    }

    /// The configuration this resolver was built from.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The transport this resolver was built with.
    #[must_use]
    pub const fn http(&self) -> &Client {
        &self.http
    }

    /// Obtain a session, re-running the full state machine from the start.
    ///
    /// # Errors
    ///
    /// Propagates the first failure of classification, grant acquisition,
    /// or vault resolution; no retry happens at this layer.
    #[instrument(skip(self), fields(server_url = %self.config.server_url, mode = self.config.mode.as_number()))]
    pub async fn resolve(&self) -> ClientResult<ResolvedSession> {
        match self.config.mode {
            AuthenticationMode::Default => self.resolve_default().await,
            AuthenticationMode::SdkClient => self.resolve_sdk_client().await,
        }
    }

    async fn resolve_default(&self) -> ClientResult<ResolvedSession> {
        let base = self.config.trimmed_server_url();
        let Credentials::UsernamePassword { username, password } = &self.config.credentials else {
            return Err(ClientError::invalid_config(
                "server_username and server_password must be set when authentication_mode is 0",
            ));
        };

        match self.classifier.classify(base).await? {
            BackendClassification::SecretServerDirect => {
                debug!("backend classified as direct Secret Server");
                let grant = PasswordGrant {
                    token_url: format!("{base}{TOKEN_PATH}"),
                    username: username.clone(),
                    password: password.clone(),
                }
                .acquire(&self.http)
                .await?;
                info!("authenticated against Secret Server");
                Ok(session_from_grant(grant, base))
            }
            BackendClassification::PlatformFronted => {
                debug!("backend classified as Platform-fronted");
                let grant = ClientCredentialsGrant {
                    token_url: format!("{base}{PLATFORM_TOKEN_PATH}"),
                    client_id: username.clone(),
                    client_secret: password.clone(),
                    scope: Some(PLATFORM_HEADLESS_SCOPE.to_string()),
                }
                .acquire(&self.http)
                .await?;
                let vault = self
                    .vaults
                    .resolve_default_vault(base, grant.access_token.expose_secret())
                    .await?;
                let Some(connection) = &vault.connection else {
                    warn!(vault = %vault.name, "default vault has no connection descriptor");
                    return Err(ClientError::NoDefaultVault);
                };
                info!(vault = %vault.name, vault_type = %vault.vault_type, "authenticated against Platform");
                Ok(session_from_grant(grant, &connection.url))
            }
            BackendClassification::Unreachable => {
                Err(ClientError::unreachable(&self.config.server_url))
            }
        }
    }

    async fn resolve_sdk_client(&self) -> ClientResult<ResolvedSession> {
        let base = self.config.trimmed_server_url();
        let Credentials::Onboarding {
            rule_name,
            onboarding_key,
        } = &self.config.credentials
        else {
            return Err(ClientError::invalid_config(
                "rule_name and onboarding_key must be set when authentication_mode is 1",
            ));
        };

        let minted = SdkClientRegistration {
            api_base_url: format!("{base}/api/{}", self.config.api_version),
            rule_name: rule_name.clone(),
            onboarding_key: onboarding_key.clone(),
        }
        .register(&self.http)
        .await?;

        let grant = ClientCredentialsGrant {
            token_url: format!("{base}{TOKEN_PATH}"),
            client_id: format!("{SDK_CLIENT_ID_PREFIX}{}", minted.client_id),
            client_secret: minted.client_secret,
            scope: None,
        }
        .acquire(&self.http)
        .await?;
        info!("authenticated as SDK client");
        Ok(session_from_grant(grant, base))
    }
}

fn session_from_grant(grant: AccessGrant, effective_base_url: &str) -> ResolvedSession {
    ResolvedSession {
        expires_at: grant.expiry_from(Utc::now()),
        bearer_token: grant.access_token,
        effective_base_url: effective_base_url.trim_end_matches('/').to_string(),
    }
}
