//! Authenticated client for the secrets API.
//!
//! Resolves a session once at construction; the bearer token is attached to
//! each outbound request at dispatch time, so a renewed session takes
//! effect without restructuring callers. On an auth rejection the accessor
//! re-resolves and retries exactly once.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::resolver::{AuthenticationResolver, ResolvedSession};
use crate::secrets::Secret;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// Client for a Secret Server reached directly or through a Platform.
///
/// Construction runs the full authentication resolution; a failed
/// resolution means no client is handed out at all.
pub struct SecretServerClient {
    resolver: AuthenticationResolver,
    session: RwLock<Arc<ResolvedSession>>,
}

impl SecretServerClient {
    /// Resolve a session for `config` and return a ready client.
    ///
    /// # Errors
    ///
    /// Any resolution failure aborts construction; see
    /// [`AuthenticationResolver::resolve`].
    pub async fn connect(config: ClientConfig) -> ClientResult<Self> {
        let resolver = AuthenticationResolver::new(config)?;
        let session = resolver.resolve().await?;
        Ok(Self {
            resolver,
            session: RwLock::new(Arc::new(session)),
        })
    }

    /// The currently held session.
    pub async fn current_session(&self) -> Arc<ResolvedSession> {
        self.session.read().await.clone()
    }

    /// Re-run the resolver and swap in the fresh session wholesale.
    ///
    /// The held session is replaced, never mutated, so concurrent readers
    /// see either the old token/URL pair or the new one.
    ///
    /// # Errors
    ///
    /// See [`AuthenticationResolver::resolve`].
    #[instrument(skip(self))]
    pub async fn refresh_session(&self) -> ClientResult<()> {
        let fresh = self.resolver.resolve().await?;
        *self.session.write().await = Arc::new(fresh);
        debug!("session refreshed");
        Ok(())
    }

    /// Fetch a secret by id.
    ///
    /// With `fetch_file_attachments` set, fields carrying a file attachment
    /// get their placeholder value replaced by the attachment contents.
    ///
    /// # Errors
    ///
    /// `SecretNotFound` for a 404, `Api` for other non-2xx answers, plus
    /// the resolution errors when a mid-call renewal fails.
    #[instrument(skip(self))]
    pub async fn get_secret(&self, id: i32, fetch_file_attachments: bool) -> ClientResult<Secret> {
        let body = self
            .authorized_get(&self.secret_url(id).await, self.comment_query().as_slice())
            .await
            .map_err(|e| match e {
                ClientError::Api { status: 404, .. } => ClientError::SecretNotFound(id),
                other => other,
            })?;
        let mut secret: Secret = serde_json::from_str(&body)?;

        if fetch_file_attachments {
            for field in &mut secret.fields {
                if !field.has_file_attachment() {
                    continue;
                }
                let Some(slug) = field.slug.as_deref().filter(|s| !s.is_empty()) else {
                    warn!(field_id = field.field_id, "attachment field has no slug, skipping");
                    continue;
                };
                let url = format!("{}/fields/{slug}", self.secret_url(id).await);
                field.value = Some(self.authorized_get(&url, &[]).await?);
            }
        }

        Ok(secret)
    }

    async fn secret_url(&self, id: i32) -> String {
        let session = self.current_session().await;
        format!(
            "{}/api/{}/secrets/{id}",
            session.effective_base_url(),
            self.resolver.config().api_version
        )
    }

    fn comment_query(&self) -> Vec<(&str, &str)> {
        self.resolver
            .config()
            .auto_comment
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|c| ("autoComment", c))
            .into_iter()
            .collect()
    }

    /// GET with the current bearer attached; on a 401 the session is
    /// refreshed and the request retried exactly once.
    async fn authorized_get(&self, url: &str, query: &[(&str, &str)]) -> ClientResult<String> {
        let mut response = self.send_authorized(url, query).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("request rejected with 401, refreshing session and retrying once");
            self.refresh_session().await?;
            response = self.send_authorized(url, query).await?;
        }
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::api(status.as_u16(), body));
        }
        Ok(body)
    }

    async fn send_authorized(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> ClientResult<reqwest::Response> {
        let session = self.current_session().await;
        let mut request = self
            .resolver
            .http()
            .get(url)
            .bearer_auth(session.bearer_token().expose_secret());
        if !query.is_empty() {
            request = request.query(query);
        }
        Ok(request.send().await?)
    }
}
