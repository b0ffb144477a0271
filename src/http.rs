//! Centralized HTTP client configuration and building.
//!
//! Every component of the resolver receives the client built here; there is
//! no global transport state. Timeouts and proxying live entirely at this
//! layer, so the resolution logic itself never retries or times out.

use reqwest::{Client, ClientBuilder, Proxy};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Outbound proxy configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Proxy host name or address
    pub host: String,
    /// Proxy port
    pub port: u16,
    /// Optional proxy username
    pub username: Option<String>,
    /// Optional proxy password
    pub password: Option<SecretString>,
}

/// HTTP client configuration.
///
/// Provides sensible defaults for production use with connection pooling,
/// timeouts, and TLS configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout (default: 30s)
    pub timeout: Duration,
    /// Connection timeout (default: 10s)
    pub connect_timeout: Duration,
    /// Pool idle timeout (default: 90s)
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections per host (default: 10)
    pub pool_max_idle_per_host: usize,
    /// User agent string
    pub user_agent: String,
    /// Optional outbound proxy
    pub proxy: Option<ProxyConfig>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: concat!("delinea-secrets-client/", env!("CARGO_PKG_VERSION")).to_string(),
            proxy: None,
        }
    }
}

impl HttpConfig {
    /// Create a new HTTP config with custom timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a new HTTP config with custom connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Create a new HTTP config with custom user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Create a new HTTP config routing requests through a proxy.
    #[must_use]
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }
}

/// Build a configured HTTP client.
///
/// Creates a reqwest client with rustls TLS, connection pooling, and the
/// specified configuration, including the optional authenticated proxy.
///
/// # Errors
///
/// Returns an error if the client cannot be built (e.g., TLS initialization
/// fails or the proxy address is invalid).
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut builder = ClientBuilder::new()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .user_agent(&config.user_agent)
        .use_rustls_tls();

    if let Some(proxy_config) = &config.proxy {
        let mut proxy = Proxy::all(format!("http://{}:{}", proxy_config.host, proxy_config.port))?;
        if let Some(username) = &proxy_config.username {
            let password = proxy_config
                .password
                .as_ref()
                .map_or("", |p| p.expose_secret());
            proxy = proxy.basic_auth(username, password);
        }
        builder = builder.proxy(proxy);
    }

    builder.build()
}
