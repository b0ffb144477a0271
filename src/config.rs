//! Client configuration.
//!
//! Mirrors the property surface of the server SDKs: a server URL, an
//! authentication mode, and the credential shape that mode requires.
//! Validation is eager — a misconfigured client fails before any network
//! call is made.

use crate::error::{ClientError, ClientResult};
use crate::http::{HttpConfig, ProxyConfig};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

/// How the client authenticates against the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationMode {
    /// Mode 0: username/password, with automatic backend classification
    Default,
    /// Mode 1: SDK-client onboarding via rule name and onboarding key
    SdkClient,
}

impl AuthenticationMode {
    /// Map the numeric `authentication_mode` selector to a mode.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for anything other than `0` or `1`.
    pub fn from_number(mode: u8) -> ClientResult<Self> {
        match mode {
            0 => Ok(Self::Default),
            1 => Ok(Self::SdkClient),
            other => Err(ClientError::invalid_config(format!(
                "authentication_mode must be 0 or 1, got {other}"
            ))),
        }
    }

    /// The numeric selector for this mode.
    #[must_use]
    pub const fn as_number(self) -> u8 {
        match self {
            Self::Default => 0,
            Self::SdkClient => 1,
        }
    }
}

/// Credential material for one resolution. Exactly one shape is active per
/// configuration; which shape is legal depends on the authentication mode.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Interactive user credentials (mode 0)
    UsernamePassword {
        /// Account username; doubles as the OAuth2 client id against a
        /// Platform-fronted backend
        username: String,
        /// Account password; doubles as the OAuth2 client secret against a
        /// Platform-fronted backend
        password: SecretString,
    },
    /// Machine onboarding credentials (mode 1)
    Onboarding {
        /// Onboarding rule name
        rule_name: String,
        /// Onboarding key issued for the rule
        onboarding_key: SecretString,
    },
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the Secret Server or Platform deployment
    pub server_url: String,
    /// Selected authentication mode
    pub mode: AuthenticationMode,
    /// Credential material matching the mode
    pub credentials: Credentials,
    /// Secrets API version segment (default: `"v1"`)
    pub api_version: String,
    /// Optional comment attached to secret reads as `autoComment`
    pub auto_comment: Option<String>,
    /// HTTP transport configuration
    pub http: HttpConfig,
}

impl ClientConfig {
    /// Create a mode-0 configuration with username/password credentials.
    #[must_use]
    pub fn password(
        server_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            mode: AuthenticationMode::Default,
            credentials: Credentials::UsernamePassword {
                username: username.into(),
                password: SecretString::from(password.into()),
            },
            api_version: "v1".to_string(),
            auto_comment: None,
            http: HttpConfig::default(),
        }
    }

    /// Create a mode-1 configuration with onboarding credentials.
    #[must_use]
    pub fn sdk_client(
        server_url: impl Into<String>,
        rule_name: impl Into<String>,
        onboarding_key: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            mode: AuthenticationMode::SdkClient,
            credentials: Credentials::Onboarding {
                rule_name: rule_name.into(),
                onboarding_key: SecretString::from(onboarding_key.into()),
            },
            api_version: "v1".to_string(),
            auto_comment: None,
            http: HttpConfig::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `SERVER_URL`, `AUTHENTICATION_MODE` (default 0), the credential
    /// pair the mode requires (`SERVER_USERNAME`/`SERVER_PASSWORD` or
    /// `RULE_NAME`/`ONBOARDING_KEY`), `API_VERSION` (default `"v1"`), and
    /// the optional `PROXY_HOST`/`PROXY_PORT`/`PROXY_USERNAME`/
    /// `PROXY_PASSWORD` quartet.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when a required variable is missing or
    /// malformed. The returned configuration is already validated.
    pub fn from_env() -> ClientResult<Self> {
        let mode_raw = optional_env("AUTHENTICATION_MODE");
        let mode = match mode_raw.as_deref() {
            None => AuthenticationMode::Default,
            Some(raw) => {
                let number: u8 = raw.parse().map_err(|_| {
                    ClientError::invalid_config(format!(
                        "AUTHENTICATION_MODE must be 0 or 1, got {raw:?}"
                    ))
                })?;
                AuthenticationMode::from_number(number)?
            }
        };

        let server_url = require_env("SERVER_URL")?;
        let credentials = match mode {
            AuthenticationMode::Default => Credentials::UsernamePassword {
                username: require_env("SERVER_USERNAME")?,
                password: SecretString::from(require_env("SERVER_PASSWORD")?),
            },
            AuthenticationMode::SdkClient => Credentials::Onboarding {
                rule_name: require_env("RULE_NAME")?,
                onboarding_key: SecretString::from(require_env("ONBOARDING_KEY")?),
            },
        };

        let mut http = HttpConfig::default();
        if let Some(proxy) = proxy_from_env()? {
            http = http.with_proxy(proxy);
        }

        let config = Self {
            server_url,
            mode,
            credentials,
            api_version: optional_env("API_VERSION").unwrap_or_else(|| "v1".to_string()),
            auto_comment: optional_env("AUTO_COMMENT"),
            http,
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the secrets API version segment.
    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Attach a comment to every secret read.
    #[must_use]
    pub fn with_auto_comment(mut self, auto_comment: impl Into<String>) -> Self {
        self.auto_comment = Some(auto_comment.into());
        self
    }

    /// Replace the HTTP transport configuration.
    #[must_use]
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Validate the configuration without touching the network.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when the server URL is blank or not an
    /// absolute http(s) URL, or when the credential shape does not match the
    /// selected mode or has blank fields.
    pub fn validate(&self) -> ClientResult<()> {
        if self.server_url.trim().is_empty() {
            return Err(ClientError::invalid_config("server_url must be set"));
        }
        let parsed = Url::parse(&self.server_url).map_err(|e| {
            ClientError::invalid_config(format!("server_url is not an absolute URL: {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::invalid_config(format!(
                "server_url must use http or https, got {}",
                parsed.scheme()
            )));
        }

        match (self.mode, &self.credentials) {
            (
                AuthenticationMode::Default,
                Credentials::UsernamePassword { username, password },
            ) => {
                if username.trim().is_empty() || password.expose_secret().trim().is_empty() {
                    return Err(ClientError::invalid_config(
                        "server_username and server_password must be set when authentication_mode is 0",
                    ));
                }
            }
            (
                AuthenticationMode::SdkClient,
                Credentials::Onboarding {
                    rule_name,
                    onboarding_key,
                },
            ) => {
                if rule_name.trim().is_empty() || onboarding_key.expose_secret().trim().is_empty() {
                    return Err(ClientError::invalid_config(
                        "rule_name and onboarding_key must be set when authentication_mode is 1",
                    ));
                }
            }
            (mode, _) => {
                return Err(ClientError::invalid_config(format!(
                    "credential shape does not match authentication_mode {}",
                    mode.as_number()
                )));
            }
        }

        Ok(())
    }

    /// The server URL with trailing slashes normalized away, ready for path
    /// concatenation.
    #[must_use]
    pub fn trimmed_server_url(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }
}

fn require_env(name: &str) -> ClientResult<String> {
    optional_env(name).ok_or_else(|| ClientError::invalid_config(format!("{name} must be set")))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn proxy_from_env() -> ClientResult<Option<ProxyConfig>> {
    let Some(host) = optional_env("PROXY_HOST") else {
        return Ok(None);
    };
    let Some(port_raw) = optional_env("PROXY_PORT") else {
        return Ok(None);
    };
    let port: u16 = match port_raw.parse() {
        Ok(port) if port > 0 => port,
        _ => {
            return Err(ClientError::invalid_config(format!(
                "invalid PROXY_PORT value: {port_raw}"
            )));
        }
    };
    Ok(Some(ProxyConfig {
        host,
        port,
        username: optional_env("PROXY_USERNAME"),
        password: optional_env("PROXY_PASSWORD").map(SecretString::from),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_numbers() {
        assert_eq!(
            AuthenticationMode::from_number(0).ok(),
            Some(AuthenticationMode::Default)
        );
        assert_eq!(
            AuthenticationMode::from_number(1).ok(),
            Some(AuthenticationMode::SdkClient)
        );
        assert!(AuthenticationMode::from_number(2).is_err());
        assert_eq!(AuthenticationMode::SdkClient.as_number(), 1);
    }

    #[test]
    fn test_password_config_validates() {
        let config = ClientConfig::password("https://x.example.com", "u", "p");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_server_url_rejected() {
        let config = ClientConfig::password("  ", "u", "p");
        assert!(matches!(
            config.validate(),
            Err(ClientError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_relative_server_url_rejected() {
        let config = ClientConfig::password("x.example.com/base", "u", "p");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        let config = ClientConfig::password("ftp://x.example.com", "u", "p");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_credentials_rejected() {
        let config = ClientConfig::password("https://x.example.com", "", "p");
        assert!(config.validate().is_err());

        let config = ClientConfig::sdk_client("https://x.example.com", "rule", " ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credential_shape_must_match_mode() {
        let mut config = ClientConfig::password("https://x.example.com", "u", "p");
        config.mode = AuthenticationMode::SdkClient;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_trailing_slashes_trimmed() {
        let config = ClientConfig::password("https://x.example.com///", "u", "p");
        assert_eq!(config.trimmed_server_url(), "https://x.example.com");
    }

    #[test]
    fn test_password_not_exposed_in_debug() {
        let config = ClientConfig::password("https://x.example.com", "u", "s3cr3t-value");
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cr3t-value"));
        assert!(debug.contains('u'));
    }
}
