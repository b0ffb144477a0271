//! Delinea Secret Server and Platform client.
//!
//! Given a server URL and a credential pair, the crate determines which
//! backend personality is present (a direct Secret Server REST API or a
//! Platform identity layer fronting it), obtains a bearer token through the
//! matching OAuth2 grant flow, resolves the downstream vault endpoint when
//! a Platform is in the way, and hands out a client that attaches the token
//! to every secrets API call.
//!
//! ```no_run
//! use delinea_secrets_client::{ClientConfig, SecretServerClient};
//!
//! # async fn run() -> delinea_secrets_client::ClientResult<()> {
//! let config = ClientConfig::password("https://x.example.com", "svc-account", "password");
//! let client = SecretServerClient::connect(config).await?;
//! let secret = client.get_secret(42, true).await?;
//! println!("fetched {}", secret.name);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod grant;
pub mod health;
pub mod http;
pub mod resolver;
pub mod secrets;
pub mod vault;

pub use client::SecretServerClient;
pub use config::{AuthenticationMode, ClientConfig, Credentials};
pub use error::{ClientError, ClientResult};
pub use grant::{AccessGrant, GrantStrategy};
pub use health::BackendClassification;
pub use http::{HttpConfig, ProxyConfig, build_http_client};
pub use resolver::{AuthenticationResolver, ResolvedSession};
pub use secrets::{Secret, SecretField};
pub use vault::{VaultConnection, VaultDescriptor};
