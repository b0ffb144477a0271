//! Vault directory resolution against a Platform deployment.
//!
//! Once Platform-authenticated, the caller is bound to a set of vaults; the
//! single vault marked both default and active names the Secret Server
//! instance every subsequent data call must target.

use crate::error::{ClientError, ClientResult};
use reqwest::Client;
use serde::Deserialize;
use tracing::{instrument, warn};

/// Vault listing as returned by the vault broker.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VaultsResponse {
    /// The vaults bound to the caller
    #[serde(default)]
    pub vaults: Vec<VaultDescriptor>,
}

/// A single vault entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VaultDescriptor {
    /// Vault identifier
    pub vault_id: String,
    /// Vault display name
    pub name: String,
    /// Vault type
    #[serde(rename = "type")]
    pub vault_type: String,
    /// Whether this vault is the caller's default
    pub is_default: bool,
    /// Whether this vault is the tenant-wide default
    pub is_global_default: bool,
    /// Whether this vault is active
    pub is_active: bool,
    /// Connection details for the backing Secret Server
    pub connection: Option<VaultConnection>,
}

/// Connection details of a vault.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VaultConnection {
    /// Base URL of the backing Secret Server
    pub url: String,
    /// OAuth profile bound to the connection
    pub o_auth_profile_id: Option<String>,
}

/// Select the vault data calls must target: the first entry marked both
/// default and active.
///
/// More than one match is a backend data-quality condition; the first match
/// still wins, with a diagnostic emitted.
///
/// # Errors
///
/// `NoDefaultVault` when no entry satisfies the predicate.
pub fn select_default_vault(vaults: Vec<VaultDescriptor>) -> ClientResult<VaultDescriptor> {
    let mut matches = vaults.into_iter().filter(|v| v.is_default && v.is_active);
    let Some(selected) = matches.next() else {
        return Err(ClientError::NoDefaultVault);
    };
    let surplus = matches.count();
    if surplus > 0 {
        warn!(
            vault = %selected.name,
            surplus,
            "multiple vaults are marked default and active, taking the first"
        );
    }
    Ok(selected)
}

/// Fetches and filters the vault directory.
#[derive(Debug)]
pub struct VaultResolver {
    http: Client,
}

impl VaultResolver {
    /// Create a resolver using the given transport.
    #[must_use]
    pub const fn new(http: Client) -> Self {
        Self { http }
    }

    /// Fetch the caller's vaults and return the default active one.
    ///
    /// # Errors
    ///
    /// `VaultFetchFailed` on a non-2xx answer, `NoDefaultVault` when no
    /// vault satisfies the predicate, `Transport`/`Serialization` for
    /// network and payload failures.
    #[instrument(skip(self, access_token))]
    pub async fn resolve_default_vault(
        &self,
        platform_base_url: &str,
        access_token: &str,
    ) -> ClientResult<VaultDescriptor> {
        let url = format!(
            "{}/vaultbroker/api/vaults",
            platform_base_url.trim_end_matches('/')
        );
        let response = self.http.get(&url).bearer_auth(access_token).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::vault_fetch_failed(status.as_u16(), body));
        }
        let listing: VaultsResponse = serde_json::from_str(&body)?;
        select_default_vault(listing.vaults)
    }
}
