//! Secret record shapes returned by the secrets API.
//!
//! Plain value objects after deserialization; nothing here is mutated once
//! a secret has been handed to a caller.

use serde::Deserialize;

/// A secret record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Secret {
    /// Secret ID
    pub id: i32,
    /// Secret name
    pub name: String,
    /// Name of the template the secret was created from
    pub secret_template_name: String,
    /// Template ID
    pub secret_template_id: i32,
    /// Containing folder ID
    pub folder_id: i32,
    /// Site ID
    pub site_id: i32,
    /// Whether the secret is active
    pub active: bool,
    /// Whether the secret is currently checked out
    pub checked_out: bool,
    /// Whether checkout is enabled for the secret
    pub checkout_enabled: bool,
    /// Last heartbeat status, when heartbeat is configured
    pub last_heart_beat_status: Option<String>,
    /// The secret's fields
    pub fields: Vec<SecretField>,
}

/// A single field (item) of a secret.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecretField {
    /// Item ID
    #[serde(rename = "itemId")]
    pub id: i32,
    /// Field ID
    pub field_id: i32,
    /// File attachment ID; zero when the field carries no attachment
    pub file_attachment_id: i32,
    /// Field description
    pub field_description: Option<String>,
    /// Field name
    pub field_name: Option<String>,
    /// Attachment filename, when present
    pub filename: Option<String>,
    /// Field value. For attachment fields the API returns a placeholder
    /// here until the attachment contents are fetched.
    #[serde(rename = "itemValue")]
    pub value: Option<String>,
    /// URL slug of the field
    pub slug: Option<String>,
}

impl SecretField {
    /// Whether this field carries a file attachment.
    #[must_use]
    pub const fn has_file_attachment(&self) -> bool {
        self.file_attachment_id > 0
    }
}
