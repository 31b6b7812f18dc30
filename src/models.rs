//! Data models for OAuth credentials and Google Drive API responses.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Google OAuth2 token endpoint.
pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Google OAuth2 consent endpoint.
pub const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// A cached token is reused only if it stays valid this long.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// Metadata for a file created in Google Drive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default, deserialize_with = "deserialize_size")]
    pub size: Option<u64>,
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) => s.parse::<u64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Format bytes into human-readable size.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Google API error response.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub code: u16,
    pub message: String,
}

/// OAuth2 token endpoint error body.
#[derive(Debug, Deserialize)]
pub struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Service account credentials from JSON file.
#[derive(Debug, Deserialize)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: Option<String>,
}

/// The `installed` (or `web`) entry of a client secrets file downloaded
/// from the Google Cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct InstalledAppSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<InstalledAppSecrets>,
    web: Option<InstalledAppSecrets>,
}

/// Parsed client credentials descriptor.
#[derive(Debug)]
pub enum ClientSecrets {
    Installed(InstalledAppSecrets),
    ServiceAccount(ServiceAccountCredentials),
}

impl ClientSecrets {
    /// Load a client secrets file or a service account key.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| AuthError::SecretsRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, AuthError> {
        let value: serde_json::Value = serde_json::from_str(content)?;

        if value.get("type").and_then(|t| t.as_str()) == Some("service_account") {
            return Ok(ClientSecrets::ServiceAccount(serde_json::from_value(value)?));
        }

        let file: ClientSecretsFile = serde_json::from_value(value)?;
        file.installed
            .or(file.web)
            .map(ClientSecrets::Installed)
            .ok_or(AuthError::UnsupportedSecrets)
    }
}

/// OAuth2 token response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// An OAuth credential, serialized in Google's authorized-user JSON shape
/// so that cache files stay interchangeable with other Google tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credential {
    /// Build a credential from a token endpoint response.
    ///
    /// Providers omit `refresh_token` on refresh and sometimes omit `scope`;
    /// `previous` fills both gaps.
    pub fn from_response(
        response: TokenResponse,
        secrets: &InstalledAppSecrets,
        requested_scopes: &[String],
        previous: Option<&Credential>,
    ) -> Self {
        // Lifetimes too large for chrono leave the expiry unset.
        let expiry = response
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime));

        let scopes = match response.scope {
            Some(scope) => scope.split_whitespace().map(String::from).collect(),
            None => previous
                .map(|p| p.scopes.clone())
                .unwrap_or_else(|| requested_scopes.to_vec()),
        };

        let refresh_token = response
            .refresh_token
            .or_else(|| previous.and_then(|p| p.refresh_token.clone()));

        Self {
            token: response.access_token,
            refresh_token,
            token_uri: secrets.token_uri.clone(),
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            scopes,
            expiry,
        }
    }

    /// True once the token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        self.expiry
            .map(|exp| exp <= Utc::now() + Duration::seconds(EXPIRY_BUFFER_SECS))
            .unwrap_or(false)
    }

    pub fn is_valid(&self) -> bool {
        !self.token.is_empty() && !self.is_expired()
    }

    pub fn has_scopes(&self, scopes: &[String]) -> bool {
        scopes.iter().all(|s| self.scopes.contains(s))
    }
}
