//! OAuth authentication for the Drive API.
//!
//! Installed-app client secrets go through the cached credential first,
//! then a refresh, then the interactive consent flow. Service account keys
//! mint a token from a signed JWT assertion.

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::credential_store::{CredentialStore, FileCredentialStore};
use crate::error::AuthError;
use crate::loopback::LoopbackFlow;
use crate::models::{
    ClientSecrets, Credential, InstalledAppSecrets, ServiceAccountCredentials, TokenErrorResponse,
    TokenResponse, TOKEN_URI,
};

/// Scope granting access to files created by this app.
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// JWT claims for service account authentication.
#[derive(Debug, Serialize)]
struct Claims {
    iss: String,   // Issuer (service account email)
    scope: String, // OAuth scope
    aud: String,   // Audience (token endpoint)
    exp: u64,      // Expiration time
    iat: u64,      // Issued at
}

/// Result of a successful consent round-trip.
#[derive(Debug, Clone)]
pub struct AuthorizationGrant {
    pub code: String,
    /// Must be sent back unchanged in the code exchange.
    pub redirect_uri: String,
    pub code_verifier: Option<String>,
}

/// Interactive step that asks the user for consent and yields an
/// authorization code.
#[async_trait]
pub trait ConsentFlow: Send + Sync {
    async fn authorize(
        &self,
        secrets: &InstalledAppSecrets,
        scopes: &[String],
    ) -> Result<AuthorizationGrant, AuthError>;
}

/// Authenticator for Google APIs.
#[derive(Clone)]
pub struct Authenticator {
    secrets: Arc<ClientSecrets>,
    scopes: Vec<String>,
    store: Arc<dyn CredentialStore>,
    consent: Arc<dyn ConsentFlow>,
    client: Client,
    cached: Arc<RwLock<Option<Credential>>>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Create a new authenticator from a client secrets or service account
    /// JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AuthError> {
        Ok(Self::new(ClientSecrets::from_file(path)?))
    }

    /// Create a new authenticator with the default token cache, the
    /// loopback consent flow and the `drive.file` scope.
    pub fn new(secrets: ClientSecrets) -> Self {
        Self {
            secrets: Arc::new(secrets),
            scopes: vec![DRIVE_FILE_SCOPE.to_string()],
            store: Arc::new(FileCredentialStore::default()),
            consent: Arc::new(LoopbackFlow::new()),
            client: Client::new(),
            cached: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_store<S: CredentialStore + 'static>(self, store: S) -> Self {
        self.with_shared_store(Arc::new(store))
    }

    pub fn with_shared_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_consent_flow<F: ConsentFlow + 'static>(mut self, consent: F) -> Self {
        self.consent = Arc::new(consent);
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Get a valid access token, authorizing if necessary.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        {
            let cached = self.cached.read().await;
            if let Some(credential) = cached.as_ref() {
                if credential.is_valid() {
                    return Ok(credential.token.clone());
                }
            }
        }

        let credential = self.authorize().await?;
        let token = credential.token.clone();

        {
            let mut cached = self.cached.write().await;
            *cached = Some(credential);
        }

        Ok(token)
    }

    /// Obtain a credential without consulting the in-memory cache.
    pub async fn authorize(&self) -> Result<Credential, AuthError> {
        match self.secrets.as_ref() {
            ClientSecrets::Installed(secrets) => self.authorize_installed(secrets).await,
            ClientSecrets::ServiceAccount(credentials) => {
                self.service_account_token(credentials).await
            }
        }
    }

    async fn authorize_installed(
        &self,
        secrets: &InstalledAppSecrets,
    ) -> Result<Credential, AuthError> {
        if let Some(cached) = self.store.load()? {
            if !cached.has_scopes(&self.scopes) {
                info!("cached credential does not cover the requested scopes");
            } else if cached.is_valid() {
                debug!("using cached credential");
                return Ok(cached);
            } else if cached.refresh_token.is_some() {
                match self.refresh(secrets, &cached).await {
                    Ok(fresh) => {
                        self.store.save(&fresh)?;
                        return Ok(fresh);
                    }
                    Err(AuthError::TokenRejected { status, message }) => {
                        warn!(status, %message, "refresh rejected, starting consent flow");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        info!("starting interactive consent flow");
        let grant = self.consent.authorize(secrets, &self.scopes).await?;
        let credential = self.exchange_code(secrets, grant).await?;
        self.store.save(&credential)?;
        Ok(credential)
    }

    /// Exchange the refresh token for a new access token.
    async fn refresh(
        &self,
        secrets: &InstalledAppSecrets,
        credential: &Credential,
    ) -> Result<Credential, AuthError> {
        info!("refreshing expired access token");
        let refresh_token = credential.refresh_token.as_deref().unwrap_or_default();
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
        ];

        let response = self.request_token(&secrets.token_uri, &params).await?;
        Ok(Credential::from_response(
            response,
            secrets,
            &self.scopes,
            Some(credential),
        ))
    }

    /// Exchange an authorization code for tokens.
    async fn exchange_code(
        &self,
        secrets: &InstalledAppSecrets,
        grant: AuthorizationGrant,
    ) -> Result<Credential, AuthError> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", grant.code.as_str()),
            ("redirect_uri", grant.redirect_uri.as_str()),
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
        ];
        if let Some(verifier) = grant.code_verifier.as_deref() {
            params.push(("code_verifier", verifier));
        }

        let response = self.request_token(&secrets.token_uri, &params).await?;
        Ok(Credential::from_response(response, secrets, &self.scopes, None))
    }

    /// Mint an access token using a JWT assertion.
    async fn service_account_token(
        &self,
        credentials: &ServiceAccountCredentials,
    ) -> Result<Credential, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let token_uri = credentials.token_uri.as_deref().unwrap_or(TOKEN_URI);

        let claims = Claims {
            iss: credentials.client_email.clone(),
            scope: self.scopes.join(" "),
            aud: token_uri.to_string(),
            iat: now,
            exp: now + 3600, // 1 hour
        };

        let header = Header::new(Algorithm::RS256);
        let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())?;
        let jwt = encode(&header, &claims, &key)?;

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", jwt.as_str()),
        ];

        let response = self.request_token(token_uri, &params).await?;
        let secrets = InstalledAppSecrets {
            client_id: credentials.client_email.clone(),
            client_secret: String::new(),
            auth_uri: String::new(),
            token_uri: token_uri.to_string(),
            redirect_uris: Vec::new(),
        };
        Ok(Credential::from_response(response, &secrets, &self.scopes, None))
    }

    async fn request_token(
        &self,
        token_uri: &str,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse, AuthError> {
        let response = self.client.post(token_uri).form(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => body,
            };
            return Err(AuthError::TokenRejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_serialization() {
        let claims = Claims {
            iss: "test@example.iam.gserviceaccount.com".to_string(),
            scope: DRIVE_FILE_SCOPE.to_string(),
            aud: TOKEN_URI.to_string(),
            iat: 1234567890,
            exp: 1234571490,
        };

        let json = serde_json::to_string(&claims).unwrap();
        assert!(json.contains("test@example.iam.gserviceaccount.com"));
        assert!(json.contains(DRIVE_FILE_SCOPE));
    }

    #[test]
    fn test_default_scope() {
        let secrets = ClientSecrets::from_json(r#"{"installed": {"client_id": "c"}}"#).unwrap();
        let auth = Authenticator::new(secrets);
        assert_eq!(auth.scopes(), &[DRIVE_FILE_SCOPE.to_string()]);
    }
}
