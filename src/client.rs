//! Google Drive API client for file uploads.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use tracing::debug;

use crate::auth::Authenticator;
use crate::error::UploadError;
use crate::models::{ApiErrorResponse, FileMetadata};
use crate::upload::{FileStore, UploadMetadata};

/// Upload URL for Google Drive API.
const UPLOAD_API_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Payloads above this size go through a resumable session (5 MB).
const RESUMABLE_THRESHOLD: usize = 5 * 1024 * 1024;

const RESPONSE_FIELDS: &str = "id, name, size, mimeType, webViewLink";

/// Client for creating files in Google Drive.
pub struct DriveClient {
    auth: Authenticator,
    http: Client,
    upload_base: String,
    resumable_threshold: usize,
}

impl DriveClient {
    /// Create a new DriveClient.
    pub fn new(auth: Authenticator) -> Self {
        Self {
            auth,
            http: Client::new(),
            upload_base: UPLOAD_API_BASE.to_string(),
            resumable_threshold: RESUMABLE_THRESHOLD,
        }
    }

    /// Point the client at another upload endpoint.
    pub fn with_upload_base(mut self, base: impl Into<String>) -> Self {
        self.upload_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_resumable_threshold(mut self, bytes: usize) -> Self {
        self.resumable_threshold = bytes;
        self
    }

    /// Upload using multipart upload (for smaller files).
    async fn upload_multipart(
        &self,
        metadata: &UploadMetadata,
        content: Vec<u8>,
    ) -> Result<FileMetadata, UploadError> {
        let token = self.auth.access_token().await?;

        let metadata_part =
            Part::text(serde_json::json!(metadata).to_string()).mime_str("application/json")?;

        let file_part = Part::bytes(content)
            .file_name(metadata.name.clone())
            .mime_str(&metadata.mime_type)?;

        let form = Form::new()
            .part("metadata", metadata_part)
            .part("file", file_part);

        let response = self
            .http
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(&token)
            .query(&[
                ("uploadType", "multipart"),
                ("supportsAllDrives", "true"),
                ("fields", RESPONSE_FIELDS),
            ])
            .multipart(form)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    /// Upload using a resumable session (for larger files).
    async fn upload_resumable(
        &self,
        metadata: &UploadMetadata,
        content: Vec<u8>,
    ) -> Result<FileMetadata, UploadError> {
        let token = self.auth.access_token().await?;
        let file_size = content.len();

        // Step 1: Initiate resumable upload
        let init_response = self
            .http
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(&token)
            .query(&[("uploadType", "resumable"), ("supportsAllDrives", "true")])
            .header("X-Upload-Content-Type", metadata.mime_type.as_str())
            .header("X-Upload-Content-Length", file_size.to_string())
            .json(metadata)
            .send()
            .await?;

        let init_response = check(init_response).await?;
        let upload_url = init_response
            .headers()
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .ok_or(UploadError::MissingUploadUrl)?
            .to_string();
        debug!(%upload_url, "resumable session opened");

        // Step 2: Upload the file content
        let upload_response = self
            .http
            .put(&upload_url)
            .header("Content-Type", metadata.mime_type.as_str())
            .header("Content-Length", file_size.to_string())
            .query(&[("fields", RESPONSE_FIELDS)])
            .body(content)
            .send()
            .await?;

        Ok(check(upload_response).await?.json().await?)
    }
}

#[async_trait]
impl FileStore for DriveClient {
    async fn create_file(
        &self,
        metadata: &UploadMetadata,
        content: Vec<u8>,
    ) -> Result<FileMetadata, UploadError> {
        if content.len() > self.resumable_threshold {
            self.upload_resumable(metadata, content).await
        } else {
            self.upload_multipart(metadata, content).await
        }
    }
}

/// Turn a non-2xx response into an ApiError, preferring the message from
/// Google's error envelope.
async fn check(response: Response) -> Result<Response, UploadError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_body = response.text().await.unwrap_or_default();
    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
        return Err(UploadError::ApiError {
            status: api_error.error.code,
            message: api_error.error.message,
        });
    }
    Err(UploadError::ApiError {
        status: status.as_u16(),
        message: error_body,
    })
}
