//! Upload metadata and the storage abstraction the uploader talks to.

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::convert::Artifact;
use crate::error::UploadError;
use crate::models::{format_size, FileMetadata};

/// Body of a Drive `files.create` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    pub name: String,
    pub parents: Vec<String>,
    pub mime_type: String,
}

impl UploadMetadata {
    /// Metadata for an in-memory artifact, named `output.<ext>` unless
    /// `name` is given.
    pub fn for_artifact(artifact: &Artifact, folder_id: &str, name: Option<&str>) -> Self {
        let format = artifact.format();
        Self {
            name: name
                .map(str::to_string)
                .unwrap_or_else(|| format.default_file_name()),
            parents: vec![folder_id.to_string()],
            mime_type: format.mime_type().to_string(),
        }
    }

    /// Metadata for a file on disk; the MIME type follows the extension.
    pub fn for_path(path: &Path, folder_id: &str, name: Option<&str>) -> Result<Self, UploadError> {
        let name = match name {
            Some(name) => name.to_string(),
            None => path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| UploadError::InvalidFileName(path.to_path_buf()))?
                .to_string(),
        };
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        Ok(Self {
            name,
            parents: vec![folder_id.to_string()],
            mime_type,
        })
    }
}

/// A storage service that can create a file from metadata and content.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn create_file(
        &self,
        metadata: &UploadMetadata,
        content: Vec<u8>,
    ) -> Result<FileMetadata, UploadError>;
}

/// Upload a rendered artifact into `folder_id`.
pub async fn upload_artifact<S: FileStore + ?Sized>(
    store: &S,
    artifact: Artifact,
    folder_id: &str,
    name: Option<&str>,
) -> Result<FileMetadata, UploadError> {
    let metadata = UploadMetadata::for_artifact(&artifact, folder_id, name);
    info!(
        name = %metadata.name,
        parent = %folder_id,
        size = %format_size(artifact.len() as u64),
        "uploading"
    );
    store.create_file(&metadata, artifact.into_bytes()).await
}

/// Upload a file from disk into `folder_id`.
pub async fn upload_path<S: FileStore + ?Sized>(
    store: &S,
    path: &Path,
    folder_id: &str,
    name: Option<&str>,
) -> Result<FileMetadata, UploadError> {
    let metadata = UploadMetadata::for_path(path, folder_id, name)?;
    let content = std::fs::read(path).map_err(|source| UploadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        name = %metadata.name,
        parent = %folder_id,
        size = %format_size(content.len() as u64),
        "uploading"
    );
    store.create_file(&metadata, content).await
}
