//! md_drive - Convert Markdown documents and upload them to Google Drive.
//!
//! This library provides:
//! - OAuth installed-app authentication with a reusable token cache
//! - Markdown to HTML and PDF conversion
//! - Folder ID extraction from Drive sharing links
//! - Single-call uploads into a Drive folder
//!
//! # Example
//!
//! ```no_run
//! use md_drive::{extract_folder_id, upload_artifact, ArtifactFormat, Authenticator, Document, DriveClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let auth = Authenticator::from_file("credentials.json")?;
//!     let artifact = Document::read("notes.md")?.render(ArtifactFormat::Html);
//!     let folder_id = extract_folder_id("https://drive.google.com/drive/folders/ABC123")?;
//!
//!     let client = DriveClient::new(auth);
//!     let file = upload_artifact(&client, artifact, &folder_id, None).await?;
//!     println!("{}", file.id);
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod convert;
pub mod credential_store;
pub mod error;
pub mod loopback;
pub mod models;
pub mod upload;
pub mod url_parser;

// Re-exports for convenience
pub use auth::{Authenticator, ConsentFlow, DRIVE_FILE_SCOPE};
pub use client::DriveClient;
pub use convert::{Artifact, ArtifactFormat, Document};
pub use credential_store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{AuthError, ConvertError, Error, ErrorKind, InvalidFolderLink, Result, UploadError};
pub use loopback::LoopbackFlow;
pub use models::{Credential, FileMetadata};
pub use upload::{upload_artifact, upload_path, FileStore, UploadMetadata};
pub use url_parser::extract_folder_id;
