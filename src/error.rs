//! Error types for the md_drive crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while obtaining an OAuth credential.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Failed to read client secrets {path:?}: {source}")]
    SecretsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse client secrets JSON: {0}")]
    SecretsParse(#[from] serde_json::Error),

    #[error("Unsupported client secrets format: expected an \"installed\" or \"web\" client, or a service account key")]
    UnsupportedSecrets,

    #[error("Invalid authorization URI: {0}")]
    InvalidAuthUri(String),

    #[error("Failed to bind redirect listener: {0}")]
    ListenerBind(#[source] std::io::Error),

    #[error("Redirect listener failed: {0}")]
    Listener(#[source] std::io::Error),

    #[error("Authorization denied: {0}")]
    ConsentDenied(String),

    #[error("Authorization callback state did not match the request")]
    StateMismatch,

    #[error("Token request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Token endpoint rejected the request ({status}): {message}")]
    TokenRejected { status: u16, message: String },

    #[error("Failed to access credential cache {path:?}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JWT encoding error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

/// Errors raised while reading or rendering a Markdown document.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path:?} is not valid UTF-8: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to overwrite the source file {0:?} with rendered HTML")]
    SiblingIsSource(PathBuf),
}

/// A folder link with no recognizable folder ID.
#[derive(Error, Debug)]
#[error("Invalid folder URL or ID: {0}")]
pub struct InvalidFolderLink(pub String);

/// Errors raised by the Drive upload call.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a file name: {0:?}")]
    InvalidFileName(PathBuf),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("No upload URL in resumable session response")]
    MissingUploadUrl,
}

/// Broad failure classes, so callers can tell what went wrong without
/// matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad client secrets or folder link.
    Configuration,
    /// Local file could not be read or written.
    Io,
    /// Consent, listener or token endpoint failure.
    Authentication,
    /// The storage API refused or failed the request.
    Remote,
}

/// Any error produced by the pipeline.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    FolderLink(#[from] InvalidFolderLink),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::SecretsRead { .. }
            | AuthError::SecretsParse(_)
            | AuthError::UnsupportedSecrets
            | AuthError::InvalidAuthUri(_) => ErrorKind::Configuration,
            AuthError::Cache { .. } => ErrorKind::Io,
            _ => ErrorKind::Authentication,
        }
    }
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::Auth(e) => e.kind(),
            UploadError::Io { .. } | UploadError::InvalidFileName(_) => ErrorKind::Io,
            _ => ErrorKind::Remote,
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Auth(e) => e.kind(),
            Error::Convert(_) => ErrorKind::Io,
            Error::FolderLink(_) => ErrorKind::Configuration,
            Error::Upload(e) => e.kind(),
        }
    }
}

/// Result type alias for the crate-level Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let err: Error = InvalidFolderLink("nope".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err: Error = AuthError::ConsentDenied("access_denied".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Authentication);

        let err: Error = UploadError::ApiError {
            status: 403,
            message: "quota".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Remote);

        let err: Error = UploadError::Auth(AuthError::UnsupportedSecrets).into();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
