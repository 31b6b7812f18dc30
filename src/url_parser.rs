//! Folder ID extraction from Google Drive sharing links.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::InvalidFolderLink;

/// `folders/<ID>` path segment, as in `/drive/folders/<ID>` and
/// `/drive/u/0/folders/<ID>`.
static FOLDER_SEGMENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^/?#]+/(?:[^?#]*/)?folders/([a-zA-Z0-9_-]+)(?:[/?#].*)?$")
        .expect("Invalid folder URL regex")
});

static OPEN_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://drive\.google\.com/(?:open|drive/folderview)\?(?:.*&)?id=([a-zA-Z0-9_-]+)")
        .expect("Invalid open URL regex")
});

/// Valid Google Drive ID pattern (alphanumeric, underscore, hyphen).
static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Invalid ID regex"));

/// Extract a folder ID from a sharing link or validate a raw ID.
///
/// Supports the following formats:
/// - `https://drive.google.com/drive/folders/<ID>` (with optional trailing
///   slash, query string or fragment)
/// - `https://drive.google.com/drive/u/0/folders/<ID>`
/// - `https://drive.google.com/open?id=<ID>`
/// - Raw ID string
///
/// # Examples
///
/// ```
/// use md_drive::url_parser::extract_folder_id;
///
/// let id = extract_folder_id("https://drive.google.com/drive/folders/ABC123?usp=sharing").unwrap();
/// assert_eq!(id, "ABC123");
///
/// let id = extract_folder_id("ABC123").unwrap();
/// assert_eq!(id, "ABC123");
/// ```
pub fn extract_folder_id(link: &str) -> Result<String, InvalidFolderLink> {
    let trimmed = link.trim();

    for regex in [&*FOLDER_SEGMENT_REGEX, &*OPEN_URL_REGEX] {
        if let Some(id) = regex.captures(trimmed).and_then(|c| c.get(1)) {
            return Ok(id.as_str().to_string());
        }
    }

    if ID_REGEX.is_match(trimmed) {
        return Ok(trimmed.to_string());
    }

    Err(InvalidFolderLink(link.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_folder_url() {
        let url = "https://drive.google.com/drive/folders/ABC123";
        assert_eq!(extract_folder_id(url).unwrap(), "ABC123");
    }

    #[test]
    fn test_extract_folder_url_with_query() {
        let url = "https://drive.google.com/drive/folders/ABC123?usp=sharing";
        assert_eq!(extract_folder_id(url).unwrap(), "ABC123");
    }

    #[test]
    fn test_extract_folder_url_with_user() {
        let url = "https://drive.google.com/drive/u/2/folders/1abc123XYZ";
        assert_eq!(extract_folder_id(url).unwrap(), "1abc123XYZ");
    }

    #[test]
    fn test_extract_open_url() {
        let url = "https://drive.google.com/open?id=1abc123XYZ";
        assert_eq!(extract_folder_id(url).unwrap(), "1abc123XYZ");
    }

    #[test]
    fn test_extract_raw_id() {
        assert_eq!(extract_folder_id("  abc-123_XYZ  ").unwrap(), "abc-123_XYZ");
    }

    #[test]
    fn test_invalid_link() {
        assert!(extract_folder_id("https://example.com/folder/123").is_err());
        assert!(extract_folder_id("").is_err());
        assert!(extract_folder_id("   ").is_err());
    }
}
