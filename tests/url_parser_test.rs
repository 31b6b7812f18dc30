//! Tests for folder ID extraction.

use md_drive::url_parser::extract_folder_id;

mod folder_links {
    use super::*;

    #[test]
    fn basic_folder_link() {
        let url = "https://drive.google.com/drive/folders/ABC123";
        assert_eq!(extract_folder_id(url).unwrap(), "ABC123");
    }

    #[test]
    fn folder_link_with_sharing_query() {
        let url = "https://drive.google.com/drive/folders/ABC123?usp=sharing";
        assert_eq!(extract_folder_id(url).unwrap(), "ABC123");
    }

    #[test]
    fn folder_link_with_trailing_slash() {
        let url = "https://drive.google.com/drive/folders/ABC123/";
        assert_eq!(extract_folder_id(url).unwrap(), "ABC123");
    }

    #[test]
    fn folder_link_with_fragment() {
        let url = "https://drive.google.com/drive/folders/ABC123#grid";
        assert_eq!(extract_folder_id(url).unwrap(), "ABC123");
    }

    #[test]
    fn folder_link_with_user_index() {
        let url = "https://drive.google.com/drive/u/1/folders/1abc123XYZ-_def456";
        assert_eq!(extract_folder_id(url).unwrap(), "1abc123XYZ-_def456");
    }

    #[test]
    fn folder_link_http() {
        let url = "http://drive.google.com/drive/folders/1abc123XYZ";
        assert_eq!(extract_folder_id(url).unwrap(), "1abc123XYZ");
    }

    #[test]
    fn shortened_folder_path() {
        let url = "https://drive.google.com/folders/XYZ";
        assert_eq!(extract_folder_id(url).unwrap(), "XYZ");
    }
}

mod open_links {
    use super::*;

    #[test]
    fn open_link() {
        let url = "https://drive.google.com/open?id=1abc123XYZ";
        assert_eq!(extract_folder_id(url).unwrap(), "1abc123XYZ");
    }

    #[test]
    fn open_link_with_other_params() {
        let url = "https://drive.google.com/open?authuser=0&id=1abc123XYZ";
        assert_eq!(extract_folder_id(url).unwrap(), "1abc123XYZ");
    }
}

mod raw_ids {
    use super::*;

    #[test]
    fn alphanumeric_id() {
        assert_eq!(extract_folder_id("1abc123XYZ").unwrap(), "1abc123XYZ");
    }

    #[test]
    fn id_with_mixed_special() {
        assert_eq!(extract_folder_id("abc-123_XYZ").unwrap(), "abc-123_XYZ");
    }

    #[test]
    fn id_with_whitespace_trimmed() {
        assert_eq!(extract_folder_id("\t1abc123XYZ\n").unwrap(), "1abc123XYZ");
    }
}

mod invalid_inputs {
    use super::*;

    #[test]
    fn empty_string() {
        assert!(extract_folder_id("").is_err());
        assert!(extract_folder_id("  \t").is_err());
    }

    #[test]
    fn no_folder_segment() {
        assert!(extract_folder_id("https://example.com/folder/123").is_err());
        assert!(extract_folder_id("https://drive.google.com/file/d/1abc/view").is_err());
    }

    #[test]
    fn folder_segment_without_id() {
        assert!(extract_folder_id("https://drive.google.com/drive/folders/").is_err());
        assert!(extract_folder_id("https://drive.google.com/drive/folders/?usp=sharing").is_err());
    }

    #[test]
    fn invalid_characters_in_id() {
        assert!(extract_folder_id("https://drive.google.com/drive/folders/abc@123").is_err());
        assert!(extract_folder_id("abc 123").is_err());
        assert!(extract_folder_id("abc/123").is_err());
    }

    #[test]
    fn error_names_the_input() {
        let err = extract_folder_id("not a link").unwrap_err();
        assert!(err.to_string().contains("not a link"));
    }
}
