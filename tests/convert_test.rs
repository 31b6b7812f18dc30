//! Tests for reading and rendering Markdown documents.

use md_drive::convert::{render_html, render_pdf};
use md_drive::{ArtifactFormat, ConvertError, Document, Error, ErrorKind};

fn write_doc(dir: &tempfile::TempDir, name: &str, body: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, body).unwrap();
    path
}

mod html {
    use super::*;

    #[test]
    fn title_and_body_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(&dir, "doc.md", b"# Title\n\nBody text.");

        let artifact = Document::read(&path).unwrap().render(ArtifactFormat::Html);

        assert_eq!(artifact.format(), ArtifactFormat::Html);
        let html = String::from_utf8(artifact.into_bytes()).unwrap();
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<p>Body text.</p>"));
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let source = "# Notes\n\n* one\n* two\n\n```rust\nfn main() {}\n```\n\n~~old~~ new\n";
        assert_eq!(render_html(source), render_html(source));
        assert!(render_html(source).contains("<del>old</del>"));
    }

    #[test]
    fn sibling_file_is_written_next_to_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(&dir, "notes.md", b"## Section\n\ntext");
        let document = Document::read(&path).unwrap();

        let html_path = document.write_sibling_html().unwrap();

        assert_eq!(html_path, dir.path().join("notes.html"));
        let written = std::fs::read_to_string(&html_path).unwrap();
        assert_eq!(written, render_html(document.source()));
    }

    #[test]
    fn sibling_of_html_source_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let original = b"# Kept\n\nThis file must survive.";
        let path = write_doc(&dir, "notes.html", original);
        let document = Document::read(&path).unwrap();

        let err = document.write_sibling_html().unwrap_err();

        assert!(matches!(err, ConvertError::SiblingIsSource(ref p) if *p == path));
        assert_eq!(std::fs::read(&path).unwrap(), original);
        assert_eq!(Error::from(err).kind(), ErrorKind::Io);
    }
}

mod pdf {
    use super::*;

    #[test]
    fn renders_pdf_bytes() {
        let bytes = render_pdf("# Title\n\nBody text.");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn empty_document_still_renders() {
        let bytes = render_pdf("");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_document_renders() {
        let paragraph = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. ".repeat(12);
        let source: String = (0..200).map(|i| format!("## Part {i}\n\n{paragraph}\n\n")).collect();

        let artifact = {
            let dir = tempfile::tempdir().unwrap();
            let path = write_doc(&dir, "long.md", source.as_bytes());
            Document::read(&path).unwrap().render(ArtifactFormat::Pdf)
        };

        assert_eq!(artifact.format(), ArtifactFormat::Pdf);
        assert!(artifact.len() > render_pdf("short").len());
    }
}

mod errors {
    use super::*;

    #[test]
    fn missing_file() {
        let err = Document::read("/nonexistent/doc.md").unwrap_err();
        assert!(matches!(err, ConvertError::Read { .. }));

        let err: Error = err.into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(&dir, "bad.md", &[0x23, 0x20, 0xff, 0xfe]);

        let err = Document::read(&path).unwrap_err();
        assert!(matches!(err, ConvertError::Decode { .. }));
        assert!(err.to_string().contains("bad.md"));
    }
}
