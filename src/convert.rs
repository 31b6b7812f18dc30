//! Markdown to HTML and PDF conversion.

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use printpdf::{BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, Point, Pt, TextItem};
use pulldown_cmark::{html, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use tracing::{debug, warn};

use crate::error::ConvertError;

/// Output format of a rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArtifactFormat {
    Html,
    Pdf,
}

impl ArtifactFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ArtifactFormat::Html => "text/html",
            ArtifactFormat::Pdf => "application/pdf",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArtifactFormat::Html => "html",
            ArtifactFormat::Pdf => "pdf",
        }
    }

    /// Name used for the uploaded file when none is given.
    pub fn default_file_name(self) -> String {
        format!("output.{}", self.extension())
    }
}

/// A Markdown source file, read once.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    source: String,
}

impl Document {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConvertError> {
        let path = path.as_ref().to_path_buf();
        let bytes = fs::read(&path).map_err(|source| ConvertError::Read {
            path: path.clone(),
            source,
        })?;
        let source = String::from_utf8(bytes).map_err(|source| ConvertError::Decode {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, source })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn render(&self, format: ArtifactFormat) -> Artifact {
        let bytes = match format {
            ArtifactFormat::Html => render_html(&self.source).into_bytes(),
            ArtifactFormat::Pdf => render_pdf(&self.source),
        };
        debug!(path = %self.path.display(), ?format, len = bytes.len(), "rendered document");
        Artifact { format, bytes }
    }

    /// Path of the `.html` file written next to the source.
    pub fn sibling_html_path(&self) -> PathBuf {
        self.path.with_extension(ArtifactFormat::Html.extension())
    }

    /// Render to HTML and write it next to the source file.
    ///
    /// Fails without writing when the source itself has an `.html`
    /// extension.
    pub fn write_sibling_html(&self) -> Result<PathBuf, ConvertError> {
        let path = self.sibling_html_path();
        if path == self.path {
            return Err(ConvertError::SiblingIsSource(path));
        }
        fs::write(&path, render_html(&self.source)).map_err(|source| ConvertError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// Rendered output, held in memory until uploaded.
#[derive(Debug, Clone)]
pub struct Artifact {
    format: ArtifactFormat,
    bytes: Vec<u8>,
}

impl Artifact {
    pub fn format(&self) -> ArtifactFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_TASKLISTS
}

/// Convert Markdown to an HTML fragment.
pub fn render_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, markdown_options());
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

// A4, in points.
const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 56.7;
const BODY_SIZE: f32 = 11.0;
const CODE_SIZE: f32 = 9.5;

#[derive(Debug, Clone, Copy, PartialEq)]
enum BlockStyle {
    Heading(HeadingLevel),
    Body,
    Code,
}

impl BlockStyle {
    fn font(self) -> BuiltinFont {
        match self {
            BlockStyle::Heading(_) => BuiltinFont::HelveticaBold,
            BlockStyle::Body => BuiltinFont::Helvetica,
            BlockStyle::Code => BuiltinFont::Courier,
        }
    }

    fn size(self) -> f32 {
        match self {
            BlockStyle::Heading(HeadingLevel::H1) => 22.0,
            BlockStyle::Heading(HeadingLevel::H2) => 18.0,
            BlockStyle::Heading(HeadingLevel::H3) => 15.0,
            BlockStyle::Heading(_) => 13.0,
            BlockStyle::Body => BODY_SIZE,
            BlockStyle::Code => CODE_SIZE,
        }
    }

    /// Rough per-glyph advance. Courier is fixed at 0.6em; Helvetica
    /// averages a little over 0.5em for running text.
    fn char_width(self) -> f32 {
        match self {
            BlockStyle::Code => self.size() * 0.6,
            BlockStyle::Heading(_) => self.size() * 0.58,
            BlockStyle::Body => self.size() * 0.52,
        }
    }

    fn line_height(self) -> f32 {
        self.size() * 1.35
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Block {
    style: BlockStyle,
    text: String,
}

fn flush(current: &mut String, style: BlockStyle, blocks: &mut Vec<Block>) {
    let text = if style == BlockStyle::Code {
        current.trim_end_matches('\n').to_string()
    } else {
        current.trim_end().to_string()
    };
    if !text.trim_start().is_empty() {
        blocks.push(Block { style, text });
    }
    current.clear();
}

/// Flatten Markdown into styled text blocks.
fn collect_blocks(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current = String::new();
    let mut style = BlockStyle::Body;
    let mut list_depth = 0usize;
    let mut ordered: Vec<Option<u64>> = Vec::new();

    for event in Parser::new_ext(markdown, markdown_options()) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                flush(&mut current, style, &mut blocks);
                style = BlockStyle::Heading(level);
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                flush(&mut current, style, &mut blocks);
                if let CodeBlockKind::Fenced(lang) = kind {
                    debug!(lang = %lang, "code block");
                }
                style = BlockStyle::Code;
            }
            Event::Start(Tag::List(start)) => {
                flush(&mut current, style, &mut blocks);
                list_depth += 1;
                ordered.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                flush(&mut current, style, &mut blocks);
                list_depth = list_depth.saturating_sub(1);
                ordered.pop();
            }
            Event::Start(Tag::Item) => {
                flush(&mut current, style, &mut blocks);
                current.push_str(&"   ".repeat(list_depth.saturating_sub(1)));
                match ordered.last_mut() {
                    Some(Some(n)) => {
                        current.push_str(&format!("{}. ", n));
                        *n += 1;
                    }
                    _ => current.push_str("- "),
                }
            }
            Event::End(TagEnd::Heading(_))
            | Event::End(TagEnd::CodeBlock)
            | Event::End(TagEnd::Paragraph)
            | Event::End(TagEnd::Item)
            | Event::End(TagEnd::TableRow)
            | Event::End(TagEnd::TableHead) => {
                flush(&mut current, style, &mut blocks);
                style = BlockStyle::Body;
            }
            Event::Start(Tag::Paragraph) if list_depth == 0 => {
                flush(&mut current, style, &mut blocks);
            }
            Event::End(TagEnd::TableCell) => current.push_str("  |  "),
            Event::Text(text) | Event::Code(text) => current.push_str(&text),
            Event::SoftBreak => current.push(' '),
            Event::HardBreak => current.push('\n'),
            Event::TaskListMarker(done) => current.push_str(if done { "[x] " } else { "[ ] " }),
            Event::Rule => {
                flush(&mut current, style, &mut blocks);
                blocks.push(Block {
                    style: BlockStyle::Body,
                    text: "-".repeat(40),
                });
            }
            _ => {}
        }
    }
    flush(&mut current, style, &mut blocks);
    blocks
}

/// Break text into lines of at most `width` characters, on whitespace
/// where possible. Code keeps its own line structure.
fn wrap(text: &str, width: usize, preserve: bool) -> Vec<String> {
    let width = width.max(8);
    let mut lines = Vec::new();

    for raw in text.split('\n') {
        if preserve {
            let chars: Vec<char> = raw.chars().collect();
            if chars.is_empty() {
                lines.push(String::new());
            }
            for chunk in chars.chunks(width) {
                lines.push(chunk.iter().collect());
            }
            continue;
        }

        // Keep list nesting visible on the first line.
        let mut line = " ".repeat(raw.len() - raw.trim_start().len());
        for word in raw.split_whitespace() {
            let line_len = line.chars().count();
            let word_len = word.chars().count();
            if !line.trim_start().is_empty() && line_len + 1 + word_len > width {
                lines.push(std::mem::take(&mut line));
            }
            if !line.trim_start().is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(line);
    }
    lines
}

/// Lay out Markdown text on A4 pages using the PDF builtin fonts.
///
/// Builtin fonts only cover WinAnsi; characters outside it come out as
/// replacement glyphs.
pub fn render_pdf(markdown: &str) -> Vec<u8> {
    let usable_width = PAGE_WIDTH - 2.0 * MARGIN;
    let mut pages = Vec::new();
    let mut ops: Vec<Op> = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN;

    for block in collect_blocks(markdown) {
        let style = block.style;
        let chars_per_line = (usable_width / style.char_width()) as usize;
        let preserve = style == BlockStyle::Code;

        if let BlockStyle::Heading(_) = style {
            y -= style.size() * 0.5;
        }

        for line in wrap(&block.text, chars_per_line, preserve) {
            if y - style.line_height() < MARGIN {
                pages.push(PdfPage::new(
                    Mm(210.0),
                    Mm(297.0),
                    std::mem::take(&mut ops),
                ));
                y = PAGE_HEIGHT - MARGIN;
            }
            y -= style.line_height();

            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt(MARGIN),
                    y: Pt(y),
                },
            });
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(style.size()),
                font: style.font(),
            });
            ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(line)],
                font: style.font(),
            });
            ops.push(Op::EndTextSection);
        }

        y -= style.size() * 0.6;
    }

    pages.push(PdfPage::new(Mm(210.0), Mm(297.0), ops));

    let mut warnings = Vec::new();
    let bytes = PdfDocument::new("Document")
        .with_pages(pages)
        .save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        warn!(count = warnings.len(), "PDF writer reported warnings");
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_html_heading_and_paragraph() {
        let html = render_html("# Title\n\nBody text.");
        assert_eq!(html, "<h1>Title</h1>\n<p>Body text.</p>\n");
    }

    #[test]
    fn test_render_html_is_deterministic() {
        let source = "## List\n\n- one\n- two\n\n| a | b |\n|---|---|\n| 1 | 2 |\n";
        assert_eq!(render_html(source), render_html(source));
        assert!(render_html(source).contains("<table>"));
    }

    #[test]
    fn test_collect_blocks() {
        let blocks = collect_blocks("# Title\n\nBody\ntext.\n\n1. first\n2. second\n\n```\nfn main() {}\n```\n");
        assert_eq!(
            blocks,
            vec![
                Block {
                    style: BlockStyle::Heading(HeadingLevel::H1),
                    text: "Title".to_string()
                },
                Block {
                    style: BlockStyle::Body,
                    text: "Body text.".to_string()
                },
                Block {
                    style: BlockStyle::Body,
                    text: "1. first".to_string()
                },
                Block {
                    style: BlockStyle::Body,
                    text: "2. second".to_string()
                },
                Block {
                    style: BlockStyle::Code,
                    text: "fn main() {}".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_wrap_on_whitespace() {
        let lines = wrap("aaaa bbbb cccc dddd", 9, false);
        assert_eq!(lines, vec!["aaaa bbbb", "cccc dddd"]);
    }

    #[test]
    fn test_wrap_preserves_code_lines() {
        let lines = wrap("let x = 1;\n\nlet y = 2;", 80, true);
        assert_eq!(lines, vec!["let x = 1;", "", "let y = 2;"]);
    }

    #[test]
    fn test_format_properties() {
        assert_eq!(ArtifactFormat::Html.mime_type(), "text/html");
        assert_eq!(ArtifactFormat::Pdf.mime_type(), "application/pdf");
        assert_eq!(ArtifactFormat::Pdf.default_file_name(), "output.pdf");
    }
}
