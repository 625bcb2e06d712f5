//! Office/HTML/plain-text to PDF conversion.
//!
//! The office formats are zip archives of XML; extraction walks the text
//! nodes of the relevant parts and the result is re-rendered through the
//! text PDF engine, mirroring the bot's "extract then restyle" conversion
//! model.

use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use thiserror::Error;

use crate::models::{Font, PageSize, TextColor};
use crate::pdf::{self, PdfError};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("no readable text in document")]
    EmptyDocument,
    #[error(transparent)]
    Pdf(#[from] PdfError),
}

/// The fixed set of accepted upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    Docx,
    Xlsx,
    Pptx,
    Html,
    Txt,
}

impl DocKind {
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_lowercase();
        let ext = lower.rsplit('.').next()?;
        match ext {
            "docx" => Some(DocKind::Docx),
            "xlsx" => Some(DocKind::Xlsx),
            "pptx" => Some(DocKind::Pptx),
            "html" | "htm" => Some(DocKind::Html),
            "txt" => Some(DocKind::Txt),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocKind::Docx => "Word document",
            DocKind::Xlsx => "Excel spreadsheet",
            DocKind::Pptx => "PowerPoint presentation",
            DocKind::Html => "HTML file",
            DocKind::Txt => "text file",
        }
    }
}

/// Convert the uploaded document into a PDF at `out`.
pub fn convert_document(path: &Path, kind: DocKind, out: &Path) -> Result<(), ConvertError> {
    let text = extract_text(path, kind)?;
    if text.trim().is_empty() {
        return Err(ConvertError::EmptyDocument);
    }
    pdf::text::render_text(&text, Font::Helvetica, TextColor::Black, PageSize::A4, out)?;
    Ok(())
}

/// Extract the plain text of a document. Also used by the AI-enhance
/// workflow for the office kinds.
pub fn extract_text(path: &Path, kind: DocKind) -> Result<String, ConvertError> {
    match kind {
        DocKind::Docx => {
            let xml = read_archive_entry(path, "word/document.xml")?;
            collect_xml_text(&xml, b"w:t", b"w:p")
        }
        DocKind::Xlsx => {
            let xml = read_archive_entry(path, "xl/sharedStrings.xml")?;
            collect_xml_text(&xml, b"t", b"si")
        }
        DocKind::Pptx => {
            let mut slides = Vec::new();
            for xml in read_slide_entries(path)? {
                slides.push(collect_xml_text(&xml, b"a:t", b"a:p")?);
            }
            Ok(slides.join("\n\n"))
        }
        DocKind::Html => {
            let html = std::fs::read_to_string(path)?;
            Ok(strip_html(&html))
        }
        DocKind::Txt => Ok(std::fs::read_to_string(path)?),
    }
}

fn read_archive_entry(path: &Path, entry: &str) -> Result<String, ConvertError> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut part = archive.by_name(entry)?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Slide parts of a pptx, in slide order.
fn read_slide_entries(path: &Path) -> Result<Vec<String>, ConvertError> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut names: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse::<u32>()
                .ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    names.sort();

    let mut slides = Vec::new();
    for (_, name) in names {
        let mut part = archive.by_name(&name)?;
        let mut xml = String::new();
        part.read_to_string(&mut xml)?;
        slides.push(xml);
    }
    Ok(slides)
}

/// Collect the character data of every `text_tag` element, inserting a line
/// break at the end of each `break_tag` element.
fn collect_xml_text(xml: &str, text_tag: &[u8], break_tag: &[u8]) -> Result<String, ConvertError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == text_tag => in_text = true,
            Event::End(e) => {
                let name = e.name();
                if name.as_ref() == text_tag {
                    in_text = false;
                } else if name.as_ref() == break_tag {
                    out.push('\n');
                }
            }
            Event::Text(t) if in_text => {
                out.push_str(&decode_entities(&String::from_utf8_lossy(t.as_ref())));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

fn script_style_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<(script|style)\b.*?</(script|style)>").unwrap())
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").unwrap())
}

/// Plain-text rendition of an HTML page: script/style bodies dropped, tags
/// stripped, entities decoded, runs of blank lines collapsed.
fn strip_html(html: &str) -> String {
    let without_scripts = script_style_re().replace_all(html, "");
    let without_tags = tag_re().replace_all(&without_scripts, "\n");
    let decoded = decode_entities(&without_tags);

    let mut out = String::new();
    let mut blank_run = 0;
    for line in decoded.lines() {
        let line = line.trim();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_archive(path: &Path, entries: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn kind_is_detected_from_the_file_name() {
        assert_eq!(DocKind::from_file_name("Report.DOCX"), Some(DocKind::Docx));
        assert_eq!(DocKind::from_file_name("page.htm"), Some(DocKind::Html));
        assert_eq!(DocKind::from_file_name("notes.txt"), Some(DocKind::Txt));
        assert_eq!(DocKind::from_file_name("archive.rar"), None);
        assert_eq!(DocKind::from_file_name("no_extension"), None);
    }

    #[test]
    fn extracts_docx_paragraphs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.docx");
        write_archive(
            &path,
            &[(
                "word/document.xml",
                r#"<?xml version="1.0"?><w:document><w:body>
                    <w:p><w:r><w:t>First paragraph</w:t></w:r></w:p>
                    <w:p><w:r><w:t>Second &amp; last</w:t></w:r></w:p>
                </w:body></w:document>"#,
            )],
        );

        let text = extract_text(&path, DocKind::Docx).unwrap();
        assert_eq!(text.trim(), "First paragraph\nSecond & last");
    }

    #[test]
    fn extracts_xlsx_shared_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.xlsx");
        write_archive(
            &path,
            &[(
                "xl/sharedStrings.xml",
                r#"<?xml version="1.0"?><sst>
                    <si><t>Revenue</t></si>
                    <si><t>Costs</t></si>
                </sst>"#,
            )],
        );

        let text = extract_text(&path, DocKind::Xlsx).unwrap();
        assert_eq!(text.trim(), "Revenue\nCosts");
    }

    #[test]
    fn strips_html_to_visible_text() {
        let html = r#"<html><head><style>body { color: red; }</style></head>
            <body><h1>Title</h1><script>alert("hi")</script>
            <p>Some &amp; text</p></body></html>"#;
        let text = strip_html(html);
        assert!(text.contains("Title"));
        assert!(text.contains("Some & text"));
        assert!(!text.contains("alert"));
        assert!(!text.contains("color: red"));
    }

    #[test]
    fn converts_a_txt_file_to_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        std::fs::write(&input, "A few notes\nacross two lines").unwrap();

        let out = dir.path().join("notes.pdf");
        convert_document(&input, DocKind::Txt, &out).unwrap();
        assert_eq!(crate::pdf::split::page_count(&out).unwrap(), 1);
    }

    #[test]
    fn empty_documents_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.txt");
        std::fs::write(&input, "   \n  ").unwrap();

        let out = dir.path().join("empty.pdf");
        assert!(matches!(
            convert_document(&input, DocKind::Txt, &out),
            Err(ConvertError::EmptyDocument)
        ));
    }
}
