//! Text-to-PDF rendering on top of lopdf primitives.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::models::{Font, PageSize, TextColor};
use crate::pdf::PdfError;

const FONT_SIZE: f32 = 12.0;
const LEADING: f32 = 14.0;
const MARGIN: f32 = 72.0;
// Conservative average glyph width as a fraction of the font size.
const GLYPH_WIDTH_FACTOR: f32 = 0.6;

/// Render `text` into a styled PDF at `out`. Paragraphs are split on
/// newlines, wrapped to the usable page width, and paginated.
pub fn render_text(
    text: &str,
    font: Font,
    color: TextColor,
    size: PageSize,
    out: &Path,
) -> Result<(), PdfError> {
    let (width, height) = size.dimensions();
    let lines = layout_lines(text, width);
    render_lines(&lines, font, color, width, height, out)
}

/// Shared with the OCR workflow, which always renders A4/Helvetica/black.
pub(crate) fn render_lines(
    lines: &[String],
    font: Font,
    color: TextColor,
    width: f32,
    height: f32,
    out: &Path,
) -> Result<(), PdfError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_name(),
    });

    let lines_per_page = (((height - 2.0 * MARGIN) / LEADING) as usize).max(1);
    let chunks: Vec<&[String]> = if lines.is_empty() {
        vec![&lines[..]]
    } else {
        lines.chunks(lines_per_page).collect()
    };

    let (r, g, b) = color.rgb();
    let mut kids = Vec::new();
    for chunk in chunks {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
            Operation::new("TL", vec![LEADING.into()]),
            Operation::new(
                "Td",
                vec![MARGIN.into(), (height - MARGIN - FONT_SIZE).into()],
            ),
        ];
        for (i, line) in chunk.iter().enumerate() {
            if i > 0 {
                operations.push(Operation::new("T*", vec![]));
            }
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(line.as_str())],
            ));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    doc.save(out)?;
    Ok(())
}

/// Split paragraphs on newlines and wrap each to the usable width. Blank
/// source lines survive as paragraph separators.
fn layout_lines(text: &str, page_width: f32) -> Vec<String> {
    let usable = page_width - 2.0 * MARGIN;
    let max_chars = ((usable / (FONT_SIZE * GLYPH_WIDTH_FACTOR)) as usize).max(8);

    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let paragraph = paragraph.trim_end();
        if paragraph.is_empty() {
            lines.push(String::new());
            continue;
        }
        lines.extend(wrap_paragraph(paragraph, max_chars));
    }
    lines
}

fn wrap_paragraph(paragraph: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in paragraph.split_whitespace() {
        let word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len > max_chars {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if word_len > max_chars {
            // Hard-split words longer than a full line.
            for piece in chunk_chars(word, max_chars) {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                current = piece;
                current_len = current.chars().count();
                if current_len == max_chars {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
            }
            continue;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn chunk_chars(word: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(max_chars)
        .map(|c| c.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Document;

    #[test]
    fn wraps_long_paragraphs() {
        let lines = wrap_paragraph("one two three four five", 9);
        assert_eq!(lines, vec!["one two", "three", "four five"]);
    }

    #[test]
    fn hard_splits_oversized_words() {
        let lines = wrap_paragraph("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn renders_a_loadable_single_page_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("text.pdf");
        render_text(
            "Hello from the test suite.",
            Font::Helvetica,
            TextColor::Black,
            PageSize::A4,
            &out,
        )
        .unwrap();

        let doc = Document::load(&out).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn paginates_when_text_exceeds_one_page() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("long.pdf");
        let text = (0..200)
            .map(|i| format!("line number {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        render_text(&text, Font::Courier, TextColor::Blue, PageSize::A4, &out).unwrap();

        let doc = Document::load(&out).unwrap();
        assert!(doc.get_pages().len() > 1);
    }
}
