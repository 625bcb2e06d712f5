//! Page extraction for the split workflow.

use std::collections::HashSet;
use std::path::Path;

use lopdf::Document;

use crate::pdf::PdfError;

/// Number of pages in the document. Used to seed the quick-pick keyboard
/// before any extraction happens.
pub fn page_count(path: &Path) -> Result<u32, PdfError> {
    let doc = Document::load(path)?;
    Ok(doc.get_pages().len() as u32)
}

/// Extract `pages` (1-based, sorted, deduplicated) into a new PDF at `out`
/// by dropping everything else.
pub fn extract_pages(path: &Path, pages: &[u32], out: &Path) -> Result<(), PdfError> {
    if pages.is_empty() {
        return Err(PdfError::Empty);
    }

    let mut doc = Document::load(path)?;
    let total = doc.get_pages().len() as u32;
    let keep: HashSet<u32> = pages.iter().copied().collect();
    let delete: Vec<u32> = (1..=total).filter(|p| !keep.contains(p)).collect();

    if delete.len() as u32 == total {
        return Err(PdfError::Empty);
    }

    doc.delete_pages(&delete);
    doc.prune_objects();
    doc.compress();
    doc.save(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Font, PageSize, TextColor};
    use crate::pdf::text::render_text;

    fn multi_page_fixture(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("fixture.pdf");
        let text = (0..300)
            .map(|i| format!("fixture line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        render_text(&text, Font::Helvetica, TextColor::Black, PageSize::A4, &path).unwrap();
        path
    }

    #[test]
    fn reports_the_page_count() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = multi_page_fixture(dir.path());
        assert!(page_count(&fixture).unwrap() >= 2);
    }

    #[test]
    fn extracts_only_the_requested_pages() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = multi_page_fixture(dir.path());
        let total = page_count(&fixture).unwrap();
        assert!(total >= 2);

        let out = dir.path().join("extracted.pdf");
        extract_pages(&fixture, &[1, 2], &out).unwrap();
        assert_eq!(page_count(&out).unwrap(), 2);
    }

    #[test]
    fn empty_selection_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = multi_page_fixture(dir.path());
        let out = dir.path().join("none.pdf");
        assert!(matches!(
            extract_pages(&fixture, &[], &out),
            Err(PdfError::Empty)
        ));
    }
}
