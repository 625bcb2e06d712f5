//! PDF concatenation in upload order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lopdf::{dictionary, Document, Object, ObjectId};

use crate::pdf::PdfError;

/// Merge the given PDFs, in order, into a single document at `out`.
pub fn merge_pdfs(pdf_paths: &[PathBuf], out: &Path) -> Result<(), PdfError> {
    if pdf_paths.len() < 2 {
        return Err(PdfError::Tool("need at least two documents".to_string()));
    }

    let mut max_id = 1;
    let mut documents_pages: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut documents_objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for path in pdf_paths {
        let mut doc = Document::load(path)?;
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for (_, object_id) in doc.get_pages() {
            let page = doc.get_object(object_id)?.to_owned();
            documents_pages.insert(object_id, page);
        }
        documents_objects.append(&mut doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    let mut catalog_id: Option<ObjectId> = None;
    let mut pages_id: Option<ObjectId> = None;
    let mut pages_dict = dictionary! {};

    // Carry every object over except the per-document catalogs and page
    // trees, which get rebuilt below.
    for (object_id, object) in documents_objects {
        let kind = object
            .as_dict()
            .ok()
            .and_then(|d| d.get(b"Type").ok())
            .and_then(|t| t.as_name().ok())
            .map(|n| n.to_vec());
        match kind.as_deref() {
            Some(b"Catalog") => {
                catalog_id.get_or_insert(object_id);
            }
            Some(b"Pages") => {
                if let Ok(dict) = object.as_dict() {
                    pages_dict.extend(dict);
                }
                pages_id.get_or_insert(object_id);
            }
            Some(b"Page") | Some(b"Outlines") | Some(b"Outline") => {}
            _ => {
                merged.objects.insert(object_id, object);
            }
        }
    }

    let pages_id = pages_id.ok_or(PdfError::Empty)?;
    let catalog_id = catalog_id.ok_or(PdfError::Empty)?;

    for (object_id, object) in &documents_pages {
        if let Ok(dict) = object.as_dict() {
            let mut dict = dict.clone();
            dict.set("Parent", pages_id);
            merged
                .objects
                .insert(*object_id, Object::Dictionary(dict));
        }
    }

    pages_dict.set("Type", "Pages");
    pages_dict.set("Count", documents_pages.len() as i64);
    pages_dict.set(
        "Kids",
        documents_pages
            .keys()
            .map(|id| Object::Reference(*id))
            .collect::<Vec<_>>(),
    );
    merged
        .objects
        .insert(pages_id, Object::Dictionary(pages_dict));

    merged.objects.insert(
        catalog_id,
        Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        }),
    );
    merged.trailer.set("Root", catalog_id);
    merged.max_id = merged.objects.len() as u32;
    merged.renumber_objects();
    merged.prune_objects();
    merged.compress();
    merged.save(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Font, PageSize, TextColor};
    use crate::pdf::text::render_text;

    #[test]
    fn merges_page_counts_in_order() {
        let dir = tempfile::tempdir().unwrap();

        let one = dir.path().join("one.pdf");
        render_text("first", Font::Helvetica, TextColor::Black, PageSize::A4, &one).unwrap();

        let two = dir.path().join("two.pdf");
        let long = (0..200).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        render_text(&long, Font::Helvetica, TextColor::Black, PageSize::A4, &two).unwrap();

        let pages_one = Document::load(&one).unwrap().get_pages().len();
        let pages_two = Document::load(&two).unwrap().get_pages().len();

        let out = dir.path().join("merged.pdf");
        merge_pdfs(&[one, two], &out).unwrap();

        let merged = Document::load(&out).unwrap();
        assert_eq!(merged.get_pages().len(), pages_one + pages_two);
    }

    #[test]
    fn refuses_fewer_than_two_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("one.pdf");
        render_text("only", Font::Helvetica, TextColor::Black, PageSize::A4, &one).unwrap();

        let out = dir.path().join("merged.pdf");
        assert!(merge_pdfs(&[one], &out).is_err());
    }
}
