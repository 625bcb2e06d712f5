//! Images-to-PDF rendering: one A4 page per image, aspect-fit with margins.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::models::Orientation;
use crate::pdf::PdfError;

const PAGE_MARGIN: f32 = 20.0;
const JPEG_QUALITY: u8 = 85;

/// Render the uploaded images, in upload order, into a PDF at `out`.
pub fn render_images(
    image_paths: &[PathBuf],
    orientation: Orientation,
    out: &Path,
) -> Result<(), PdfError> {
    if image_paths.is_empty() {
        return Err(PdfError::Empty);
    }

    let (page_w, page_h) = orientation.page_dimensions();
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for (index, path) in image_paths.iter().enumerate() {
        let rgb = image::open(path)?.to_rgb8();
        let (px_w, px_h) = rgb.dimensions();

        // Re-encode as JPEG so the XObject can use DCTDecode regardless of
        // the upload format.
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut Cursor::new(&mut jpeg), JPEG_QUALITY)
            .encode_image(&rgb)?;

        let xobject_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => px_w as i64,
                "Height" => px_h as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        ));

        let (draw_w, draw_h) = fit_to_page(px_w as f32, px_h as f32, page_w, page_h);
        let offset_x = (page_w - draw_w) / 2.0;
        let offset_y = (page_h - draw_h) / 2.0;

        let name = format!("Im{index}");
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        draw_w.into(),
                        0.into(),
                        0.into(),
                        draw_h.into(),
                        offset_x.into(),
                        offset_y.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), page_w.into(), page_h.into()],
            "Resources" => dictionary! {
                "XObject" => dictionary! { name => xobject_id },
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
    doc.save(out)?;
    Ok(())
}

/// Scale an image into the page's usable area, preserving aspect ratio.
fn fit_to_page(img_w: f32, img_h: f32, page_w: f32, page_h: f32) -> (f32, f32) {
    let avail_w = page_w - 2.0 * PAGE_MARGIN;
    let avail_h = page_h - 2.0 * PAGE_MARGIN;
    let scale = (avail_w / img_w).min(avail_h / img_h);
    (img_w * scale, img_h * scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn fit_preserves_aspect_ratio() {
        let (w, h) = fit_to_page(1000.0, 500.0, 595.0, 842.0);
        assert!((w / h - 2.0).abs() < 0.01);
        assert!(w <= 595.0 - 2.0 * PAGE_MARGIN);
    }

    #[test]
    fn renders_one_page_per_image() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for n in 0..2 {
            let path = dir.path().join(format!("img{n}.png"));
            let img = RgbImage::from_pixel(32, 24, Rgb([200, 100, 50]));
            img.save(&path).unwrap();
            paths.push(path);
        }

        let out = dir.path().join("images.pdf");
        render_images(&paths, Orientation::Portrait, &out).unwrap();

        let doc = Document::load(&out).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn empty_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("none.pdf");
        assert!(matches!(
            render_images(&[], Orientation::Portrait, &out),
            Err(PdfError::Empty)
        ));
    }
}
