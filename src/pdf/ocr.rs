//! OCR text extraction via the `tesseract` command-line tool, compiled into
//! a searchable text PDF.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::models::{Font, PageSize, TextColor};
use crate::pdf::{text, PdfError};

/// Run tesseract on one image and return the recognized text.
pub async fn extract_image_text(image_path: &Path) -> Result<String, PdfError> {
    let output = Command::new("tesseract")
        .arg(image_path)
        .arg("stdout")
        .output()
        .await
        .map_err(|e| PdfError::Tool(format!("failed to run tesseract: {e}")))?;

    if !output.status.success() {
        return Err(PdfError::Tool(format!(
            "tesseract exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// OCR every image in upload order and render the combined text as a PDF.
/// Images with no recognizable text are reported as such in the output; if
/// nothing at all is recognized the action fails.
pub async fn ocr_images_to_pdf(image_paths: &[PathBuf], out: &Path) -> Result<(), PdfError> {
    if image_paths.is_empty() {
        return Err(PdfError::Empty);
    }

    let mut sections = Vec::new();
    let mut recognized_any = false;
    for (index, path) in image_paths.iter().enumerate() {
        let extracted = extract_image_text(path).await?;
        sections.push(format!("Text from image {}:", index + 1));
        sections.push(String::new());
        if extracted.is_empty() {
            sections.push("(no text detected)".to_string());
        } else {
            recognized_any = true;
            sections.push(extracted);
        }
        sections.push(String::new());
    }

    if !recognized_any {
        return Err(PdfError::Tool(
            "no readable text found in the uploaded images".to_string(),
        ));
    }

    let combined = sections.join("\n");
    text::render_text(
        &combined,
        Font::Helvetica,
        TextColor::Black,
        PageSize::A4,
        out,
    )
}
