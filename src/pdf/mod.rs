pub mod encrypt;
pub mod images;
pub mod merge;
pub mod ocr;
pub mod pages;
pub mod split;
pub mod text;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("pdf parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("{0}")]
    Tool(String),
    #[error("document contains no pages")]
    Empty,
}
