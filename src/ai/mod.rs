//! AI document enhancement through the Groq chat-completions API.

pub mod config;

use std::path::Path;

use reqwest::Client;
use reqwest_middleware::ClientBuilder;
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use thiserror::Error;

use crate::ai::config::{ChatMessage, ChatRequest, ChatResponse};
use crate::convert::{self, DocKind};
use crate::pdf::ocr;

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const MODEL: &str = "llama3-8b-8192";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 2048;
const TOP_P: f32 = 0.9;
const RETRIES: u32 = 1;

/// Content shorter than this is rejected before any API call.
pub const MIN_CONTENT_CHARS: usize = 50;
/// Content beyond this is truncated to stay inside the model's context.
const MAX_CONTENT_CHARS: usize = 8000;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI analysis is not available: no API key is configured")]
    Unavailable,
    #[error("document content is too short for meaningful analysis")]
    TooShort,
    #[error("could not extract readable content: {0}")]
    Extraction(String),
    #[error("request error: {0}")]
    Request(#[from] reqwest_middleware::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("the model returned an empty response")]
    EmptyResponse,
}

/// File kinds accepted by the AI-enhance workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiDocKind {
    Pdf,
    Docx,
    Xlsx,
    Pptx,
    Image,
    Txt,
}

impl AiDocKind {
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_lowercase();
        let ext = lower.rsplit('.').next()?;
        match ext {
            "pdf" => Some(AiDocKind::Pdf),
            "docx" => Some(AiDocKind::Docx),
            "xlsx" => Some(AiDocKind::Xlsx),
            "pptx" => Some(AiDocKind::Pptx),
            "jpg" | "jpeg" | "png" | "gif" | "webp" => Some(AiDocKind::Image),
            "txt" => Some(AiDocKind::Txt),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AiDocKind::Pdf => "PDF document",
            AiDocKind::Docx => "Word document",
            AiDocKind::Xlsx => "Excel spreadsheet",
            AiDocKind::Pptx => "PowerPoint presentation",
            AiDocKind::Image => "image",
            AiDocKind::Txt => "text document",
        }
    }
}

/// Extract the text of an uploaded file, per kind.
pub async fn extract_content(path: &Path, kind: AiDocKind) -> Result<String, AiError> {
    match kind {
        AiDocKind::Pdf => {
            pdf_extract::extract_text(path).map_err(|e| AiError::Extraction(e.to_string()))
        }
        AiDocKind::Docx => convert::extract_text(path, DocKind::Docx)
            .map_err(|e| AiError::Extraction(e.to_string())),
        AiDocKind::Xlsx => convert::extract_text(path, DocKind::Xlsx)
            .map_err(|e| AiError::Extraction(e.to_string())),
        AiDocKind::Pptx => convert::extract_text(path, DocKind::Pptx)
            .map_err(|e| AiError::Extraction(e.to_string())),
        AiDocKind::Image => ocr::extract_image_text(path)
            .await
            .map_err(|e| AiError::Extraction(e.to_string())),
        AiDocKind::Txt => std::fs::read_to_string(path)
            .map_err(|e| AiError::Extraction(e.to_string())),
    }
}

/// Ask the model for an enhanced rendition of the document. The API key is
/// optional at the config level; a missing key surfaces as
/// [`AiError::Unavailable`] rather than a failed request.
pub async fn enhance(
    api_key: Option<&str>,
    content: &str,
    document_kind: &str,
) -> Result<String, AiError> {
    let api_key = api_key.ok_or(AiError::Unavailable)?;

    if content.trim().chars().count() < MIN_CONTENT_CHARS {
        return Err(AiError::TooShort);
    }

    let content = if content.chars().count() > MAX_CONTENT_CHARS {
        let truncated: String = content.chars().take(MAX_CONTENT_CHARS).collect();
        format!("{truncated}\n...[content truncated for analysis]")
    } else {
        content.to_string()
    };

    let prompt = format!(
        "You are an expert document enhancement specialist. Please provide an \
         enhanced, improved version of this {document_kind}.\n\n\
         ORIGINAL DOCUMENT:\n{content}\n\n\
         Please create an enhanced version that:\n\
         - Has better structure and organization\n\
         - Uses clearer, more professional language\n\
         - Improves formatting and readability\n\
         - Adds relevant headings and sections\n\
         - Enhances overall presentation\n\n\
         Provide your response in this format:\n\n\
         ENHANCED DOCUMENT:\n\
         [The complete improved version of the document]\n\n\
         IMPROVEMENTS MADE:\n\
         [3-5 key improvements, as a short list]"
    );

    let request = ChatRequest {
        model: MODEL.to_string(),
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: prompt,
        }],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
        top_p: TOP_P,
    };

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(RETRIES);
    let client = ClientBuilder::new(Client::new())
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();

    let response = client
        .post(GROQ_API_URL)
        .bearer_auth(api_key)
        .json(&request)
        .send()
        .await?
        .error_for_status()?;

    let response: ChatResponse = response.json().await?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(AiError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_degrades_to_unavailable() {
        let long_enough = "x".repeat(MIN_CONTENT_CHARS + 1);
        assert!(matches!(
            enhance(None, &long_enough, "text document").await,
            Err(AiError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn short_content_is_rejected_before_any_request() {
        assert!(matches!(
            enhance(Some("key"), "too short", "text document").await,
            Err(AiError::TooShort)
        ));
    }

    #[test]
    fn ai_kind_detection_covers_images_and_documents() {
        assert_eq!(AiDocKind::from_file_name("paper.pdf"), Some(AiDocKind::Pdf));
        assert_eq!(
            AiDocKind::from_file_name("photo.JPEG"),
            Some(AiDocKind::Image)
        );
        assert_eq!(AiDocKind::from_file_name("deck.pptx"), Some(AiDocKind::Pptx));
        assert_eq!(AiDocKind::from_file_name("archive.zip"), None);
    }
}
