use std::path::PathBuf;

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use uuid::Uuid;

use crate::ai::{self, AiDocKind, AiError};
use crate::cleanup;
use crate::config::BotConfig;
use crate::convert::{self, DocKind};
use crate::handlers::master;
use crate::handlers::utils::{
    download_to_temp, escape_markdown_v2, images_done_keyboard, menu_button, merge_done_keyboard,
    ocr_done_keyboard, send_failure, send_pdf_artifact, send_unrecognized, split_options_keyboard,
};
use crate::handlers::HandlerResult;
use crate::models::AdminState;
use crate::pdf::{self, encrypt::password_acceptable, pages::parse_page_numbers};
use crate::session::{FileRef, SessionStore, WorkflowState};

const MAX_MESSAGE_LEN: usize = 4000;

/// Free text and file uploads, routed by the chat's current workflow state.
pub async fn message_handler(
    bot: Bot,
    msg: Message,
    store: SessionStore,
    admin: AdminState,
    config: BotConfig,
) -> HandlerResult {
    let chat_id = msg.chat.id;

    // A slash text reaching this handler matched no known command; it must
    // not be consumed as workflow input (e.g. as a password).
    if msg.text().map(|t| t.starts_with('/')).unwrap_or(false) {
        return send_unrecognized(&bot, chat_id).await;
    }

    match store.get(chat_id).await {
        Some(WorkflowState::AwaitingMasterPassword) => {
            master::handle_master_password(&bot, &msg, &store, &admin).await
        }
        Some(WorkflowState::AwaitingBroadcastText) => {
            master::handle_broadcast_input(&bot, &msg, &store, &admin).await
        }
        Some(WorkflowState::AwaitingText) => handle_text_input(&bot, &msg, &store).await,
        Some(WorkflowState::AwaitingImages { images }) => {
            handle_image_upload(&bot, &msg, &store, images).await
        }
        Some(WorkflowState::AwaitingOcrImages { images }) => {
            handle_ocr_image_upload(&bot, &msg, &store, images).await
        }
        Some(WorkflowState::AwaitingDocument) => {
            handle_document_upload(&bot, &msg, &store, &config).await
        }
        Some(WorkflowState::AwaitingMergePdfs { pdfs }) => {
            handle_merge_upload(&bot, &msg, &store, pdfs).await
        }
        Some(WorkflowState::AwaitingSplitPdf) => {
            handle_split_upload(&bot, &msg, &store, &config).await
        }
        Some(WorkflowState::AwaitingSplitPages {
            pdf_path,
            page_count,
        }) => handle_split_pages_input(&bot, &msg, &store, &config, pdf_path, page_count).await,
        Some(WorkflowState::AwaitingProtectPdf) => {
            handle_protect_upload(&bot, &msg, &store).await
        }
        Some(WorkflowState::AwaitingPassword { pdf }) => {
            handle_password_input(&bot, &msg, &store, &config, pdf).await
        }
        Some(WorkflowState::AwaitingAiDocument) => {
            handle_ai_upload(&bot, &msg, &store, &config).await
        }
        // Button-driven steps ignore free text; no state means main menu.
        _ => send_unrecognized(&bot, chat_id).await,
    }
}

async fn handle_text_input(bot: &Bot, msg: &Message, store: &SessionStore) -> HandlerResult {
    let chat_id = msg.chat.id;
    let Some(text) = msg.text() else {
        bot.send_message(chat_id, "✍️ Please send plain text to convert\\.")
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        return Ok(());
    };

    store
        .set(
            chat_id,
            WorkflowState::ChoosingFont {
                text: text.to_string(),
            },
        )
        .await;
    bot.send_message(
        chat_id,
        "✅ *Text received\\!*\n\n👉 Now choose a font style:",
    )
    .parse_mode(ParseMode::MarkdownV2)
    .reply_markup(crate::handlers::utils::font_keyboard())
    .await?;
    Ok(())
}

async fn handle_image_upload(
    bot: &Bot,
    msg: &Message,
    store: &SessionStore,
    mut images: Vec<FileRef>,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) else {
        bot.send_message(chat_id, "❌ Please upload images \\(as photos\\)\\.")
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(images_done_keyboard())
            .await?;
        return Ok(());
    };

    images.push(FileRef::new(
        photo.file.id.clone(),
        format!("photo_{}.jpg", images.len() + 1),
    ));
    let count = images.len();
    store
        .set(chat_id, WorkflowState::AwaitingImages { images })
        .await;

    bot.send_message(
        chat_id,
        format!(
            "✅ *Image {count} received\\!*\n\n📸 Upload more images or press *✅ Done* to continue\\."
        ),
    )
    .parse_mode(ParseMode::MarkdownV2)
    .reply_markup(images_done_keyboard())
    .await?;
    Ok(())
}

async fn handle_ocr_image_upload(
    bot: &Bot,
    msg: &Message,
    store: &SessionStore,
    mut images: Vec<FileRef>,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) else {
        bot.send_message(
            chat_id,
            "❌ Please upload images only\\.\n📸 Photos with text content work best\\.",
        )
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(menu_button())
        .await?;
        return Ok(());
    };

    images.push(FileRef::new(
        photo.file.id.clone(),
        format!("scan_{}.jpg", images.len() + 1),
    ));
    let count = images.len();
    store
        .set(chat_id, WorkflowState::AwaitingOcrImages { images })
        .await;

    bot.send_message(
        chat_id,
        format!(
            "📸 *Image {count} received\\!*\n\n\
             Upload more images or press *✅ Process OCR* to extract the text\\."
        ),
    )
    .parse_mode(ParseMode::MarkdownV2)
    .reply_markup(ocr_done_keyboard())
    .await?;
    Ok(())
}

async fn handle_document_upload(
    bot: &Bot,
    msg: &Message,
    store: &SessionStore,
    config: &BotConfig,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let Some(document) = msg.document() else {
        bot.send_message(chat_id, "❌ Please upload a document file\\.")
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        return Ok(());
    };

    let file_name = document
        .file_name
        .clone()
        .unwrap_or_else(|| "document".to_string());
    let Some(kind) = DocKind::from_file_name(&file_name) else {
        // Rejection does not consume the step; the chat stays in state.
        bot.send_message(
            chat_id,
            "❌ *Unsupported file format\\!*\n\n\
             📋 Supported formats: docx, xlsx, pptx, html, txt",
        )
        .parse_mode(ParseMode::MarkdownV2)
        .await?;
        return Ok(());
    };

    bot.send_message(chat_id, "✅ *Document received\\!*\n\n🔄 Converting to PDF\\.\\.\\.")
        .parse_mode(ParseMode::MarkdownV2)
        .await?;

    let token = Uuid::new_v4();
    let ext = file_name.rsplit('.').next().unwrap_or("bin").to_lowercase();
    let input = config.temp_dir.join(format!("doc_{token}.{ext}"));
    let output = config.temp_dir.join(format!("doc_{token}.pdf"));

    store.clear(chat_id).await;

    let result = match download_to_temp(bot, &document.file.id, &input).await {
        Ok(()) => convert::convert_document(&input, kind, &output).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match result {
        Ok(()) => {
            let stem = file_name
                .rsplit_once('.')
                .map(|(stem, _)| stem)
                .unwrap_or(file_name.as_str());
            send_pdf_artifact(
                bot,
                chat_id,
                &output,
                &format!("{stem}.pdf"),
                format!(
                    "📂 *Your PDF is ready\\!*\n\n📄 Original: {}",
                    escape_markdown_v2(&file_name)
                ),
            )
            .await?;
        }
        Err(e) => {
            log::error!("chat {chat_id}: document conversion failed: {e}");
            send_failure(bot, chat_id, "converting document").await?;
        }
    }
    cleanup::remove_file_quiet(&input);
    cleanup::remove_file_quiet(&output);
    Ok(())
}

async fn handle_merge_upload(
    bot: &Bot,
    msg: &Message,
    store: &SessionStore,
    mut pdfs: Vec<FileRef>,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let Some(document) = msg.document() else {
        bot.send_message(chat_id, "❌ Please upload PDF files only\\!")
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        return Ok(());
    };

    let file_name = document.file_name.clone().unwrap_or_default();
    if !file_name.to_lowercase().ends_with(".pdf") {
        bot.send_message(chat_id, "❌ Please upload PDF files only\\!")
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        return Ok(());
    }

    pdfs.push(FileRef::new(document.file.id.clone(), file_name.clone()));
    let count = pdfs.len();
    store
        .set(chat_id, WorkflowState::AwaitingMergePdfs { pdfs })
        .await;

    bot.send_message(
        chat_id,
        format!(
            "✅ *PDF {count} received: {}*\n\n📄 Upload more PDFs or press *✅ Done* to merge them\\.",
            escape_markdown_v2(&file_name)
        ),
    )
    .parse_mode(ParseMode::MarkdownV2)
    .reply_markup(merge_done_keyboard())
    .await?;
    Ok(())
}

async fn handle_split_upload(
    bot: &Bot,
    msg: &Message,
    store: &SessionStore,
    config: &BotConfig,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let Some(document) = msg.document() else {
        bot.send_message(chat_id, "❌ Please upload a PDF file\\!")
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        return Ok(());
    };

    let file_name = document.file_name.clone().unwrap_or_default();
    if !file_name.to_lowercase().ends_with(".pdf") {
        bot.send_message(chat_id, "❌ Please upload a PDF file\\!")
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        return Ok(());
    }

    bot.send_message(chat_id, "✅ *PDF received\\!*\n\n🔄 Analyzing PDF\\.\\.\\.")
        .parse_mode(ParseMode::MarkdownV2)
        .await?;

    let input = config
        .temp_dir
        .join(format!("split_{}.pdf", Uuid::new_v4()));

    let analyzed = match download_to_temp(bot, &document.file.id, &input).await {
        Ok(()) => pdf::split::page_count(&input).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match analyzed {
        Ok(page_count) => {
            store
                .set(
                    chat_id,
                    WorkflowState::AwaitingSplitPages {
                        pdf_path: input,
                        page_count,
                    },
                )
                .await;
            bot.send_message(
                chat_id,
                format!(
                    "📄 *PDF Analysis Complete\\!*\n\n\
                     📊 Total pages: *{page_count}*\n\
                     📁 File: {}\n\n\
                     👉 Choose a quick option or enter a custom range:",
                    escape_markdown_v2(&file_name)
                ),
            )
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(split_options_keyboard(page_count))
            .await?;
        }
        Err(e) => {
            log::error!("chat {chat_id}: pdf analysis failed: {e}");
            cleanup::remove_file_quiet(&input);
            store.clear(chat_id).await;
            send_failure(bot, chat_id, "analyzing PDF").await?;
        }
    }
    Ok(())
}

async fn handle_split_pages_input(
    bot: &Bot,
    msg: &Message,
    store: &SessionStore,
    config: &BotConfig,
    pdf_path: PathBuf,
    page_count: u32,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let Some(text) = msg.text() else {
        bot.send_message(chat_id, "✍️ Please type the page numbers to extract\\.")
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        return Ok(());
    };

    let selection = text.trim();
    let pages = parse_page_numbers(selection, page_count);
    if pages.is_empty() {
        bot.send_message(
            chat_id,
            format!(
                "❌ *Invalid page numbers\\!*\n\n\
                 Enter pages between 1 and {page_count}\\.\n\n\
                 *Examples:*\n\
                 • `1-3` \\(pages 1 to 3\\)\n\
                 • `1,3,5` \\(pages 1, 3 and 5\\)\n\
                 • `2-4,6,8-10`"
            ),
        )
        .parse_mode(ParseMode::MarkdownV2)
        .await?;
        return Ok(());
    }

    run_split(bot, chat_id, store, config, pdf_path, pages, selection).await
}

/// Terminal split action, shared with the quick-pick buttons.
pub(crate) async fn run_split(
    bot: &Bot,
    chat_id: ChatId,
    store: &SessionStore,
    config: &BotConfig,
    pdf_path: PathBuf,
    pages: Vec<u32>,
    label: &str,
) -> HandlerResult {
    bot.send_message(
        chat_id,
        format!(
            "🔄 *Extracting pages {}\\.\\.\\.*",
            escape_markdown_v2(label)
        ),
    )
    .parse_mode(ParseMode::MarkdownV2)
    .await?;

    store.clear(chat_id).await;
    let output = config
        .temp_dir
        .join(format!("split_{}_out.pdf", Uuid::new_v4()));

    match pdf::split::extract_pages(&pdf_path, &pages, &output) {
        Ok(()) => {
            let file_label = label.replace(',', "_").replace('-', "_");
            send_pdf_artifact(
                bot,
                chat_id,
                &output,
                &format!("extracted_pages_{file_label}.pdf"),
                format!(
                    "📂 *Extracted PDF is ready\\!*\n\n\
                     📄 Pages: {}\n\
                     📊 Total extracted: {} pages",
                    escape_markdown_v2(label),
                    pages.len()
                ),
            )
            .await?;
        }
        Err(e) => {
            log::error!("chat {chat_id}: split failed: {e}");
            send_failure(bot, chat_id, "splitting PDF").await?;
        }
    }
    cleanup::remove_file_quiet(&pdf_path);
    cleanup::remove_file_quiet(&output);
    Ok(())
}

async fn handle_protect_upload(bot: &Bot, msg: &Message, store: &SessionStore) -> HandlerResult {
    let chat_id = msg.chat.id;
    let Some(document) = msg.document() else {
        bot.send_message(
            chat_id,
            "❌ Please upload a PDF file\\.\nI can only password\\-protect PDF files\\.",
        )
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(menu_button())
        .await?;
        return Ok(());
    };

    let file_name = document.file_name.clone().unwrap_or_default();
    if !file_name.to_lowercase().ends_with(".pdf") {
        bot.send_message(chat_id, "❌ Please upload a PDF file only\\.")
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(menu_button())
            .await?;
        return Ok(());
    }

    store
        .set(
            chat_id,
            WorkflowState::AwaitingPassword {
                pdf: FileRef::new(document.file.id.clone(), file_name.clone()),
            },
        )
        .await;

    bot.send_message(
        chat_id,
        format!(
            "✅ *PDF file received: {}*\n\n\
             🔒 Enter a secure password \\(at least 4 characters\\):",
            escape_markdown_v2(&file_name)
        ),
    )
    .parse_mode(ParseMode::MarkdownV2)
    .await?;
    Ok(())
}

async fn handle_password_input(
    bot: &Bot,
    msg: &Message,
    store: &SessionStore,
    config: &BotConfig,
    pdf: FileRef,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let Some(password) = msg.text() else {
        bot.send_message(chat_id, "💬 Please type your password\\.")
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        return Ok(());
    };
    let password = password.trim();

    if !password_acceptable(password) {
        // Re-prompt; the workflow step is not advanced.
        bot.send_message(
            chat_id,
            "❌ Password too short\\! Use at least 4 characters\\.\n\
             💬 Enter a stronger password:",
        )
        .parse_mode(ParseMode::MarkdownV2)
        .await?;
        return Ok(());
    }

    bot.send_message(
        chat_id,
        "🔄 *Processing your PDF\\.\\.\\.*\nAdding 128\\-bit password protection\\.\\.\\.",
    )
    .parse_mode(ParseMode::MarkdownV2)
    .await?;

    store.clear(chat_id).await;
    let token = Uuid::new_v4();
    let input = config.temp_dir.join(format!("protect_{token}.pdf"));
    let output = config.temp_dir.join(format!("protect_{token}_out.pdf"));

    let result = match download_to_temp(bot, &pdf.file_id, &input).await {
        Ok(()) => pdf::encrypt::encrypt_pdf(&input, password, &output)
            .await
            .map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match result {
        Ok(()) => {
            send_pdf_artifact(
                bot,
                chat_id,
                &output,
                &format!("protected_{}", pdf.file_name),
                format!(
                    "🔐 *PDF protected successfully\\!*\n\n\
                     🔒 Secured with 128\\-bit encryption\n\
                     📄 File: {}\n\
                     🔑 Use your password to open it",
                    escape_markdown_v2(&pdf.file_name)
                ),
            )
            .await?;
        }
        Err(e) => {
            log::error!("chat {chat_id}: password protection failed: {e}");
            send_failure(bot, chat_id, "protecting PDF").await?;
        }
    }
    cleanup::remove_file_quiet(&input);
    cleanup::remove_file_quiet(&output);
    Ok(())
}

async fn handle_ai_upload(
    bot: &Bot,
    msg: &Message,
    store: &SessionStore,
    config: &BotConfig,
) -> HandlerResult {
    let chat_id = msg.chat.id;

    let (file_id, file_name, kind) = if let Some(document) = msg.document() {
        let file_name = document
            .file_name
            .clone()
            .unwrap_or_else(|| "document".to_string());
        match AiDocKind::from_file_name(&file_name) {
            Some(kind) => (document.file.id.clone(), file_name, kind),
            None => {
                bot.send_message(
                    chat_id,
                    "❌ This file type is not supported for AI analysis\\.\n\
                     📄 Supported: PDF, DOCX, XLSX, PPTX, images, TXT",
                )
                .parse_mode(ParseMode::MarkdownV2)
                .reply_markup(menu_button())
                .await?;
                return Ok(());
            }
        }
    } else if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        (photo.file.id.clone(), "photo.jpg".to_string(), AiDocKind::Image)
    } else {
        bot.send_message(
            chat_id,
            "❌ Please upload a supported document file\\.\n\
             📄 Supported: PDF, DOCX, XLSX, PPTX, images, TXT",
        )
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(menu_button())
        .await?;
        return Ok(());
    };

    bot.send_message(
        chat_id,
        format!(
            "📄 *Document received:* {}\n\n🤖 Analyzing with AI\\.\\.\\.",
            escape_markdown_v2(&file_name)
        ),
    )
    .parse_mode(ParseMode::MarkdownV2)
    .await?;

    let ext = file_name.rsplit('.').next().unwrap_or("bin").to_lowercase();
    let input = config
        .temp_dir
        .join(format!("enhance_{}.{ext}", Uuid::new_v4()));

    if let Err(e) = download_to_temp(bot, &file_id, &input).await {
        log::error!("chat {chat_id}: ai download failed: {e}");
        store.clear(chat_id).await;
        send_failure(bot, chat_id, "downloading the document").await?;
        return Ok(());
    }

    let extracted = ai::extract_content(&input, kind).await;
    cleanup::remove_file_quiet(&input);

    let content = match extracted {
        Ok(content) => content,
        Err(e) => {
            // Extraction problems do not consume the step; the chat may try
            // another file.
            log::warn!("chat {chat_id}: ai extraction failed: {e}");
            bot.send_message(
                chat_id,
                "❌ Could not extract readable content from that file\\.\n\
                 Please try a different document\\.",
            )
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(menu_button())
            .await?;
            return Ok(());
        }
    };

    match ai::enhance(config.groq_api_key.as_deref(), &content, kind.label()).await {
        Ok(enhanced) => {
            store.clear(chat_id).await;
            let full = format!("🤖 AI Document Enhancement\n\n{enhanced}");
            let chunks = chunk_message(&full, MAX_MESSAGE_LEN);
            let last = chunks.len().saturating_sub(1);
            for (i, chunk) in chunks.into_iter().enumerate() {
                let request = bot.send_message(chat_id, chunk);
                if i == last {
                    request.reply_markup(menu_button()).await?;
                } else {
                    request.await?;
                }
            }
        }
        Err(AiError::TooShort) => {
            bot.send_message(
                chat_id,
                "❌ Document content is too short for meaningful analysis \
                 \\(need at least 50 characters\\)\\.\nTry a more detailed document\\.",
            )
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        }
        Err(AiError::Unavailable) => {
            store.clear(chat_id).await;
            bot.send_message(
                chat_id,
                "❌ *AI analysis is unavailable*\n\n\
                 🔑 No API key is configured\\. Please contact the bot administrator\\.",
            )
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(menu_button())
            .await?;
        }
        Err(e) => {
            log::error!("chat {chat_id}: ai analysis failed: {e}");
            store.clear(chat_id).await;
            send_failure(bot, chat_id, "running the AI analysis").await?;
        }
    }
    Ok(())
}

/// Split a long reply into Telegram-sized chunks on line boundaries.
pub(crate) fn chunk_message(text: &str, max_len: usize) -> Vec<String> {
    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    for line in text.split('\n') {
        let line_len = line.chars().count() + 1;
        if current_len > 0 && current_len + line_len > max_len {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > max_len {
            // A single oversized line is hard-split.
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_len) {
                if current_len > 0 {
                    chunks.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                current = piece.iter().collect();
                current_len = current.chars().count();
            }
            current.push('\n');
            current_len += 1;
            continue;
        }
        current.push_str(line);
        current.push('\n');
        current_len += line_len;
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_messages_are_not_chunked() {
        assert_eq!(chunk_message("hello", 100), vec!["hello"]);
    }

    #[test]
    fn long_messages_split_on_line_boundaries() {
        let text = (0..100)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = chunk_message(&text, 80);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 81);
        }
        let rejoined: String = chunks.concat();
        assert!(rejoined.contains("line 0"));
        assert!(rejoined.contains("line 99"));
    }
}
