use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode};
use uuid::Uuid;

use crate::cleanup;
use crate::config::BotConfig;
use crate::handlers::commands::{
    DOC_PROMPT, ENHANCE_PROMPT, HELP_TEXT, IMG_PROMPT, MERGE_PROMPT, OCR_PROMPT, PROTECT_PROMPT,
    SPLIT_PROMPT, TXT_PROMPT, WELCOME_TEXT,
};
use crate::handlers::master::{self, MasterAction};
use crate::handlers::messages::run_split;
use crate::handlers::utils::{
    color_keyboard, discard_displaced, download_to_temp, main_menu_keyboard, menu_button,
    orientation_keyboard, send_failure, send_pdf_artifact, size_keyboard,
};
use crate::handlers::HandlerResult;
use crate::models::{AdminState, Font, Orientation, PageSize, TextColor};
use crate::pdf::{self, pages::parse_page_numbers};
use crate::session::{FileRef, SessionStore, WorkflowState};

/// Closed set of inline-button identifiers. Unknown callback data is logged
/// and dropped; adding a workflow means adding a variant here and handling
/// it exhaustively below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    MainMenu,
    Help,
    StartTextPdf,
    StartImagePdf,
    StartOcrPdf,
    StartDocPdf,
    StartMerge,
    StartSplit,
    StartProtect,
    StartEnhance,
    ImagesDone,
    OcrDone,
    MergeDone,
    FontChoice(Font),
    ColorChoice(TextColor),
    SizeChoice(PageSize),
    OrientationChoice(Orientation),
    QuickSplit(String),
    CustomSplit,
    Master(MasterAction),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "start" => return Some(CallbackAction::MainMenu),
            "help" => return Some(CallbackAction::Help),
            "txt2pdf" => return Some(CallbackAction::StartTextPdf),
            "img2pdf" => return Some(CallbackAction::StartImagePdf),
            "ocr2pdf" => return Some(CallbackAction::StartOcrPdf),
            "doc2pdf" => return Some(CallbackAction::StartDocPdf),
            "mergepdf" => return Some(CallbackAction::StartMerge),
            "splitpdf" => return Some(CallbackAction::StartSplit),
            "protect" => return Some(CallbackAction::StartProtect),
            "enhance" => return Some(CallbackAction::StartEnhance),
            "img_done" => return Some(CallbackAction::ImagesDone),
            "ocr_done" => return Some(CallbackAction::OcrDone),
            "merge_done" => return Some(CallbackAction::MergeDone),
            "custom_split" => return Some(CallbackAction::CustomSplit),
            _ => {}
        }

        if let Some(token) = data.strip_prefix("font_") {
            return Font::from_token(token).map(CallbackAction::FontChoice);
        }
        if let Some(token) = data.strip_prefix("color_") {
            return TextColor::from_token(token).map(CallbackAction::ColorChoice);
        }
        if let Some(token) = data.strip_prefix("size_") {
            return PageSize::from_token(token).map(CallbackAction::SizeChoice);
        }
        if let Some(token) = data.strip_prefix("orient_") {
            return Orientation::from_token(token).map(CallbackAction::OrientationChoice);
        }
        if let Some(range) = data.strip_prefix("quick_split_") {
            return Some(CallbackAction::QuickSplit(range.to_string()));
        }
        if let Some(token) = data.strip_prefix("master_") {
            return MasterAction::from_token(token).map(CallbackAction::Master);
        }
        None
    }

    /// Inverse of [`parse`]; the keyboards emit exactly these strings.
    pub fn data(&self) -> String {
        match self {
            CallbackAction::MainMenu => "start".to_string(),
            CallbackAction::Help => "help".to_string(),
            CallbackAction::StartTextPdf => "txt2pdf".to_string(),
            CallbackAction::StartImagePdf => "img2pdf".to_string(),
            CallbackAction::StartOcrPdf => "ocr2pdf".to_string(),
            CallbackAction::StartDocPdf => "doc2pdf".to_string(),
            CallbackAction::StartMerge => "mergepdf".to_string(),
            CallbackAction::StartSplit => "splitpdf".to_string(),
            CallbackAction::StartProtect => "protect".to_string(),
            CallbackAction::StartEnhance => "enhance".to_string(),
            CallbackAction::ImagesDone => "img_done".to_string(),
            CallbackAction::OcrDone => "ocr_done".to_string(),
            CallbackAction::MergeDone => "merge_done".to_string(),
            CallbackAction::FontChoice(font) => format!("font_{}", font.token()),
            CallbackAction::ColorChoice(color) => format!("color_{}", color.token()),
            CallbackAction::SizeChoice(size) => format!("size_{}", size.token()),
            CallbackAction::OrientationChoice(o) => format!("orient_{}", o.token()),
            CallbackAction::QuickSplit(range) => format!("quick_split_{range}"),
            CallbackAction::CustomSplit => "custom_split".to_string(),
            CallbackAction::Master(action) => format!("master_{}", action.token()),
        }
    }
}

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    store: SessionStore,
    admin: AdminState,
    config: BotConfig,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();

    let Some(action) = CallbackAction::parse(data) else {
        log::warn!("chat {chat_id}: unknown callback data {data:?}");
        return Ok(());
    };

    match action {
        CallbackAction::MainMenu => {
            bot.edit_message_text(chat_id, message_id, WELCOME_TEXT)
                .parse_mode(ParseMode::MarkdownV2)
                .reply_markup(main_menu_keyboard())
                .await?;
        }
        CallbackAction::Help => {
            bot.edit_message_text(chat_id, message_id, HELP_TEXT)
                .parse_mode(ParseMode::MarkdownV2)
                .reply_markup(menu_button())
                .await?;
        }
        CallbackAction::StartTextPdf => {
            discard_displaced(store.set(chat_id, WorkflowState::AwaitingText).await);
            bot.edit_message_text(chat_id, message_id, TXT_PROMPT)
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        }
        CallbackAction::StartImagePdf => {
            discard_displaced(
                store
                    .set(chat_id, WorkflowState::AwaitingImages { images: vec![] })
                    .await,
            );
            bot.edit_message_text(chat_id, message_id, IMG_PROMPT)
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        }
        CallbackAction::StartOcrPdf => {
            discard_displaced(
                store
                    .set(chat_id, WorkflowState::AwaitingOcrImages { images: vec![] })
                    .await,
            );
            bot.edit_message_text(chat_id, message_id, OCR_PROMPT)
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        }
        CallbackAction::StartDocPdf => {
            discard_displaced(store.set(chat_id, WorkflowState::AwaitingDocument).await);
            bot.edit_message_text(chat_id, message_id, DOC_PROMPT)
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        }
        CallbackAction::StartMerge => {
            discard_displaced(
                store
                    .set(chat_id, WorkflowState::AwaitingMergePdfs { pdfs: vec![] })
                    .await,
            );
            bot.edit_message_text(chat_id, message_id, MERGE_PROMPT)
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        }
        CallbackAction::StartSplit => {
            discard_displaced(store.set(chat_id, WorkflowState::AwaitingSplitPdf).await);
            bot.edit_message_text(chat_id, message_id, SPLIT_PROMPT)
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        }
        CallbackAction::StartProtect => {
            discard_displaced(store.set(chat_id, WorkflowState::AwaitingProtectPdf).await);
            bot.edit_message_text(chat_id, message_id, PROTECT_PROMPT)
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        }
        CallbackAction::StartEnhance => {
            discard_displaced(store.set(chat_id, WorkflowState::AwaitingAiDocument).await);
            bot.edit_message_text(chat_id, message_id, ENHANCE_PROMPT)
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        }
        CallbackAction::FontChoice(font) => {
            handle_font_choice(&bot, chat_id, message_id, &store, font).await?;
        }
        CallbackAction::ColorChoice(color) => {
            handle_color_choice(&bot, chat_id, message_id, &store, color).await?;
        }
        CallbackAction::SizeChoice(size) => {
            handle_size_choice(&bot, chat_id, message_id, &store, &config, size).await?;
        }
        CallbackAction::ImagesDone => {
            handle_images_done(&bot, chat_id, message_id, &store).await?;
        }
        CallbackAction::OrientationChoice(orientation) => {
            handle_orientation_choice(&bot, chat_id, message_id, &store, &config, orientation)
                .await?;
        }
        CallbackAction::OcrDone => {
            handle_ocr_done(&bot, chat_id, message_id, &store, &config).await?;
        }
        CallbackAction::MergeDone => {
            handle_merge_done(&bot, chat_id, message_id, &store, &config).await?;
        }
        CallbackAction::QuickSplit(range) => {
            handle_quick_split(&bot, chat_id, &store, &config, &range).await?;
        }
        CallbackAction::CustomSplit => {
            handle_custom_split(&bot, chat_id, message_id, &store).await?;
        }
        CallbackAction::Master(action) => {
            master::handle_master_callback(&bot, chat_id, message_id, &store, &admin, &config, action)
                .await?;
        }
    }
    Ok(())
}

/// Required accumulated data is gone; report and terminate the session.
async fn expired_session(bot: &Bot, chat_id: ChatId, store: &SessionStore) -> HandlerResult {
    discard_displaced(store.clear(chat_id).await);
    bot.send_message(
        chat_id,
        "⚠️ *Session expired\\!*\n\nPlease start again from the menu\\.",
    )
    .parse_mode(ParseMode::MarkdownV2)
    .reply_markup(menu_button())
    .await?;
    Ok(())
}

async fn handle_font_choice(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    store: &SessionStore,
    font: Font,
) -> HandlerResult {
    match store.get(chat_id).await {
        Some(WorkflowState::ChoosingFont { text }) => {
            store
                .set(chat_id, WorkflowState::ChoosingColor { text, font })
                .await;
            bot.edit_message_text(
                chat_id,
                message_id,
                format!(
                    "✅ *Font selected: {}*\n\n👉 Now choose text color:",
                    font.label()
                ),
            )
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(color_keyboard())
            .await?;
            Ok(())
        }
        _ => expired_session(bot, chat_id, store).await,
    }
}

async fn handle_color_choice(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    store: &SessionStore,
    color: TextColor,
) -> HandlerResult {
    match store.get(chat_id).await {
        Some(WorkflowState::ChoosingColor { text, font }) => {
            store
                .set(chat_id, WorkflowState::ChoosingSize { text, font, color })
                .await;
            bot.edit_message_text(
                chat_id,
                message_id,
                format!(
                    "✅ *Color selected: {}*\n\n👉 Choose page size:",
                    color.label()
                ),
            )
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(size_keyboard())
            .await?;
            Ok(())
        }
        _ => expired_session(bot, chat_id, store).await,
    }
}

async fn handle_size_choice(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    store: &SessionStore,
    config: &BotConfig,
    size: PageSize,
) -> HandlerResult {
    let Some(WorkflowState::ChoosingSize { text, font, color }) = store.take(chat_id).await else {
        return expired_session(bot, chat_id, store).await;
    };

    bot.edit_message_text(chat_id, message_id, "🔄 *Generating your PDF\\.\\.\\.*")
        .parse_mode(ParseMode::MarkdownV2)
        .await?;

    let output = config
        .temp_dir
        .join(format!("text_{}.pdf", Uuid::new_v4()));
    match pdf::text::render_text(&text, font, color, size, &output) {
        Ok(()) => {
            send_pdf_artifact(
                bot,
                chat_id,
                &output,
                "converted_text.pdf",
                format!(
                    "📂 *Your PDF is ready\\!*\n\n\
                     📝 Font: {}\n\
                     🎨 Color: {}\n\
                     📄 Size: {}",
                    font.label(),
                    color.label(),
                    size.label()
                ),
            )
            .await?;
        }
        Err(e) => {
            log::error!("chat {chat_id}: text render failed: {e}");
            send_failure(bot, chat_id, "creating PDF").await?;
        }
    }
    cleanup::remove_file_quiet(&output);
    Ok(())
}

async fn handle_images_done(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    store: &SessionStore,
) -> HandlerResult {
    match store.get(chat_id).await {
        Some(WorkflowState::AwaitingImages { images }) if images.is_empty() => {
            // Stays in state; the chat can keep uploading.
            bot.edit_message_text(
                chat_id,
                message_id,
                "❌ *No images found\\!*\n\nPlease upload at least one image first\\.",
            )
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
            Ok(())
        }
        Some(WorkflowState::AwaitingImages { images }) => {
            let count = images.len();
            store
                .set(chat_id, WorkflowState::ChoosingOrientation { images })
                .await;
            bot.edit_message_text(
                chat_id,
                message_id,
                format!("✅ *{count} image\\(s\\) ready\\!*\n\n👉 Choose page orientation:"),
            )
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(orientation_keyboard())
            .await?;
            Ok(())
        }
        _ => expired_session(bot, chat_id, store).await,
    }
}

async fn handle_orientation_choice(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    store: &SessionStore,
    config: &BotConfig,
    orientation: Orientation,
) -> HandlerResult {
    let Some(WorkflowState::ChoosingOrientation { images }) = store.take(chat_id).await else {
        return expired_session(bot, chat_id, store).await;
    };

    bot.edit_message_text(
        chat_id,
        message_id,
        "🔄 *Creating PDF from images\\.\\.\\.*\nPlease wait while I process your images\\.\\.\\.",
    )
    .parse_mode(ParseMode::MarkdownV2)
    .await?;

    let (paths, output) = match download_batch(bot, chat_id, config, &images, "img").await {
        Ok(paths) => {
            let output = config
                .temp_dir
                .join(format!("img_{}_out.pdf", Uuid::new_v4()));
            (paths, output)
        }
        Err(paths) => {
            for path in &paths {
                cleanup::remove_file_quiet(path);
            }
            send_failure(bot, chat_id, "downloading images").await?;
            return Ok(());
        }
    };

    match pdf::images::render_images(&paths, orientation, &output) {
        Ok(()) => {
            send_pdf_artifact(
                bot,
                chat_id,
                &output,
                "images_to_pdf.pdf",
                format!(
                    "📂 *Your PDF is ready\\!*\n\n\
                     📸 Images: {}\n\
                     📄 Orientation: {}",
                    images.len(),
                    orientation.label()
                ),
            )
            .await?;
        }
        Err(e) => {
            log::error!("chat {chat_id}: image render failed: {e}");
            send_failure(bot, chat_id, "creating PDF").await?;
        }
    }
    for path in &paths {
        cleanup::remove_file_quiet(path);
    }
    cleanup::remove_file_quiet(&output);
    Ok(())
}

async fn handle_ocr_done(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    store: &SessionStore,
    config: &BotConfig,
) -> HandlerResult {
    match store.get(chat_id).await {
        Some(WorkflowState::AwaitingOcrImages { images }) if images.is_empty() => {
            bot.edit_message_text(
                chat_id,
                message_id,
                "❌ No images found\\! Please upload images first\\.",
            )
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
            return Ok(());
        }
        Some(WorkflowState::AwaitingOcrImages { images }) => {
            store.clear(chat_id).await;

            bot.edit_message_text(
                chat_id,
                message_id,
                format!(
                    "🔄 *Processing {} image\\(s\\)\\.\\.\\.*\n\
                     Extracting text and building a searchable PDF\\.\\.\\.",
                    images.len()
                ),
            )
            .parse_mode(ParseMode::MarkdownV2)
            .await?;

            let paths = match download_batch(bot, chat_id, config, &images, "ocr").await {
                Ok(paths) => paths,
                Err(paths) => {
                    for path in &paths {
                        cleanup::remove_file_quiet(path);
                    }
                    send_failure(bot, chat_id, "downloading images").await?;
                    return Ok(());
                }
            };

            let output = config
                .temp_dir
                .join(format!("ocr_{}_out.pdf", Uuid::new_v4()));
            match pdf::ocr::ocr_images_to_pdf(&paths, &output).await {
                Ok(()) => {
                    send_pdf_artifact(
                        bot,
                        chat_id,
                        &output,
                        "ocr_extracted.pdf",
                        format!(
                            "🔍 *OCR extraction complete\\!*\n\n\
                             📸 Processed {} image\\(s\\)\n\
                             📄 The text is compiled into a searchable PDF",
                            images.len()
                        ),
                    )
                    .await?;
                }
                Err(e) => {
                    log::error!("chat {chat_id}: ocr failed: {e}");
                    send_failure(bot, chat_id, "extracting text").await?;
                }
            }
            for path in &paths {
                cleanup::remove_file_quiet(path);
            }
            cleanup::remove_file_quiet(&output);
            return Ok(());
        }
        _ => {}
    }
    expired_session(bot, chat_id, store).await
}

async fn handle_merge_done(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    store: &SessionStore,
    config: &BotConfig,
) -> HandlerResult {
    match store.get(chat_id).await {
        Some(WorkflowState::AwaitingMergePdfs { pdfs }) if pdfs.len() < 2 => {
            // Not enough inputs; the accumulator stays active.
            bot.edit_message_text(
                chat_id,
                message_id,
                "❌ *Need at least 2 PDFs to merge\\!*\n\nPlease upload more PDF files\\.",
            )
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
            return Ok(());
        }
        Some(WorkflowState::AwaitingMergePdfs { pdfs }) => {
            store.clear(chat_id).await;

            bot.edit_message_text(
                chat_id,
                message_id,
                format!("🔄 *Merging {} PDFs\\.\\.\\.*\nPlease wait\\.\\.\\.", pdfs.len()),
            )
            .parse_mode(ParseMode::MarkdownV2)
            .await?;

            let paths = match download_batch(bot, chat_id, config, &pdfs, "merge").await {
                Ok(paths) => paths,
                Err(paths) => {
                    for path in &paths {
                        cleanup::remove_file_quiet(path);
                    }
                    send_failure(bot, chat_id, "downloading PDFs").await?;
                    return Ok(());
                }
            };

            let output = config
                .temp_dir
                .join(format!("merge_{}_out.pdf", Uuid::new_v4()));
            match pdf::merge::merge_pdfs(&paths, &output) {
                Ok(()) => {
                    send_pdf_artifact(
                        bot,
                        chat_id,
                        &output,
                        "merged_document.pdf",
                        format!(
                            "📂 *Merged PDF is ready\\!*\n\n📄 Combined {} PDF files",
                            pdfs.len()
                        ),
                    )
                    .await?;
                }
                Err(e) => {
                    log::error!("chat {chat_id}: merge failed: {e}");
                    send_failure(bot, chat_id, "merging PDFs").await?;
                }
            }
            for path in &paths {
                cleanup::remove_file_quiet(path);
            }
            cleanup::remove_file_quiet(&output);
            return Ok(());
        }
        _ => {}
    }
    expired_session(bot, chat_id, store).await
}

async fn handle_quick_split(
    bot: &Bot,
    chat_id: ChatId,
    store: &SessionStore,
    config: &BotConfig,
    range: &str,
) -> HandlerResult {
    match store.get(chat_id).await {
        Some(WorkflowState::AwaitingSplitPages {
            pdf_path,
            page_count,
        }) => {
            let pages = parse_page_numbers(range, page_count);
            if pages.is_empty() {
                bot.send_message(chat_id, "❌ Invalid page selection\\. Please try again\\.")
                    .parse_mode(ParseMode::MarkdownV2)
                    .await?;
                return Ok(());
            }
            run_split(bot, chat_id, store, config, pdf_path, pages, range).await
        }
        _ => expired_session(bot, chat_id, store).await,
    }
}

async fn handle_custom_split(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    store: &SessionStore,
) -> HandlerResult {
    match store.get(chat_id).await {
        Some(WorkflowState::AwaitingSplitPages { page_count, .. }) => {
            bot.edit_message_text(
                chat_id,
                message_id,
                format!(
                    "✏️ *Custom Page Range*\n\n\
                     📊 Total pages: *{page_count}*\n\n\
                     👉 *Enter page numbers to extract:*\n\n\
                     *Examples:*\n\
                     • `1-3` \\(pages 1 to 3\\)\n\
                     • `1,3,5` \\(pages 1, 3 and 5\\)\n\
                     • `2-4,6,8-10`"
                ),
            )
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
            Ok(())
        }
        _ => expired_session(bot, chat_id, store).await,
    }
}

/// Download accumulated uploads to prefixed temp files, preserving order.
/// On failure returns whatever was already written so the caller can clean
/// up.
async fn download_batch(
    bot: &Bot,
    chat_id: ChatId,
    config: &BotConfig,
    files: &[FileRef],
    prefix: &str,
) -> Result<Vec<std::path::PathBuf>, Vec<std::path::PathBuf>> {
    let token = Uuid::new_v4();
    let mut paths = Vec::new();
    for (index, file) in files.iter().enumerate() {
        let ext = file
            .file_name
            .rsplit('.')
            .next()
            .unwrap_or("bin")
            .to_lowercase();
        let path = config
            .temp_dir
            .join(format!("{prefix}_{token}_{index}.{ext}"));
        if let Err(e) = download_to_temp(bot, &file.file_id, &path).await {
            log::error!("chat {chat_id}: download of {} failed: {e}", file.file_name);
            return Err(paths);
        }
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_emitted_callback_round_trips() {
        let actions = vec![
            CallbackAction::MainMenu,
            CallbackAction::Help,
            CallbackAction::StartTextPdf,
            CallbackAction::StartImagePdf,
            CallbackAction::StartOcrPdf,
            CallbackAction::StartDocPdf,
            CallbackAction::StartMerge,
            CallbackAction::StartSplit,
            CallbackAction::StartProtect,
            CallbackAction::StartEnhance,
            CallbackAction::ImagesDone,
            CallbackAction::OcrDone,
            CallbackAction::MergeDone,
            CallbackAction::FontChoice(Font::Times),
            CallbackAction::ColorChoice(TextColor::Green),
            CallbackAction::SizeChoice(PageSize::Legal),
            CallbackAction::OrientationChoice(Orientation::Landscape),
            CallbackAction::QuickSplit("8-12".to_string()),
            CallbackAction::CustomSplit,
            CallbackAction::Master(MasterAction::Stats),
        ];
        for action in actions {
            assert_eq!(CallbackAction::parse(&action.data()), Some(action));
        }
    }

    #[test]
    fn unknown_data_does_not_parse() {
        assert_eq!(CallbackAction::parse("definitely_not_a_button"), None);
        assert_eq!(CallbackAction::parse("font_wingdings"), None);
        assert_eq!(CallbackAction::parse("master_selfdestruct"), None);
    }
}
