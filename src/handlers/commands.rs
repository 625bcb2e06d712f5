use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::handlers::master;
use crate::handlers::utils::{
    discard_displaced, images_done_keyboard, main_menu_keyboard, menu_button,
    merge_done_keyboard,
};
use crate::handlers::HandlerResult;
use crate::models::AdminState;
use crate::session::{SessionStore, WorkflowState};
use crate::Command;

// Prompt texts are shared with the callback entry points; all literals are
// pre-escaped for MarkdownV2.

pub(crate) const WELCOME_TEXT: &str = "🤖 *Welcome to Professional PDF Bot\\!*\n\n\
I can:\n\
📝 Convert text to styled PDFs\n\
🖼️ Convert images to optimized PDFs\n\
🔍 Extract text from images using OCR\n\
📄 Convert Word, Excel and PowerPoint documents\n\
📚 Merge multiple PDFs into one\n\
✂️ Split PDFs by page numbers\n\
🔐 Add password protection to any PDF\n\
🤖 Suggest AI\\-powered document improvements\n\n\
👇 *Choose an option below to get started:*";

pub(crate) const HELP_TEXT: &str = "🤖 *PDF Bot Help Guide*\n\n\
*📝 Text to PDF:* send /txt2pdf, type your text, then pick font, color and page size\\.\n\
*🖼️ Images to PDF:* send /img2pdf, upload images, press ✅ Done, pick orientation\\.\n\
*🔍 OCR:* send /ocr2pdf, upload images with text, press ✅ Process OCR\\.\n\
*📄 Documents:* send /doc2pdf and upload docx, xlsx, pptx, html or txt\\.\n\
*📚 Merge:* send /mergepdf, upload two or more PDFs, press ✅ Done\\.\n\
*✂️ Split:* send /splitpdf, upload a PDF, pick a quick range or type your own\\.\n\
*🔐 Protect:* send /protect, upload a PDF, then enter a password\\.\n\
*🤖 AI Enhancement:* send /enhance and upload a document for improvement suggestions\\.\n\n\
💡 Files are processed securely and deleted after use\\.";

pub(crate) const TXT_PROMPT: &str = "📝 *Text to PDF Converter*\n\n\
👉 Send me the text you want to convert\\.\n\
✨ You will choose a font, a color and a page size next\\.";

pub(crate) const IMG_PROMPT: &str = "🖼️ *Images to PDF Converter*\n\n\
👉 Upload your images \\(one or multiple\\)\\.\n\
📸 Supported formats: JPG, PNG, WEBP, GIF\n\
📄 Images are resized to fit A4 pages\n\n\
Press *✅ Done* when you have uploaded all images\\.";

pub(crate) const OCR_PROMPT: &str = "🔍 *OCR Text Extraction*\n\n\
Upload images containing text and I will extract it into a searchable PDF\\.\n\n\
📷 Send your first image to start\\.";

pub(crate) const DOC_PROMPT: &str = "📄 *Document to PDF Converter*\n\n\
👉 Upload your document file\\.\n\
📋 Supported formats:\n\
• Word documents \\(\\.docx\\)\n\
• Excel spreadsheets \\(\\.xlsx\\)\n\
• PowerPoint presentations \\(\\.pptx\\)\n\
• HTML files \\(\\.html\\)\n\
• Text files \\(\\.txt\\)";

pub(crate) const MERGE_PROMPT: &str = "📚 *PDF Merger*\n\n\
👉 Upload 2 or more PDF files to merge\\.\n\
📄 Files are merged in upload order\\.\n\n\
Press *✅ Done* when you have uploaded all PDFs\\.";

pub(crate) const SPLIT_PROMPT: &str = "✂️ *PDF Splitter*\n\n\
👉 Upload the PDF file you want to split\\.\n\
📄 After upload I will offer quick page options or a custom range\\.";

pub(crate) const PROTECT_PROMPT: &str = "🔐 *Password Protect PDF*\n\n\
Upload a PDF file and I will add 128\\-bit password protection\\.\n\n\
📄 Upload your PDF file to start\\.";

pub(crate) const ENHANCE_PROMPT: &str = "🤖 *AI Document Enhancement*\n\n\
Upload a document and I will suggest an improved version\\.\n\n\
📄 Supported: PDF, DOCX, XLSX, PPTX, images with text, TXT\\.\n\n\
📁 Upload your document to get started\\.";

/// Explicit commands always preempt an in-progress workflow: every entry
/// point overwrites whatever state the chat had.
pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    store: SessionStore,
    admin: AdminState,
) -> HandlerResult {
    let chat_id = msg.chat.id;

    match cmd {
        Command::Start => {
            bot.send_message(chat_id, WELCOME_TEXT)
                .parse_mode(ParseMode::MarkdownV2)
                .reply_markup(main_menu_keyboard())
                .await?;
        }
        Command::Help => {
            bot.send_message(chat_id, HELP_TEXT)
                .parse_mode(ParseMode::MarkdownV2)
                .reply_markup(menu_button())
                .await?;
        }
        Command::Txt2Pdf => {
            discard_displaced(store.set(chat_id, WorkflowState::AwaitingText).await);
            bot.send_message(chat_id, TXT_PROMPT)
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        }
        Command::Img2Pdf => {
            discard_displaced(
                store
                    .set(chat_id, WorkflowState::AwaitingImages { images: vec![] })
                    .await,
            );
            bot.send_message(chat_id, IMG_PROMPT)
                .parse_mode(ParseMode::MarkdownV2)
                .reply_markup(images_done_keyboard())
                .await?;
        }
        Command::Ocr2Pdf => {
            discard_displaced(
                store
                    .set(chat_id, WorkflowState::AwaitingOcrImages { images: vec![] })
                    .await,
            );
            bot.send_message(chat_id, OCR_PROMPT)
                .parse_mode(ParseMode::MarkdownV2)
                .reply_markup(menu_button())
                .await?;
        }
        Command::Doc2Pdf => {
            discard_displaced(store.set(chat_id, WorkflowState::AwaitingDocument).await);
            bot.send_message(chat_id, DOC_PROMPT)
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        }
        Command::MergePdf => {
            discard_displaced(
                store
                    .set(chat_id, WorkflowState::AwaitingMergePdfs { pdfs: vec![] })
                    .await,
            );
            bot.send_message(chat_id, MERGE_PROMPT)
                .parse_mode(ParseMode::MarkdownV2)
                .reply_markup(merge_done_keyboard())
                .await?;
        }
        Command::SplitPdf => {
            discard_displaced(store.set(chat_id, WorkflowState::AwaitingSplitPdf).await);
            bot.send_message(chat_id, SPLIT_PROMPT)
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        }
        Command::Protect => {
            discard_displaced(store.set(chat_id, WorkflowState::AwaitingProtectPdf).await);
            bot.send_message(chat_id, PROTECT_PROMPT)
                .parse_mode(ParseMode::MarkdownV2)
                .reply_markup(menu_button())
                .await?;
        }
        Command::Enhance => {
            discard_displaced(store.set(chat_id, WorkflowState::AwaitingAiDocument).await);
            bot.send_message(chat_id, ENHANCE_PROMPT)
                .parse_mode(ParseMode::MarkdownV2)
                .reply_markup(menu_button())
                .await?;
        }
        Command::Master | Command::Admin => {
            master::handle_master_login(&bot, &msg, &store, &admin).await?;
        }
        Command::Cancel => {
            discard_displaced(store.clear(chat_id).await);
            bot.send_message(chat_id, "✅ Operation cancelled\\.")
                .parse_mode(ParseMode::MarkdownV2)
                .reply_markup(menu_button())
                .await?;
        }
    }
    Ok(())
}
