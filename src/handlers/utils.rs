use std::error::Error;
use std::path::Path;

use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode};

use crate::cleanup;
use crate::pdf::pages::quick_picks;
use crate::session::WorkflowState;

/// Delete the files owned by a workflow state that was displaced or cleared
/// without reaching its terminal action. Entry commands preempt in-progress
/// workflows; whatever the old state downloaded must not wait for the
/// janitor.
pub fn discard_displaced(displaced: Option<WorkflowState>) {
    if let Some(path) = displaced.as_ref().and_then(|state| state.owned_file()) {
        cleanup::remove_file_quiet(path);
    }
}

/// Escape MarkdownV2 special characters in dynamic text.
pub fn escape_markdown_v2(text: &str) -> String {
    let specials = [
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ];
    let mut out = String::with_capacity(text.len() * 2);

    for ch in text.chars() {
        if specials.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Main menu: one button per workflow.
pub fn main_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("📝 Text ➝ PDF", "txt2pdf")],
        vec![
            InlineKeyboardButton::callback("🖼️ Images ➝ PDF", "img2pdf"),
            InlineKeyboardButton::callback("🔍 OCR ➝ PDF", "ocr2pdf"),
        ],
        vec![InlineKeyboardButton::callback("📄 Documents ➝ PDF", "doc2pdf")],
        vec![
            InlineKeyboardButton::callback("📚 Merge PDFs", "mergepdf"),
            InlineKeyboardButton::callback("✂️ Split PDF", "splitpdf"),
        ],
        vec![InlineKeyboardButton::callback("🔐 Password Protect", "protect")],
        vec![InlineKeyboardButton::callback("🤖 AI Enhancement", "enhance")],
        vec![InlineKeyboardButton::callback("❓ Help", "help")],
    ])
}

/// Single "back to menu" row appended to most replies.
pub fn menu_button() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "🏠 Main Menu",
        "start",
    )]])
}

pub fn images_done_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "✅ Done", "img_done",
    )]])
}

pub fn merge_done_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "✅ Done",
        "merge_done",
    )]])
}

pub fn ocr_done_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("✅ Process OCR", "ocr_done")],
        vec![InlineKeyboardButton::callback("🏠 Main Menu", "start")],
    ])
}

pub fn font_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("📝 Arial", "font_arial"),
            InlineKeyboardButton::callback("📝 Times New Roman", "font_times"),
        ],
        vec![
            InlineKeyboardButton::callback("📝 Helvetica", "font_helvetica"),
            InlineKeyboardButton::callback("📝 Courier", "font_courier"),
        ],
    ])
}

pub fn color_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("⚫ Black", "color_black"),
            InlineKeyboardButton::callback("🔵 Blue", "color_blue"),
        ],
        vec![
            InlineKeyboardButton::callback("🔴 Red", "color_red"),
            InlineKeyboardButton::callback("🟢 Green", "color_green"),
        ],
    ])
}

pub fn size_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("📄 A4", "size_a4"),
            InlineKeyboardButton::callback("📄 Letter", "size_letter"),
        ],
        vec![InlineKeyboardButton::callback("📄 Legal", "size_legal")],
    ])
}

pub fn orientation_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("📄 Portrait", "orient_portrait")],
        vec![InlineKeyboardButton::callback(
            "📄 Landscape",
            "orient_landscape",
        )],
    ])
}

/// Quick-pick ranges derived from the page count, two per row, plus the
/// custom-range affordance.
pub fn split_options_keyboard(page_count: u32) -> InlineKeyboardMarkup {
    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    let mut row = Vec::new();

    for pick in quick_picks(page_count) {
        row.push(InlineKeyboardButton::callback(
            format!("📄 {}", pick.label),
            format!("quick_split_{}", pick.range),
        ));
        if row.len() == 2 {
            keyboard.push(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        keyboard.push(row);
    }

    keyboard.push(vec![InlineKeyboardButton::callback(
        "✏️ Custom Range",
        "custom_split",
    )]);
    InlineKeyboardMarkup::new(keyboard)
}

/// Download a Telegram file to a local path inside the bot's temp dir.
pub async fn download_to_temp(
    bot: &Bot,
    file_id: &str,
    dest: &Path,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let file = bot.get_file(file_id.to_string()).await?;
    let mut dst = tokio::fs::File::create(dest).await?;
    bot.download_file(&file.path, &mut dst).await?;
    Ok(())
}

/// Deliver a produced PDF with a caption and the menu button.
pub async fn send_pdf_artifact(
    bot: &Bot,
    chat_id: ChatId,
    path: &Path,
    file_name: &str,
    caption: String,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    bot.send_document(
        chat_id,
        InputFile::file(path.to_path_buf()).file_name(file_name.to_string()),
    )
    .caption(caption)
    .parse_mode(ParseMode::MarkdownV2)
    .reply_markup(menu_button())
    .await?;
    Ok(())
}

/// Uniform terminal-failure reply. The caller has already cleared the
/// session and removed its temp files.
pub async fn send_failure(
    bot: &Bot,
    chat_id: ChatId,
    what: &str,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    bot.send_message(
        chat_id,
        format!("❌ *Error {what}*\n\nSorry, something went wrong\\. Please try again\\."),
    )
    .parse_mode(ParseMode::MarkdownV2)
    .reply_markup(menu_button())
    .await?;
    Ok(())
}

/// Default response for input that matches no command and no active state.
pub async fn send_unrecognized(
    bot: &Bot,
    chat_id: ChatId,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    bot.send_message(
        chat_id,
        "🤔 I'm not sure what you want to do\\.\nPlease use the menu below to get started\\!",
    )
    .parse_mode(ParseMode::MarkdownV2)
    .reply_markup(menu_button())
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_every_markdown_special() {
        assert_eq!(escape_markdown_v2("a.b-c!"), "a\\.b\\-c\\!");
        assert_eq!(escape_markdown_v2("(1+2)*3"), "\\(1\\+2\\)\\*3");
        assert_eq!(escape_markdown_v2("plain"), "plain");
    }

    #[test]
    fn discarding_a_displaced_split_state_removes_its_download() {
        let dir = tempfile::tempdir().unwrap();
        let pdf_path = dir.path().join("split_abandoned.pdf");
        std::fs::write(&pdf_path, b"%PDF-1.5").unwrap();

        discard_displaced(Some(WorkflowState::AwaitingSplitPages {
            pdf_path: pdf_path.clone(),
            page_count: 3,
        }));
        assert!(!pdf_path.exists());

        // States without disk artifacts are a no-op, as is no state at all.
        discard_displaced(Some(WorkflowState::AwaitingText));
        discard_displaced(None);
    }

    #[test]
    fn split_keyboard_always_offers_custom_range() {
        for count in [1u32, 4, 12, 30] {
            let keyboard = split_options_keyboard(count);
            let last_row = keyboard.inline_keyboard.last().unwrap();
            assert_eq!(last_row.len(), 1);
            assert_eq!(last_row[0].text, "✏️ Custom Range");
        }
    }
}
