//! Master control panel: login, system stats, manual cleanup, broadcast.
//! Every action is gated on `is_master && is_authenticated`.

use std::time::Duration;

use sysinfo::{Disks, System};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode};

use crate::cleanup;
use crate::config::BotConfig;
use crate::handlers::utils::{discard_displaced, escape_markdown_v2};
use crate::handlers::HandlerResult;
use crate::models::AdminState;
use crate::session::{SessionStore, WorkflowState};

const PANEL_TEXT: &str = "🎛️ *Master Control Panel*\n\n\
Welcome to the bot administration interface\\. Choose an option below:\n\n\
📊 *System Stats* \\- server performance\n\
🧹 *Manual Cleanup* \\- clean temporary files now\n\
📢 *Broadcast* \\- send a message to all users\n\
👥 *User Stats* \\- activity overview\n\
🔧 *Bot Settings* \\- runtime parameters\n\
📋 *Server Logs* \\- where to find them";

const ACCESS_DENIED: &str = "❌ *Access Denied*\n\nYou are not authorized for this action\\.";

/// Admin panel actions, parsed from `master_*` callback data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterAction {
    Panel,
    Stats,
    Cleanup,
    Broadcast,
    Users,
    Settings,
    Logs,
}

impl MasterAction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "panel" => Some(MasterAction::Panel),
            "stats" => Some(MasterAction::Stats),
            "cleanup" => Some(MasterAction::Cleanup),
            "broadcast" => Some(MasterAction::Broadcast),
            "users" => Some(MasterAction::Users),
            "settings" => Some(MasterAction::Settings),
            "logs" => Some(MasterAction::Logs),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            MasterAction::Panel => "panel",
            MasterAction::Stats => "stats",
            MasterAction::Cleanup => "cleanup",
            MasterAction::Broadcast => "broadcast",
            MasterAction::Users => "users",
            MasterAction::Settings => "settings",
            MasterAction::Logs => "logs",
        }
    }
}

fn panel_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("📊 System Stats", "master_stats"),
            InlineKeyboardButton::callback("🧹 Manual Cleanup", "master_cleanup"),
        ],
        vec![
            InlineKeyboardButton::callback("📢 Broadcast Message", "master_broadcast"),
            InlineKeyboardButton::callback("👥 User Statistics", "master_users"),
        ],
        vec![
            InlineKeyboardButton::callback("🔧 Bot Settings", "master_settings"),
            InlineKeyboardButton::callback("📋 Server Logs", "master_logs"),
        ],
    ])
}

fn back_to_panel() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "🏠 Main Panel",
        "master_panel",
    )]])
}

/// `/master` and `/admin`: deny non-masters, show the panel if already
/// authenticated, otherwise ask for the password.
pub async fn handle_master_login(
    bot: &Bot,
    msg: &Message,
    store: &SessionStore,
    admin: &AdminState,
) -> HandlerResult {
    let chat_id = msg.chat.id;

    if !admin.is_master(chat_id) {
        bot.send_message(chat_id, ACCESS_DENIED)
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        return Ok(());
    }

    if admin.is_authenticated(chat_id).await {
        bot.send_message(chat_id, PANEL_TEXT)
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(panel_keyboard())
            .await?;
        return Ok(());
    }

    discard_displaced(
        store
            .set(chat_id, WorkflowState::AwaitingMasterPassword)
            .await,
    );
    bot.send_message(
        chat_id,
        "🔐 *Master Authentication Required*\n\nPlease enter the master password:",
    )
    .parse_mode(ParseMode::MarkdownV2)
    .await?;
    Ok(())
}

/// Password message while in the master-password state. The state is
/// consumed either way.
pub async fn handle_master_password(
    bot: &Bot,
    msg: &Message,
    store: &SessionStore,
    admin: &AdminState,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    store.clear(chat_id).await;

    let password = msg.text().unwrap_or_default().trim();
    if admin.try_authenticate(chat_id, password).await {
        bot.send_message(
            chat_id,
            "✅ *Authentication Successful*\n\nWelcome to the Master Control Panel\\!",
        )
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(panel_keyboard())
        .await?;
    } else {
        log::warn!("chat {chat_id}: failed master authentication attempt");
        bot.send_message(
            chat_id,
            "❌ *Invalid Password*\n\nAccess denied\\. Please try again\\.",
        )
        .parse_mode(ParseMode::MarkdownV2)
        .await?;
    }
    Ok(())
}

/// Broadcast text while in the broadcast state. Delivery is out of scope:
/// the store keeps no user registry, so this mirrors the confirm-only
/// behavior of the admin workflow.
pub async fn handle_broadcast_input(
    bot: &Bot,
    msg: &Message,
    store: &SessionStore,
    admin: &AdminState,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    store.clear(chat_id).await;

    if !admin.is_master(chat_id) || !admin.is_authenticated(chat_id).await {
        bot.send_message(chat_id, ACCESS_DENIED)
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        return Ok(());
    }

    let text = msg.text().unwrap_or_default().trim();
    bot.send_message(
        chat_id,
        format!(
            "✅ *Broadcast Scheduled*\n\n\
             Message: {}\n\n\
             The message will be sent to all bot users\\.",
            escape_markdown_v2(text)
        ),
    )
    .parse_mode(ParseMode::MarkdownV2)
    .reply_markup(back_to_panel())
    .await?;
    Ok(())
}

pub async fn handle_master_callback(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    store: &SessionStore,
    admin: &AdminState,
    config: &BotConfig,
    action: MasterAction,
) -> HandlerResult {
    if !admin.is_master(chat_id) || !admin.is_authenticated(chat_id).await {
        bot.send_message(chat_id, ACCESS_DENIED)
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        return Ok(());
    }

    match action {
        MasterAction::Panel => {
            bot.edit_message_text(chat_id, message_id, PANEL_TEXT)
                .parse_mode(ParseMode::MarkdownV2)
                .reply_markup(panel_keyboard())
                .await?;
        }
        MasterAction::Stats => {
            show_stats(bot, chat_id, message_id, config).await?;
        }
        MasterAction::Cleanup => {
            run_cleanup(bot, chat_id, message_id, config).await?;
        }
        MasterAction::Broadcast => {
            discard_displaced(
                store
                    .set(chat_id, WorkflowState::AwaitingBroadcastText)
                    .await,
            );
            bot.edit_message_text(
                chat_id,
                message_id,
                "📢 *Broadcast Message*\n\n\
                 Type the message you want to send to all bot users\\.\n\n\
                 *Note:* it will reach everyone who has used the bot\\.",
            )
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        }
        MasterAction::Users => {
            let active = store.active_count().await;
            bot.edit_message_text(
                chat_id,
                message_id,
                format!(
                    "👥 *User Statistics*\n\n• Active workflows right now: {active}\n\n\
                     More metrics are planned\\."
                ),
            )
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(back_to_panel())
            .await?;
        }
        MasterAction::Settings => {
            bot.edit_message_text(
                chat_id,
                message_id,
                format!(
                    "🔧 *Bot Settings*\n\n\
                     • Auto cleanup: every {} h\n\
                     • Temp file retention: {} h\n\
                     • Temp directory: {}",
                    config.cleanup_interval_hours,
                    config.max_file_age_hours,
                    escape_markdown_v2(&config.temp_dir.display().to_string())
                ),
            )
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(back_to_panel())
            .await?;
        }
        MasterAction::Logs => {
            bot.edit_message_text(
                chat_id,
                message_id,
                "📋 *Server Logs*\n\n\
                 Activity is logged to stdout; check the service journal on the host\\.",
            )
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(back_to_panel())
            .await?;
        }
    }
    Ok(())
}

async fn show_stats(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    config: &BotConfig,
) -> HandlerResult {
    let mut sys = System::new_all();
    sys.refresh_all();

    let cpu = escape_markdown_v2(&format!("{:.1}", sys.global_cpu_usage()));
    let mem = escape_markdown_v2(&format!(
        "{:.1}GB / {:.1}GB",
        sys.used_memory() as f64 / 1e9,
        sys.total_memory() as f64 / 1e9
    ));

    let disks = Disks::new_with_refreshed_list();
    let (disk_total, disk_avail) = disks
        .iter()
        .fold((0u64, 0u64), |acc, d| {
            (acc.0 + d.total_space(), acc.1 + d.available_space())
        });
    let disk = escape_markdown_v2(&format!(
        "{:.1}GB / {:.1}GB",
        (disk_total - disk_avail) as f64 / 1e9,
        disk_total as f64 / 1e9
    ));

    let (temp_files, temp_bytes) = cleanup::temp_stats(&config.temp_dir);
    let temp_size = escape_markdown_v2(&format!("{:.2} MB", temp_bytes as f64 / 1e6));
    let updated = escape_markdown_v2(
        &chrono::Local::now()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
    );

    let keyboard = InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("🔄 Refresh", "master_stats"),
        InlineKeyboardButton::callback("🏠 Main Panel", "master_panel"),
    ]]);

    bot.edit_message_text(
        chat_id,
        message_id,
        format!(
            "📊 *System Statistics*\n\n\
             *💻 Server Performance:*\n\
             • CPU usage: {cpu}%\n\
             • Memory: {mem}\n\
             • Disk: {disk}\n\n\
             *🗂️ Temporary Files:*\n\
             • Count: {temp_files} files\n\
             • Size: {temp_size}\n\n\
             ⏰ Updated: {updated}"
        ),
    )
    .parse_mode(ParseMode::MarkdownV2)
    .reply_markup(keyboard)
    .await?;
    Ok(())
}

async fn run_cleanup(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    config: &BotConfig,
) -> HandlerResult {
    let max_age = Duration::from_secs(config.max_file_age_hours * 3600);
    let report = cleanup::sweep_temp_files(&config.temp_dir, max_age);
    let freed = escape_markdown_v2(&format!("{:.2} MB", report.bytes_freed as f64 / 1e6));

    let keyboard = InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("🧹 Run Again", "master_cleanup"),
        InlineKeyboardButton::callback("🏠 Main Panel", "master_panel"),
    ]]);

    bot.edit_message_text(
        chat_id,
        message_id,
        format!(
            "🧹 *Cleanup Completed*\n\n\
             *Results:*\n\
             • Files deleted: {}\n\
             • Space freed: {freed}",
            report.deleted
        ),
    )
    .parse_mode(ParseMode::MarkdownV2)
    .reply_markup(keyboard)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_action_tokens_round_trip() {
        let actions = [
            MasterAction::Panel,
            MasterAction::Stats,
            MasterAction::Cleanup,
            MasterAction::Broadcast,
            MasterAction::Users,
            MasterAction::Settings,
            MasterAction::Logs,
        ];
        for action in actions {
            assert_eq!(MasterAction::from_token(action.token()), Some(action));
        }
        assert_eq!(MasterAction::from_token("shutdown"), None);
    }
}
