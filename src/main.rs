use teloxide::{prelude::*, utils::command::BotCommands};

mod ai;
mod cleanup;
mod config;
mod convert;
mod handlers;
mod models;
mod pdf;
mod session;

use crate::config::BotConfig;
use crate::handlers::{callback_handler, command_handler, message_handler};
use crate::models::AdminState;
use crate::session::SessionStore;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
enum Command {
    #[command(description = "show the main menu")]
    Start,
    #[command(description = "show help")]
    Help,
    #[command(description = "convert text to a styled PDF")]
    Txt2Pdf,
    #[command(description = "convert images to a PDF")]
    Img2Pdf,
    #[command(description = "extract text from images into a PDF")]
    Ocr2Pdf,
    #[command(description = "convert a document to PDF")]
    Doc2Pdf,
    #[command(description = "merge several PDFs into one")]
    MergePdf,
    #[command(description = "extract pages from a PDF")]
    SplitPdf,
    #[command(description = "password-protect a PDF")]
    Protect,
    #[command(description = "AI document enhancement")]
    Enhance,
    #[command(description = "master control panel")]
    Master,
    #[command(description = "master control panel")]
    Admin,
    #[command(description = "cancel the current operation")]
    Cancel,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Starting docusmith PDF bot...");

    let config = BotConfig::from_env();
    std::fs::create_dir_all(&config.temp_dir)?;

    let store = SessionStore::new();
    let admin = AdminState::new(&config);

    // Background sweep for temp artifacts orphaned by abandoned sessions.
    tokio::spawn(cleanup::sweep_task(
        config.temp_dir.clone(),
        config.cleanup_interval_hours,
        config.max_file_age_hours,
    ));
    log::info!(
        "cleanup scheduled every {} h (retention {} h) in {}",
        config.cleanup_interval_hours,
        config.max_file_age_hours,
        config.temp_dir.display()
    );
    if config.groq_api_key.is_none() {
        log::warn!("GROQ_API_KEY not set; AI enhancement is disabled");
    }

    let bot = Bot::from_env();

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(Update::filter_callback_query().endpoint(callback_handler))
        .branch(Update::filter_message().endpoint(message_handler));

    log::info!("🚀 Starting dispatcher...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![store, admin, config])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
