use std::env;
use std::path::PathBuf;

const DEFAULT_MASTER_PASSWORD: &str = "admin123";
const DEFAULT_CLEANUP_INTERVAL_HOURS: u64 = 1;
const DEFAULT_MAX_FILE_AGE_HOURS: u64 = 1;

/// Runtime configuration, read once at startup and handed to the dispatcher
/// through `dptree::deps!`.
#[derive(Clone, Debug)]
pub struct BotConfig {
    /// Chat id allowed to open the master panel. `None` disables it entirely.
    pub master_id: Option<i64>,
    pub master_password: String,
    /// Missing key degrades AI enhancement to an explicit "unavailable" error.
    pub groq_api_key: Option<String>,
    /// Directory owning every temp artifact the bot writes.
    pub temp_dir: PathBuf,
    pub cleanup_interval_hours: u64,
    pub max_file_age_hours: u64,
}

impl BotConfig {
    pub fn from_env() -> Self {
        let master_id = env::var("MASTER_ID")
            .ok()
            .and_then(|v| v.parse::<i64>().ok());
        let master_password =
            env::var("MASTER_PASSWORD").unwrap_or_else(|_| DEFAULT_MASTER_PASSWORD.to_string());
        let groq_api_key = env::var("GROQ_API_KEY").ok().filter(|k| !k.is_empty());
        let temp_dir = env::var("DOCUSMITH_TMP")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("docusmith"));
        let cleanup_interval_hours = env::var("CLEANUP_INTERVAL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CLEANUP_INTERVAL_HOURS);
        let max_file_age_hours = env::var("MAX_FILE_AGE_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_FILE_AGE_HOURS);

        Self {
            master_id,
            master_password,
            groq_api_key,
            temp_dir,
            cleanup_interval_hours,
            max_file_age_hours,
        }
    }
}
