use std::collections::HashSet;
use std::sync::Arc;

use teloxide::types::ChatId;
use tokio::sync::RwLock;

use crate::config::BotConfig;

/// Master-panel authentication, separate from regular workflow sessions.
/// Every admin action checks `is_master` and `is_authenticated` before doing
/// anything. Authentication lasts until the process exits.
#[derive(Clone)]
pub struct AdminState {
    master_id: Option<i64>,
    password: String,
    authenticated: Arc<RwLock<HashSet<ChatId>>>,
}

impl AdminState {
    pub fn new(config: &BotConfig) -> Self {
        Self {
            master_id: config.master_id,
            password: config.master_password.clone(),
            authenticated: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub fn is_master(&self, chat_id: ChatId) -> bool {
        self.master_id == Some(chat_id.0)
    }

    pub async fn is_authenticated(&self, chat_id: ChatId) -> bool {
        self.authenticated.read().await.contains(&chat_id)
    }

    /// Compare the submitted password and authenticate on match.
    pub async fn try_authenticate(&self, chat_id: ChatId, password: &str) -> bool {
        if self.is_master(chat_id) && password == self.password {
            self.authenticated.write().await.insert(chat_id);
            log::info!("master {} authenticated", chat_id);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(master_id: Option<i64>) -> BotConfig {
        BotConfig {
            master_id,
            master_password: "hunter2".to_string(),
            groq_api_key: None,
            temp_dir: PathBuf::from("/tmp"),
            cleanup_interval_hours: 1,
            max_file_age_hours: 1,
        }
    }

    #[tokio::test]
    async fn only_the_master_with_the_right_password_authenticates() {
        let admin = AdminState::new(&config(Some(42)));

        assert!(!admin.try_authenticate(ChatId(1), "hunter2").await);
        assert!(!admin.try_authenticate(ChatId(42), "wrong").await);
        assert!(!admin.is_authenticated(ChatId(42)).await);

        assert!(admin.try_authenticate(ChatId(42), "hunter2").await);
        assert!(admin.is_authenticated(ChatId(42)).await);
    }

    #[tokio::test]
    async fn unset_master_id_denies_everyone() {
        let admin = AdminState::new(&config(None));
        assert!(!admin.is_master(ChatId(0)));
        assert!(!admin.try_authenticate(ChatId(0), "hunter2").await);
    }
}
