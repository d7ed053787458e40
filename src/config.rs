// src/config.rs

use std::env;

/// Credentials for the Telegram sink. Always passed explicitly to the
/// sender; handlers never read the process environment themselves.
#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    pub admin_token: Option<String>,
    pub telegram: Option<TelegramConfig>,
}

impl AppConfig {
    /// Reads the environment once at startup.
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080); // default 8080

        let admin_token = env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty());

        let telegram = match (env::var("TELEGRAM_BOT_TOKEN"), env::var("TELEGRAM_CHAT_ID")) {
            (Ok(bot_token), Ok(chat_id)) if !bot_token.is_empty() && !chat_id.is_empty() => {
                Some(TelegramConfig { bot_token, chat_id })
            }
            _ => None,
        };

        Self { port, admin_token, telegram }
    }
}
