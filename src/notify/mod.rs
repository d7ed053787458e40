// src/notify/mod.rs
//
// Telegram sink for status-change notices. Credentials are an explicit
// config value; the settings store overrides the environment so the CRM
// telegram-config screen wins.

use sqlx::PgPool;
use tracing::error;

use crate::config::TelegramConfig;

pub async fn resolve_telegram(
    pool: &PgPool,
    fallback: Option<&TelegramConfig>,
) -> Option<TelegramConfig> {
    let rows = sqlx::query_as::<_, (String, Option<String>)>(
        r#"SELECT key, value FROM settings WHERE key IN ('telegram_bot_token', 'telegram_chat_id')"#,
    )
    .fetch_all(pool)
    .await;

    let rows = match rows {
        Ok(rows) => rows,
        Err(e) => {
            error!("failed to load telegram settings: {e}");
            return fallback.cloned();
        }
    };

    let mut bot_token = None;
    let mut chat_id = None;
    for (key, value) in rows {
        match (key.as_str(), value) {
            ("telegram_bot_token", Some(v)) if !v.is_empty() => bot_token = Some(v),
            ("telegram_chat_id", Some(v)) if !v.is_empty() => chat_id = Some(v),
            _ => {}
        }
    }

    match (bot_token, chat_id) {
        (Some(bot_token), Some(chat_id)) => Some(TelegramConfig { bot_token, chat_id }),
        _ => fallback.cloned(),
    }
}

/// Sends one plain-text message to the configured chat. Callers on the
/// status-change path log failures and move on; nothing retries.
pub async fn send_telegram(cfg: &TelegramConfig, text: &str) -> anyhow::Result<()> {
    let url = format!("https://api.telegram.org/bot{}/sendMessage", cfg.bot_token);
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    client
        .post(&url)
        .json(&serde_json::json!({ "chat_id": cfg.chat_id, "text": text }))
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}
