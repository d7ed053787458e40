// src/routes/settings.rs

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::{query, query_as};

use crate::error::ApiError;
use crate::models::Setting;
use crate::notify;
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQ {
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct UpsertSettingBody {
    pub value: Option<String>,
    #[serde(default = "default_value_type")] pub value_type: String,
    #[serde(default = "default_category")] pub category: String,
}
fn default_value_type() -> String { "string".into() }
fn default_category() -> String { "general".into() }

#[derive(Deserialize)]
pub struct TelegramConfigBody {
    pub bot_token: String,
    pub chat_id: String,
}

pub async fn list_settings(
    State(state): State<AppState>,
    Query(q): Query<ListQ>,
) -> Result<Json<Vec<Setting>>, ApiError> {
    let rows = query_as::<_, Setting>(
        r#"
        SELECT * FROM settings
        WHERE ($1::text IS NULL OR category = $1)
        ORDER BY key
        "#,
    )
    .bind(q.category)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

/// PUT /api/v1/settings/:key
pub async fn upsert_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(b): Json<UpsertSettingBody>,
) -> Result<Json<Setting>, ApiError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ApiError::Validation("setting key must not be empty".into()));
    }

    let row = query_as::<_, Setting>(
        r#"
        INSERT INTO settings(key, value, value_type, category)
        VALUES ($1,$2,$3,$4)
        ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value,
                value_type = EXCLUDED.value_type,
                category = EXCLUDED.category,
                updated_at = now()
        RETURNING id, key, value, value_type, category, updated_at
        "#,
    )
    .bind(key)
    .bind(b.value)
    .bind(b.value_type)
    .bind(b.category)
    .fetch_one(&state.pool)
    .await?;
    Ok(Json(row))
}

/// GET /api/v1/telegram-config — reports whether the sink is usable without
/// echoing the bot token back.
pub async fn get_telegram_config(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    match notify::resolve_telegram(&state.pool, state.config.telegram.as_ref()).await {
        Some(cfg) => Ok(Json(json!({ "configured": true, "chat_id": cfg.chat_id }))),
        None => Ok(Json(json!({ "configured": false }))),
    }
}

/// POST /api/v1/telegram-config
pub async fn set_telegram_config(
    State(state): State<AppState>,
    Json(b): Json<TelegramConfigBody>,
) -> Result<Json<Value>, ApiError> {
    if b.bot_token.trim().is_empty() || b.chat_id.trim().is_empty() {
        return Err(ApiError::Validation("bot_token and chat_id are required".into()));
    }

    let mut tx = state.pool.begin().await?;
    for (key, value) in [
        ("telegram_bot_token", b.bot_token.trim()),
        ("telegram_chat_id", b.chat_id.trim()),
    ] {
        query(
            r#"
            INSERT INTO settings(key, value, value_type, category)
            VALUES ($1, $2, 'string', 'telegram')
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(Json(json!({ "saved": true })))
}
