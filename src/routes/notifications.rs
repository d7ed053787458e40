// src/routes/notifications.rs

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::{query, query_as};

use crate::error::ApiError;
use crate::models::Notification;
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQ {
    pub client_id: Option<i64>,
    pub is_read: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateNotificationBody {
    pub client_id: Option<i64>,
    pub title: String,
    pub message: String,
}

#[derive(Deserialize)]
pub struct ReadAllBody {
    pub client_id: i64,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Query(q): Query<ListQ>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let limit = q.limit.unwrap_or(50).clamp(1, 500);
    let offset = q.offset.unwrap_or(0).max(0);

    let rows = query_as::<_, Notification>(
        r#"
        SELECT * FROM notifications
        WHERE ($1::bigint IS NULL OR client_id = $1)
          AND ($2::boolean IS NULL OR is_read = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(q.client_id)
    .bind(q.is_read)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

pub async fn create_notification(
    State(state): State<AppState>,
    Json(b): Json<CreateNotificationBody>,
) -> Result<Json<Notification>, ApiError> {
    if b.title.trim().is_empty() || b.message.trim().is_empty() {
        return Err(ApiError::Validation("title and message are required".into()));
    }

    let row = query_as::<_, Notification>(
        r#"
        INSERT INTO notifications(client_id, title, message)
        VALUES ($1,$2,$3)
        RETURNING id, client_id, title, message, is_read, created_at
        "#,
    )
    .bind(b.client_id)
    .bind(b.title.trim())
    .bind(b.message.trim())
    .fetch_one(&state.pool)
    .await?;
    Ok(Json(row))
}

/// POST /api/v1/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Notification>, ApiError> {
    let row = query_as::<_, Notification>(
        r#"
        UPDATE notifications SET is_read = TRUE
        WHERE id = $1
        RETURNING id, client_id, title, message, is_read, created_at
        "#,
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("notification {id} not found")))?;
    Ok(Json(row))
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    Json(b): Json<ReadAllBody>,
) -> Result<Json<Value>, ApiError> {
    let res = query(r#"UPDATE notifications SET is_read = TRUE WHERE client_id=$1 AND NOT is_read"#)
        .bind(b.client_id)
        .execute(&state.pool)
        .await?;
    Ok(Json(json!({ "updated": res.rows_affected() })))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let res = query(r#"DELETE FROM notifications WHERE id=$1"#)
        .bind(id)
        .execute(&state.pool)
        .await?;
    Ok(Json(json!({ "deleted": res.rows_affected() > 0 })))
}
