// src/routes/clients.rs

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::{query, query_as};

use crate::error::ApiError;
use crate::models::Client;
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQ {
    pub phone: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateClientBody {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Deserialize)]
pub struct PatchClientBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_verified: Option<bool>,
}

fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub async fn create_client(
    State(state): State<AppState>,
    Json(b): Json<CreateClientBody>,
) -> Result<Json<Client>, ApiError> {
    if b.name.trim().is_empty() || b.phone.trim().is_empty() || b.password.is_empty() {
        return Err(ApiError::Validation(
            "name, phone and password are required".into(),
        ));
    }

    let row = query_as::<_, Client>(
        r#"
        INSERT INTO clients(name, phone, email, password_hash)
        VALUES ($1,$2,$3,$4)
        RETURNING id, name, phone, email, password_hash, is_verified, created_at
        "#,
    )
    .bind(b.name.trim())
    .bind(b.phone.trim())
    .bind(&b.email)
    .bind(hash_password(&b.password))
    .fetch_one(&state.pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::Validation("phone already registered".into())
        }
        _ => ApiError::Database(e),
    })?;
    Ok(Json(row))
}

pub async fn list_clients(
    State(state): State<AppState>,
    Query(q): Query<ListQ>,
) -> Result<Json<Vec<Client>>, ApiError> {
    let limit = q.limit.unwrap_or(50).clamp(1, 500);
    let offset = q.offset.unwrap_or(0).max(0);

    let rows = query_as::<_, Client>(
        r#"
        SELECT * FROM clients
        WHERE ($1::text IS NULL OR phone = $1)
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(q.phone)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Client>, ApiError> {
    let row = query_as::<_, Client>(r#"SELECT * FROM clients WHERE id=$1"#)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("client {id} not found")))?;
    Ok(Json(row))
}

pub async fn patch_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(b): Json<PatchClientBody>,
) -> Result<Json<Client>, ApiError> {
    let password_hash = b.password.as_deref().map(hash_password);

    let row = query_as::<_, Client>(
        r#"
        UPDATE clients SET
            name = COALESCE($2, name),
            email = COALESCE($3, email),
            password_hash = COALESCE($4, password_hash),
            is_verified = COALESCE($5, is_verified)
        WHERE id = $1
        RETURNING id, name, phone, email, password_hash, is_verified, created_at
        "#,
    )
    .bind(id)
    .bind(b.name)
    .bind(b.email)
    .bind(password_hash)
    .bind(b.is_verified)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("client {id} not found")))?;
    Ok(Json(row))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let res = query(r#"DELETE FROM clients WHERE id=$1"#)
        .bind(id)
        .execute(&state.pool)
        .await?;
    Ok(Json(serde_json::json!({ "deleted": res.rows_affected() > 0 })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_sha256_hex() {
        let h = hash_password("qwerty123");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(h, hash_password("qwerty123"));
        assert_ne!(h, hash_password("qwerty124"));
    }
}
