// src/routes/orders.rs

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::{query, query_as, PgPool};
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::models::ShipmentOrder;
use crate::notify;
use crate::tracking;
use crate::AppState;

pub const ORDER_TYPES: &[&str] = &["astana", "regional"];
pub const CARGO_TYPES: &[&str] = &["documents", "parcel", "cargo", "fragile", "perishable"];

// ─────────────────────────────────────────────────────────────────────────────
// Request models
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ListQ {
    pub status: Option<String>,
    pub order_type: Option<String>,
    pub phone: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateOrderBody {
    pub order_type: String,              // astana | regional
    pub pickup_address: String,
    pub pickup_city: Option<String>,
    pub ready_time: Option<String>,
    pub contact_name: String,
    pub contact_phone: String,
    pub cargo_type: String,
    pub weight: Decimal,
    pub dimensions: Option<String>,
    pub destination_city: Option<String>,
    pub delivery_address: Option<String>,
    pub delivery_method: Option<String>,
    pub desired_arrival_date: Option<NaiveDate>,
    pub recipient_contact: Option<String>,
    pub recipient_phone: Option<String>,
    pub notes: Option<String>,
    pub comment: Option<String>,
    pub uploaded_files: Option<String>,
}

#[derive(Deserialize)]
pub struct PatchOrderBody {
    pub pickup_address: Option<String>,
    pub pickup_city: Option<String>,
    pub ready_time: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub cargo_type: Option<String>,
    pub weight: Option<Decimal>,
    pub dimensions: Option<String>,
    pub destination_city: Option<String>,
    pub delivery_address: Option<String>,
    pub delivery_method: Option<String>,
    pub desired_arrival_date: Option<NaiveDate>,
    pub recipient_contact: Option<String>,
    pub recipient_phone: Option<String>,
    pub notes: Option<String>,
    pub comment: Option<String>,
    pub shipping_cost: Option<Decimal>,
    pub uploaded_files: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusBody {
    pub status: String,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct BulkIdsBody {
    pub ids: Vec<i64>,
}

#[derive(Deserialize)]
pub struct BulkRouteBody {
    pub ids: Vec<i64>,
    pub route: String,
}

#[derive(Deserialize)]
pub struct BulkPriorityBody {
    pub ids: Vec<i64>,
    pub priority: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

static ROUTE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[Маршрут:[^\]]*\]").expect("route tag regex"));
static PRIORITY_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[Приоритет:[^\]]*\]").expect("priority tag regex"));

/// Bulk screens stash their route/priority markers as bracket tags inside
/// the free-text notes; an existing tag is rewritten in place.
fn set_bracket_tag(notes: &str, re: &Regex, tag: &str) -> String {
    if re.is_match(notes) {
        re.replace(notes, NoExpand(tag)).into_owned()
    } else if notes.trim().is_empty() {
        tag.to_string()
    } else {
        format!("{} {}", notes.trim_end(), tag)
    }
}

/// Links an order to a registered client by phone, with the stored and the
/// submitted number allowed to differ by a leading '+'.
async fn resolve_client_id(pool: &PgPool, phone: &str) -> Result<Option<i64>, ApiError> {
    let bare = phone.trim_start_matches('+');
    let row: Option<(i64,)> = query_as(
        r#"SELECT id FROM clients WHERE phone = $1 OR phone = $2 OR phone = '+' || $2 LIMIT 1"#,
    )
    .bind(phone)
    .bind(bare)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| r.0))
}

async fn fetch_order(pool: &PgPool, id: i64) -> Result<ShipmentOrder, ApiError> {
    query_as::<_, ShipmentOrder>(r#"SELECT * FROM shipment_orders WHERE id=$1"#)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))
}

// ─────────────────────────────────────────────────────────────────────────────
// CRUD
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/orders
///
/// Inserts the order and its first ledger entry in one transaction.
pub async fn create_order(
    State(state): State<AppState>,
    Json(b): Json<CreateOrderBody>,
) -> Result<Json<ShipmentOrder>, ApiError> {
    if !ORDER_TYPES.contains(&b.order_type.as_str()) {
        return Err(ApiError::Validation(format!(
            "unknown order_type '{}', expected one of {:?}",
            b.order_type, ORDER_TYPES
        )));
    }
    if !CARGO_TYPES.contains(&b.cargo_type.as_str()) {
        return Err(ApiError::Validation(format!(
            "unknown cargo_type '{}', expected one of {:?}",
            b.cargo_type, CARGO_TYPES
        )));
    }
    if b.weight <= Decimal::ZERO {
        return Err(ApiError::Validation("weight must be positive".into()));
    }
    if b.pickup_address.trim().is_empty()
        || b.contact_name.trim().is_empty()
        || b.contact_phone.trim().is_empty()
    {
        return Err(ApiError::Validation(
            "pickup_address, contact_name and contact_phone are required".into(),
        ));
    }

    let client_id = resolve_client_id(&state.pool, b.contact_phone.trim()).await?;

    let mut tx = state.pool.begin().await?;
    let order = query_as::<_, ShipmentOrder>(
        r#"
        INSERT INTO shipment_orders(
            order_type, pickup_address, pickup_city, ready_time, contact_name,
            contact_phone, cargo_type, weight, dimensions, destination_city,
            delivery_address, delivery_method, desired_arrival_date,
            recipient_contact, recipient_phone, notes, comment, uploaded_files,
            client_id, status)
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,'new')
        RETURNING *
        "#,
    )
    .bind(&b.order_type)
    .bind(b.pickup_address.trim())
    .bind(&b.pickup_city)
    .bind(&b.ready_time)
    .bind(b.contact_name.trim())
    .bind(b.contact_phone.trim())
    .bind(&b.cargo_type)
    .bind(b.weight)
    .bind(&b.dimensions)
    .bind(&b.destination_city)
    .bind(&b.delivery_address)
    .bind(&b.delivery_method)
    .bind(b.desired_arrival_date)
    .bind(&b.recipient_contact)
    .bind(&b.recipient_phone)
    .bind(&b.notes)
    .bind(&b.comment)
    .bind(&b.uploaded_files)
    .bind(client_id)
    .fetch_one(&mut *tx)
    .await?;

    tracking::append_entry(
        &mut *tx,
        order.id,
        tracking::CREATED_STATUS_LABEL,
        None,
        Some("Заявка зарегистрирована в системе"),
        "system",
    )
    .await?;
    tx.commit().await?;

    info!("order {} created ({}, {})", order.id, order.order_type, order.cargo_type);
    Ok(Json(order))
}

/// GET /api/v1/orders
pub async fn list_orders(
    State(state): State<AppState>,
    Query(q): Query<ListQ>,
) -> Result<Json<Vec<ShipmentOrder>>, ApiError> {
    let limit = q.limit.unwrap_or(50).clamp(1, 500);
    let offset = q.offset.unwrap_or(0).max(0);

    let rows = query_as::<_, ShipmentOrder>(
        r#"
        SELECT * FROM shipment_orders
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR order_type = $2)
          AND ($3::text IS NULL OR contact_phone = $3)
        ORDER BY created_at DESC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(q.status)
    .bind(q.order_type)
    .bind(q.phone)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

/// GET /api/v1/orders/:id
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ShipmentOrder>, ApiError> {
    Ok(Json(fetch_order(&state.pool, id).await?))
}

/// GET /api/v1/orders/:id/history
pub async fn order_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let order = fetch_order(&state.pool, id).await?;
    let entries = tracking::history(&state.pool, id).await?;
    let history = tracking::with_created_fallback(entries, &order);

    Ok(Json(json!({
        "order_id": id,
        "status": order.status,
        "progress_percentage": tracking::progress_percentage(&order.status),
        "history": history,
    })))
}

/// PATCH /api/v1/orders/:id
///
/// Status is deliberately not editable here; status changes go through
/// `update_status` so the order row and the ledger stay paired.
pub async fn patch_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(b): Json<PatchOrderBody>,
) -> Result<Json<ShipmentOrder>, ApiError> {
    if let Some(cargo_type) = b.cargo_type.as_deref() {
        if !CARGO_TYPES.contains(&cargo_type) {
            return Err(ApiError::Validation(format!(
                "unknown cargo_type '{cargo_type}', expected one of {CARGO_TYPES:?}"
            )));
        }
    }
    if let Some(weight) = b.weight {
        if weight <= Decimal::ZERO {
            return Err(ApiError::Validation("weight must be positive".into()));
        }
    }

    let row = query_as::<_, ShipmentOrder>(
        r#"
        UPDATE shipment_orders SET
            pickup_address = COALESCE($2, pickup_address),
            pickup_city = COALESCE($3, pickup_city),
            ready_time = COALESCE($4, ready_time),
            contact_name = COALESCE($5, contact_name),
            contact_phone = COALESCE($6, contact_phone),
            cargo_type = COALESCE($7, cargo_type),
            weight = COALESCE($8, weight),
            dimensions = COALESCE($9, dimensions),
            destination_city = COALESCE($10, destination_city),
            delivery_address = COALESCE($11, delivery_address),
            delivery_method = COALESCE($12, delivery_method),
            desired_arrival_date = COALESCE($13, desired_arrival_date),
            recipient_contact = COALESCE($14, recipient_contact),
            recipient_phone = COALESCE($15, recipient_phone),
            notes = COALESCE($16, notes),
            comment = COALESCE($17, comment),
            shipping_cost = COALESCE($18, shipping_cost),
            uploaded_files = COALESCE($19, uploaded_files),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(b.pickup_address)
    .bind(b.pickup_city)
    .bind(b.ready_time)
    .bind(b.contact_name)
    .bind(b.contact_phone)
    .bind(b.cargo_type)
    .bind(b.weight)
    .bind(b.dimensions)
    .bind(b.destination_city)
    .bind(b.delivery_address)
    .bind(b.delivery_method)
    .bind(b.desired_arrival_date)
    .bind(b.recipient_contact)
    .bind(b.recipient_phone)
    .bind(b.notes)
    .bind(b.comment)
    .bind(b.shipping_cost)
    .bind(b.uploaded_files)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))?;

    Ok(Json(row))
}

// ─────────────────────────────────────────────────────────────────────────────
// Status changes
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/orders/:id/status
///
/// The order-row update and the ledger append land in one transaction.
/// Notification side effects run after commit and never fail the request.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(b): Json<StatusBody>,
) -> Result<Json<ShipmentOrder>, ApiError> {
    if !tracking::ORDER_STATUSES.contains(&b.status.as_str()) {
        return Err(ApiError::Validation(format!(
            "unknown status '{}', expected one of {:?}",
            b.status,
            tracking::ORDER_STATUSES
        )));
    }

    let mut tx = state.pool.begin().await?;
    let order = query_as::<_, ShipmentOrder>(
        r#"UPDATE shipment_orders SET status=$2, updated_at=now() WHERE id=$1 RETURNING *"#,
    )
    .bind(id)
    .bind(&b.status)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))?;

    tracking::append_entry(
        &mut *tx,
        id,
        tracking::status_label(&b.status),
        b.location.as_deref(),
        b.description.as_deref(),
        "admin",
    )
    .await?;
    tx.commit().await?;

    notify_status_change(&state, &order).await;

    Ok(Json(order))
}

async fn notify_status_change(state: &AppState, order: &ShipmentOrder) {
    let label = tracking::status_label(&order.status);

    if let Some(client_id) = order.client_id {
        let res = query(r#"INSERT INTO notifications(client_id, title, message) VALUES ($1,$2,$3)"#)
            .bind(client_id)
            .bind(format!("Заказ №{}", order.id))
            .bind(format!("{}: {}", tracking::tracking_code(order.id), label))
            .execute(&state.pool)
            .await;
        if let Err(e) = res {
            error!("failed to store notification for order {}: {e}", order.id);
        }
    }

    if let Some(cfg) = notify::resolve_telegram(&state.pool, state.config.telegram.as_ref()).await {
        let text = format!("📦 {} — {}", tracking::tracking_code(order.id), label);
        if let Err(e) = notify::send_telegram(&cfg, &text).await {
            warn!("telegram notification for order {} failed: {e}", order.id);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bulk actions
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/orders/bulk-delete — the only deletion path for orders.
pub async fn bulk_delete(
    State(state): State<AppState>,
    Json(b): Json<BulkIdsBody>,
) -> Result<Json<Value>, ApiError> {
    if b.ids.is_empty() {
        return Err(ApiError::Validation("ids must not be empty".into()));
    }
    let res = query(r#"DELETE FROM shipment_orders WHERE id = ANY($1)"#)
        .bind(&b.ids)
        .execute(&state.pool)
        .await?;
    Ok(Json(json!({ "deleted": res.rows_affected() })))
}

/// POST /api/v1/orders/bulk-route
pub async fn bulk_assign_route(
    State(state): State<AppState>,
    Json(b): Json<BulkRouteBody>,
) -> Result<Json<Value>, ApiError> {
    if b.ids.is_empty() {
        return Err(ApiError::Validation("ids must not be empty".into()));
    }
    if b.route.trim().is_empty() {
        return Err(ApiError::Validation("route must not be empty".into()));
    }
    let tag = format!("[Маршрут: {}]", b.route.trim());
    let updated = retag_notes(&state.pool, &b.ids, &ROUTE_TAG, &tag).await?;
    Ok(Json(json!({ "updated": updated })))
}

/// POST /api/v1/orders/bulk-priority
pub async fn bulk_assign_priority(
    State(state): State<AppState>,
    Json(b): Json<BulkPriorityBody>,
) -> Result<Json<Value>, ApiError> {
    if b.ids.is_empty() {
        return Err(ApiError::Validation("ids must not be empty".into()));
    }
    if b.priority.trim().is_empty() {
        return Err(ApiError::Validation("priority must not be empty".into()));
    }
    let tag = format!("[Приоритет: {}]", b.priority.trim());
    let updated = retag_notes(&state.pool, &b.ids, &PRIORITY_TAG, &tag).await?;
    Ok(Json(json!({ "updated": updated })))
}

async fn retag_notes(
    pool: &PgPool,
    ids: &[i64],
    re: &Regex,
    tag: &str,
) -> Result<u64, ApiError> {
    let mut tx = pool.begin().await?;
    let rows = query_as::<_, (i64, Option<String>)>(
        r#"SELECT id, notes FROM shipment_orders WHERE id = ANY($1)"#,
    )
    .bind(ids)
    .fetch_all(&mut *tx)
    .await?;

    let mut updated = 0u64;
    for (id, notes) in rows {
        let next = set_bracket_tag(notes.as_deref().unwrap_or(""), re, tag);
        let res = query(r#"UPDATE shipment_orders SET notes=$2, updated_at=now() WHERE id=$1"#)
            .bind(id)
            .bind(next)
            .execute(&mut *tx)
            .await?;
        updated += res.rows_affected();
    }
    tx.commit().await?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_appended_to_existing_notes() {
        let out = set_bracket_tag("хрупкий груз", &ROUTE_TAG, "[Маршрут: Север-1]");
        assert_eq!(out, "хрупкий груз [Маршрут: Север-1]");
    }

    #[test]
    fn tag_replaced_in_place() {
        let out = set_bracket_tag(
            "до обеда [Маршрут: Север-1] этаж 3",
            &ROUTE_TAG,
            "[Маршрут: Юг-2]",
        );
        assert_eq!(out, "до обеда [Маршрут: Юг-2] этаж 3");
    }

    #[test]
    fn tag_on_empty_notes() {
        assert_eq!(
            set_bracket_tag("", &PRIORITY_TAG, "[Приоритет: Срочно]"),
            "[Приоритет: Срочно]"
        );
    }

    #[test]
    fn tags_do_not_clobber_each_other() {
        let with_route = set_bracket_tag("", &ROUTE_TAG, "[Маршрут: Север-1]");
        let both = set_bracket_tag(&with_route, &PRIORITY_TAG, "[Приоритет: Срочно]");
        assert_eq!(both, "[Маршрут: Север-1] [Приоритет: Срочно]");
    }

    // The ignored tests below need a migrated database; run them with
    // `cargo test -- --ignored` and DATABASE_URL pointing at it.

    async fn test_pool() -> PgPool {
        sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&std::env::var("DATABASE_URL").expect("DATABASE_URL for ignored tests"))
            .await
            .expect("connect to test database")
    }

    #[tokio::test]
    #[ignore = "requires Postgres"]
    async fn status_update_rolls_back_together_with_ledger_failure() {
        let pool = test_pool().await;
        let order = query_as::<_, ShipmentOrder>(
            r#"
            INSERT INTO shipment_orders(order_type, pickup_address, contact_name,
                                        contact_phone, cargo_type, weight)
            VALUES ('astana', 'Кабанбай батыра 5', 'Тест', '+77010000001', 'parcel', 1)
            RETURNING *
            "#,
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        let mut tx = pool.begin().await.unwrap();
        query(r#"UPDATE shipment_orders SET status='processing', updated_at=now() WHERE id=$1"#)
            .bind(order.id)
            .execute(&mut *tx)
            .await
            .unwrap();
        // an append for a missing order violates the FK, failing the pair
        let err = tracking::append_entry(&mut *tx, -1, "В обработке", None, None, "admin").await;
        assert!(err.is_err());
        drop(tx); // rolls back

        let (status,): (String,) =
            query_as(r#"SELECT status FROM shipment_orders WHERE id=$1"#)
                .bind(order.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(status, "new");

        let entries = tracking::history(&pool, order.id).await.unwrap();
        assert!(entries.iter().all(|e| e.status != "В обработке"));
    }

    #[tokio::test]
    #[ignore = "requires Postgres"]
    async fn client_resolution_tolerates_leading_plus() {
        let pool = test_pool().await;
        query(
            r#"
            INSERT INTO clients(name, phone, password_hash)
            VALUES ('Айгерим', '+77015550001', 'x')
            ON CONFLICT (phone) DO NOTHING
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let with_plus = resolve_client_id(&pool, "+77015550001").await.unwrap();
        let without_plus = resolve_client_id(&pool, "77015550001").await.unwrap();
        assert!(with_plus.is_some());
        assert_eq!(with_plus, without_plus);
    }
}
