// src/routes/tracking.rs

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::{query_as, PgPool};

use crate::error::ApiError;
use crate::models::ShipmentOrder;
use crate::tracking;
use crate::AppState;

#[derive(Deserialize)]
pub struct TrackingQ {
    pub tracking: Option<String>,
}

/// What a raw tracking query denotes.
#[derive(Debug, PartialEq)]
enum QueryKind {
    OrderId(i64),
    Phone(String),
}

/// Order ids are bare numbers below one million; everything else, including
/// anything carrying a '+', reads as a phone number.
fn classify(raw: &str) -> QueryKind {
    let trimmed = raw.trim();
    if !trimmed.contains('+')
        && !trimmed.is_empty()
        && trimmed.chars().all(|c| c.is_ascii_digit())
    {
        if let Ok(id) = trimmed.parse::<i64>() {
            if (1..1_000_000).contains(&id) {
                return QueryKind::OrderId(id);
            }
        }
    }
    QueryKind::Phone(trimmed.to_string())
}

async fn order_block(pool: &PgPool, order: &ShipmentOrder) -> Result<Value, ApiError> {
    let entries = tracking::history(pool, order.id).await?;
    let history = tracking::with_created_fallback(entries, order);
    let current_status = history.last().map(|e| e.status.clone()).unwrap_or_default();

    let info = json!({
        "tracking_code": tracking::tracking_code(order.id),
        "current_status": current_status,
        "current_location": tracking::current_location(&history, order),
        "progress_percentage": tracking::progress_percentage(&order.status),
        "estimated_delivery": tracking::estimated_delivery(order),
    });

    Ok(json!({ "order": order, "status_history": history, "tracking_info": info }))
}

fn into_single_shape(mut block: Value) -> Value {
    if let Some(obj) = block.as_object_mut() {
        obj.insert("success".into(), json!(true));
    }
    block
}

/// GET /api/v1/tracking?tracking=<id-or-phone> (public)
pub async fn track(
    State(state): State<AppState>,
    Query(q): Query<TrackingQ>,
) -> Result<Json<Value>, ApiError> {
    let raw = q.tracking.as_deref().map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Err(ApiError::Validation("tracking parameter is required".into()));
    }

    match classify(raw) {
        QueryKind::OrderId(id) => {
            let order =
                query_as::<_, ShipmentOrder>(r#"SELECT * FROM shipment_orders WHERE id=$1"#)
                    .bind(id)
                    .fetch_optional(&state.pool)
                    .await?
                    .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))?;
            let block = order_block(&state.pool, &order).await?;
            Ok(Json(into_single_shape(block)))
        }
        QueryKind::Phone(phone) => {
            let orders = query_as::<_, ShipmentOrder>(
                r#"SELECT * FROM shipment_orders WHERE contact_phone=$1 ORDER BY created_at DESC"#,
            )
            .bind(&phone)
            .fetch_all(&state.pool)
            .await?;

            match orders.as_slice() {
                [] => Err(ApiError::NotFound(format!("no orders found for {phone}"))),
                [only] => {
                    let block = order_block(&state.pool, only).await?;
                    Ok(Json(into_single_shape(block)))
                }
                many => {
                    let mut blocks = Vec::with_capacity(many.len());
                    for order in many {
                        blocks.push(order_block(&state.pool, order).await?);
                    }
                    Ok(Json(json!({
                        "success": true,
                        "multiple": true,
                        "count": blocks.len(),
                        "orders": blocks,
                    })))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_ids_in_range() {
        assert_eq!(classify("42"), QueryKind::OrderId(42));
        assert_eq!(classify("1"), QueryKind::OrderId(1));
        assert_eq!(classify("999999"), QueryKind::OrderId(999_999));
        assert_eq!(classify("  17  "), QueryKind::OrderId(17));
    }

    #[test]
    fn out_of_range_numbers_are_phones() {
        assert_eq!(classify("0"), QueryKind::Phone("0".into()));
        assert_eq!(classify("1000000"), QueryKind::Phone("1000000".into()));
        assert_eq!(classify("77011234567"), QueryKind::Phone("77011234567".into()));
    }

    #[test]
    fn plus_always_means_phone() {
        assert_eq!(
            classify("+77011234567"),
            QueryKind::Phone("+77011234567".into())
        );
        assert_eq!(classify("+42"), QueryKind::Phone("+42".into()));
    }

    #[test]
    fn non_numeric_input_is_a_phone() {
        assert_eq!(
            classify("8 701 123 45 67"),
            QueryKind::Phone("8 701 123 45 67".into())
        );
    }
}
