// src/routes/calendar.rs

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::query_as;

use crate::error::ApiError;
use crate::models::ShipmentOrder;
use crate::AppState;

#[derive(Deserialize)]
pub struct CalendarQ {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// GET /api/v1/calendar — orders bucketed by desired arrival day for the
/// dispatcher screen.
pub async fn calendar(
    State(state): State<AppState>,
    Query(q): Query<CalendarQ>,
) -> Result<Json<Value>, ApiError> {
    let rows = query_as::<_, ShipmentOrder>(
        r#"
        SELECT * FROM shipment_orders
        WHERE desired_arrival_date IS NOT NULL
          AND ($1::date IS NULL OR desired_arrival_date >= $1)
          AND ($2::date IS NULL OR desired_arrival_date <= $2)
        ORDER BY desired_arrival_date, id
        "#,
    )
    .bind(q.from)
    .bind(q.to)
    .fetch_all(&state.pool)
    .await?;

    let mut buckets: BTreeMap<NaiveDate, Vec<ShipmentOrder>> = BTreeMap::new();
    for order in rows {
        if let Some(day) = order.desired_arrival_date {
            buckets.entry(day).or_default().push(order);
        }
    }

    let days: Vec<Value> = buckets
        .into_iter()
        .map(|(date, orders)| json!({ "date": date, "count": orders.len(), "orders": orders }))
        .collect();

    Ok(Json(json!({ "days": days })))
}
