// src/routes/reports.rs

use axum::extract::State;
use axum::Json;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::query_as;

use crate::error::ApiError;
use crate::AppState;

/// GET /api/v1/reports/summary
pub async fn summary(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let by_status = query_as::<_, (String, i64)>(
        r#"SELECT status, COUNT(*) FROM shipment_orders GROUP BY status ORDER BY status"#,
    )
    .fetch_all(&state.pool)
    .await?;

    let by_type = query_as::<_, (String, i64)>(
        r#"SELECT order_type, COUNT(*) FROM shipment_orders GROUP BY order_type ORDER BY order_type"#,
    )
    .fetch_all(&state.pool)
    .await?;

    let (total, revenue): (i64, Option<Decimal>) =
        query_as(r#"SELECT COUNT(*), SUM(shipping_cost) FROM shipment_orders"#)
            .fetch_one(&state.pool)
            .await?;

    Ok(Json(json!({
        "total_orders": total,
        "shipping_revenue": revenue.unwrap_or(Decimal::ZERO),
        "by_status": by_status
            .into_iter()
            .map(|(status, count)| json!({ "status": status, "count": count }))
            .collect::<Vec<_>>(),
        "by_type": by_type
            .into_iter()
            .map(|(order_type, count)| json!({ "order_type": order_type, "count": count }))
            .collect::<Vec<_>>(),
    })))
}
