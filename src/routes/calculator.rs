// src/routes/calculator.rs

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::query_as;

use crate::error::ApiError;
use crate::models::DeliveryTariff;
use crate::pricing::{self, Tariff};
use crate::AppState;

#[derive(Deserialize)]
pub struct CalculatorBody {
    pub cargo_type: Option<String>,
    pub weight: Option<Decimal>,
    pub zone: Option<String>,
    pub distance: Option<Decimal>,
    pub priority: Option<String>,        // normal | urgent | express
    pub insurance_value: Option<Decimal>,
}

/// POST /api/v1/calculator (public)
pub async fn calculate(
    State(state): State<AppState>,
    Json(b): Json<CalculatorBody>,
) -> Result<Json<Value>, ApiError> {
    let cargo_type = b
        .cargo_type
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("cargo_type is required".into()))?;
    let zone = b
        .zone
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("zone is required".into()))?;
    let weight = b
        .weight
        .ok_or_else(|| ApiError::Validation("weight is required".into()))?;
    if weight <= Decimal::ZERO {
        return Err(ApiError::Validation("weight must be positive".into()));
    }

    let tariff = query_as::<_, DeliveryTariff>(
        r#"SELECT * FROM delivery_tariffs WHERE cargo_type=$1 AND zone=$2"#,
    )
    .bind(&cargo_type)
    .bind(&zone)
    .fetch_optional(&state.pool)
    .await?
    .map(|t| Tariff {
        base_price: t.base_price,
        price_per_kg: t.price_per_kg,
        price_per_km: t.price_per_km,
    })
    .unwrap_or_else(|| Tariff::default_for_zone(&zone));

    let priority = b.priority.unwrap_or_default();
    let q = pricing::quote(&tariff, weight, b.distance, &priority, b.insurance_value);
    let breakdown = q.breakdown();

    Ok(Json(json!({
        "success": true,
        "calculation": q,
        "breakdown": breakdown,
    })))
}
