// src/models/mod.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ───────────────────────────────────────
// Clients
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub phone: String,                   // natural lookup key
    pub email: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

// ───────────────────────────────────────
// Shipment orders & tracking ledger
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct ShipmentOrder {
    pub id: i64,
    pub order_type: String,              // astana | regional
    pub pickup_address: String,
    pub pickup_city: Option<String>,
    pub ready_time: Option<String>,
    pub contact_name: String,
    pub contact_phone: String,
    pub cargo_type: String,              // see routes::orders::CARGO_TYPES
    pub weight: Decimal,                 // kg
    pub dimensions: Option<String>,      // free text
    pub destination_city: Option<String>,
    pub delivery_address: Option<String>,
    pub delivery_method: Option<String>,
    pub desired_arrival_date: Option<NaiveDate>,
    pub recipient_contact: Option<String>,
    pub recipient_phone: Option<String>,
    pub notes: Option<String>,
    pub comment: Option<String>,
    pub status: String,                  // see tracking::ORDER_STATUSES
    pub shipping_cost: Option<Decimal>,  // KZT, unset until priced
    pub uploaded_files: Option<String>,  // comma-joined paths
    pub client_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One immutable event in an order's status history. `status` here is a
/// display label, deliberately not the order-status vocabulary.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct TrackingEntry {
    pub id: i64,
    pub order_id: i64,
    pub status: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub created_by: String,              // system | admin
}

// ───────────────────────────────────────
// Pricing
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct DeliveryTariff {
    pub id: i64,
    pub cargo_type: String,
    pub zone: String,
    pub base_price: Decimal,
    pub price_per_kg: Decimal,
    pub price_per_km: Decimal,
}

// ───────────────────────────────────────
// Inbox & settings
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub client_id: Option<i64>,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Setting {
    pub id: i64,
    pub key: String,
    pub value: Option<String>,
    pub value_type: String,              // string | int | bool
    pub category: String,
    pub updated_at: DateTime<Utc>,
}
