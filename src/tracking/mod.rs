// src/tracking/mod.rs
//
// Append-only status ledger and the display state derived from it. Entries
// are only ever inserted; history is reconstructed by ascending timestamp.

use chrono::{DateTime, Duration, Utc};
use sqlx::{query_as, PgPool};

use crate::models::{ShipmentOrder, TrackingEntry};

/// Closed order-status vocabulary; every status write is checked against it.
pub const ORDER_STATUSES: &[&str] = &[
    "new",
    "pending",
    "confirmed",
    "processing",
    "in_progress",
    "out_for_delivery",
    "completed",
    "delivered",
    "cancelled",
];

/// Ledger label written at order creation.
pub const CREATED_STATUS_LABEL: &str = "Заказ создан";

/// Shown when no ledger entry ever carried a location.
pub const DEFAULT_LOCATION: &str = "Astana, office";

/// The only mutator of the ledger. Takes any executor so the status-change
/// path can run it inside its transaction.
pub async fn append_entry<'e, E>(
    executor: E,
    order_id: i64,
    status: &str,
    location: Option<&str>,
    description: Option<&str>,
    created_by: &str,
) -> Result<TrackingEntry, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    query_as::<_, TrackingEntry>(
        r#"
        INSERT INTO shipment_tracking(order_id, status, location, description, created_by)
        VALUES ($1,$2,$3,$4,$5)
        RETURNING id, order_id, status, location, description, timestamp, created_by
        "#,
    )
    .bind(order_id)
    .bind(status)
    .bind(location)
    .bind(description)
    .bind(created_by)
    .fetch_one(executor)
    .await
}

pub async fn history(pool: &PgPool, order_id: i64) -> Result<Vec<TrackingEntry>, sqlx::Error> {
    query_as::<_, TrackingEntry>(
        r#"SELECT * FROM shipment_tracking WHERE order_id=$1 ORDER BY timestamp ASC, id ASC"#,
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
}

/// History is never rendered empty: orders that predate the ledger (or whose
/// initial entry never landed) get a single synthetic creation event stamped
/// with the order's creation time.
pub fn with_created_fallback(
    entries: Vec<TrackingEntry>,
    order: &ShipmentOrder,
) -> Vec<TrackingEntry> {
    if !entries.is_empty() {
        return entries;
    }
    vec![TrackingEntry {
        id: 0,
        order_id: order.id,
        status: CREATED_STATUS_LABEL.to_string(),
        location: None,
        description: Some("Заявка зарегистрирована в системе".into()),
        timestamp: order.created_at,
        created_by: "system".into(),
    }]
}

/// Latest recorded location, with two fallbacks: a successfully finished
/// order without any recorded location reads as its delivery address, and
/// everything else as the office.
pub fn current_location(entries: &[TrackingEntry], order: &ShipmentOrder) -> String {
    if let Some(loc) = entries.iter().rev().find_map(|e| e.location.clone()) {
        return loc;
    }
    if matches!(order.status.as_str(), "completed" | "delivered") {
        if let Some(addr) = order.delivery_address.as_deref() {
            if !addr.is_empty() {
                return addr.to_string();
            }
        }
    }
    DEFAULT_LOCATION.to_string()
}

/// Pure total mapping from order status to a 0–100 display value.
/// Unrecognized statuses read as 0, never as some known stage.
pub fn progress_percentage(status: &str) -> i32 {
    match status {
        "new" => 5,
        "pending" => 10,
        "confirmed" => 20,
        "processing" => 30,
        "in_progress" => 60,
        "out_for_delivery" => 80,
        "completed" => 100,
        "delivered" => 100,
        "cancelled" => 0,
        _ => 0,
    }
}

/// Display phrase recorded into the ledger when an admin changes a status.
pub fn status_label(status: &str) -> &'static str {
    match status {
        "new" => "Новый заказ",
        "pending" => "Ожидает подтверждения",
        "confirmed" => "Заказ подтверждён",
        "processing" => "В обработке",
        "in_progress" => "В пути",
        "out_for_delivery" => "Передан курьеру",
        "completed" => "Заказ выполнен",
        "delivered" => "Доставлен получателю",
        "cancelled" => "Заказ отменён",
        _ => "Статус обновлён",
    }
}

pub fn tracking_code(order_id: i64) -> String {
    format!("KZ{:06}", order_id)
}

/// Heuristic, recomputed on every read and never persisted: four hours for
/// addresses inside Astana, a day for everything else.
pub fn estimated_delivery(order: &ShipmentOrder) -> DateTime<Utc> {
    let addr = order.delivery_address.as_deref().unwrap_or("");
    if addr.contains("Astana") {
        order.created_at + Duration::hours(4)
    } else {
        order.created_at + Duration::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn order(status: &str, delivery_address: Option<&str>) -> ShipmentOrder {
        let created = Utc.with_ymd_and_hms(2024, 3, 14, 9, 30, 0).unwrap();
        ShipmentOrder {
            id: 7,
            order_type: "regional".into(),
            pickup_address: "Кабанбай батыра 11".into(),
            pickup_city: Some("Astana".into()),
            ready_time: None,
            contact_name: "Арман".into(),
            contact_phone: "+77011234567".into(),
            cargo_type: "parcel".into(),
            weight: dec!(3.5),
            dimensions: None,
            destination_city: Some("Karaganda".into()),
            delivery_address: delivery_address.map(str::to_string),
            delivery_method: None,
            desired_arrival_date: None,
            recipient_contact: None,
            recipient_phone: None,
            notes: None,
            comment: None,
            status: status.into(),
            shipping_cost: None,
            uploaded_files: None,
            client_id: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn entry(minutes: i64, location: Option<&str>) -> TrackingEntry {
        TrackingEntry {
            id: minutes,
            order_id: 7,
            status: "В пути".into(),
            location: location.map(str::to_string),
            description: None,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 14, 10, 0, 0).unwrap()
                + Duration::minutes(minutes),
            created_by: "admin".into(),
        }
    }

    #[test]
    fn progress_table_is_total() {
        assert_eq!(progress_percentage("new"), 5);
        assert_eq!(progress_percentage("pending"), 10);
        assert_eq!(progress_percentage("confirmed"), 20);
        assert_eq!(progress_percentage("processing"), 30);
        assert_eq!(progress_percentage("in_progress"), 60);
        assert_eq!(progress_percentage("out_for_delivery"), 80);
        assert_eq!(progress_percentage("completed"), 100);
        assert_eq!(progress_percentage("delivered"), 100);
        assert_eq!(progress_percentage("cancelled"), 0);
        assert_eq!(progress_percentage("unknown_status"), 0);
        assert_eq!(progress_percentage(""), 0);
    }

    #[test]
    fn tracking_code_is_zero_padded() {
        assert_eq!(tracking_code(42), "KZ000042");
        assert_eq!(tracking_code(123456), "KZ123456");
    }

    #[test]
    fn estimate_is_four_hours_inside_astana() {
        let o = order("new", Some("Astana, Turan 37"));
        assert_eq!(estimated_delivery(&o), o.created_at + Duration::hours(4));
    }

    #[test]
    fn estimate_is_next_day_elsewhere() {
        let o = order("new", Some("Karaganda, Gogol 12"));
        assert_eq!(estimated_delivery(&o), o.created_at + Duration::days(1));

        let no_addr = order("new", None);
        assert_eq!(estimated_delivery(&no_addr), no_addr.created_at + Duration::days(1));
    }

    #[test]
    fn empty_history_synthesizes_creation_entry() {
        let o = order("new", None);
        let h = with_created_fallback(Vec::new(), &o);
        assert_eq!(h.len(), 1);
        assert_eq!(h[0].status, CREATED_STATUS_LABEL);
        assert_eq!(h[0].timestamp, o.created_at);
        assert_eq!(h[0].created_by, "system");
    }

    #[test]
    fn existing_history_is_untouched() {
        let o = order("processing", None);
        let h = with_created_fallback(
            vec![entry(0, None), entry(5, Some("Сортировочный центр"))],
            &o,
        );
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn location_comes_from_latest_entry_carrying_one() {
        let o = order("in_progress", None);
        let h = vec![
            entry(0, Some("Склад отправителя")),
            entry(5, Some("Сортировочный центр")),
            entry(9, None),
        ];
        assert_eq!(current_location(&h, &o), "Сортировочный центр");
    }

    #[test]
    fn completed_order_without_locations_reads_as_delivery_address() {
        let o = order("completed", Some("Karaganda"));
        assert_eq!(current_location(&[], &o), "Karaganda");
        assert_eq!(progress_percentage(&o.status), 100);
    }

    #[test]
    fn office_is_the_default_location() {
        let o = order("new", Some("Karaganda"));
        assert_eq!(current_location(&[], &o), DEFAULT_LOCATION);
    }
}
