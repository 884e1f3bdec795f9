use chrono::NaiveDate;
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::DeliverySlot;

pub async fn fetch_slot(slot_id: i64, conn: &mut SqliteConnection) -> Result<Option<DeliverySlot>, sqlx::Error> {
    let slot = sqlx::query_as("SELECT * FROM delivery_slots WHERE id = $1").bind(slot_id).fetch_optional(conn).await?;
    Ok(slot)
}

pub async fn fetch_slots_for_sector(
    sector_id: i64,
    date: NaiveDate,
    conn: &mut SqliteConnection,
) -> Result<Vec<DeliverySlot>, sqlx::Error> {
    let slots = sqlx::query_as(
        r#"
        SELECT * FROM delivery_slots
        WHERE sector_id = $1 AND slot_date = $2 AND is_active = 1
        ORDER BY start_time ASC
        "#,
    )
    .bind(sector_id)
    .bind(date)
    .fetch_all(conn)
    .await?;
    Ok(slots)
}

/// Takes one unit of capacity if any is left. Returns `None` if the slot is full, inactive or missing.
pub async fn reserve(slot_id: i64, conn: &mut SqliteConnection) -> Result<Option<DeliverySlot>, sqlx::Error> {
    let slot: Option<DeliverySlot> = sqlx::query_as(
        r#"
        UPDATE delivery_slots SET available_orders = available_orders - 1
        WHERE id = $1 AND is_active = 1 AND available_orders > 0
        RETURNING *
        "#,
    )
    .bind(slot_id)
    .fetch_optional(conn)
    .await?;
    if let Some(s) = &slot {
        trace!("🗃️ Slot {slot_id} reserved. {} of {} left", s.available_orders, s.max_orders);
    }
    Ok(slot)
}

/// Gives one unit of capacity back, capped at `max_orders`. Returns `None` if the slot does not exist.
pub async fn release(slot_id: i64, conn: &mut SqliteConnection) -> Result<Option<DeliverySlot>, sqlx::Error> {
    let slot: Option<DeliverySlot> = sqlx::query_as(
        r#"
        UPDATE delivery_slots SET available_orders = MIN(available_orders + 1, max_orders)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(slot_id)
    .fetch_optional(conn)
    .await?;
    if let Some(s) = &slot {
        trace!("🗃️ Slot {slot_id} released. {} of {} left", s.available_orders, s.max_orders);
    }
    Ok(slot)
}

pub async fn sector_serves_postal_code(
    sector_id: i64,
    postal_code: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sector_postal_codes WHERE sector_id = $1 AND postal_code = $2")
            .bind(sector_id)
            .bind(postal_code.trim())
            .fetch_one(conn)
            .await?;
    Ok(count > 0)
}
