use chrono::NaiveDate;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::db_types::{DeliveryPartnerOrder, OrderPickup, SectorAssignment};

/// Creates an assignment unless the order already has a live one. Returns `None` when nothing was inserted.
pub async fn insert_if_unassigned(
    order_id: i64,
    partner_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliveryPartnerOrder>, sqlx::Error> {
    let record = sqlx::query_as(
        r#"
        INSERT INTO delivery_partner_orders (order_id, delivery_partner_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(partner_id)
    .fetch_optional(conn)
    .await?;
    Ok(record)
}

/// The order's live (not cancelled) assignment, if any.
pub async fn fetch_active(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliveryPartnerOrder>, sqlx::Error> {
    let record = sqlx::query_as("SELECT * FROM delivery_partner_orders WHERE order_id = $1 AND status != 'cancelled'")
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(record)
}

/// Inserts a pickup record for every vendor with live items in the order that does not have one for this partner.
/// Returns the number of records created.
pub async fn insert_missing_pickups(
    order_id: i64,
    partner_id: i64,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO order_pickups (order_id, vendor_id, delivery_partner_id)
        SELECT DISTINCT $1, vendor_id, $2 FROM order_items
        WHERE order_id = $1 AND item_status != 'cancelled'
        ON CONFLICT (order_id, vendor_id, delivery_partner_id) DO NOTHING
        "#,
    )
    .bind(order_id)
    .bind(partner_id)
    .execute(conn)
    .await?;
    let created = result.rows_affected();
    if created > 0 {
        trace!("🗃️ {created} pickup records created for order {order_id}");
    }
    Ok(created)
}

pub async fn fetch_pickups(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderPickup>, sqlx::Error> {
    let pickups = sqlx::query_as("SELECT * FROM order_pickups WHERE order_id = $1 ORDER BY vendor_id ASC, id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(pickups)
}

/// Updates pending pickup records from their vendor's items:
/// * picked up once none of the vendor's live items is still at the vendor,
/// * cancelled once all of the vendor's items are cancelled.
pub async fn refresh_pickups(order_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE order_pickups SET pickup_status = 'cancelled'
        WHERE order_id = $1 AND pickup_status = 'pending'
        AND NOT EXISTS (
            SELECT 1 FROM order_items i
            WHERE i.order_id = order_pickups.order_id
              AND i.vendor_id = order_pickups.vendor_id
              AND i.item_status != 'cancelled'
        )
        "#,
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await?;
    sqlx::query(
        r#"
        UPDATE order_pickups SET pickup_status = 'picked_up', picked_up_at = CURRENT_TIMESTAMP
        WHERE order_id = $1 AND pickup_status = 'pending'
        AND EXISTS (
            SELECT 1 FROM order_items i
            WHERE i.order_id = order_pickups.order_id
              AND i.vendor_id = order_pickups.vendor_id
              AND i.item_status IN ('picked_up', 'out_for_delivery', 'delivered')
        )
        AND NOT EXISTS (
            SELECT 1 FROM order_items i
            WHERE i.order_id = order_pickups.order_id
              AND i.vendor_id = order_pickups.vendor_id
              AND i.item_status IN ('pending', 'confirmed', 'processing', 'packed', 'assigned_to_delivery')
        )
        "#,
    )
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Updates the live assignment from the order's items:
/// * cancelled once every item is cancelled,
/// * picked up once no live item is still at a vendor,
/// * delivered once every live item is delivered.
pub async fn refresh_assignment(order_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let cancelled = sqlx::query(
        r#"
        UPDATE delivery_partner_orders SET status = 'cancelled', cancelled_at = CURRENT_TIMESTAMP
        WHERE order_id = $1 AND status IN ('assigned', 'picked_up')
        AND NOT EXISTS (SELECT 1 FROM order_items WHERE order_id = $1 AND item_status != 'cancelled')
        "#,
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await?;
    if cancelled.rows_affected() > 0 {
        debug!("🗃️ Delivery assignment for order {order_id} cancelled");
        return Ok(());
    }
    sqlx::query(
        r#"
        UPDATE delivery_partner_orders SET status = 'picked_up', picked_up_at = CURRENT_TIMESTAMP
        WHERE order_id = $1 AND status = 'assigned'
        AND EXISTS (
            SELECT 1 FROM order_items WHERE order_id = $1
            AND item_status IN ('picked_up', 'out_for_delivery', 'delivered')
        )
        AND NOT EXISTS (
            SELECT 1 FROM order_items WHERE order_id = $1
            AND item_status IN ('pending', 'confirmed', 'processing', 'packed', 'assigned_to_delivery')
        )
        "#,
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await?;
    sqlx::query(
        r#"
        UPDATE delivery_partner_orders SET
            status = 'delivered',
            delivered_at = CURRENT_TIMESTAMP,
            picked_up_at = COALESCE(picked_up_at, CURRENT_TIMESTAMP)
        WHERE order_id = $1 AND status IN ('assigned', 'picked_up')
        AND EXISTS (SELECT 1 FROM order_items WHERE order_id = $1 AND item_status = 'delivered')
        AND NOT EXISTS (
            SELECT 1 FROM order_items WHERE order_id = $1 AND item_status NOT IN ('delivered', 'cancelled')
        )
        "#,
    )
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn upsert_sector_assignment(
    sector_id: i64,
    partner_id: i64,
    date: NaiveDate,
    conn: &mut SqliteConnection,
) -> Result<SectorAssignment, sqlx::Error> {
    let record = sqlx::query_as(
        r#"
        INSERT INTO sector_assignments (sector_id, delivery_partner_id, assignment_date)
        VALUES ($1, $2, $3)
        ON CONFLICT (sector_id, delivery_partner_id, assignment_date) DO UPDATE SET is_active = 1
        RETURNING *
        "#,
    )
    .bind(sector_id)
    .bind(partner_id)
    .bind(date)
    .fetch_one(conn)
    .await?;
    Ok(record)
}

pub async fn fetch_sector_assignments(
    date: NaiveDate,
    conn: &mut SqliteConnection,
) -> Result<Vec<SectorAssignment>, sqlx::Error> {
    let records = sqlx::query_as(
        r#"
        SELECT * FROM sector_assignments
        WHERE assignment_date = $1 AND is_active = 1
        ORDER BY sector_id ASC, id ASC
        "#,
    )
    .bind(date)
    .fetch_all(conn)
    .await?;
    Ok(records)
}
