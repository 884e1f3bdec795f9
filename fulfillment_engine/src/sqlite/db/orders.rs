use chrono::NaiveDate;
use fulfillment_common::Paise;
use log::debug;
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{Cancellation, FulfillmentStatus, NewOrder, Order},
    lifecycle::project_order_status,
    sqlite::db::{assignments, items, slots},
};

/// Inserts the order header. Items are inserted separately. Not atomic on its own; call it inside a transaction.
pub async fn insert_order(
    order_number: &str,
    order: &NewOrder,
    subtotal: Paise,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let record: Order = sqlx::query_as(
        r#"
        INSERT INTO orders (order_number, customer_id, address, slot_id, subtotal, delivery_fee, total_amount)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(order_number)
    .bind(order.customer_id)
    .bind(Json(&order.address))
    .bind(order.slot_id)
    .bind(subtotal)
    .bind(order.delivery_fee)
    .bind(subtotal + order.delivery_fee)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order {} inserted with id {}", record.order_number, record.id);
    Ok(record)
}

pub async fn fetch_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_number(
    order_number: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(order_number)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_orders_for_sector_date(
    sector_id: i64,
    date: NaiveDate,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        r#"
        SELECT o.* FROM orders o
        JOIN delivery_slots s ON s.id = o.slot_id
        WHERE s.sector_id = $1 AND s.slot_date = $2 AND o.order_status NOT IN ('pending', 'cancelled')
        ORDER BY o.id ASC
        "#,
    )
    .bind(sector_id)
    .bind(date)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

/// Records the partner on the order unless one is already recorded.
pub async fn set_delivery_partner_if_unset(
    order_id: i64,
    partner_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE orders SET delivery_partner_id = $1, updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND delivery_partner_id IS NULL
        "#,
    )
    .bind(partner_id)
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

async fn write_status(
    order_id: i64,
    status: FulfillmentStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders SET
            order_status = $1,
            updated_at = CURRENT_TIMESTAMP,
            confirmed_at = CASE WHEN $2 THEN COALESCE(confirmed_at, CURRENT_TIMESTAMP) ELSE confirmed_at END,
            picked_up_at = CASE WHEN $3 THEN COALESCE(picked_up_at, CURRENT_TIMESTAMP) ELSE picked_up_at END,
            out_for_delivery_at =
                CASE WHEN $4 THEN COALESCE(out_for_delivery_at, CURRENT_TIMESTAMP) ELSE out_for_delivery_at END,
            delivered_at = CASE WHEN $5 THEN COALESCE(delivered_at, CURRENT_TIMESTAMP) ELSE delivered_at END,
            cancelled_at = CASE WHEN $6 THEN COALESCE(cancelled_at, CURRENT_TIMESTAMP) ELSE cancelled_at END
        WHERE id = $7
        RETURNING *
        "#,
    )
    .bind(status)
    .bind(status.has_reached(FulfillmentStatus::Confirmed))
    .bind(status.has_reached(FulfillmentStatus::PickedUp))
    .bind(status.has_reached(FulfillmentStatus::OutForDelivery))
    .bind(status.has_reached(FulfillmentStatus::Delivered))
    .bind(status == FulfillmentStatus::Cancelled)
    .bind(order_id)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

async fn record_cancellation(
    order_id: i64,
    cancellation: &Cancellation,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE orders SET cancellation_reason = $1, cancellation_details = $2, cancelled_by = $3
        WHERE id = $4
        "#,
    )
    .bind(cancellation.reason)
    .bind(cancellation.details.as_deref())
    .bind(cancellation.cancelled_by)
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// The outcome of [`refresh_after_item_change`].
pub struct RefreshedOrder {
    pub order: Order,
    pub slot_released: bool,
}

/// Brings everything derived from item statuses back in line after one or more items of the order changed:
///
/// * the order status projection and its milestone timestamps,
/// * pickup records and the delivery assignment status,
/// * the slot's capacity, which is given back once when the order becomes cancelled.
///
/// Must run in the same transaction as the item change.
pub async fn refresh_after_item_change(
    order_id: i64,
    cancellation: Option<&Cancellation>,
    conn: &mut SqliteConnection,
) -> Result<RefreshedOrder, sqlx::Error> {
    let previous = fetch_order(order_id, &mut *conn).await?.ok_or(sqlx::Error::RowNotFound)?;
    let statuses = items::fetch_items_for_order(order_id, &mut *conn).await?.into_iter().map(|i| i.item_status);
    let status = project_order_status(statuses);
    let mut order = write_status(order_id, status, &mut *conn).await?;
    assignments::refresh_pickups(order_id, &mut *conn).await?;
    assignments::refresh_assignment(order_id, &mut *conn).await?;
    let became_cancelled =
        previous.order_status != FulfillmentStatus::Cancelled && status == FulfillmentStatus::Cancelled;
    if became_cancelled {
        if let Some(c) = cancellation {
            record_cancellation(order_id, c, &mut *conn).await?;
            order.cancellation_reason = Some(c.reason);
            order.cancellation_details = c.details.clone();
            order.cancelled_by = Some(c.cancelled_by);
        }
        slots::release(order.slot_id, &mut *conn).await?;
        debug!("🗃️ Order {} is cancelled. Slot {} released", order.order_number, order.slot_id);
    }
    if previous.order_status != status {
        debug!("🗃️ Order {} is now {status} (was {})", order.order_number, previous.order_status);
    }
    Ok(RefreshedOrder { order, slot_released: became_cancelled })
}
