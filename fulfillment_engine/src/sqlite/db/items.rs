use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Cancellation, FulfillmentStatus, OrderItem, Product},
    traits::PendingConfirmation,
};

/// Snapshots the product's name and price onto a new item.
pub async fn insert_item(
    order_id: i64,
    product: &Product,
    quantity: i64,
    pickup_otp: &str,
    delivery_otp: &str,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, sqlx::Error> {
    let item = sqlx::query_as(
        r#"
        INSERT INTO order_items (
            order_id,
            vendor_id,
            product_id,
            product_name,
            quantity,
            unit_price,
            line_total,
            pickup_otp,
            delivery_otp
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(product.vendor_id)
    .bind(product.id)
    .bind(&product.name)
    .bind(quantity)
    .bind(product.unit_price)
    .bind(product.unit_price * quantity)
    .bind(pickup_otp)
    .bind(delivery_otp)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_item(item_id: i64, conn: &mut SqliteConnection) -> Result<Option<OrderItem>, sqlx::Error> {
    let item = sqlx::query_as("SELECT * FROM order_items WHERE id = $1").bind(item_id).fetch_optional(conn).await?;
    Ok(item)
}

pub async fn fetch_items_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

// Shared SET clause for forward transitions. $1 is the target status.
const STAMP_MILESTONES: &str = r#"
    item_status = $1,
    updated_at = CURRENT_TIMESTAMP,
    confirmed_at = CASE WHEN $1 = 'confirmed' THEN CURRENT_TIMESTAMP ELSE confirmed_at END,
    packed_at = CASE WHEN $1 = 'packed' THEN CURRENT_TIMESTAMP ELSE packed_at END,
    picked_up_at = CASE WHEN $1 = 'picked_up' THEN CURRENT_TIMESTAMP ELSE picked_up_at END,
    delivered_at = CASE WHEN $1 = 'delivered' THEN CURRENT_TIMESTAMP ELSE delivered_at END
"#;

/// Moves the item to `to` if it is still in `from`.
pub async fn transition(
    item_id: i64,
    from: FulfillmentStatus,
    to: FulfillmentStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderItem>, sqlx::Error> {
    let sql = format!("UPDATE order_items SET {STAMP_MILESTONES} WHERE id = $2 AND item_status = $3 RETURNING *");
    let item = sqlx::query_as(&sql).bind(to).bind(item_id).bind(from).fetch_optional(conn).await?;
    trace!("🗃️ Item {item_id} {from} -> {to}: {}", if item.is_some() { "moved" } else { "no match" });
    Ok(item)
}

/// Moves every item of the order that is in `from` to `to`.
pub async fn transition_for_order(
    order_id: i64,
    from: FulfillmentStatus,
    to: FulfillmentStatus,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, sqlx::Error> {
    let sql =
        format!("UPDATE order_items SET {STAMP_MILESTONES} WHERE order_id = $2 AND item_status = $3 RETURNING *");
    let items = sqlx::query_as(&sql).bind(to).bind(order_id).bind(from).fetch_all(conn).await?;
    Ok(items)
}

pub async fn auto_confirm(item_id: i64, conn: &mut SqliteConnection) -> Result<Option<OrderItem>, sqlx::Error> {
    let item = sqlx::query_as(
        r#"
        UPDATE order_items SET
            item_status = 'confirmed',
            auto_confirmed = 1,
            confirmed_at = CURRENT_TIMESTAMP,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $1 AND item_status = 'pending'
        RETURNING *
        "#,
    )
    .bind(item_id)
    .fetch_optional(conn)
    .await?;
    Ok(item)
}

pub async fn escalate(item_id: i64, conn: &mut SqliteConnection) -> Result<Option<OrderItem>, sqlx::Error> {
    let item = sqlx::query_as(
        r#"
        UPDATE order_items SET is_urgent = 1, escalated_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
        WHERE id = $1 AND item_status = 'pending' AND is_urgent = 0
        RETURNING *
        "#,
    )
    .bind(item_id)
    .fetch_optional(conn)
    .await?;
    Ok(item)
}

/// Cancels the item if it is still in `from`. Both OTPs are cleared so that a cancelled item can never be picked up or
/// delivered.
pub async fn cancel(
    item_id: i64,
    from: FulfillmentStatus,
    cancellation: &Cancellation,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderItem>, sqlx::Error> {
    let item = sqlx::query_as(
        r#"
        UPDATE order_items SET
            item_status = 'cancelled',
            cancellation_reason = $1,
            cancellation_details = $2,
            cancelled_by = $3,
            pickup_otp = NULL,
            delivery_otp = NULL,
            cancelled_at = CURRENT_TIMESTAMP,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $4 AND item_status = $5
        RETURNING *
        "#,
    )
    .bind(cancellation.reason)
    .bind(cancellation.details.as_deref())
    .bind(cancellation.cancelled_by)
    .bind(item_id)
    .bind(from)
    .fetch_optional(conn)
    .await?;
    Ok(item)
}

/// Picks up every item carrying the pickup code, but only if all of them are ready. Either the code is consumed
/// by every item holding it, or nothing changes.
pub async fn consume_pickup_otp(
    order_id: i64,
    otp: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as(
        r#"
        UPDATE order_items SET
            item_status = 'picked_up',
            pickup_otp = NULL,
            picked_up_at = CURRENT_TIMESTAMP,
            updated_at = CURRENT_TIMESTAMP
        WHERE order_id = $1 AND pickup_otp = $2 AND item_status IN ('packed', 'assigned_to_delivery')
        AND NOT EXISTS (
            SELECT 1 FROM order_items waiting
            WHERE waiting.order_id = $1 AND waiting.pickup_otp = $2
            AND waiting.item_status NOT IN ('packed', 'assigned_to_delivery')
        )
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(otp)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

/// The delivery leg is a single hand-over: the code is accepted only once every live item is out for delivery.
pub async fn consume_delivery_otp(
    order_id: i64,
    otp: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as(
        r#"
        UPDATE order_items SET
            item_status = 'delivered',
            delivery_otp = NULL,
            delivered_at = CURRENT_TIMESTAMP,
            updated_at = CURRENT_TIMESTAMP
        WHERE order_id = $1 AND delivery_otp = $2 AND item_status = 'out_for_delivery'
        AND NOT EXISTS (
            SELECT 1 FROM order_items waiting
            WHERE waiting.order_id = $1 AND waiting.delivery_otp = $2
            AND waiting.item_status <> 'out_for_delivery'
        )
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(otp)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

pub async fn count_with_pickup_otp(order_id: i64, otp: &str, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE order_id = $1 AND pickup_otp = $2")
        .bind(order_id)
        .bind(otp)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

pub async fn count_with_delivery_otp(
    order_id: i64,
    otp: &str,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE order_id = $1 AND delivery_otp = $2")
        .bind(order_id)
        .bind(otp)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

pub async fn fetch_unconfirmed(conn: &mut SqliteConnection) -> Result<Vec<PendingConfirmation>, sqlx::Error> {
    let items = sqlx::query_as(
        r#"
        SELECT
            i.id AS item_id,
            i.order_id,
            i.vendor_id,
            i.created_at,
            o.total_amount AS order_total,
            s.auto_approve_orders,
            s.auto_approve_under_amount,
            s.confirmation_timeout_minutes
        FROM order_items i
        JOIN orders o ON o.id = i.order_id
        LEFT JOIN vendor_settings s ON s.vendor_id = i.vendor_id
        WHERE i.item_status = 'pending' AND i.is_urgent = 0
        ORDER BY i.created_at ASC, i.id ASC
        "#,
    )
    .fetch_all(conn)
    .await?;
    Ok(items)
}

pub async fn update_vendor_notes(
    item_id: i64,
    notes: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderItem>, sqlx::Error> {
    let item =
        sqlx::query_as("UPDATE order_items SET vendor_notes = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(notes)
            .bind(item_id)
            .fetch_optional(conn)
            .await?;
    Ok(item)
}
