use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{DeliverySlot, NewDeliverySlot, NewProduct, NewSector, Product, Sector, VendorSettings};

/// Inserts the sector and its postal codes. Not atomic on its own; call it inside a transaction.
pub async fn insert_sector(sector: NewSector, conn: &mut SqliteConnection) -> Result<Sector, sqlx::Error> {
    let record: Sector = sqlx::query_as("INSERT INTO sectors (name) VALUES ($1) RETURNING *")
        .bind(sector.name.trim())
        .fetch_one(&mut *conn)
        .await?;
    for code in &sector.postal_codes {
        sqlx::query("INSERT OR IGNORE INTO sector_postal_codes (sector_id, postal_code) VALUES ($1, $2)")
            .bind(record.id)
            .bind(code.trim())
            .execute(&mut *conn)
            .await?;
    }
    debug!("🗃️ Sector {} created with {} postal codes", record.name, sector.postal_codes.len());
    Ok(record)
}

pub async fn fetch_sector(sector_id: i64, conn: &mut SqliteConnection) -> Result<Option<Sector>, sqlx::Error> {
    let sector = sqlx::query_as("SELECT * FROM sectors WHERE id = $1").bind(sector_id).fetch_optional(conn).await?;
    Ok(sector)
}

pub async fn insert_slot(slot: &NewDeliverySlot, conn: &mut SqliteConnection) -> Result<DeliverySlot, sqlx::Error> {
    let record = sqlx::query_as(
        r#"
        INSERT INTO delivery_slots (sector_id, slot_date, start_time, end_time, cutoff_time, max_orders, available_orders)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        RETURNING *
        "#,
    )
    .bind(slot.sector_id)
    .bind(slot.slot_date)
    .bind(slot.start_time)
    .bind(slot.end_time)
    .bind(slot.cutoff_time)
    .bind(slot.max_orders)
    .fetch_one(conn)
    .await?;
    Ok(record)
}

/// Like [`insert_slot`], but returns `None` instead of failing when a slot with the same sector, date and start time
/// already exists.
pub async fn insert_slot_if_absent(
    slot: &NewDeliverySlot,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliverySlot>, sqlx::Error> {
    let record = sqlx::query_as(
        r#"
        INSERT INTO delivery_slots (sector_id, slot_date, start_time, end_time, cutoff_time, max_orders, available_orders)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        ON CONFLICT (sector_id, slot_date, start_time) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(slot.sector_id)
    .bind(slot.slot_date)
    .bind(slot.start_time)
    .bind(slot.end_time)
    .bind(slot.cutoff_time)
    .bind(slot.max_orders)
    .fetch_optional(conn)
    .await?;
    Ok(record)
}

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let record = sqlx::query_as(
        r#"
        INSERT INTO products (vendor_id, name, unit_price, stock_quantity)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(product.vendor_id)
    .bind(product.name)
    .bind(product.unit_price)
    .bind(product.stock_quantity)
    .fetch_one(conn)
    .await?;
    Ok(record)
}

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product =
        sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(product)
}

/// Removes `quantity` units from stock if, and only if, that many are on hand. Returns `None` otherwise.
pub async fn take_stock(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as(
        r#"
        UPDATE products SET stock_quantity = stock_quantity - $1, updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND is_active = 1 AND stock_quantity >= $1
        RETURNING *
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    Ok(product)
}

pub async fn restore_stock(product_id: i64, quantity: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE products SET stock_quantity = stock_quantity + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
    )
    .bind(quantity)
    .bind(product_id)
    .execute(conn)
    .await?;
    debug!("🗃️ {quantity} units of product {product_id} returned to stock");
    Ok(())
}

pub async fn upsert_vendor_settings(
    settings: VendorSettings,
    conn: &mut SqliteConnection,
) -> Result<VendorSettings, sqlx::Error> {
    let record = sqlx::query_as(
        r#"
        INSERT INTO vendor_settings (vendor_id, auto_approve_orders, auto_approve_under_amount, confirmation_timeout_minutes)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (vendor_id) DO UPDATE SET
            auto_approve_orders = excluded.auto_approve_orders,
            auto_approve_under_amount = excluded.auto_approve_under_amount,
            confirmation_timeout_minutes = excluded.confirmation_timeout_minutes,
            updated_at = CURRENT_TIMESTAMP
        RETURNING vendor_id, auto_approve_orders, auto_approve_under_amount, confirmation_timeout_minutes
        "#,
    )
    .bind(settings.vendor_id)
    .bind(settings.auto_approve_orders)
    .bind(settings.auto_approve_under_amount)
    .bind(settings.confirmation_timeout_minutes)
    .fetch_one(conn)
    .await?;
    Ok(record)
}

pub async fn fetch_vendor_settings(
    vendor_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<VendorSettings>, sqlx::Error> {
    let settings = sqlx::query_as(
        r#"
        SELECT vendor_id, auto_approve_orders, auto_approve_under_amount, confirmation_timeout_minutes
        FROM vendor_settings WHERE vendor_id = $1
        "#,
    )
    .bind(vendor_id)
    .fetch_optional(conn)
    .await?;
    Ok(settings)
}
