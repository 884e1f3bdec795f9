//! `SqliteDatabase` is a concrete implementation of a fulfillment engine backend.
//!
//! It uses SQLite as the backend and implements all the traits defined in the [`crate::traits`] module.
//!
//! Every write transaction starts with a conditional write, so it takes the database write lock at its first
//! statement. Reads that only validate input happen before the transaction opens.
use std::fmt::Debug;

use chrono::{NaiveDate, Utc};
use fulfillment_common::Paise;
use log::*;
use sqlx::SqlitePool;

use super::db::{assignments, catalog, db_url, items, new_pool, orders, payouts, slots, wallets};
use crate::{
    db_types::{
        Cancellation,
        DeliveryPartnerOrder,
        DeliverySlot,
        FulfillmentStatus,
        NewDeliverySlot,
        NewOrder,
        NewPayoutRequest,
        NewProduct,
        NewSector,
        Order,
        OrderItem,
        OrderPickup,
        PayoutRequest,
        PayoutSettings,
        PayoutStatus,
        Product,
        Sector,
        SectorAssignment,
        VendorSettings,
        VendorWallet,
    },
    helpers::{generate_order_number, generate_otp, generate_pickup_otps},
    traits::{
        AssignmentManagement,
        CancelOutcome,
        CatalogManagement,
        FulfillmentDatabase,
        FulfillmentError,
        ItemUpdated,
        ItemsUpdated,
        OrderManagement,
        PayoutQueryFilter,
        PendingConfirmation,
        SlotManagement,
        WalletManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `FMS_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding schema migrations.
    pub async fn migrate(&self) -> Result<(), FulfillmentError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }
}

/// Explains why a conditional item write matched nothing.
async fn item_write_missed(
    item_id: i64,
    expected: FulfillmentStatus,
    conn: &mut sqlx::SqliteConnection,
) -> FulfillmentError {
    match items::fetch_item(item_id, conn).await {
        Ok(Some(item)) => FulfillmentError::Conflict(format!(
            "Item {item_id} is {} and no longer {expected}. It was changed by another request",
            item.item_status
        )),
        Ok(None) => FulfillmentError::NotFound(format!("Item {item_id}")),
        Err(e) => e.into(),
    }
}

async fn payout_write_missed(
    payout_id: i64,
    expected: PayoutStatus,
    conn: &mut sqlx::SqliteConnection,
) -> FulfillmentError {
    match payouts::fetch_payout(payout_id, conn).await {
        Ok(Some(p)) => FulfillmentError::Conflict(format!(
            "Payout request {payout_id} is {} and no longer {expected}",
            p.payout_status
        )),
        Ok(None) => FulfillmentError::NotFound(format!("Payout request {payout_id}")),
        Err(e) => e.into(),
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn create_sector(&self, sector: NewSector) -> Result<Sector, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let record = catalog::insert_sector(sector, &mut tx).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn fetch_sector(&self, sector_id: i64) -> Result<Option<Sector>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let sector = catalog::fetch_sector(sector_id, &mut conn).await?;
        Ok(sector)
    }

    async fn create_slot(&self, slot: NewDeliverySlot) -> Result<DeliverySlot, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let record = catalog::insert_slot(&slot, &mut conn).await?;
        debug!("🗃️ Slot {} created for sector {} on {}", record.id, record.sector_id, record.slot_date);
        Ok(record)
    }

    async fn create_slots_for_dates(
        &self,
        template: NewDeliverySlot,
        dates: &[NaiveDate],
    ) -> Result<Vec<DeliverySlot>, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(dates.len());
        for date in dates {
            let slot = NewDeliverySlot { slot_date: *date, ..template.clone() };
            if let Some(record) = catalog::insert_slot_if_absent(&slot, &mut tx).await? {
                created.push(record);
            }
        }
        tx.commit().await?;
        debug!("🗃️ {} of {} slots created for sector {}", created.len(), dates.len(), template.sector_id);
        Ok(created)
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let record = catalog::insert_product(product, &mut conn).await?;
        Ok(record)
    }

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let product = catalog::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn upsert_vendor_settings(&self, settings: VendorSettings) -> Result<VendorSettings, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let record = catalog::upsert_vendor_settings(settings, &mut conn).await?;
        Ok(record)
    }

    async fn fetch_vendor_settings(&self, vendor_id: i64) -> Result<Option<VendorSettings>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let settings = catalog::fetch_vendor_settings(vendor_id, &mut conn).await?;
        Ok(settings)
    }
}

impl SlotManagement for SqliteDatabase {
    async fn fetch_slot(&self, slot_id: i64) -> Result<Option<DeliverySlot>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let slot = slots::fetch_slot(slot_id, &mut conn).await?;
        Ok(slot)
    }

    async fn fetch_slots_for_sector(
        &self,
        sector_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<DeliverySlot>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let slots = slots::fetch_slots_for_sector(sector_id, date, &mut conn).await?;
        Ok(slots)
    }

    async fn reserve_slot(&self, slot_id: i64) -> Result<DeliverySlot, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        match slots::reserve(slot_id, &mut conn).await? {
            Some(slot) => Ok(slot),
            None => match slots::fetch_slot(slot_id, &mut conn).await? {
                Some(s) if s.is_active => Err(FulfillmentError::CapacityExceeded(slot_id)),
                _ => Err(FulfillmentError::NotFound(format!("Delivery slot {slot_id}"))),
            },
        }
    }

    async fn release_slot(&self, slot_id: i64) -> Result<DeliverySlot, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        slots::release(slot_id, &mut conn)
            .await?
            .ok_or_else(|| FulfillmentError::NotFound(format!("Delivery slot {slot_id}")))
    }

    async fn sector_serves_postal_code(&self, sector_id: i64, postal_code: &str) -> Result<bool, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let result = slots::sector_serves_postal_code(sector_id, postal_code, &mut conn).await?;
        Ok(result)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>), FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        // Capacity first. This is also the statement that takes the write lock.
        if slots::reserve(order.slot_id, &mut tx).await?.is_none() {
            let slot = slots::fetch_slot(order.slot_id, &mut tx).await?;
            return match slot {
                Some(s) if s.is_active => Err(FulfillmentError::CapacityExceeded(order.slot_id)),
                _ => Err(FulfillmentError::NotFound(format!("Delivery slot {}", order.slot_id))),
            };
        }
        let mut products = Vec::with_capacity(order.items.len());
        for line in &order.items {
            match catalog::take_stock(line.product_id, line.quantity, &mut tx).await? {
                Some(product) => products.push((product, line.quantity)),
                None => {
                    return match catalog::fetch_product(line.product_id, &mut tx).await? {
                        Some(p) if p.is_active => Err(FulfillmentError::OutOfStock {
                            product_id: line.product_id,
                            requested: line.quantity,
                        }),
                        _ => Err(FulfillmentError::NotFound(format!("Product {}", line.product_id))),
                    };
                },
            }
        }
        let subtotal = products.iter().map(|(p, qty)| p.unit_price * *qty).sum::<Paise>();
        let order_number = generate_order_number(Utc::now().date_naive());
        let header = orders::insert_order(&order_number, &order, subtotal, &mut tx).await?;
        let pickup_otps = generate_pickup_otps(products.iter().map(|(p, _)| p.vendor_id));
        let delivery_otp = generate_otp();
        let mut records = Vec::with_capacity(products.len());
        for (product, quantity) in &products {
            let pickup_otp = pickup_otps.get(&product.vendor_id).map(String::as_str).unwrap_or_default();
            let item = items::insert_item(header.id, product, *quantity, pickup_otp, &delivery_otp, &mut tx).await?;
            records.push(item);
        }
        tx.commit().await?;
        info!(
            "🗃️ Order {} placed by customer {} with {} items for {}",
            header.order_number,
            header.customer_id,
            records.len(),
            header.total_amount
        );
        Ok((header, records))
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_number(order_number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let items = items::fetch_items_for_order(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn fetch_item(&self, item_id: i64) -> Result<Option<OrderItem>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let item = items::fetch_item(item_id, &mut conn).await?;
        Ok(item)
    }

    async fn fetch_orders_for_sector_date(
        &self,
        sector_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<Order>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_sector_date(sector_id, date, &mut conn).await?;
        Ok(orders)
    }

    async fn transition_item(
        &self,
        item_id: i64,
        from: FulfillmentStatus,
        to: FulfillmentStatus,
    ) -> Result<ItemUpdated, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let item = match items::transition(item_id, from, to, &mut tx).await? {
            Some(item) => item,
            None => return Err(item_write_missed(item_id, from, &mut tx).await),
        };
        let refreshed = orders::refresh_after_item_change(item.order_id, None, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Item {item_id} of order {} moved from {from} to {to}", refreshed.order.order_number);
        Ok(ItemUpdated { item, order: refreshed.order })
    }

    async fn transition_order_items(
        &self,
        order_id: i64,
        from: FulfillmentStatus,
        to: FulfillmentStatus,
    ) -> Result<ItemsUpdated, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let moved = items::transition_for_order(order_id, from, to, &mut tx).await?;
        let order = if moved.is_empty() {
            orders::fetch_order(order_id, &mut tx).await?
        } else {
            Some(orders::refresh_after_item_change(order_id, None, &mut tx).await?.order)
        };
        let order = order.ok_or_else(|| FulfillmentError::NotFound(format!("Order {order_id}")))?;
        tx.commit().await?;
        debug!("🗃️ {} items of order {} moved from {from} to {to}", moved.len(), order.order_number);
        Ok(ItemsUpdated { items: moved, order })
    }

    async fn cancel_item(
        &self,
        item_id: i64,
        from: FulfillmentStatus,
        cancellation: Cancellation,
    ) -> Result<CancelOutcome, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let item = match items::cancel(item_id, from, &cancellation, &mut tx).await? {
            Some(item) => item,
            None => return Err(item_write_missed(item_id, from, &mut tx).await),
        };
        catalog::restore_stock(item.product_id, item.quantity, &mut tx).await?;
        let refreshed = orders::refresh_after_item_change(item.order_id, Some(&cancellation), &mut tx).await?;
        tx.commit().await?;
        info!(
            "🗃️ Item {item_id} of order {} cancelled by {} ({})",
            refreshed.order.order_number, cancellation.cancelled_by, cancellation.reason
        );
        Ok(CancelOutcome {
            stock_restored: item.quantity,
            item,
            order: refreshed.order,
            slot_released: refreshed.slot_released,
        })
    }

    async fn consume_pickup_otp(&self, order_id: i64, otp: &str) -> Result<ItemsUpdated, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let picked = items::consume_pickup_otp(order_id, otp, &mut tx).await?;
        if picked.is_empty() {
            let holders = items::count_with_pickup_otp(order_id, otp, &mut tx).await?;
            return if holders > 0 {
                Err(FulfillmentError::InvalidTransition(
                    "Every item for this pickup code must be packed before it is collected".into(),
                ))
            } else {
                Err(FulfillmentError::InvalidOtp)
            };
        }
        let refreshed = orders::refresh_after_item_change(order_id, None, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ {} items of order {} picked up", picked.len(), refreshed.order.order_number);
        Ok(ItemsUpdated { items: picked, order: refreshed.order })
    }

    async fn consume_delivery_otp(&self, order_id: i64, otp: &str) -> Result<ItemsUpdated, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let delivered = items::consume_delivery_otp(order_id, otp, &mut tx).await?;
        if delivered.is_empty() {
            let holders = items::count_with_delivery_otp(order_id, otp, &mut tx).await?;
            return if holders > 0 {
                Err(FulfillmentError::InvalidTransition(
                    "Every item of this order must be out for delivery before it is handed over".into(),
                ))
            } else {
                Err(FulfillmentError::InvalidOtp)
            };
        }
        let refreshed = orders::refresh_after_item_change(order_id, None, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ {} items of order {} delivered", delivered.len(), refreshed.order.order_number);
        Ok(ItemsUpdated { items: delivered, order: refreshed.order })
    }

    async fn fetch_unconfirmed_items(&self) -> Result<Vec<PendingConfirmation>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let items = items::fetch_unconfirmed(&mut conn).await?;
        Ok(items)
    }

    async fn auto_confirm_item(&self, item_id: i64) -> Result<ItemUpdated, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let item = match items::auto_confirm(item_id, &mut tx).await? {
            Some(item) => item,
            None => return Err(item_write_missed(item_id, FulfillmentStatus::Pending, &mut tx).await),
        };
        let refreshed = orders::refresh_after_item_change(item.order_id, None, &mut tx).await?;
        tx.commit().await?;
        Ok(ItemUpdated { item, order: refreshed.order })
    }

    async fn escalate_item(&self, item_id: i64) -> Result<Option<OrderItem>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let item = items::escalate(item_id, &mut conn).await?;
        Ok(item)
    }

    async fn update_vendor_notes(&self, item_id: i64, notes: &str) -> Result<OrderItem, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        items::update_vendor_notes(item_id, notes, &mut conn)
            .await?
            .ok_or_else(|| FulfillmentError::NotFound(format!("Item {item_id}")))
    }
}

/// The assignment half of [`AssignmentManagement::ensure_assignment`], for use inside a transaction.
async fn ensure_assignment_in_tx(
    order_id: i64,
    partner_id: i64,
    conn: &mut sqlx::SqliteConnection,
) -> Result<(DeliveryPartnerOrder, bool), FulfillmentError> {
    let (assignment, created) = match assignments::insert_if_unassigned(order_id, partner_id, &mut *conn).await? {
        Some(record) => (record, true),
        None => {
            let existing = assignments::fetch_active(order_id, &mut *conn).await?.ok_or_else(|| {
                FulfillmentError::DatabaseError(format!("Order {order_id} has neither a new nor an existing assignment"))
            })?;
            (existing, false)
        },
    };
    if assignment.delivery_partner_id != partner_id {
        return Err(FulfillmentError::Conflict(format!(
            "Order {order_id} is already assigned to delivery partner {}",
            assignment.delivery_partner_id
        )));
    }
    orders::set_delivery_partner_if_unset(order_id, partner_id, &mut *conn).await?;
    Ok((assignment, created))
}

impl AssignmentManagement for SqliteDatabase {
    async fn ensure_assignment(
        &self,
        order_id: i64,
        partner_id: i64,
    ) -> Result<(DeliveryPartnerOrder, bool), FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let result = ensure_assignment_in_tx(order_id, partner_id, &mut tx).await?;
        tx.commit().await?;
        if result.1 {
            debug!("🗃️ Order {order_id} assigned to delivery partner {partner_id}");
        }
        Ok(result)
    }

    async fn ensure_pickup_records(
        &self,
        order_id: i64,
        partner_id: i64,
    ) -> Result<(Vec<OrderPickup>, usize), FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let created = assignments::insert_missing_pickups(order_id, partner_id, &mut tx).await?;
        assignments::refresh_pickups(order_id, &mut tx).await?;
        let pickups = assignments::fetch_pickups(order_id, &mut tx).await?;
        tx.commit().await?;
        let pickups = pickups.into_iter().filter(|p| p.delivery_partner_id == partner_id).collect();
        Ok((pickups, created as usize))
    }

    async fn assign_delivery(
        &self,
        order_id: i64,
        partner_id: i64,
    ) -> Result<(DeliveryPartnerOrder, Vec<OrderPickup>), FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let (assignment, _) = ensure_assignment_in_tx(order_id, partner_id, &mut tx).await?;
        assignments::insert_missing_pickups(order_id, partner_id, &mut tx).await?;
        let moved = items::transition_for_order(
            order_id,
            FulfillmentStatus::Packed,
            FulfillmentStatus::AssignedToDelivery,
            &mut tx,
        )
        .await?;
        orders::refresh_after_item_change(order_id, None, &mut tx).await?;
        let assignment = assignments::fetch_active(order_id, &mut tx).await?.unwrap_or(assignment);
        let pickups = assignments::fetch_pickups(order_id, &mut tx)
            .await?
            .into_iter()
            .filter(|p| p.delivery_partner_id == partner_id)
            .collect();
        tx.commit().await?;
        debug!("🗃️ Delivery of order {order_id} assigned to partner {partner_id}. {} packed items handed over", moved.len());
        Ok((assignment, pickups))
    }

    async fn fetch_assignment_for_order(
        &self,
        order_id: i64,
    ) -> Result<Option<DeliveryPartnerOrder>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let assignment = assignments::fetch_active(order_id, &mut conn).await?;
        Ok(assignment)
    }

    async fn fetch_pickups_for_order(&self, order_id: i64) -> Result<Vec<OrderPickup>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let pickups = assignments::fetch_pickups(order_id, &mut conn).await?;
        Ok(pickups)
    }

    async fn upsert_sector_assignment(
        &self,
        sector_id: i64,
        partner_id: i64,
        date: NaiveDate,
    ) -> Result<SectorAssignment, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let record = assignments::upsert_sector_assignment(sector_id, partner_id, date, &mut conn).await?;
        Ok(record)
    }

    async fn fetch_sector_assignments(&self, date: NaiveDate) -> Result<Vec<SectorAssignment>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let records = assignments::fetch_sector_assignments(date, &mut conn).await?;
        Ok(records)
    }
}

impl WalletManagement for SqliteDatabase {
    async fn sync_wallet(&self, vendor_id: i64) -> Result<VendorWallet, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = wallets::sync_balances(vendor_id, &mut conn).await?;
        Ok(wallet)
    }

    async fn fetch_wallet(&self, vendor_id: i64) -> Result<Option<VendorWallet>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = wallets::fetch_wallet(vendor_id, &mut conn).await?;
        Ok(wallet)
    }

    async fn update_payout_settings(
        &self,
        vendor_id: i64,
        settings: PayoutSettings,
    ) -> Result<VendorWallet, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        // Creates the wallet if this is the vendor's first visit.
        wallets::sync_balances(vendor_id, &mut tx).await?;
        let wallet = wallets::update_payout_settings(vendor_id, settings, &mut tx)
            .await?
            .ok_or_else(|| FulfillmentError::NotFound(format!("Wallet for vendor {vendor_id}")))?;
        tx.commit().await?;
        Ok(wallet)
    }

    async fn insert_payout_request(&self, request: NewPayoutRequest) -> Result<PayoutRequest, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let payout = payouts::insert_payout(request, &mut conn).await?;
        Ok(payout)
    }

    async fn fetch_payout(&self, payout_id: i64) -> Result<Option<PayoutRequest>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let payout = payouts::fetch_payout(payout_id, &mut conn).await?;
        Ok(payout)
    }

    async fn search_payouts(&self, filter: PayoutQueryFilter) -> Result<Vec<PayoutRequest>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let payouts = payouts::search_payouts(filter, &mut conn).await?;
        Ok(payouts)
    }

    async fn approve_payout(
        &self,
        payout_id: i64,
        approved_by: i64,
    ) -> Result<(PayoutRequest, VendorWallet), FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let request = payouts::fetch_payout(payout_id, &mut conn)
            .await?
            .ok_or_else(|| FulfillmentError::NotFound(format!("Payout request {payout_id}")))?;
        drop(conn);
        let mut tx = self.pool.begin().await?;
        // The debit below must be measured against fresh balances.
        let before = wallets::sync_balances(request.vendor_id, &mut tx).await?;
        let payout = match payouts::transition(
            payout_id,
            PayoutStatus::Pending,
            PayoutStatus::Processing,
            Some(approved_by),
            None,
            &mut tx,
        )
        .await?
        {
            Some(p) => p,
            None => return Err(payout_write_missed(payout_id, PayoutStatus::Pending, &mut tx).await),
        };
        let wallet = match wallets::debit_available(payout.vendor_id, payout.amount, &mut tx).await? {
            Some(w) => w,
            None => {
                // Dropping the transaction rolls back the status change.
                return Err(FulfillmentError::InsufficientBalance {
                    requested: payout.amount,
                    available: before.available_balance,
                });
            },
        };
        tx.commit().await?;
        info!("🗃️ Payout {payout_id} of {} approved for vendor {}", payout.amount, payout.vendor_id);
        Ok((payout, wallet))
    }

    async fn cancel_payout(
        &self,
        payout_id: i64,
        decided_by: Option<i64>,
        notes: Option<String>,
    ) -> Result<PayoutRequest, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        match payouts::transition(payout_id, PayoutStatus::Pending, PayoutStatus::Cancelled, decided_by, notes, &mut conn)
            .await?
        {
            Some(p) => Ok(p),
            None => Err(payout_write_missed(payout_id, PayoutStatus::Pending, &mut conn).await),
        }
    }

    async fn complete_payout(&self, payout_id: i64, notes: Option<String>) -> Result<PayoutRequest, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        match payouts::transition(payout_id, PayoutStatus::Processing, PayoutStatus::Completed, None, notes, &mut conn)
            .await?
        {
            Some(p) => Ok(p),
            None => Err(payout_write_missed(payout_id, PayoutStatus::Processing, &mut conn).await),
        }
    }

    async fn fail_payout(
        &self,
        payout_id: i64,
        notes: Option<String>,
    ) -> Result<(PayoutRequest, VendorWallet), FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let payout =
            match payouts::transition(payout_id, PayoutStatus::Processing, PayoutStatus::Failed, None, notes, &mut tx)
                .await?
            {
                Some(p) => p,
                None => return Err(payout_write_missed(payout_id, PayoutStatus::Processing, &mut tx).await),
            };
        let wallet = wallets::credit_available(payout.vendor_id, payout.amount, &mut tx).await?;
        tx.commit().await?;
        warn!("🗃️ Payout {payout_id} of {} failed. Funds returned to vendor {}", payout.amount, payout.vendor_id);
        Ok((payout, wallet))
    }
}

impl FulfillmentDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) -> Result<(), FulfillmentError> {
        self.pool.close().await;
        Ok(())
    }
}
