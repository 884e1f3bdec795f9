use chrono::NaiveDate;

use crate::{
    db_types::{Cancellation, FulfillmentStatus, NewOrder, Order, OrderItem},
    traits::{CancelOutcome, FulfillmentError, ItemUpdated, ItemsUpdated, PendingConfirmation},
};

/// Order creation and the per-item state machine.
///
/// Every method that changes an item also recomputes the order's status projection, the pickup records and the
/// delivery assignment status in the same transaction.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Takes a new order and, in a single atomic transaction:
    /// * reserves one unit of capacity on the order's slot,
    /// * decrements stock for every line, failing with `OutOfStock` if any product cannot cover its quantity,
    /// * snapshots product names and prices onto the items,
    /// * generates the pickup OTP for each vendor and one delivery OTP for the order.
    ///
    /// If any step fails, nothing is written.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>), FulfillmentError>;

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, FulfillmentError>;

    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, FulfillmentError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, FulfillmentError>;

    async fn fetch_item(&self, item_id: i64) -> Result<Option<OrderItem>, FulfillmentError>;

    /// Non-pending, non-cancelled orders booked into slots of `sector_id` on `date`.
    async fn fetch_orders_for_sector_date(
        &self,
        sector_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<Order>, FulfillmentError>;

    /// Moves the item from `from` to `to` if, and only if, it is still in `from`. Fails with `Conflict` otherwise.
    /// Validating that `from -> to` is a legal transition is the caller's job.
    async fn transition_item(
        &self,
        item_id: i64,
        from: FulfillmentStatus,
        to: FulfillmentStatus,
    ) -> Result<ItemUpdated, FulfillmentError>;

    /// Moves every item of the order that is in `from` to `to`. Returns the items that moved, which may be none.
    async fn transition_order_items(
        &self,
        order_id: i64,
        from: FulfillmentStatus,
        to: FulfillmentStatus,
    ) -> Result<ItemsUpdated, FulfillmentError>;

    /// Cancels the item if it is still in `from`, restores its stock, and, if that leaves the order with no live items,
    /// releases the slot and cancels the delivery assignment and pickups.
    async fn cancel_item(
        &self,
        item_id: i64,
        from: FulfillmentStatus,
        cancellation: Cancellation,
    ) -> Result<CancelOutcome, FulfillmentError>;

    /// Atomically consumes a pickup OTP: once every item of the order carrying `otp` is `packed` or
    /// `assigned_to_delivery`, all of them become `picked_up` and the code is cleared from them.
    ///
    /// Fails with `InvalidOtp` if no item of the order carries the code, and `InvalidTransition` if items carry it
    /// but some of them are not ready for pickup. Nothing is written in either case.
    async fn consume_pickup_otp(&self, order_id: i64, otp: &str) -> Result<ItemsUpdated, FulfillmentError>;

    /// Atomically consumes the delivery OTP: once every item of the order carrying `otp` is `out_for_delivery`, all of
    /// them become `delivered` and the code is cleared from them. Fails like [`Self::consume_pickup_otp`].
    async fn consume_delivery_otp(&self, order_id: i64, otp: &str) -> Result<ItemsUpdated, FulfillmentError>;

    /// Pending items that have not been escalated yet, with their vendor's confirmation settings.
    async fn fetch_unconfirmed_items(&self) -> Result<Vec<PendingConfirmation>, FulfillmentError>;

    /// Confirms a pending item on the vendor's behalf and flags it as auto-confirmed.
    async fn auto_confirm_item(&self, item_id: i64) -> Result<ItemUpdated, FulfillmentError>;

    /// Flags a pending item as urgent. Returns `None` if the item is no longer pending or was already escalated.
    async fn escalate_item(&self, item_id: i64) -> Result<Option<OrderItem>, FulfillmentError>;

    /// Stores the vendor's notes on an item.
    async fn update_vendor_notes(&self, item_id: i64, notes: &str) -> Result<OrderItem, FulfillmentError>;
}
