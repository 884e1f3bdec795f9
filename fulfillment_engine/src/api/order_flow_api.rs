use std::{collections::BTreeMap, fmt::Debug};

use chrono::{DateTime, NaiveDateTime, Utc};
use fulfillment_common::Paise;
use log::*;

use crate::{
    api::{
        order_objects::{OrderDetails, PlacedOrder, TimeoutReport},
        require_role,
        slot_api::SlotRules,
        sync_wallets,
        FulfillmentPolicy,
    },
    db_types::{
        Actor,
        AddressSnapshot,
        Cancellation,
        CancellationReason,
        FulfillmentStatus,
        NewOrder,
        NewOrderItem,
        Order,
        OrderItem,
        Role,
    },
    events::{EventProducers, ItemEscalatedEvent, ItemStatusChangedEvent, OrderPlacedEvent},
    lifecycle::check_transition,
    traits::{CancelOutcome, FulfillmentDatabase, FulfillmentError, ItemUpdated, ItemsUpdated},
};

/// `OrderFlowApi` places orders and moves their items through the fulfillment lifecycle on behalf of customers,
/// vendors, delivery partners and the confirmation timeout worker.
///
/// Every status change is delegated to the backend as a compare-and-set against the status the item was read in.
/// If another request changed the item in between, the call fails with [`FulfillmentError::Conflict`] rather than
/// overwriting that change.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    policy: FulfillmentPolicy,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({:?})", self.policy)
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, policy: FulfillmentPolicy::default() }
    }

    pub fn with_policy(mut self, policy: FulfillmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &FulfillmentPolicy {
        &self.policy
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: FulfillmentDatabase
{
    /// Places a new order.
    ///
    /// `now` is the local wall-clock time used to decide whether the slot can still be booked.
    ///
    /// Duplicate lines for the same product are merged. The postal code of the address must be served by the slot's
    /// sector. If the slot is closed, inactive or full, the call fails with `SlotUnavailable`, and if any product
    /// is short of stock, with `OutOfStock`. In every failure case nothing is written.
    pub async fn create_order(
        &self,
        actor: &Actor,
        order: NewOrder,
        now: NaiveDateTime,
    ) -> Result<PlacedOrder, FulfillmentError> {
        require_role(actor, &[Role::Customer, Role::Admin])?;
        if actor.role == Role::Customer && actor.id != order.customer_id {
            return Err(FulfillmentError::NotAuthorized("Customers can only place orders for themselves".into()));
        }
        let order = validate_new_order(order)?;
        let slot = self
            .db
            .fetch_slot(order.slot_id)
            .await?
            .ok_or_else(|| FulfillmentError::NotFound(format!("Delivery slot {}", order.slot_id)))?;
        if !self.db.sector_serves_postal_code(slot.sector_id, &order.address.postal_code).await? {
            return Err(FulfillmentError::Validation(format!(
                "Postal code {} is not served by the sector of slot {}",
                order.address.postal_code, slot.id
            )));
        }
        let rules = SlotRules::new(self.policy.preorder_threshold);
        if !rules.is_bookable(&slot, now) {
            return Err(FulfillmentError::SlotUnavailable(format!(
                "Slot {} on {} is closed or full",
                slot.id, slot.slot_date
            )));
        }
        let (order, items) = self.db.insert_order(order).await.map_err(|e| match e {
            FulfillmentError::CapacityExceeded(id) => {
                FulfillmentError::SlotUnavailable(format!("Slot {id} was fully booked while the order was placed"))
            },
            e => e,
        })?;
        info!("📦️ Order {} placed by customer {} for {}", order.order_number, order.customer_id, order.total_amount);
        let placed = PlacedOrder { order, items };
        sync_wallets(&self.db, placed.vendor_ids()).await;
        self.producers.publish_order_placed(OrderPlacedEvent::new(placed.order.clone(), placed.items.clone())).await;
        Ok(placed)
    }

    /// The vendor accepts a pending item.
    pub async fn confirm_item(&self, actor: &Actor, item_id: i64) -> Result<ItemUpdated, FulfillmentError> {
        let item = self.fetch_vendor_item(actor, item_id).await?;
        self.vendor_transition(actor, item, FulfillmentStatus::Confirmed).await
    }

    pub async fn mark_processing(&self, actor: &Actor, item_id: i64) -> Result<ItemUpdated, FulfillmentError> {
        let item = self.fetch_vendor_item(actor, item_id).await?;
        self.vendor_transition(actor, item, FulfillmentStatus::Processing).await
    }

    /// Marks an item as packed. If a delivery partner is already assigned to the order, the item is handed over to
    /// the assignment straight away.
    pub async fn mark_packed(&self, actor: &Actor, item_id: i64) -> Result<ItemUpdated, FulfillmentError> {
        let item = self.fetch_vendor_item(actor, item_id).await?;
        let packed = self.vendor_transition(actor, item, FulfillmentStatus::Packed).await?;
        if self.db.fetch_assignment_for_order(packed.order.id).await?.is_none() {
            return Ok(packed);
        }
        match self.db.transition_item(item_id, FulfillmentStatus::Packed, FulfillmentStatus::AssignedToDelivery).await {
            Ok(handed_over) => {
                debug!("📦️ Item {item_id} handed over to the assigned delivery partner");
                self.publish_item_change(handed_over.item.clone(), FulfillmentStatus::Packed, None).await;
                Ok(handed_over)
            },
            // The assignment flow moved it first.
            Err(FulfillmentError::Conflict(_)) => Ok(packed),
            Err(e) => Err(e),
        }
    }

    /// The vendor declines an item it cannot fulfil. Allowed until the item has been picked up. The item is cancelled
    /// with [`CancellationReason::VendorRejected`] and `reason` as the details.
    pub async fn reject_item(&self, actor: &Actor, item_id: i64, reason: &str) -> Result<CancelOutcome, FulfillmentError> {
        let item = self.fetch_vendor_item(actor, item_id).await?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(FulfillmentError::Validation("A reason is required to reject an item".into()));
        }
        check_transition(item.item_status, FulfillmentStatus::Cancelled)?;
        if !matches!(
            item.item_status,
            FulfillmentStatus::Pending | FulfillmentStatus::Confirmed | FulfillmentStatus::Processing | FulfillmentStatus::Packed
        ) {
            return Err(FulfillmentError::InvalidTransition(format!(
                "Item {item_id} is {} and can no longer be rejected by the vendor",
                item.item_status
            )));
        }
        let cancellation = Cancellation {
            reason: CancellationReason::VendorRejected,
            details: Some(reason.to_string()),
            cancelled_by: Role::Vendor,
        };
        info!("📦️ Vendor {} rejected item {item_id}. {reason}", actor.id);
        self.cancel(actor, item, cancellation).await
    }

    /// Cancels a single item.
    ///
    /// Customers may cancel items of their own orders with a customer reason, the assigned delivery partner with a
    /// delivery reason, and admins with either. `other` always needs details.
    pub async fn cancel_item(
        &self,
        actor: &Actor,
        item_id: i64,
        reason: CancellationReason,
        details: Option<String>,
    ) -> Result<CancelOutcome, FulfillmentError> {
        require_role(actor, &[Role::Customer, Role::DeliveryPartner, Role::Admin])?;
        if !reason.allowed_for(actor.role) {
            return Err(FulfillmentError::Validation(format!("{reason} is not a valid cancellation reason for a {}", actor.role)));
        }
        let details = details.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());
        if reason.requires_details() && details.is_none() {
            return Err(FulfillmentError::Validation(format!("Cancelling with reason {reason} requires details")));
        }
        let item = self.fetch_item(item_id).await?;
        match actor.role {
            Role::Customer => {
                let order = self.fetch_order_for(&item).await?;
                if order.customer_id != actor.id {
                    return Err(FulfillmentError::NotAuthorized(format!("Item {item_id} is not in one of your orders")));
                }
            },
            Role::DeliveryPartner => self.require_assigned_partner(actor, item.order_id).await?,
            _ => {},
        }
        check_transition(item.item_status, FulfillmentStatus::Cancelled)?;
        let cancellation = Cancellation { reason, details, cancelled_by: actor.role };
        self.cancel(actor, item, cancellation).await
    }

    /// The assigned delivery partner sets off with every picked up item of the order.
    pub async fn mark_out_for_delivery(&self, actor: &Actor, order_id: i64) -> Result<ItemsUpdated, FulfillmentError> {
        require_role(actor, &[Role::DeliveryPartner, Role::Admin])?;
        if actor.role == Role::DeliveryPartner {
            self.require_assigned_partner(actor, order_id).await?;
        }
        let moved = self
            .db
            .transition_order_items(order_id, FulfillmentStatus::PickedUp, FulfillmentStatus::OutForDelivery)
            .await?;
        if moved.items.is_empty() {
            return Err(FulfillmentError::InvalidTransition(format!(
                "Order {order_id} has no picked up items to take out for delivery"
            )));
        }
        info!("📦️ {} items of order {} are out for delivery", moved.items.len(), moved.order.order_number);
        for item in &moved.items {
            self.publish_item_change(item.clone(), FulfillmentStatus::PickedUp, Some(*actor)).await;
        }
        Ok(moved)
    }

    pub async fn update_vendor_notes(&self, actor: &Actor, item_id: i64, notes: &str) -> Result<OrderItem, FulfillmentError> {
        self.fetch_vendor_item(actor, item_id).await?;
        self.db.update_vendor_notes(item_id, notes.trim()).await
    }

    /// The order, its items, and its delivery records, redacted for the caller. Visible to the customer who placed
    /// the order, vendors with items in it, the assigned delivery partner and admins.
    pub async fn order_details(&self, actor: &Actor, order_id: i64) -> Result<OrderDetails, FulfillmentError> {
        let order =
            self.db.fetch_order(order_id).await?.ok_or_else(|| FulfillmentError::NotFound(format!("Order {order_id}")))?;
        let items = self.db.fetch_order_items(order_id).await?;
        let assignment = self.db.fetch_assignment_for_order(order_id).await?;
        let allowed = match actor.role {
            Role::Admin => true,
            Role::Customer => order.customer_id == actor.id,
            Role::Vendor => items.iter().any(|i| i.vendor_id == actor.id),
            Role::DeliveryPartner => order.delivery_partner_id == Some(actor.id),
        };
        if !allowed {
            return Err(FulfillmentError::NotAuthorized(format!("{actor} may not view order {order_id}")));
        }
        let pickups = self.db.fetch_pickups_for_order(order_id).await?;
        Ok(OrderDetails { order, items, assignment, pickups }.redact_for(actor))
    }

    /// Applies the confirmation timeout policy to every pending item whose window has lapsed at `now`.
    ///
    /// Items of vendors that opted in, or whose order total is below the vendor's threshold, are confirmed. All other
    /// lapsed items are flagged as urgent and an [`ItemEscalatedEvent`] is published. An item is never escalated
    /// twice. Failures on one item do not stop the sweep.
    pub async fn run_confirmation_timeouts(&self, now: DateTime<Utc>) -> Result<TimeoutReport, FulfillmentError> {
        let candidates = self.db.fetch_unconfirmed_items().await?;
        let default_timeout = self.policy.confirmation_timeout_minutes;
        let mut report = TimeoutReport { checked: candidates.len(), ..Default::default() };
        for pending in candidates {
            match pending.deadline(default_timeout) {
                Some(deadline) if now < deadline => {
                    report.waiting += 1;
                    continue;
                },
                Some(_) => {},
                None => {
                    warn!(
                        "📦️ Item {} of vendor {} has an unusable confirmation timeout. It needs a manual decision",
                        pending.item_id, pending.vendor_id
                    );
                    report.errors.push((pending.item_id, "The confirmation timeout is out of range".to_string()));
                    continue;
                },
            }
            let settings = pending.settings(default_timeout);
            if settings.should_auto_confirm(pending.order_total) {
                match self.db.auto_confirm_item(pending.item_id).await {
                    Ok(updated) => {
                        debug!("📦️ Item {} auto-confirmed for vendor {}", pending.item_id, pending.vendor_id);
                        report.auto_confirmed.push(pending.item_id);
                        self.publish_item_change(updated.item, FulfillmentStatus::Pending, None).await;
                    },
                    Err(FulfillmentError::Conflict(_)) => report.skipped.push(pending.item_id),
                    Err(e) => {
                        warn!("📦️ Could not auto-confirm item {}. {e}", pending.item_id);
                        report.errors.push((pending.item_id, e.to_string()));
                    },
                }
            } else {
                match self.db.escalate_item(pending.item_id).await {
                    Ok(Some(item)) => {
                        info!("📦️ Item {} of vendor {} is overdue for confirmation. Escalated", item.id, item.vendor_id);
                        report.escalated.push(item.id);
                        self.producers.publish_item_escalated(ItemEscalatedEvent::new(item)).await;
                    },
                    Ok(None) => report.skipped.push(pending.item_id),
                    Err(e) => {
                        warn!("📦️ Could not escalate item {}. {e}", pending.item_id);
                        report.errors.push((pending.item_id, e.to_string()));
                    },
                }
            }
        }
        if !report.is_quiet() {
            info!(
                "📦️ Confirmation sweep: {} auto-confirmed, {} escalated, {} errors",
                report.auto_confirmed.len(),
                report.escalated.len(),
                report.errors.len()
            );
        }
        Ok(report)
    }

    async fn fetch_item(&self, item_id: i64) -> Result<OrderItem, FulfillmentError> {
        self.db.fetch_item(item_id).await?.ok_or_else(|| FulfillmentError::NotFound(format!("Item {item_id}")))
    }

    async fn fetch_order_for(&self, item: &OrderItem) -> Result<Order, FulfillmentError> {
        self.db
            .fetch_order(item.order_id)
            .await?
            .ok_or_else(|| FulfillmentError::NotFound(format!("Order {}", item.order_id)))
    }

    /// Fetches the item and checks that `actor` is the vendor selling it.
    async fn fetch_vendor_item(&self, actor: &Actor, item_id: i64) -> Result<OrderItem, FulfillmentError> {
        require_role(actor, &[Role::Vendor])?;
        let item = self.fetch_item(item_id).await?;
        if item.vendor_id != actor.id {
            return Err(FulfillmentError::NotAuthorized(format!("Item {item_id} belongs to another vendor")));
        }
        Ok(item)
    }

    async fn require_assigned_partner(&self, actor: &Actor, order_id: i64) -> Result<(), FulfillmentError> {
        let order =
            self.db.fetch_order(order_id).await?.ok_or_else(|| FulfillmentError::NotFound(format!("Order {order_id}")))?;
        if order.delivery_partner_id == Some(actor.id) {
            Ok(())
        } else {
            Err(FulfillmentError::NotAuthorized(format!("Order {order_id} is not assigned to you")))
        }
    }

    async fn vendor_transition(
        &self,
        actor: &Actor,
        item: OrderItem,
        to: FulfillmentStatus,
    ) -> Result<ItemUpdated, FulfillmentError> {
        let from = item.item_status;
        check_transition(from, to)?;
        let updated = self.db.transition_item(item.id, from, to).await?;
        debug!("📦️ Item {} moved from {from} to {to} by {actor}", item.id);
        self.publish_item_change(updated.item.clone(), from, Some(*actor)).await;
        Ok(updated)
    }

    async fn cancel(
        &self,
        actor: &Actor,
        item: OrderItem,
        cancellation: Cancellation,
    ) -> Result<CancelOutcome, FulfillmentError> {
        let from = item.item_status;
        let outcome = self.db.cancel_item(item.id, from, cancellation).await?;
        if outcome.slot_released {
            info!("📦️ Order {} is fully cancelled. Its slot has been released", outcome.order.order_number);
        }
        sync_wallets(&self.db, [item.vendor_id]).await;
        self.publish_item_change(outcome.item.clone(), from, Some(*actor)).await;
        Ok(outcome)
    }

    async fn publish_item_change(&self, item: OrderItem, old_status: FulfillmentStatus, actor: Option<Actor>) {
        self.producers.publish_item_status_changed(ItemStatusChangedEvent::new(item, old_status, actor)).await;
    }
}

/// Checks the order for obviously malformed input, and merges duplicate product lines.
fn validate_new_order(mut order: NewOrder) -> Result<NewOrder, FulfillmentError> {
    if order.items.is_empty() {
        return Err(FulfillmentError::Validation("An order needs at least one item".into()));
    }
    if order.delivery_fee < Paise::zero() {
        return Err(FulfillmentError::Validation("The delivery fee cannot be negative".into()));
    }
    validate_address(&order.address)?;
    let mut merged = BTreeMap::<i64, i64>::new();
    for line in &order.items {
        if line.quantity <= 0 {
            return Err(FulfillmentError::Validation(format!(
                "Quantity for product {} must be positive",
                line.product_id
            )));
        }
        let total = merged.entry(line.product_id).or_default();
        *total = total.checked_add(line.quantity).ok_or_else(|| {
            FulfillmentError::Validation(format!("Quantity for product {} is too large", line.product_id))
        })?;
    }
    order.items =
        merged.into_iter().map(|(product_id, quantity)| NewOrderItem { product_id, quantity }).collect::<Vec<_>>();
    Ok(order)
}

fn validate_address(address: &AddressSnapshot) -> Result<(), FulfillmentError> {
    let required = [
        ("recipient name", &address.recipient_name),
        ("phone", &address.phone),
        ("address line", &address.line1),
        ("city", &address.city),
        ("postal code", &address.postal_code),
    ];
    match required.iter().find(|(_, v)| v.trim().is_empty()) {
        Some((field, _)) => Err(FulfillmentError::Validation(format!("The delivery address is missing a {field}"))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn new_order(items: &[(i64, i64)]) -> NewOrder {
        NewOrder {
            customer_id: 1,
            slot_id: 1,
            address: AddressSnapshot {
                recipient_name: "Asha".into(),
                phone: "9800000000".into(),
                line1: "12 MG Road".into(),
                line2: None,
                landmark: None,
                city: "Bengaluru".into(),
                postal_code: "560001".into(),
            },
            items: items.iter().map(|(product_id, quantity)| NewOrderItem { product_id: *product_id, quantity: *quantity }).collect(),
            delivery_fee: Paise::from(2500),
        }
    }

    #[test]
    fn duplicate_lines_are_merged() {
        let order = validate_new_order(new_order(&[(7, 1), (3, 2), (7, 4)])).unwrap();
        let lines = order.items.iter().map(|l| (l.product_id, l.quantity)).collect::<Vec<_>>();
        assert_eq!(lines, vec![(3, 2), (7, 5)]);
    }

    #[test]
    fn malformed_orders_are_rejected() {
        assert!(matches!(validate_new_order(new_order(&[])), Err(FulfillmentError::Validation(_))));
        assert!(matches!(validate_new_order(new_order(&[(1, 0)])), Err(FulfillmentError::Validation(_))));
        let mut order = new_order(&[(1, 1)]);
        order.address.city = "  ".into();
        let err = validate_new_order(order).unwrap_err();
        assert_eq!(err, FulfillmentError::Validation("The delivery address is missing a city".into()));
        let mut order = new_order(&[(1, 1)]);
        order.delivery_fee = Paise::from(-1);
        assert!(validate_new_order(order).is_err());
    }

    #[test]
    fn merged_quantities_cannot_overflow() {
        let err = validate_new_order(new_order(&[(7, i64::MAX), (7, 1)])).unwrap_err();
        assert_eq!(err, FulfillmentError::Validation("Quantity for product 7 is too large".into()));
    }
}
