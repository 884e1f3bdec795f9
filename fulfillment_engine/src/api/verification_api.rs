use std::{collections::HashMap, fmt::Debug};

use log::*;

use crate::{
    api::{require_role, sync_wallets},
    db_types::{Actor, FulfillmentStatus, Role},
    events::{EventProducers, ItemStatusChangedEvent},
    helpers::is_well_formed_otp,
    traits::{FulfillmentDatabase, FulfillmentError, ItemsUpdated},
};

/// Gates the pickup and delivery hand-overs behind single-use codes.
///
/// A code is consumed in one step by every item holding it, so replaying it fails with `InvalidOtp`. Until all of
/// those items are ready the code is refused with `InvalidTransition` and stays valid.
/// A code that does not match leaves everything untouched. Rate limiting guesses is up to the caller.
pub struct DeliveryVerificationApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for DeliveryVerificationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeliveryVerificationApi")
    }
}

impl<B> DeliveryVerificationApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> DeliveryVerificationApi<B>
where B: FulfillmentDatabase
{
    /// The delivery partner collects a vendor's items by quoting the vendor's pickup code. Every item carrying the
    /// code moves to `picked_up` once all of them are `packed` or `assigned_to_delivery`.
    pub async fn verify_pickup_otp(
        &self,
        actor: &Actor,
        order_id: i64,
        otp: &str,
    ) -> Result<ItemsUpdated, FulfillmentError> {
        self.check_caller(actor, order_id).await?;
        let otp = otp.trim();
        if !is_well_formed_otp(otp) {
            return Err(FulfillmentError::InvalidOtp);
        }
        let before = self.status_snapshot(order_id).await?;
        let picked = self.db.consume_pickup_otp(order_id, otp).await.map_err(|e| {
            if e == FulfillmentError::InvalidOtp {
                warn!("🔑️ Incorrect pickup code presented by {actor} for order {order_id}");
            }
            e
        })?;
        info!("🔑️ Pickup verified for {} items of order {}", picked.items.len(), picked.order.order_number);
        self.publish(actor, &picked, &before).await;
        Ok(picked)
    }

    /// The customer hands over the delivery code. Every live item of the order must be `out_for_delivery`, and all
    /// of them move to `delivered`.
    pub async fn verify_delivery_otp(
        &self,
        actor: &Actor,
        order_id: i64,
        otp: &str,
    ) -> Result<ItemsUpdated, FulfillmentError> {
        self.check_caller(actor, order_id).await?;
        let otp = otp.trim();
        if !is_well_formed_otp(otp) {
            return Err(FulfillmentError::InvalidOtp);
        }
        let before = self.status_snapshot(order_id).await?;
        let delivered = self.db.consume_delivery_otp(order_id, otp).await.map_err(|e| {
            if e == FulfillmentError::InvalidOtp {
                warn!("🔑️ Incorrect delivery code presented by {actor} for order {order_id}");
            }
            e
        })?;
        info!("🔑️ Delivery verified for {} items of order {}", delivered.items.len(), delivered.order.order_number);
        sync_wallets(&self.db, delivered.vendor_ids()).await;
        self.publish(actor, &delivered, &before).await;
        Ok(delivered)
    }

    /// The partner recorded on the order is checked rather than the live assignment, which disappears when the
    /// order is cancelled.
    async fn check_caller(&self, actor: &Actor, order_id: i64) -> Result<(), FulfillmentError> {
        require_role(actor, &[Role::DeliveryPartner, Role::Admin])?;
        if actor.is_admin() {
            return Ok(());
        }
        let order =
            self.db.fetch_order(order_id).await?.ok_or_else(|| FulfillmentError::NotFound(format!("Order {order_id}")))?;
        match order.delivery_partner_id {
            Some(id) if id == actor.id => Ok(()),
            Some(_) => Err(FulfillmentError::NotAuthorized(format!("Order {order_id} is not assigned to you"))),
            None => Err(FulfillmentError::NotAuthorized(format!("Order {order_id} has no delivery partner"))),
        }
    }

    async fn status_snapshot(&self, order_id: i64) -> Result<HashMap<i64, FulfillmentStatus>, FulfillmentError> {
        let items = self.db.fetch_order_items(order_id).await?;
        if items.is_empty() {
            return Err(FulfillmentError::NotFound(format!("Order {order_id}")));
        }
        Ok(items.into_iter().map(|i| (i.id, i.item_status)).collect())
    }

    async fn publish(&self, actor: &Actor, updated: &ItemsUpdated, before: &HashMap<i64, FulfillmentStatus>) {
        for item in &updated.items {
            let old_status = before.get(&item.id).copied().unwrap_or(FulfillmentStatus::Packed);
            let event = ItemStatusChangedEvent::new(item.clone(), old_status, Some(*actor));
            self.producers.publish_item_status_changed(event).await;
        }
    }
}
