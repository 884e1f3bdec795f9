//! The notification dispatcher.
//!
//! Delivering push, email or SMS messages is somebody else's job. The server forwards every engine event to these
//! handlers, which record what would be sent to whom. Swap a hook body for a real dispatcher call to wire one in; a
//! failing hook only ever logs, it never affects the transition that produced the event.
use fulfillment_engine::events::{
    DeliveryAssignedEvent,
    EventHandlers,
    EventHooks,
    HookFuture,
    ItemEscalatedEvent,
    ItemStatusChangedEvent,
    OrderPlacedEvent,
    PayoutStatusChangedEvent,
};
use log::*;

pub const NOTIFICATION_BUFFER_SIZE: usize = 128;

fn done() -> HookFuture {
    Box::pin(async {})
}

pub fn create_notification_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_order_placed(|ev| {
        let OrderPlacedEvent { order, items } = ev;
        info!(
            "📬️ Order {} placed by customer {} with {} items. Total {}",
            order.order_number,
            order.customer_id,
            items.len(),
            order.total_amount
        );
        let mut vendors = items.iter().map(|i| i.vendor_id).collect::<Vec<_>>();
        vendors.sort_unstable();
        vendors.dedup();
        for vendor_id in vendors {
            debug!("📬️ Notify vendor {vendor_id}: new items in order {}", order.order_number);
        }
        done()
    });
    hooks.on_item_status_changed(|ev| {
        let ItemStatusChangedEvent { item, old_status, actor } = ev;
        let by = actor.map(|a| a.to_string()).unwrap_or_else(|| "the system".into());
        debug!("📬️ Item {} of order {}: {old_status} -> {} by {by}", item.id, item.order_id, item.item_status);
        done()
    });
    hooks.on_item_escalated(|ev| {
        let ItemEscalatedEvent { item } = ev;
        warn!(
            "📬️ Item {} ({}) of order {} was not confirmed by vendor {} in time. Escalating to operations.",
            item.id, item.product_name, item.order_id, item.vendor_id
        );
        done()
    });
    hooks.on_delivery_assigned(|ev| {
        let DeliveryAssignedEvent { assignment, pickups } = ev;
        info!(
            "📬️ Notify partner {}: order {} assigned with {} pickups",
            assignment.delivery_partner_id,
            assignment.order_id,
            pickups.len()
        );
        done()
    });
    hooks.on_payout_status_changed(|ev| {
        let PayoutStatusChangedEvent { payout, old_status } = ev;
        info!(
            "📬️ Notify vendor {}: payout {} of {} moved from {old_status} to {}",
            payout.vendor_id, payout.id, payout.amount, payout.payout_status
        );
        done()
    });
    EventHandlers::new(NOTIFICATION_BUFFER_SIZE, hooks)
}
