use serde::{Deserialize, Serialize};

use crate::db_types::{Actor, DeliveryPartnerOrder, Order, OrderItem, OrderPickup, Role};

/// The result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl PlacedOrder {
    pub fn order_id(&self) -> i64 {
        self.order.id
    }

    pub fn order_number(&self) -> &str {
        self.order.order_number.as_str()
    }

    /// The distinct vendors with items in this order.
    pub fn vendor_ids(&self) -> Vec<i64> {
        let mut ids = self.items.iter().map(|i| i.vendor_id).collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// An order as seen by one particular actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub assignment: Option<DeliveryPartnerOrder>,
    pub pickups: Vec<OrderPickup>,
}

impl OrderDetails {
    /// Strips what `actor` should not see. Vendors only see their own items and pickups, and every item loses the
    /// codes its viewer must not learn (see [`OrderItem::redact_for`]).
    pub fn redact_for(mut self, actor: &Actor) -> Self {
        if actor.role == Role::Vendor {
            self.items.retain(|i| i.vendor_id == actor.id);
            self.pickups.retain(|p| p.vendor_id == actor.id);
        }
        self.items.iter_mut().for_each(|i| i.redact_for(actor));
        self
    }
}

/// Outcome of one pass of the confirmation timeout sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutReport {
    /// Pending items examined.
    pub checked: usize,
    /// Items whose confirmation window has not lapsed yet.
    pub waiting: usize,
    pub auto_confirmed: Vec<i64>,
    pub escalated: Vec<i64>,
    /// Items a vendor or customer acted on while the sweep was running.
    pub skipped: Vec<i64>,
    pub errors: Vec<(i64, String)>,
}

impl TimeoutReport {
    pub fn is_quiet(&self) -> bool {
        self.auto_confirmed.is_empty() && self.escalated.is_empty() && self.errors.is_empty()
    }
}
