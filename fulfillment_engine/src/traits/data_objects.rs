use chrono::{DateTime, Utc};
use fulfillment_common::Paise;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db_types::{Actor, Order, OrderItem, PayoutStatus, VendorSettings};

/// A single item after a successful transition, along with its order after the status projection was refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdated {
    pub item: OrderItem,
    pub order: Order,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsUpdated {
    pub items: Vec<OrderItem>,
    pub order: Order,
}

impl ItemUpdated {
    pub fn redact_for(mut self, actor: &Actor) -> Self {
        self.item.redact_for(actor);
        self
    }
}

impl ItemsUpdated {
    pub fn redact_for(mut self, actor: &Actor) -> Self {
        self.items.iter_mut().for_each(|i| i.redact_for(actor));
        self
    }

    pub fn vendor_ids(&self) -> Vec<i64> {
        let mut ids = self.items.iter().map(|i| i.vendor_id).collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOutcome {
    pub item: OrderItem,
    pub order: Order,
    /// Units returned to the product's stock.
    pub stock_restored: i64,
    /// True if this cancellation cancelled the whole order and gave its slot back.
    pub slot_released: bool,
}

impl CancelOutcome {
    pub fn redact_for(mut self, actor: &Actor) -> Self {
        self.item.redact_for(actor);
        self
    }
}

/// A pending, not yet escalated item together with what is needed to decide whether its confirmation window has
/// lapsed. The vendor settings columns are `NULL` when the vendor has never saved any settings.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PendingConfirmation {
    pub item_id: i64,
    pub order_id: i64,
    pub vendor_id: i64,
    pub created_at: DateTime<Utc>,
    pub order_total: Paise,
    pub auto_approve_orders: Option<bool>,
    pub auto_approve_under_amount: Option<Paise>,
    pub confirmation_timeout_minutes: Option<i64>,
}

impl PendingConfirmation {
    pub fn settings(&self, default_timeout_minutes: i64) -> VendorSettings {
        VendorSettings {
            vendor_id: self.vendor_id,
            auto_approve_orders: self.auto_approve_orders.unwrap_or(false),
            auto_approve_under_amount: self.auto_approve_under_amount,
            confirmation_timeout_minutes: self.confirmation_timeout_minutes.unwrap_or(default_timeout_minutes),
        }
    }

    /// When the confirmation window lapses. `None` if the configured timeout is too large to represent.
    pub fn deadline(&self, default_timeout_minutes: i64) -> Option<DateTime<Utc>> {
        let minutes = self.settings(default_timeout_minutes).confirmation_timeout_minutes;
        chrono::Duration::try_minutes(minutes).and_then(|window| self.created_at.checked_add_signed(window))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutQueryFilter {
    pub vendor_id: Option<i64>,
    pub status: Option<PayoutStatus>,
}

impl PayoutQueryFilter {
    pub fn with_vendor_id(mut self, vendor_id: i64) -> Self {
        self.vendor_id = Some(vendor_id);
        self
    }

    pub fn with_status(mut self, status: PayoutStatus) -> Self {
        self.status = Some(status);
        self
    }
}
