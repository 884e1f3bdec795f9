use serde::{Deserialize, Serialize};

use crate::db_types::{
    Actor,
    DeliveryPartnerOrder,
    FulfillmentStatus,
    Order,
    OrderItem,
    OrderPickup,
    PayoutRequest,
    PayoutStatus,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderPlacedEvent {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        Self { order, items }
    }
}

/// Emitted after every successful item transition, including cancellations and OTP verifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStatusChangedEvent {
    pub item: OrderItem,
    pub old_status: FulfillmentStatus,
    /// `None` for transitions made by background workers.
    pub actor: Option<Actor>,
}

impl ItemStatusChangedEvent {
    pub fn new(item: OrderItem, old_status: FulfillmentStatus, actor: Option<Actor>) -> Self {
        Self { item, old_status, actor }
    }
}

/// A pending item outlived its vendor's confirmation window and was not eligible for auto-confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEscalatedEvent {
    pub item: OrderItem,
}

impl ItemEscalatedEvent {
    pub fn new(item: OrderItem) -> Self {
        Self { item }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAssignedEvent {
    pub assignment: DeliveryPartnerOrder,
    pub pickups: Vec<OrderPickup>,
}

impl DeliveryAssignedEvent {
    pub fn new(assignment: DeliveryPartnerOrder, pickups: Vec<OrderPickup>) -> Self {
        Self { assignment, pickups }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutStatusChangedEvent {
    pub payout: PayoutRequest,
    pub old_status: PayoutStatus,
}

impl PayoutStatusChangedEvent {
    pub fn new(payout: PayoutRequest, old_status: PayoutStatus) -> Self {
        Self { payout, old_status }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderPlaced(OrderPlacedEvent),
    ItemStatusChanged(ItemStatusChangedEvent),
    ItemEscalated(ItemEscalatedEvent),
    DeliveryAssigned(DeliveryAssignedEvent),
    PayoutStatusChanged(PayoutStatusChangedEvent),
}
