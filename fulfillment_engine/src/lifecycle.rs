//! The item state machine and the order status projection.
//!
//! ```text
//! pending ─► confirmed ─► processing ─► packed ─┬─► assigned_to_delivery ─┐
//!                                               └─────────────────────────┴─► picked_up ─► out_for_delivery ─► delivered
//! ```
//!
//! Every non-terminal status except `picked_up` may also move to `cancelled`. `delivered` and `cancelled` are
//! terminal.
use crate::{db_types::FulfillmentStatus, traits::FulfillmentError};

use FulfillmentStatus::*;

const TRANSITIONS: &[(FulfillmentStatus, &[FulfillmentStatus])] = &[
    (Pending, &[Confirmed, Cancelled]),
    (Confirmed, &[Processing, Cancelled]),
    (Processing, &[Packed, Cancelled]),
    (Packed, &[AssignedToDelivery, PickedUp, Cancelled]),
    (AssignedToDelivery, &[PickedUp, Cancelled]),
    (PickedUp, &[OutForDelivery]),
    (OutForDelivery, &[Delivered, Cancelled]),
    (Delivered, &[]),
    (Cancelled, &[]),
];

impl FulfillmentStatus {
    /// The statuses this status may move to.
    pub fn successors(&self) -> &'static [FulfillmentStatus] {
        TRANSITIONS.iter().find(|(from, _)| from == self).map(|(_, to)| *to).unwrap_or(&[])
    }

    pub fn can_transition_to(&self, to: FulfillmentStatus) -> bool {
        self.successors().contains(&to)
    }

    pub fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }

    pub fn is_cancellable(&self) -> bool {
        self.can_transition_to(Cancelled)
    }

    /// Statuses in which the goods are still at the vendor.
    pub fn is_before_pickup(&self) -> bool {
        matches!(self, Pending | Confirmed | Processing | Packed | AssignedToDelivery)
    }

    /// Position along the fulfillment path. `cancelled` is off the path and has no rank.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Pending => Some(0),
            Confirmed => Some(1),
            Processing => Some(2),
            Packed => Some(3),
            AssignedToDelivery => Some(4),
            PickedUp => Some(5),
            OutForDelivery => Some(6),
            Delivered => Some(7),
            Cancelled => None,
        }
    }

    /// True if this status is at or beyond `milestone` on the fulfillment path.
    pub fn has_reached(&self, milestone: FulfillmentStatus) -> bool {
        match (self.rank(), milestone.rank()) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        }
    }
}

/// Checks that an item currently in `from` may move to `to`.
///
/// A request for the status the item is already in, or any request against a terminal item, is a `Conflict`: some
/// other caller got there first. Every other illegal move is an `InvalidTransition`.
pub fn check_transition(from: FulfillmentStatus, to: FulfillmentStatus) -> Result<(), FulfillmentError> {
    if from == to || from.is_terminal() {
        return Err(FulfillmentError::Conflict(format!("The item is already {from}")));
    }
    if !from.can_transition_to(to) {
        return Err(FulfillmentError::InvalidTransition(format!("An item cannot move from {from} to {to}")));
    }
    Ok(())
}

/// The order status is the least advanced status among its live items. An order whose items are all cancelled is
/// cancelled.
pub fn project_order_status<I>(items: I) -> FulfillmentStatus
where I: IntoIterator<Item = FulfillmentStatus> {
    let mut saw_any = false;
    let least = items
        .into_iter()
        .inspect(|_| saw_any = true)
        .filter(|s| *s != Cancelled)
        .min_by_key(|s| s.rank().unwrap_or(u8::MAX));
    match least {
        Some(status) => status,
        None if saw_any => Cancelled,
        None => Pending,
    }
}
