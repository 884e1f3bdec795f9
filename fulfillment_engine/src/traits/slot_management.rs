use chrono::NaiveDate;

use crate::{db_types::DeliverySlot, traits::FulfillmentError};

/// Slot capacity. `available_orders` only ever changes through [`reserve_slot`](SlotManagement::reserve_slot) and
/// [`release_slot`](SlotManagement::release_slot), and both are single conditional writes.
#[allow(async_fn_in_trait)]
pub trait SlotManagement {
    async fn fetch_slot(&self, slot_id: i64) -> Result<Option<DeliverySlot>, FulfillmentError>;

    /// All active slots for the sector on the given date, ordered by start time. Full slots are included.
    async fn fetch_slots_for_sector(
        &self,
        sector_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<DeliverySlot>, FulfillmentError>;

    /// Takes one unit of capacity. Fails with `CapacityExceeded` if the slot is full and `NotFound` if it does not
    /// exist or is inactive.
    async fn reserve_slot(&self, slot_id: i64) -> Result<DeliverySlot, FulfillmentError>;

    /// Gives one unit of capacity back. Never raises `available_orders` above `max_orders`.
    async fn release_slot(&self, slot_id: i64) -> Result<DeliverySlot, FulfillmentError>;

    async fn sector_serves_postal_code(&self, sector_id: i64, postal_code: &str) -> Result<bool, FulfillmentError>;
}
