use std::fmt::Debug;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::*;

use crate::{
    db_types::DeliverySlot,
    traits::{FulfillmentError, SlotManagement},
};

/// Decides which slots can be booked at a given moment. `now` is the local wall-clock time of the service area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRules {
    pub preorder_threshold: NaiveTime,
}

impl SlotRules {
    pub fn new(preorder_threshold: NaiveTime) -> Self {
        Self { preorder_threshold }
    }

    /// Whether the slot's cutoff still allows orders at `now`, ignoring capacity.
    ///
    /// * Past dates are never open.
    /// * Future dates are always open.
    /// * For today, a slot is open until its cutoff. Before the pre-order threshold, every slot of the day is open.
    pub fn is_open(&self, slot: &DeliverySlot, now: NaiveDateTime) -> bool {
        let today = now.date();
        if !slot.is_active || slot.slot_date < today {
            return false;
        }
        if slot.slot_date > today {
            return true;
        }
        now.time() < self.preorder_threshold || now.time() < slot.cutoff_time
    }

    /// Open and with capacity left.
    pub fn is_bookable(&self, slot: &DeliverySlot, now: NaiveDateTime) -> bool {
        !slot.is_full() && self.is_open(slot, now)
    }
}

pub struct SlotApi<B> {
    db: B,
    rules: SlotRules,
}

impl<B> Debug for SlotApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SlotApi ({:?})", self.rules)
    }
}

impl<B> SlotApi<B>
where B: SlotManagement
{
    pub fn new(db: B, rules: SlotRules) -> Self {
        Self { db, rules }
    }

    pub fn rules(&self) -> &SlotRules {
        &self.rules
    }

    /// Slots of the sector on `date` that can be booked at `now`, in start time order. Full slots are left out.
    pub async fn list_available_slots(
        &self,
        sector_id: i64,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<DeliverySlot>, FulfillmentError> {
        if date < now.date() {
            return Ok(vec![]);
        }
        let slots = self.db.fetch_slots_for_sector(sector_id, date).await?;
        let total = slots.len();
        let available = slots.into_iter().filter(|s| self.rules.is_bookable(s, now)).collect::<Vec<_>>();
        trace!("📦️ {} of {total} slots in sector {sector_id} on {date} are bookable at {now}", available.len());
        Ok(available)
    }

    /// Every active slot of the sector on `date`, including full and closed ones.
    pub async fn all_slots(&self, sector_id: i64, date: NaiveDate) -> Result<Vec<DeliverySlot>, FulfillmentError> {
        self.db.fetch_slots_for_sector(sector_id, date).await
    }

    pub async fn reserve(&self, slot_id: i64) -> Result<DeliverySlot, FulfillmentError> {
        let slot = self.db.reserve_slot(slot_id).await?;
        debug!("📦️ Reserved slot {slot_id}. {} places left", slot.available_orders);
        Ok(slot)
    }

    pub async fn release(&self, slot_id: i64) -> Result<DeliverySlot, FulfillmentError> {
        let slot = self.db.release_slot(slot_id).await?;
        debug!("📦️ Released slot {slot_id}. {} places left", slot.available_orders);
        Ok(slot)
    }
}
