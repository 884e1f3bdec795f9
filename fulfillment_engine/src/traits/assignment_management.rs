use chrono::NaiveDate;

use crate::{
    db_types::{DeliveryPartnerOrder, OrderPickup, SectorAssignment},
    traits::FulfillmentError,
};

/// Delivery partner assignments. All `ensure_*` methods are idempotent: calling them again with the same arguments
/// returns the existing records and creates nothing.
#[allow(async_fn_in_trait)]
pub trait AssignmentManagement {
    /// Returns the order's active assignment, creating it for `partner_id` if there is none. The boolean is true if a
    /// record was created. Fails with `Conflict` if the order is already assigned to a different partner.
    ///
    /// Also records the partner on the order if the order does not have one yet.
    async fn ensure_assignment(
        &self,
        order_id: i64,
        partner_id: i64,
    ) -> Result<(DeliveryPartnerOrder, bool), FulfillmentError>;

    /// Ensures one pickup record exists per vendor that still has live items in the order. Returns all pickup
    /// records of the order for this partner, and how many were created.
    async fn ensure_pickup_records(
        &self,
        order_id: i64,
        partner_id: i64,
    ) -> Result<(Vec<OrderPickup>, usize), FulfillmentError>;

    /// `ensure_assignment` and `ensure_pickup_records` in one transaction, after which every `packed` item of the
    /// order is moved to `assigned_to_delivery`.
    async fn assign_delivery(
        &self,
        order_id: i64,
        partner_id: i64,
    ) -> Result<(DeliveryPartnerOrder, Vec<OrderPickup>), FulfillmentError>;

    async fn fetch_assignment_for_order(&self, order_id: i64)
        -> Result<Option<DeliveryPartnerOrder>, FulfillmentError>;

    async fn fetch_pickups_for_order(&self, order_id: i64) -> Result<Vec<OrderPickup>, FulfillmentError>;

    /// Puts a partner on the roster for a sector and date. Reactivates an existing entry instead of duplicating it.
    async fn upsert_sector_assignment(
        &self,
        sector_id: i64,
        partner_id: i64,
        date: NaiveDate,
    ) -> Result<SectorAssignment, FulfillmentError>;

    async fn fetch_sector_assignments(&self, date: NaiveDate) -> Result<Vec<SectorAssignment>, FulfillmentError>;
}
