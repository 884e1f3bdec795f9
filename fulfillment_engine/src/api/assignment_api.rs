use std::{collections::HashSet, fmt::Debug};

use chrono::NaiveDate;
use log::*;

use crate::{
    api::{
        assignment_objects::{DeliveryAssignment, RepairError, RepairReport},
        require_role,
    },
    db_types::{Actor, DeliveryPartnerOrder, FulfillmentStatus, Order, OrderPickup, Role, SectorAssignment},
    events::{DeliveryAssignedEvent, EventProducers, ItemStatusChangedEvent},
    traits::{FulfillmentDatabase, FulfillmentError},
};

/// `AssignmentApi` links orders to delivery partners.
///
/// An assignment consists of one `DeliveryPartnerOrder` per order and one `OrderPickup` per vendor in that order.
/// Both are created by idempotent upserts keyed on their natural identity, so every method here can be repeated, and
/// can race with itself, without producing duplicates.
pub struct AssignmentApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for AssignmentApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AssignmentApi")
    }
}

impl<B> AssignmentApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> AssignmentApi<B>
where B: FulfillmentDatabase
{
    /// Returns the order's assignment to `partner_id`, creating it if needed. The flag is true if it was created.
    pub async fn ensure_assignment(
        &self,
        order_id: i64,
        partner_id: i64,
    ) -> Result<(DeliveryPartnerOrder, bool), FulfillmentError> {
        self.fetch_assignable_order(order_id).await?;
        self.db.ensure_assignment(order_id, partner_id).await
    }

    /// Returns the order's pickup records for `partner_id`, creating any that are missing, and how many were created.
    pub async fn ensure_pickup_records(
        &self,
        order_id: i64,
        partner_id: i64,
    ) -> Result<(Vec<OrderPickup>, usize), FulfillmentError> {
        self.fetch_assignable_order(order_id).await?;
        self.db.ensure_pickup_records(order_id, partner_id).await
    }

    /// Assigns the order to a delivery partner and hands every packed item over to them.
    ///
    /// Admins may assign any partner. A delivery partner may only assign themselves. Assigning the same partner again
    /// is a no-op; assigning a different partner to an order that already has one is a `Conflict`.
    pub async fn assign_delivery(
        &self,
        actor: &Actor,
        order_id: i64,
        partner_id: i64,
    ) -> Result<DeliveryAssignment, FulfillmentError> {
        require_role(actor, &[Role::Admin, Role::DeliveryPartner])?;
        if actor.role == Role::DeliveryPartner && actor.id != partner_id {
            return Err(FulfillmentError::NotAuthorized("Delivery partners can only assign orders to themselves".into()));
        }
        self.fetch_assignable_order(order_id).await?;
        let packed = self
            .db
            .fetch_order_items(order_id)
            .await?
            .into_iter()
            .filter(|i| i.item_status == FulfillmentStatus::Packed)
            .map(|i| i.id)
            .collect::<HashSet<_>>();
        let (assignment, pickups) = self.db.assign_delivery(order_id, partner_id).await?;
        info!("🚚️ Order {order_id} assigned to delivery partner {partner_id} with {} pickups", pickups.len());
        if !packed.is_empty() {
            let handed_over = self
                .db
                .fetch_order_items(order_id)
                .await?
                .into_iter()
                .filter(|i| packed.contains(&i.id) && i.item_status == FulfillmentStatus::AssignedToDelivery);
            for item in handed_over {
                let event = ItemStatusChangedEvent::new(item, FulfillmentStatus::Packed, Some(*actor));
                self.producers.publish_item_status_changed(event).await;
            }
        }
        let event = DeliveryAssignedEvent::new(assignment.clone(), pickups.clone());
        self.producers.publish_delivery_assigned(event).await;
        Ok(DeliveryAssignment { assignment, pickups })
    }

    /// The batch self-healing pass.
    ///
    /// For every active roster entry of `date`, makes sure every live order booked into the sector that day has an
    /// assignment and its pickup records. Orders that already have a partner keep them; otherwise the rostered
    /// partner is used. Failures are collected per order and never abort the pass.
    pub async fn repair_day(&self, date: NaiveDate) -> Result<RepairReport, FulfillmentError> {
        let roster = self.db.fetch_sector_assignments(date).await?;
        let mut report = RepairReport::new(date);
        let mut seen = HashSet::new();
        for entry in roster.iter().filter(|r| r.is_active) {
            report.assignments_checked += 1;
            let orders = match self.db.fetch_orders_for_sector_date(entry.sector_id, date).await {
                Ok(orders) => orders,
                Err(e) => {
                    warn!("🚚️ Could not load the orders of sector {} on {date}. {e}", entry.sector_id);
                    continue;
                },
            };
            for order in orders {
                if !seen.insert(order.id) {
                    continue;
                }
                report.orders_checked += 1;
                if let Err(e) = self.repair_order(&order, entry.delivery_partner_id, &mut report).await {
                    warn!("🚚️ Could not repair the assignment of order {}. {e}", order.order_number);
                    report.errors.push(RepairError { order_id: order.id, message: e.to_string() });
                }
            }
        }
        if report.is_clean() {
            debug!("🚚️ Assignments for {date} are consistent. {} orders checked", report.orders_checked);
        } else {
            info!(
                "🚚️ Repair of {date}: {} assignments and {} pickups created, {} orders linked, {} errors",
                report.assignments_created,
                report.pickups_created,
                report.orders_linked,
                report.errors.len()
            );
        }
        Ok(report)
    }

    async fn repair_order(
        &self,
        order: &Order,
        rostered_partner: i64,
        report: &mut RepairReport,
    ) -> Result<(), FulfillmentError> {
        let partner_id = match self.db.fetch_assignment_for_order(order.id).await? {
            Some(existing) => existing.delivery_partner_id,
            None => rostered_partner,
        };
        let (_, created) = self.db.ensure_assignment(order.id, partner_id).await?;
        if created {
            report.assignments_created += 1;
        }
        if order.delivery_partner_id.is_none() {
            report.orders_linked += 1;
        }
        let (_, pickups_created) = self.db.ensure_pickup_records(order.id, partner_id).await?;
        report.pickups_created += pickups_created;
        Ok(())
    }

    /// Puts a delivery partner on the roster for a sector and date. Admin only.
    pub async fn assign_sector(
        &self,
        actor: &Actor,
        sector_id: i64,
        partner_id: i64,
        date: NaiveDate,
    ) -> Result<SectorAssignment, FulfillmentError> {
        require_role(actor, &[Role::Admin])?;
        self.db.fetch_sector(sector_id).await?.ok_or_else(|| FulfillmentError::NotFound(format!("Sector {sector_id}")))?;
        let entry = self.db.upsert_sector_assignment(sector_id, partner_id, date).await?;
        info!("🚚️ Delivery partner {partner_id} rostered on sector {sector_id} for {date}");
        Ok(entry)
    }

    pub async fn sector_assignments(&self, date: NaiveDate) -> Result<Vec<SectorAssignment>, FulfillmentError> {
        self.db.fetch_sector_assignments(date).await
    }

    /// Only orders a vendor has confirmed, and that are not fully cancelled, can be assigned.
    async fn fetch_assignable_order(&self, order_id: i64) -> Result<Order, FulfillmentError> {
        let order =
            self.db.fetch_order(order_id).await?.ok_or_else(|| FulfillmentError::NotFound(format!("Order {order_id}")))?;
        match order.order_status {
            FulfillmentStatus::Cancelled => {
                Err(FulfillmentError::InvalidTransition(format!("Order {} is cancelled", order.order_number)))
            },
            FulfillmentStatus::Pending => Err(FulfillmentError::InvalidTransition(format!(
                "Order {} has not been confirmed by its vendors yet",
                order.order_number
            ))),
            _ => Ok(order),
        }
    }
}
