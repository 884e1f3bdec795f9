use std::fmt::Debug;

use chrono::NaiveDate;
use log::*;

use crate::{
    api::{require_role, FulfillmentPolicy, MAX_CONFIRMATION_TIMEOUT_MINUTES},
    db_types::{Actor, DeliverySlot, NewDeliverySlot, NewProduct, NewSector, Product, Role, Sector, VendorSettings},
    traits::{CatalogManagement, FulfillmentError},
};

/// Longest date range `create_slots_for_range` will fill in one call.
pub const MAX_SLOT_RANGE_DAYS: i64 = 62;

/// Reference data: sectors, slots, products and vendor confirmation settings.
pub struct CatalogApi<B> {
    db: B,
    policy: FulfillmentPolicy,
}

impl<B> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi")
    }
}

impl<B> CatalogApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, policy: FulfillmentPolicy::default() }
    }

    pub fn with_policy(mut self, policy: FulfillmentPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub async fn create_sector(&self, actor: &Actor, sector: NewSector) -> Result<Sector, FulfillmentError> {
        require_role(actor, &[Role::Admin])?;
        if sector.name.trim().is_empty() {
            return Err(FulfillmentError::Validation("A sector needs a name".into()));
        }
        let mut codes = sector.postal_codes.iter().map(|c| c.trim().to_string()).collect::<Vec<_>>();
        if let Some(bad) = codes.iter().find(|c| c.len() != 6 || !c.chars().all(|ch| ch.is_ascii_digit())) {
            return Err(FulfillmentError::Validation(format!("{bad} is not a valid postal code")));
        }
        codes.sort();
        codes.dedup();
        let record = self.db.create_sector(NewSector { name: sector.name.trim().to_string(), postal_codes: codes }).await?;
        info!("📦️ Sector {} ({}) created", record.id, record.name);
        Ok(record)
    }

    pub async fn fetch_sector(&self, sector_id: i64) -> Result<Sector, FulfillmentError> {
        self.db.fetch_sector(sector_id).await?.ok_or_else(|| FulfillmentError::NotFound(format!("Sector {sector_id}")))
    }

    pub async fn create_slot(&self, actor: &Actor, slot: NewDeliverySlot) -> Result<DeliverySlot, FulfillmentError> {
        require_role(actor, &[Role::Admin])?;
        validate_slot(&slot)?;
        self.fetch_sector(slot.sector_id).await?;
        self.db.create_slot(slot).await
    }

    /// Creates the same slot on every date from `from` to `to` inclusive, skipping dates that already have it.
    pub async fn create_slots_for_range(
        &self,
        actor: &Actor,
        template: NewDeliverySlot,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DeliverySlot>, FulfillmentError> {
        require_role(actor, &[Role::Admin])?;
        validate_slot(&template)?;
        let days = (to - from).num_days();
        if !(0..MAX_SLOT_RANGE_DAYS).contains(&days) {
            return Err(FulfillmentError::Validation(format!(
                "Slots can be created for 1 to {MAX_SLOT_RANGE_DAYS} days at a time"
            )));
        }
        self.fetch_sector(template.sector_id).await?;
        let dates = from.iter_days().take_while(|d| *d <= to).collect::<Vec<_>>();
        self.db.create_slots_for_dates(template, &dates).await
    }

    /// Vendors add their own products. Admins may add products for any vendor.
    pub async fn create_product(&self, actor: &Actor, product: NewProduct) -> Result<Product, FulfillmentError> {
        require_vendor_or_admin(actor, product.vendor_id)?;
        if product.name.trim().is_empty() {
            return Err(FulfillmentError::Validation("A product needs a name".into()));
        }
        if !product.unit_price.is_positive() {
            return Err(FulfillmentError::Validation("The unit price must be positive".into()));
        }
        if product.stock_quantity < 0 {
            return Err(FulfillmentError::Validation("Stock cannot be negative".into()));
        }
        let record = self.db.create_product(product).await?;
        debug!("📦️ Product {} ({}) added for vendor {}", record.id, record.name, record.vendor_id);
        Ok(record)
    }

    pub async fn fetch_product(&self, product_id: i64) -> Result<Product, FulfillmentError> {
        self.db
            .fetch_product(product_id)
            .await?
            .ok_or_else(|| FulfillmentError::NotFound(format!("Product {product_id}")))
    }

    /// The vendor's confirmation settings, or the defaults if none were saved.
    pub async fn vendor_settings(&self, vendor_id: i64) -> Result<VendorSettings, FulfillmentError> {
        let settings = self.db.fetch_vendor_settings(vendor_id).await?;
        Ok(settings.unwrap_or_else(|| VendorSettings::defaults_for(vendor_id, self.policy.confirmation_timeout_minutes)))
    }

    pub async fn update_vendor_settings(
        &self,
        actor: &Actor,
        settings: VendorSettings,
    ) -> Result<VendorSettings, FulfillmentError> {
        require_vendor_or_admin(actor, settings.vendor_id)?;
        if !(1..=MAX_CONFIRMATION_TIMEOUT_MINUTES).contains(&settings.confirmation_timeout_minutes) {
            return Err(FulfillmentError::Validation(format!(
                "The confirmation timeout must be between 1 and {MAX_CONFIRMATION_TIMEOUT_MINUTES} minutes"
            )));
        }
        if settings.auto_approve_under_amount.map(|a| !a.is_positive()).unwrap_or(false) {
            return Err(FulfillmentError::Validation("The auto-approve threshold must be positive".into()));
        }
        let record = self.db.upsert_vendor_settings(settings).await?;
        info!("📦️ Confirmation settings of vendor {} updated", record.vendor_id);
        Ok(record)
    }
}

fn require_vendor_or_admin(actor: &Actor, vendor_id: i64) -> Result<(), FulfillmentError> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Vendor if actor.id == vendor_id => Ok(()),
        _ => Err(FulfillmentError::NotAuthorized(format!("{actor} may not manage vendor {vendor_id}"))),
    }
}

fn validate_slot(slot: &NewDeliverySlot) -> Result<(), FulfillmentError> {
    if slot.end_time <= slot.start_time {
        return Err(FulfillmentError::Validation("A slot must end after it starts".into()));
    }
    if slot.cutoff_time > slot.start_time {
        return Err(FulfillmentError::Validation("The order cutoff cannot be later than the slot start".into()));
    }
    if slot.max_orders <= 0 {
        return Err(FulfillmentError::Validation("A slot must accept at least one order".into()));
    }
    Ok(())
}
