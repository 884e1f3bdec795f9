use chrono::NaiveDate;

use crate::{
    db_types::{DeliverySlot, NewDeliverySlot, NewProduct, NewSector, Product, Sector, VendorSettings},
    traits::FulfillmentError,
};

/// Reference data the fulfillment flow depends on: sectors and their postal codes, delivery slots, products and
/// vendor confirmation settings.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    /// Creates a sector and registers the postal codes it serves.
    async fn create_sector(&self, sector: NewSector) -> Result<Sector, FulfillmentError>;

    async fn fetch_sector(&self, sector_id: i64) -> Result<Option<Sector>, FulfillmentError>;

    /// Creates a slot with `available_orders == max_orders`.
    async fn create_slot(&self, slot: NewDeliverySlot) -> Result<DeliverySlot, FulfillmentError>;

    /// Creates one slot per date in `dates` using the same time window and capacity. Dates that already have a slot
    /// with the same start time are skipped.
    async fn create_slots_for_dates(
        &self,
        template: NewDeliverySlot,
        dates: &[NaiveDate],
    ) -> Result<Vec<DeliverySlot>, FulfillmentError>;

    async fn create_product(&self, product: NewProduct) -> Result<Product, FulfillmentError>;

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, FulfillmentError>;

    async fn upsert_vendor_settings(&self, settings: VendorSettings) -> Result<VendorSettings, FulfillmentError>;

    async fn fetch_vendor_settings(&self, vendor_id: i64) -> Result<Option<VendorSettings>, FulfillmentError>;
}
