//! Reference data for tests: one sector, slots around a fixed date, and a handful of products from two vendors.
use chrono::{NaiveDate, NaiveTime};
use fulfillment_common::Paise;

use crate::{
    db_types::{AddressSnapshot, DeliverySlot, NewDeliverySlot, NewOrder, NewOrderItem, NewProduct, NewSector, Product},
    traits::CatalogManagement,
};

pub const POSTAL_CODE: &str = "560001";
pub const VENDOR_A: i64 = 101;
pub const VENDOR_B: i64 = 102;
pub const CUSTOMER: i64 = 201;
pub const PARTNER: i64 = 301;
pub const OTHER_PARTNER: i64 = 302;
pub const ADMIN: i64 = 1;

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn address(postal_code: &str) -> AddressSnapshot {
    AddressSnapshot {
        recipient_name: "Asha Rao".into(),
        phone: "+91 98450 00000".into(),
        line1: "12 MG Road".into(),
        line2: None,
        landmark: Some("Opposite the metro station".into()),
        city: "Bengaluru".into(),
        postal_code: postal_code.into(),
    }
}

pub struct Catalog {
    pub sector_id: i64,
    pub slot: DeliverySlot,
    pub rice: Product,
    pub dal: Product,
    pub soap: Product,
}

/// A sector serving [`POSTAL_CODE`], a 10:00-12:00 slot on `slot_date` with a 09:00 cutoff and `capacity` places, rice
/// and dal from vendor A, and soap from vendor B.
pub async fn seed_catalog<B: CatalogManagement>(db: &B, slot_date: NaiveDate, capacity: i64) -> Catalog {
    let sector = db
        .create_sector(NewSector { name: "Central".into(), postal_codes: vec![POSTAL_CODE.into(), "560002".into()] })
        .await
        .expect("sector");
    let slot = db
        .create_slot(NewDeliverySlot {
            sector_id: sector.id,
            slot_date,
            start_time: time(10, 0),
            end_time: time(12, 0),
            cutoff_time: time(9, 0),
            max_orders: capacity,
        })
        .await
        .expect("slot");
    let rice = product(db, VENDOR_A, "Sona Masoori Rice 5kg", 45_000, 50).await;
    let dal = product(db, VENDOR_A, "Toor Dal 1kg", 16_000, 50).await;
    let soap = product(db, VENDOR_B, "Sandal Soap", 5_500, 50).await;
    Catalog { sector_id: sector.id, slot, rice, dal, soap }
}

pub async fn product<B: CatalogManagement>(db: &B, vendor_id: i64, name: &str, price: i64, stock: i64) -> Product {
    db.create_product(NewProduct {
        vendor_id,
        name: name.into(),
        unit_price: Paise::from(price),
        stock_quantity: stock,
    })
    .await
    .expect("product")
}

pub fn order_for(catalog: &Catalog, lines: &[(i64, i64)]) -> NewOrder {
    NewOrder {
        customer_id: CUSTOMER,
        slot_id: catalog.slot.id,
        address: address(POSTAL_CODE),
        items: lines.iter().map(|(product_id, quantity)| NewOrderItem { product_id: *product_id, quantity: *quantity }).collect(),
        delivery_fee: Paise::from(2_500),
    }
}
