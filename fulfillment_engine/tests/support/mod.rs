#![allow(dead_code)]
//! A full set of APIs over one throwaway database, plus shortcuts for driving orders through their lifecycle.
use chrono::{NaiveDate, NaiveDateTime};
use fulfillment_engine::{
    db_types::{Actor, FulfillmentStatus, OrderItem},
    events::EventProducers,
    order_objects::PlacedOrder,
    test_utils::{
        fixtures::{date, order_for, seed_catalog, Catalog, ADMIN, CUSTOMER, PARTNER},
        prepare_env::fresh_database,
    },
    AssignmentApi,
    CatalogApi,
    DeliveryVerificationApi,
    FulfillmentDatabase,
    OrderFlowApi,
    PayoutApi,
    SlotApi,
    SlotRules,
    SqliteDatabase,
    WalletApi,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

/// The delivery date every test books into.
pub fn slot_date() -> NaiveDate {
    date(2030, 3, 15)
}

/// The day before the slot, comfortably before any cutoff.
pub fn booking_time() -> NaiveDateTime {
    date(2030, 3, 14).and_hms_opt(12, 0, 0).expect("valid time")
}

pub struct System {
    pub db: SqliteDatabase,
    pub catalog: Catalog,
    pub slots: SlotApi<SqliteDatabase>,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub assignments: AssignmentApi<SqliteDatabase>,
    pub verifier: DeliveryVerificationApi<SqliteDatabase>,
    pub wallets: WalletApi<SqliteDatabase>,
    pub payouts: PayoutApi<SqliteDatabase>,
    pub catalog_api: CatalogApi<SqliteDatabase>,
}

impl System {
    pub async fn new(capacity: i64) -> Self {
        Self::with_producers(capacity, EventProducers::default()).await
    }

    pub async fn with_producers(capacity: i64, producers: EventProducers) -> Self {
        let db = fresh_database().await;
        let catalog = seed_catalog(&db, slot_date(), capacity).await;
        let policy = fulfillment_engine::FulfillmentPolicy::default();
        Self {
            slots: SlotApi::new(db.clone(), SlotRules::new(policy.preorder_threshold)),
            orders: OrderFlowApi::new(db.clone(), producers.clone()),
            assignments: AssignmentApi::new(db.clone(), producers.clone()),
            verifier: DeliveryVerificationApi::new(db.clone(), producers.clone()),
            wallets: WalletApi::new(db.clone(), producers.clone()),
            payouts: PayoutApi::new(db.clone(), producers),
            catalog_api: CatalogApi::new(db.clone()),
            catalog,
            db,
        }
    }

    pub fn customer(&self) -> Actor {
        Actor::customer(CUSTOMER)
    }

    pub fn partner(&self) -> Actor {
        Actor::delivery_partner(PARTNER)
    }

    pub fn admin(&self) -> Actor {
        Actor::admin(ADMIN)
    }

    /// Places an order for the given `(product_id, quantity)` lines.
    pub async fn place(&self, lines: &[(i64, i64)]) -> PlacedOrder {
        let order = order_for(&self.catalog, lines);
        self.orders.create_order(&self.customer(), order, booking_time()).await.expect("order should be placed")
    }

    /// Places an order with one line per vendor: 2 bags of rice from vendor A and 3 soaps from vendor B.
    pub async fn place_two_vendor_order(&self) -> PlacedOrder {
        self.place(&[(self.catalog.rice.id, 2), (self.catalog.soap.id, 3)]).await
    }

    /// Moves every item of the order through confirmation, processing and packing as its vendor.
    pub async fn pack_all(&self, placed: &PlacedOrder) {
        for item in &placed.items {
            let vendor = Actor::vendor(item.vendor_id);
            self.orders.confirm_item(&vendor, item.id).await.expect("confirm");
            self.orders.mark_processing(&vendor, item.id).await.expect("processing");
            self.orders.mark_packed(&vendor, item.id).await.expect("packed");
        }
    }

    /// Packs, assigns, picks up, dispatches and delivers the whole order.
    pub async fn deliver(&self, placed: &PlacedOrder) {
        self.pack_all(placed).await;
        let partner = self.partner();
        self.assignments.assign_delivery(&self.admin(), placed.order_id(), partner.id).await.expect("assign");
        for otp in pickup_codes(&placed.items) {
            self.verifier.verify_pickup_otp(&partner, placed.order_id(), &otp).await.expect("pickup");
        }
        self.orders.mark_out_for_delivery(&partner, placed.order_id()).await.expect("out for delivery");
        let otp = delivery_code(&placed.items);
        self.verifier.verify_delivery_otp(&partner, placed.order_id(), &otp).await.expect("delivery");
    }

    pub async fn item(&self, item_id: i64) -> OrderItem {
        use fulfillment_engine::OrderManagement;
        self.db.fetch_item(item_id).await.expect("fetch item").expect("item exists")
    }

    pub async fn item_status(&self, item_id: i64) -> FulfillmentStatus {
        self.item(item_id).await.item_status
    }

    pub async fn tear_down(mut self) {
        let url = self.db.url().to_string();
        if let Err(e) = self.db.close().await {
            log::error!("🚀️ Failed to close database: {e}");
        }
        let _ = Sqlite::drop_database(&url).await;
    }
}

/// The distinct pickup codes of the items, one per vendor.
pub fn pickup_codes(items: &[OrderItem]) -> Vec<String> {
    let mut codes = items.iter().filter_map(|i| i.pickup_otp.clone()).collect::<Vec<_>>();
    codes.sort();
    codes.dedup();
    codes
}

pub fn delivery_code(items: &[OrderItem]) -> String {
    items.iter().find_map(|i| i.delivery_otp.clone()).expect("order has a delivery code")
}

/// A six digit code that is guaranteed not to be any of `used`.
pub fn wrong_code(used: &[String]) -> String {
    (0..1_000_000).map(|n| format!("{n:06}")).find(|c| !used.contains(c)).expect("a free code")
}
