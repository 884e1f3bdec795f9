use std::{collections::HashMap, fmt::Debug};

use cucumber::World;
use fulfillment_engine::{
    db_types::{Actor, OrderItem, Product},
    events::EventProducers,
    order_objects::PlacedOrder,
    test_utils::{
        fixtures::{seed_catalog, Catalog, ADMIN, CUSTOMER, PARTNER, VENDOR_A, VENDOR_B},
        prepare_env::fresh_database,
    },
    AssignmentApi,
    CatalogApi,
    DeliveryVerificationApi,
    FulfillmentDatabase,
    FulfillmentError,
    FulfillmentPolicy,
    OrderFlowApi,
    PayoutApi,
    SlotApi,
    SlotRules,
    SqliteDatabase,
    WalletApi,
};

#[derive(Default, Debug, World)]
pub struct FulfillmentWorld {
    pub system: Option<FulfillmentSystem>,
    /// The order the scenario is currently talking about.
    pub order: Option<PlacedOrder>,
    pub payout_id: Option<i64>,
    /// Outcomes of the most recent batch of operations, in the order they were issued.
    pub outcomes: Vec<Result<(), FulfillmentError>>,
    /// Extra products created by the scenario, by name.
    pub products: HashMap<String, Product>,
}

pub struct FulfillmentSystem {
    pub db_path: String,
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

impl Debug for FulfillmentSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FulfillmentSystem({})", self.db_path)
    }
}

impl FulfillmentSystem {
    pub async fn new(slot_date: chrono::NaiveDate, capacity: i64) -> Self {
        let db = fresh_database().await;
        let catalog = seed_catalog(&db, slot_date, capacity).await;
        let policy = FulfillmentPolicy::default();
        let producers = EventProducers::default();
        Self {
            db_path: db.url().to_string(),
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
}

impl FulfillmentWorld {
    pub fn system(&self) -> &FulfillmentSystem {
        self.system.as_ref().expect("The system has not been initialised")
    }

    pub fn order(&self) -> &PlacedOrder {
        self.order.as_ref().expect("No order has been placed yet")
    }

    /// Looks a product up by the short name used in feature files.
    pub fn product(&self, name: &str) -> Product {
        let catalog = &self.system().catalog;
        match name {
            "rice" => catalog.rice.clone(),
            "dal" => catalog.dal.clone(),
            "soap" => catalog.soap.clone(),
            other => self.products.get(other).cloned().unwrap_or_else(|| panic!("Unknown product {other}")),
        }
    }

    /// The line of the current order for the named product.
    pub fn item(&self, name: &str) -> OrderItem {
        let product = self.product(name);
        self.order()
            .items
            .iter()
            .find(|i| i.product_id == product.id)
            .cloned()
            .unwrap_or_else(|| panic!("The order has no {name}"))
    }

    pub fn record<T>(&mut self, result: Result<T, FulfillmentError>) {
        self.outcomes.push(result.map(|_| ()));
    }
}

pub fn vendor(name: &str) -> Actor {
    match name {
        "A" => Actor::vendor(VENDOR_A),
        "B" => Actor::vendor(VENDOR_B),
        other => panic!("Unknown vendor {other}"),
    }
}

pub fn actor(role: &str) -> Actor {
    match role {
        "customer" => Actor::customer(CUSTOMER),
        "partner" | "delivery partner" => Actor::delivery_partner(PARTNER),
        "admin" => Actor::admin(ADMIN),
        other => panic!("Unknown actor {other}"),
    }
}

/// The variant name of an error, as written in feature files.
pub fn error_kind(e: &FulfillmentError) -> &'static str {
    match e {
        FulfillmentError::Validation(_) => "Validation",
        FulfillmentError::NotAuthorized(_) => "NotAuthorized",
        FulfillmentError::NotFound(_) => "NotFound",
        FulfillmentError::Conflict(_) => "Conflict",
        FulfillmentError::InvalidTransition(_) => "InvalidTransition",
        FulfillmentError::CapacityExceeded(_) => "CapacityExceeded",
        FulfillmentError::SlotUnavailable(_) => "SlotUnavailable",
        FulfillmentError::OutOfStock { .. } => "OutOfStock",
        FulfillmentError::InvalidOtp => "InvalidOtp",
        FulfillmentError::InsufficientBalance { .. } => "InsufficientBalance",
        FulfillmentError::DatabaseError(_) => "DatabaseError",
    }
}
