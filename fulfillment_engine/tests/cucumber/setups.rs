use cucumber::given;
use fulfillment_common::Paise;
use fulfillment_engine::{
    db_types::{NewProduct, PayoutMethod, PayoutSettings, VendorSettings},
    test_utils::fixtures::date,
};

use crate::cucumber::{
    world::{vendor, FulfillmentWorld},
    FulfillmentSystem,
};

#[given("a fresh install")]
async fn fresh_install(world: &mut FulfillmentWorld) {
    world.system = Some(FulfillmentSystem::new(date(2030, 3, 15), 5).await);
}

#[given(expr = "a fresh install with room for {int} order(s) in the slot")]
async fn fresh_install_with_capacity(world: &mut FulfillmentWorld, capacity: i64) {
    world.system = Some(FulfillmentSystem::new(date(2030, 3, 15), capacity).await);
}

#[given(expr = "vendor {word} auto-approves orders under {int} rupees")]
async fn auto_approve_under(world: &mut FulfillmentWorld, name: String, rupees: i64) {
    let vendor = vendor(&name);
    let settings = VendorSettings {
        vendor_id: vendor.id,
        auto_approve_orders: false,
        auto_approve_under_amount: Some(Paise::from_rupees(rupees)),
        confirmation_timeout_minutes: 15,
    };
    world.system().catalog_api.update_vendor_settings(&vendor, settings).await.expect("Error saving settings");
}

#[given(expr = "vendor {word} sells {word} at {int} rupees")]
async fn vendor_sells(world: &mut FulfillmentWorld, name: String, product: String, rupees: i64) {
    let vendor = vendor(&name);
    let new_product =
        NewProduct { vendor_id: vendor.id, name: product.clone(), unit_price: Paise::from_rupees(rupees), stock_quantity: 20 };
    let record = world.system().catalog_api.create_product(&vendor, new_product).await.expect("Error creating product");
    world.products.insert(product, record);
}

#[given(expr = "vendor {word} is paid by bank transfer")]
async fn bank_transfer(world: &mut FulfillmentWorld, name: String) {
    let vendor = vendor(&name);
    let settings = PayoutSettings {
        payout_method: Some(PayoutMethod::BankTransfer),
        bank_account_holder: Some("Lakshmi Stores".into()),
        bank_account_number: Some("001234567890".into()),
        bank_ifsc: Some("HDFC0001234".into()),
        ..Default::default()
    };
    world.system().wallets.update_settings(&vendor, vendor.id, settings).await.expect("Error saving payout settings");
}
