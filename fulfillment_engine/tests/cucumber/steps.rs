use std::str::FromStr;

use chrono::{Duration, Utc};
use cucumber::{then, when};
use fulfillment_common::Paise;
use fulfillment_engine::{
    db_types::{CancellationReason, FulfillmentStatus},
    test_utils::fixtures::{date, order_for, PARTNER},
    wallet_objects::PayoutApplication,
    OrderManagement,
    SlotManagement,
};
use futures_util::future::join_all;

use crate::cucumber::world::{actor, error_kind, vendor, FulfillmentWorld};

fn booking_time() -> chrono::NaiveDateTime {
    date(2030, 3, 14).and_hms_opt(12, 0, 0).expect("valid time")
}

#[when(expr = "the customer orders {int} {word}")]
async fn customer_orders(world: &mut FulfillmentWorld, quantity: i64, product: String) {
    let product = world.product(&product);
    let sys = world.system();
    let order = order_for(&sys.catalog, &[(product.id, quantity)]);
    let placed = sys.orders.create_order(&actor("customer"), order, booking_time()).await.expect("Error placing order");
    world.order = Some(placed);
}

#[when(expr = "the customer orders {int} {word} and {int} {word}")]
async fn customer_orders_two(world: &mut FulfillmentWorld, qty_a: i64, product_a: String, qty_b: i64, product_b: String) {
    let (a, b) = (world.product(&product_a), world.product(&product_b));
    let sys = world.system();
    let order = order_for(&sys.catalog, &[(a.id, qty_a), (b.id, qty_b)]);
    let placed = sys.orders.create_order(&actor("customer"), order, booking_time()).await.expect("Error placing order");
    world.order = Some(placed);
}

#[when(expr = "{int} customers order {int} {word} at the same time")]
async fn simultaneous_orders(world: &mut FulfillmentWorld, customers: usize, quantity: i64, product: String) {
    let product = world.product(&product);
    let sys = world.system();
    let customer = actor("customer");
    let attempts = (0..customers).map(|_| {
        let order = order_for(&sys.catalog, &[(product.id, quantity)]);
        sys.orders.create_order(&customer, order, booking_time())
    });
    let results = join_all(attempts).await;
    world.outcomes.clear();
    for result in results {
        if let Ok(placed) = &result {
            world.order = Some(placed.clone());
        }
        world.record(result);
    }
}

#[when(expr = "vendor {word} prepares the {word}")]
async fn vendor_prepares(world: &mut FulfillmentWorld, name: String, product: String) {
    let vendor = vendor(&name);
    let item = world.item(&product);
    let sys = world.system();
    sys.orders.confirm_item(&vendor, item.id).await.expect("Error confirming");
    sys.orders.mark_processing(&vendor, item.id).await.expect("Error processing");
    sys.orders.mark_packed(&vendor, item.id).await.expect("Error packing");
}

#[when("the delivery partner collects the order")]
async fn partner_collects(world: &mut FulfillmentWorld) {
    let sys = world.system();
    let placed = world.order();
    let partner = actor("partner");
    sys.assignments.assign_delivery(&actor("admin"), placed.order_id(), PARTNER).await.expect("Error assigning");
    let mut codes = placed.items.iter().filter_map(|i| i.pickup_otp.clone()).collect::<Vec<_>>();
    codes.sort();
    codes.dedup();
    for code in codes {
        sys.verifier.verify_pickup_otp(&partner, placed.order_id(), &code).await.expect("Error verifying pickup");
    }
    sys.orders.mark_out_for_delivery(&partner, placed.order_id()).await.expect("Error dispatching");
}

#[when("the delivery partner hands the order over")]
async fn partner_delivers(world: &mut FulfillmentWorld) {
    let sys = world.system();
    let placed = world.order();
    let code = placed.items.iter().find_map(|i| i.delivery_otp.clone()).expect("No delivery code");
    sys.verifier.verify_delivery_otp(&actor("partner"), placed.order_id(), &code).await.expect("Error delivering");
}

#[when(expr = "the delivery partner enters the pickup code of vendor {word} again")]
async fn reuse_pickup_code(world: &mut FulfillmentWorld, name: String) {
    let vendor_id = vendor(&name).id;
    let code = world
        .order()
        .items
        .iter()
        .find(|i| i.vendor_id == vendor_id)
        .and_then(|i| i.pickup_otp.clone())
        .expect("No pickup code");
    let order_id = world.order().order_id();
    let result = world.system().verifier.verify_pickup_otp(&actor("partner"), order_id, &code).await;
    world.outcomes.clear();
    world.record(result);
}

#[when(expr = "the {word} cancels the {word} item as {word}")]
async fn cancel_item(world: &mut FulfillmentWorld, role: String, product: String, reason: String) {
    let reason = CancellationReason::from_str(&reason).expect("Unknown cancellation reason");
    let item = world.item(&product);
    let result = world.system().orders.cancel_item(&actor(&role), item.id, reason, None).await;
    world.outcomes.clear();
    world.record(result);
}

#[when(expr = "the customer and vendor {word} cancel the {word} item at the same time")]
async fn cancellation_race(world: &mut FulfillmentWorld, name: String, product: String) {
    let item = world.item(&product);
    let sys = world.system();
    let customer = actor("customer");
    let vendor_actor = vendor(&name);
    let (by_customer, by_vendor) = tokio::join!(
        sys.orders.cancel_item(&customer, item.id, CancellationReason::ChangedMind, None),
        sys.orders.reject_item(&vendor_actor, item.id, "Out of stock at the shop"),
    );
    world.outcomes.clear();
    world.record(by_customer);
    world.record(by_vendor);
}

#[when(expr = "the confirmation sweep runs {int} minutes later")]
async fn sweep(world: &mut FulfillmentWorld, minutes: i64) {
    world.system().orders.run_confirmation_timeouts(Utc::now() + Duration::minutes(minutes)).await.expect("Sweep failed");
}

#[when(expr = "vendor {word} requests a payout of {int} rupees")]
async fn request_payout(world: &mut FulfillmentWorld, name: String, rupees: i64) {
    let vendor = vendor(&name);
    let application = PayoutApplication::new(Paise::from_rupees(rupees));
    let payout = world.system().wallets.request_payout(&vendor, vendor.id, application).await.expect("Request failed");
    world.payout_id = Some(payout.id);
}

#[when("an admin approves the payout")]
async fn approve_payout(world: &mut FulfillmentWorld) {
    let id = world.payout_id.expect("No payout requested");
    world.system().payouts.approve(&actor("admin"), id).await.expect("Approval failed");
}

#[when("the bank transfer fails")]
async fn fail_payout(world: &mut FulfillmentWorld) {
    let id = world.payout_id.expect("No payout requested");
    world.system().payouts.fail(&actor("admin"), id, Some("Beneficiary bank rejected the transfer".into())).await.expect("Error");
}

#[then(expr = "{int} of the attempts succeeded")]
async fn successes(world: &mut FulfillmentWorld, expected: usize) {
    let ok = world.outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok, expected, "Unexpected number of successes: {:?}", world.outcomes);
}

#[then(expr = "{int} of the attempts failed with {word}")]
async fn failures(world: &mut FulfillmentWorld, expected: usize, kind: String) {
    let failed = world.outcomes.iter().filter_map(|r| r.as_ref().err()).filter(|e| error_kind(e) == kind).count();
    assert_eq!(failed, expected, "Unexpected failures: {:?}", world.outcomes);
}

#[then(expr = "the slot has {int} place(s) left")]
async fn places_left(world: &mut FulfillmentWorld, expected: i64) {
    let sys = world.system();
    let slot = sys.db.fetch_slot(sys.catalog.slot.id).await.expect("Error fetching slot").expect("Slot missing");
    assert_eq!(slot.available_orders, expected);
    assert!(slot.available_orders >= 0 && slot.available_orders <= slot.max_orders);
}

#[then(expr = "the {word} item is {word}")]
async fn item_status(world: &mut FulfillmentWorld, product: String, status: String) {
    let expected = FulfillmentStatus::from_str(&status).expect("Unknown status");
    let item_id = world.item(&product).id;
    let item = world.system().db.fetch_item(item_id).await.expect("Error fetching item").expect("Item missing");
    assert_eq!(item.item_status, expected);
}

#[then(expr = "the stock of {word} is {int}")]
async fn stock(world: &mut FulfillmentWorld, product: String, expected: i64) {
    let product_id = world.product(&product).id;
    let product = world.system().catalog_api.fetch_product(product_id).await.expect("Error fetching product");
    assert_eq!(product.stock_quantity, expected);
}

#[then(expr = "vendor {word} has {int} rupees {word}")]
async fn wallet_balance(world: &mut FulfillmentWorld, name: String, rupees: i64, bucket: String) {
    let vendor = vendor(&name);
    let wallet = world.system().wallets.sync_balance(&vendor, vendor.id).await.expect("Error syncing wallet");
    let actual = match bucket.as_str() {
        "available" => wallet.available_balance,
        "pending" => wallet.pending_balance,
        "earned" => wallet.total_earned,
        "paid" => wallet.total_paid_out,
        other => panic!("Unknown balance {other}"),
    };
    assert_eq!(actual, Paise::from_rupees(rupees), "Wrong {bucket} balance for vendor {name}");
}

#[then("every wallet balances")]
async fn wallets_balance(world: &mut FulfillmentWorld) {
    for name in ["A", "B"] {
        let vendor = vendor(name);
        let wallet = world.system().wallets.sync_balance(&vendor, vendor.id).await.expect("Error syncing wallet");
        assert!(wallet.is_balanced(), "Wallet of vendor {name} does not balance: {wallet:?}");
    }
}
