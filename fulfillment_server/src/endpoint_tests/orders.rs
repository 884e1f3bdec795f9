use actix_web::{http::Method, web, web::ServiceConfig};
use fulfillment_engine::{
    db_types::{Actor, FulfillmentStatus},
    events::EventProducers,
    traits::{ItemUpdated, ItemsUpdated},
    DeliveryVerificationApi,
    OrderFlowApi,
};

use super::{
    helpers::{call_as, json, order, order_item, DELIVERY_CODE, PICKUP_CODE},
    mocks::MockDatabase,
};
use crate::routes::{CancelItemRoute, ConfirmItemRoute, OutForDeliveryRoute, VerifyPickupRoute};

const PARTNER: i64 = 77;
const VENDOR: i64 = 5;

fn configure_flow(db: MockDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = OrderFlowApi::new(db, EventProducers::default());
        cfg.service(CancelItemRoute::<MockDatabase>::new())
            .service(ConfirmItemRoute::<MockDatabase>::new())
            .service(OutForDeliveryRoute::<MockDatabase>::new())
            .app_data(web::Data::new(api));
    }
}

fn configure_verification(db: MockDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = DeliveryVerificationApi::new(db, EventProducers::default());
        cfg.service(VerifyPickupRoute::<MockDatabase>::new()).app_data(web::Data::new(api));
    }
}

/// Cancellations that fail validation must never reach the database.
fn untouched_database() -> MockDatabase {
    let mut db = MockDatabase::new();
    db.expect_fetch_item().never();
    db.expect_cancel_item().never();
    db
}

#[actix_web::test]
async fn other_needs_details() {
    let _ = env_logger::try_init().ok();
    for details in [None, Some("   ")] {
        let payload = match details {
            Some(d) => serde_json::json!({ "reason": "other", "details": d }),
            None => serde_json::json!({ "reason": "other" }),
        };
        let (status, text) = call_as(
            &Actor::customer(42),
            Method::POST,
            "/api/items/11/cancel",
            Some(payload),
            configure_flow(untouched_database()),
        )
        .await;
        assert_eq!(status.as_u16(), 400);
        assert!(text.contains("requires details"), "{text}");
    }
}

#[actix_web::test]
async fn unknown_reasons_are_rejected() {
    let _ = env_logger::try_init().ok();
    let (status, _) = call_as(
        &Actor::customer(42),
        Method::POST,
        "/api/items/11/cancel",
        Some(serde_json::json!({ "reason": "bored" })),
        configure_flow(untouched_database()),
    )
    .await;
    assert_eq!(status.as_u16(), 400);
}

#[actix_web::test]
async fn customers_cannot_use_delivery_reasons() {
    let _ = env_logger::try_init().ok();
    let (status, text) = call_as(
        &Actor::customer(42),
        Method::POST,
        "/api/items/11/cancel",
        Some(serde_json::json!({ "reason": "customer_unavailable" })),
        configure_flow(untouched_database()),
    )
    .await;
    assert_eq!(status.as_u16(), 400);
    assert!(text.contains("not a valid cancellation reason"), "{text}");
}

#[actix_web::test]
async fn partners_cannot_use_customer_reasons() {
    let _ = env_logger::try_init().ok();
    let (status, text) = call_as(
        &Actor::delivery_partner(PARTNER),
        Method::POST,
        "/api/items/11/cancel",
        Some(serde_json::json!({ "reason": "changed_mind" })),
        configure_flow(untouched_database()),
    )
    .await;
    assert_eq!(status.as_u16(), 400);
    assert!(text.contains("not a valid cancellation reason"), "{text}");
}

#[actix_web::test]
async fn pickup_response_hides_the_delivery_code() {
    let _ = env_logger::try_init().ok();
    let mut db = MockDatabase::new();
    db.expect_fetch_order()
        .withf(|id| *id == 7)
        .returning(|id| Ok(Some(order(id, FulfillmentStatus::AssignedToDelivery, Some(PARTNER)))));
    db.expect_fetch_order_items()
        .times(1)
        .returning(|id| Ok(vec![order_item(11, id, VENDOR, FulfillmentStatus::AssignedToDelivery)]));
    db.expect_consume_pickup_otp().withf(|id, otp| *id == 7 && otp == PICKUP_CODE).times(1).returning(|id, _| {
        let mut picked = order_item(11, id, VENDOR, FulfillmentStatus::PickedUp);
        picked.pickup_otp = None;
        Ok(ItemsUpdated { items: vec![picked], order: order(id, FulfillmentStatus::PickedUp, Some(PARTNER)) })
    });
    let (status, text) = call_as(
        &Actor::delivery_partner(PARTNER),
        Method::POST,
        "/api/orders/7/verify_pickup",
        Some(serde_json::json!({ "otp": PICKUP_CODE })),
        configure_verification(db),
    )
    .await;
    assert_eq!(status.as_u16(), 200);
    assert!(!text.contains(DELIVERY_CODE), "{text}");
    let items = json(&text)["items"].as_array().unwrap().clone();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["item_status"], "picked_up");
    assert!(items[0]["delivery_otp"].is_null());
}

#[actix_web::test]
async fn out_for_delivery_response_hides_both_codes() {
    let _ = env_logger::try_init().ok();
    let mut db = MockDatabase::new();
    db.expect_fetch_order()
        .withf(|id| *id == 7)
        .returning(|id| Ok(Some(order(id, FulfillmentStatus::PickedUp, Some(PARTNER)))));
    db.expect_transition_order_items()
        .withf(|id, from, to| {
            *id == 7 && *from == FulfillmentStatus::PickedUp && *to == FulfillmentStatus::OutForDelivery
        })
        .times(1)
        .returning(|id, _, to| {
            let items = vec![order_item(11, id, VENDOR, to), order_item(12, id, VENDOR + 1, to)];
            Ok(ItemsUpdated { items, order: order(id, to, Some(PARTNER)) })
        });
    let (status, text) = call_as(
        &Actor::delivery_partner(PARTNER),
        Method::POST,
        "/api/orders/7/out_for_delivery",
        None,
        configure_flow(db),
    )
    .await;
    assert_eq!(status.as_u16(), 200);
    assert!(!text.contains(DELIVERY_CODE), "{text}");
    assert!(!text.contains(PICKUP_CODE), "{text}");
    let items = json(&text)["items"].as_array().unwrap().clone();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i["pickup_otp"].is_null() && i["delivery_otp"].is_null()));
}

#[actix_web::test]
async fn vendors_see_their_pickup_code_but_not_the_delivery_code() {
    let _ = env_logger::try_init().ok();
    let mut db = MockDatabase::new();
    db.expect_fetch_item()
        .withf(|id| *id == 11)
        .returning(|id| Ok(Some(order_item(id, 7, VENDOR, FulfillmentStatus::Pending))));
    db.expect_transition_item()
        .withf(|id, from, to| *id == 11 && *from == FulfillmentStatus::Pending && *to == FulfillmentStatus::Confirmed)
        .times(1)
        .returning(|id, _, to| {
            Ok(ItemUpdated { item: order_item(id, 7, VENDOR, to), order: order(7, to, None) })
        });
    let (status, text) =
        call_as(&Actor::vendor(VENDOR), Method::POST, "/api/items/11/confirm", None, configure_flow(db)).await;
    assert_eq!(status.as_u16(), 200);
    let updated = json(&text);
    let item = &updated["item"];
    assert_eq!(item["pickup_otp"], PICKUP_CODE);
    assert!(item["delivery_otp"].is_null());
}
