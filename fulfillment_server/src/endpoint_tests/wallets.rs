use actix_web::{http::Method, web, web::ServiceConfig};
use fulfillment_common::Paise;
use fulfillment_engine::{
    db_types::{Actor, PayoutMethod, PayoutStatus},
    events::EventProducers,
    WalletApi,
};
use serde_json::json as body;

use super::{
    helpers::{call_as, json, payout, wallet},
    mocks::MockWalletManager,
};
use crate::routes::{PayoutSettingsRoute, RequestPayoutRoute, WalletSummaryRoute};

fn configure_with(wallets: MockWalletManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = WalletApi::new(wallets, EventProducers::default());
        cfg.service(WalletSummaryRoute::<MockWalletManager>::new())
            .service(PayoutSettingsRoute::<MockWalletManager>::new())
            .service(RequestPayoutRoute::<MockWalletManager>::new())
            .app_data(web::Data::new(api));
    }
}

#[actix_web::test]
async fn vendor_reads_own_wallet() {
    let _ = env_logger::try_init().ok();
    let mut wallets = MockWalletManager::new();
    wallets.expect_fetch_wallet().withf(|id| *id == 7).returning(|id| Ok(Some(wallet(id, 90_000))));
    // The snapshot is fresh, so no resync
    wallets.expect_sync_wallet().never();
    let (status, body) =
        call_as(&Actor::vendor(7), Method::GET, "/api/wallet/7", None, configure_with(wallets)).await;
    assert_eq!(status.as_u16(), 200);
    let snapshot = json(&body);
    assert_eq!(snapshot["available_balance"], 90_000);
    assert_eq!(snapshot["pending_balance"], 20_000);
    assert_eq!(snapshot["total_earned"], 110_000);
    assert_eq!(snapshot["payout_destination"], "****7890");
    assert!(!body.contains("001234567890"));
}

#[actix_web::test]
async fn stale_wallets_are_resynced() {
    let _ = env_logger::try_init().ok();
    let mut wallets = MockWalletManager::new();
    wallets.expect_fetch_wallet().returning(|id| {
        let mut w = wallet(id, 10_000);
        w.last_updated_balance_at = None;
        Ok(Some(w))
    });
    wallets.expect_sync_wallet().times(1).returning(|id| Ok(wallet(id, 55_000)));
    let (status, body) =
        call_as(&Actor::admin(1), Method::GET, "/api/wallet/7", None, configure_with(wallets)).await;
    assert_eq!(status.as_u16(), 200);
    assert_eq!(json(&body)["available_balance"], 55_000);
}

#[actix_web::test]
async fn vendors_cannot_read_other_wallets() {
    let _ = env_logger::try_init().ok();
    let mut wallets = MockWalletManager::new();
    wallets.expect_fetch_wallet().never();
    let (status, _) = call_as(&Actor::vendor(8), Method::GET, "/api/wallet/7", None, configure_with(wallets)).await;
    assert_eq!(status.as_u16(), 403);

    // Customers are stopped by the route itself
    let app = configure_with(MockWalletManager::new());
    let (status, _) = call_as(&Actor::customer(7), Method::GET, "/api/wallet/7", None, app).await;
    assert_eq!(status.as_u16(), 403);
}

#[actix_web::test]
async fn payout_requests() {
    let _ = env_logger::try_init().ok();
    let mut wallets = MockWalletManager::new();
    wallets.expect_sync_wallet().returning(|id| Ok(wallet(id, 90_000)));
    wallets
        .expect_insert_payout_request()
        .withf(|r| {
            r.vendor_id == 7
                && r.amount == Paise::from(30_000)
                && r.payout_method == PayoutMethod::BankTransfer
                && r.available_balance_at_request == Paise::from(90_000)
        })
        .times(1)
        .returning(|r| Ok(payout(12, r.vendor_id, 30_000, PayoutStatus::Pending)));
    let (status, body) = call_as(
        &Actor::vendor(7),
        Method::POST,
        "/api/wallet/7/payouts",
        Some(body!({ "amount": 30_000 })),
        configure_with(wallets),
    )
    .await;
    assert_eq!(status.as_u16(), 201);
    let payout = json(&body);
    assert_eq!(payout["id"], 12);
    assert_eq!(payout["payout_status"], "pending");
}

#[actix_web::test]
async fn payout_requests_cannot_exceed_the_balance() {
    let _ = env_logger::try_init().ok();
    let mut wallets = MockWalletManager::new();
    wallets.expect_sync_wallet().returning(|id| Ok(wallet(id, 25_000)));
    wallets.expect_insert_payout_request().never();
    let (status, body) = call_as(
        &Actor::vendor(7),
        Method::POST,
        "/api/wallet/7/payouts",
        Some(body!({ "amount": 30_000 })),
        configure_with(wallets),
    )
    .await;
    assert_eq!(status.as_u16(), 422);
    assert!(json(&body)["error"].as_str().unwrap().contains("₹250.00"));

    // Below the vendor's minimum
    let mut wallets = MockWalletManager::new();
    wallets.expect_sync_wallet().returning(|id| Ok(wallet(id, 25_000)));
    wallets.expect_insert_payout_request().never();
    let (status, _) = call_as(
        &Actor::vendor(7),
        Method::POST,
        "/api/wallet/7/payouts",
        Some(body!({ "amount": 5_000 })),
        configure_with(wallets),
    )
    .await;
    assert_eq!(status.as_u16(), 400);
}

#[actix_web::test]
async fn invalid_payout_settings() {
    let _ = env_logger::try_init().ok();
    let mut wallets = MockWalletManager::new();
    wallets.expect_update_payout_settings().never();
    let (status, body) = call_as(
        &Actor::vendor(7),
        Method::PUT,
        "/api/wallet/7/settings",
        Some(body!({ "payout_method": "upi", "upi_id": "lakshmi.okbank" })),
        configure_with(wallets),
    )
    .await;
    assert_eq!(status.as_u16(), 400);
    assert_eq!(json(&body)["error"], "Invalid request. lakshmi.okbank is not a valid UPI id");
}
