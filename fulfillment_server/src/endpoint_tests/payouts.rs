use actix_web::{http::Method, web, web::ServiceConfig};
use fulfillment_common::Paise;
use fulfillment_engine::{
    db_types::{Actor, PayoutStatus},
    events::EventProducers,
    FulfillmentError,
    PayoutApi,
    WalletApi,
};
use serde_json::json as body;

use super::{
    helpers::{call_as, json, payout, wallet},
    mocks::MockWalletManager,
};
use crate::routes::{ApprovePayoutRoute, CancelPayoutRoute, FailPayoutRoute, ListPayoutsRoute, RejectPayoutRoute};

/// Admin calls go through `PayoutApi`, vendor calls through `WalletApi`. Each API gets its own mock.
fn configure_with(admin_db: MockWalletManager, vendor_db: MockWalletManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let payouts = PayoutApi::new(admin_db, EventProducers::default());
        let wallets = WalletApi::new(vendor_db, EventProducers::default());
        cfg.service(ApprovePayoutRoute::<MockWalletManager>::new())
            .service(RejectPayoutRoute::<MockWalletManager>::new())
            .service(FailPayoutRoute::<MockWalletManager>::new())
            .service(CancelPayoutRoute::<MockWalletManager>::new())
            .service(ListPayoutsRoute::<MockWalletManager>::new())
            .app_data(web::Data::new(payouts))
            .app_data(web::Data::new(wallets));
    }
}

#[actix_web::test]
async fn approving_a_payout() {
    let _ = env_logger::try_init().ok();
    let mut db = MockWalletManager::new();
    db.expect_approve_payout().withf(|id, admin| *id == 12 && *admin == 1).times(1).returning(|id, admin| {
        let mut p = payout(id, 7, 30_000, PayoutStatus::Processing);
        p.approved_by = Some(admin);
        Ok((p, wallet(7, 60_000)))
    });
    let app = configure_with(db, MockWalletManager::new());
    let (status, body) = call_as(&Actor::admin(1), Method::POST, "/api/payouts/12/approve", None, app).await;
    assert_eq!(status.as_u16(), 200);
    let result = json(&body);
    assert_eq!(result["payout"]["payout_status"], "processing");
    assert_eq!(result["payout"]["approved_by"], 1);
    assert_eq!(result["wallet"]["available_balance"], 60_000);
}

#[actix_web::test]
async fn approval_needs_funds() {
    let _ = env_logger::try_init().ok();
    let mut db = MockWalletManager::new();
    db.expect_approve_payout().returning(|_, _| {
        Err(FulfillmentError::InsufficientBalance { requested: Paise::from(30_000), available: Paise::from(10_000) })
    });
    let app = configure_with(db, MockWalletManager::new());
    let (status, _) = call_as(&Actor::admin(1), Method::POST, "/api/payouts/12/approve", None, app).await;
    assert_eq!(status.as_u16(), 422);
}

#[actix_web::test]
async fn deciding_twice_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let mut db = MockWalletManager::new();
    db.expect_approve_payout()
        .returning(|id, _| Err(FulfillmentError::Conflict(format!("Payout request {id} is no longer pending"))));
    let app = configure_with(db, MockWalletManager::new());
    let (status, _) = call_as(&Actor::admin(1), Method::POST, "/api/payouts/12/approve", None, app).await;
    assert_eq!(status.as_u16(), 409);
}

#[actix_web::test]
async fn rejections_need_a_note() {
    let _ = env_logger::try_init().ok();
    let mut db = MockWalletManager::new();
    db.expect_cancel_payout().never();
    let (status, _) = call_as(
        &Actor::admin(1),
        Method::POST,
        "/api/payouts/12/reject",
        Some(body!({ "notes": "  " })),
        configure_with(db, MockWalletManager::new()),
    )
    .await;
    assert_eq!(status.as_u16(), 400);

    let mut db = MockWalletManager::new();
    db.expect_cancel_payout()
        .withf(|id, by, notes| *id == 12 && *by == Some(1) && notes.as_deref() == Some("Bank details unverified"))
        .times(1)
        .returning(|id, _, notes| {
            let mut p = payout(id, 7, 30_000, PayoutStatus::Cancelled);
            p.notes = notes;
            Ok(p)
        });
    let (status, body) = call_as(
        &Actor::admin(1),
        Method::POST,
        "/api/payouts/12/reject",
        Some(body!({ "notes": "Bank details unverified" })),
        configure_with(db, MockWalletManager::new()),
    )
    .await;
    assert_eq!(status.as_u16(), 200);
    assert_eq!(json(&body)["payout_status"], "cancelled");
}

#[actix_web::test]
async fn failed_transfers_return_funds() {
    let _ = env_logger::try_init().ok();
    let mut db = MockWalletManager::new();
    db.expect_fail_payout()
        .times(1)
        .returning(|id, _| Ok((payout(id, 7, 30_000, PayoutStatus::Failed), wallet(7, 90_000))));
    let app = configure_with(db, MockWalletManager::new());
    let (status, body) = call_as(&Actor::admin(1), Method::POST, "/api/payouts/12/fail", None, app).await;
    assert_eq!(status.as_u16(), 200);
    let result = json(&body);
    assert_eq!(result["payout"]["payout_status"], "failed");
    assert_eq!(result["wallet"]["available_balance"], 90_000);
}

#[actix_web::test]
async fn vendors_only_list_their_own_payouts() {
    let _ = env_logger::try_init().ok();
    let mut db = MockWalletManager::new();
    db.expect_search_payouts()
        .withf(|f| f.vendor_id == Some(7) && f.status == Some(PayoutStatus::Pending))
        .times(1)
        .returning(|_| Ok(vec![payout(12, 7, 30_000, PayoutStatus::Pending)]));
    let (status, body) = call_as(
        &Actor::vendor(7),
        Method::GET,
        "/api/payouts?vendor_id=99&status=pending",
        None,
        configure_with(MockWalletManager::new(), db),
    )
    .await;
    assert_eq!(status.as_u16(), 200);
    assert_eq!(json(&body).as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn admins_search_all_payouts() {
    let _ = env_logger::try_init().ok();
    let mut db = MockWalletManager::new();
    db.expect_search_payouts()
        .withf(|f| f.vendor_id.is_none() && f.status == Some(PayoutStatus::Processing))
        .times(1)
        .returning(|_| {
            Ok(vec![payout(12, 7, 30_000, PayoutStatus::Processing), payout(14, 9, 12_500, PayoutStatus::Processing)])
        });
    let app = configure_with(db, MockWalletManager::new());
    let (status, body) = call_as(&Actor::admin(1), Method::GET, "/api/payouts?status=processing", None, app).await;
    assert_eq!(status.as_u16(), 200);
    let vendors = json(&body).as_array().unwrap().iter().map(|p| p["vendor_id"].as_i64().unwrap()).collect::<Vec<_>>();
    assert_eq!(vendors, vec![7, 9]);
}

#[actix_web::test]
async fn vendors_withdraw_only_their_own_requests() {
    let _ = env_logger::try_init().ok();
    let mut db = MockWalletManager::new();
    db.expect_fetch_payout().returning(|id| Ok(Some(payout(id, 7, 30_000, PayoutStatus::Pending))));
    db.expect_cancel_payout().never();
    let app = configure_with(MockWalletManager::new(), db);
    let (status, _) = call_as(&Actor::vendor(8), Method::POST, "/api/payouts/12/cancel", None, app).await;
    assert_eq!(status.as_u16(), 403);
}
