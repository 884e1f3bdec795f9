use actix_web::{http::Method, web, web::ServiceConfig};
use fulfillment_engine::{
    db_types::{Actor, Role},
    events::EventProducers,
    PayoutApi,
};

use super::{
    helpers::{call_as, identity_headers, json, send_request},
    mocks::MockWalletManager,
};
use crate::routes::ApprovePayoutRoute;

fn configure(cfg: &mut ServiceConfig) {
    // No expectations: none of these requests may reach the backend
    let api = PayoutApi::new(MockWalletManager::new(), EventProducers::default());
    cfg.service(ApprovePayoutRoute::<MockWalletManager>::new()).app_data(web::Data::new(api));
}

#[actix_web::test]
async fn missing_identity_headers() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_request(Method::POST, "/api/payouts/1/approve", vec![], None, configure).await;
    assert_eq!(status.as_u16(), 401);
    assert_eq!(json(&body)["error"], "Authentication Error. No X-Actor-Id header was provided");
}

#[actix_web::test]
async fn forged_signature() {
    let _ = env_logger::try_init().ok();
    // A vendor signature replayed with the admin role
    let mut headers = identity_headers(&Actor::vendor(7));
    headers[1].1 = "admin".into();
    let (status, body) = send_request(Method::POST, "/api/payouts/1/approve", headers, None, configure).await;
    assert_eq!(status.as_u16(), 401);
    assert_eq!(json(&body)["error"], "Authentication Error. The identity signature is invalid");

    let mut headers = identity_headers(&Actor::admin(1));
    headers[2].1 = "bm90IGEgc2lnbmF0dXJl".into();
    let (status, _) = send_request(Method::POST, "/api/payouts/1/approve", headers, None, configure).await;
    assert_eq!(status.as_u16(), 401);
}

#[actix_web::test]
async fn unknown_role() {
    let _ = env_logger::try_init().ok();
    let mut headers = identity_headers(&Actor::admin(1));
    headers[1].1 = "superuser".into();
    let (status, body) = send_request(Method::POST, "/api/payouts/1/approve", headers, None, configure).await;
    assert_eq!(status.as_u16(), 401);
    assert!(json(&body)["error"].as_str().unwrap().contains("X-Actor-Role"));
}

#[actix_web::test]
async fn wrong_role_is_forbidden() {
    let _ = env_logger::try_init().ok();
    for role in [Role::Customer, Role::Vendor, Role::DeliveryPartner] {
        let (status, body) =
            call_as(&Actor::new(7, role), Method::POST, "/api/payouts/1/approve", None, configure).await;
        assert_eq!(status.as_u16(), 403, "{role} should not be able to approve payouts");
        assert!(json(&body)["error"].as_str().unwrap().starts_with("Insufficient Permissions."));
    }
}
