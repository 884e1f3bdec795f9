use actix_web::{
    body::to_bytes,
    http::{Method, StatusCode},
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::{DateTime, TimeZone, Utc};
use fulfillment_common::{Paise, Secret};
use fulfillment_engine::db_types::{
    Actor,
    AddressSnapshot,
    FulfillmentStatus,
    Order,
    OrderItem,
    PayoutMethod,
    PayoutRequest,
    PayoutStatus,
    VendorWallet,
};
use log::debug;
use serde_json::Value;

use crate::{
    helpers::sign_identity,
    middleware::{IdentityMiddlewareFactory, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER, ACTOR_SIGNATURE_HEADER},
};

// Shared with the identity middleware under test. DO NOT re-use this key anywhere.
pub const TEST_SECRET: &str = "endpoint-tests-only-3c9a17f0b2d84e6f";

/// The three identity headers, correctly signed for `actor`.
pub fn identity_headers(actor: &Actor) -> Vec<(&'static str, String)> {
    vec![
        (ACTOR_ID_HEADER, actor.id.to_string()),
        (ACTOR_ROLE_HEADER, actor.role.to_string()),
        (ACTOR_SIGNATURE_HEADER, sign_identity(TEST_SECRET, actor)),
    ]
}

/// Sends a request to an `/api` scope configured by `configure` and protected by the identity middleware. Errors
/// raised by middleware are rendered the same way the server would render them.
pub async fn send_request(
    method: Method,
    path: &str,
    headers: Vec<(&'static str, String)>,
    body: Option<Value>,
    configure: impl FnOnce(&mut ServiceConfig),
) -> (StatusCode, String) {
    let mut req = TestRequest::default().method(method).uri(path);
    for header in headers {
        req = req.insert_header(header);
    }
    if let Some(body) = body {
        req = req.set_json(body);
    }
    let identity = IdentityMiddlewareFactory::new(Secret::new(TEST_SECRET.to_string()), true);
    let app = App::new().service(web::scope("/api").wrap(identity).configure(configure));
    let service = test::init_service(app).await;
    debug!("🚀️ Making request to {path}");
    let res = match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => res.into_parts().1.map_into_boxed_body(),
        Err(e) => e.error_response(),
    };
    let status = res.status();
    let bytes = to_bytes(res.into_body()).await.unwrap_or_default();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

pub async fn call_as(
    actor: &Actor,
    method: Method,
    path: &str,
    body: Option<Value>,
    configure: impl FnOnce(&mut ServiceConfig),
) -> (StatusCode, String) {
    send_request(method, path, identity_headers(actor), body, configure).await
}

pub fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 9, 30, 0).unwrap()
}

pub fn wallet(vendor_id: i64, available: i64) -> VendorWallet {
    VendorWallet {
        vendor_id,
        available_balance: Paise::from(available),
        pending_balance: Paise::from(20_000),
        total_earned: Paise::from(available + 20_000),
        total_paid_out: Paise::zero(),
        payout_method: Some(PayoutMethod::BankTransfer),
        minimum_payout_amount: Paise::from(10_000),
        bank_account_holder: Some("Lakshmi Stores".into()),
        bank_account_number: Some("001234567890".into()),
        bank_ifsc: Some("HDFC0001234".into()),
        upi_id: None,
        last_updated_balance_at: Some(Utc::now()),
        created_at: timestamp(),
    }
}

pub fn payout(id: i64, vendor_id: i64, amount: i64, status: PayoutStatus) -> PayoutRequest {
    PayoutRequest {
        id,
        vendor_id,
        amount: Paise::from(amount),
        payout_method: PayoutMethod::BankTransfer,
        payout_status: status,
        available_balance_at_request: Paise::from(90_000),
        notes: None,
        approved_by: None,
        requested_at: timestamp(),
        approved_at: None,
        processed_at: None,
        updated_at: timestamp(),
    }
}

/// An order for customer 42 with a ₹180 subtotal, assigned to `partner` if given.
pub fn order(id: i64, status: FulfillmentStatus, partner: Option<i64>) -> Order {
    Order {
        id,
        order_number: format!("ORD-20240603-{id:06}"),
        customer_id: 42,
        address: AddressSnapshot {
            recipient_name: "Meena Iyer".into(),
            phone: "+919876543210".into(),
            line1: "14 Temple Street".into(),
            line2: None,
            landmark: Some("Opposite the post office".into()),
            city: "Chennai".into(),
            postal_code: "600004".into(),
        },
        slot_id: 1,
        subtotal: Paise::from(18_000),
        delivery_fee: Paise::from(3_000),
        total_amount: Paise::from(21_000),
        order_status: status,
        delivery_partner_id: partner,
        cancellation_reason: None,
        cancellation_details: None,
        cancelled_by: None,
        created_at: timestamp(),
        updated_at: timestamp(),
        confirmed_at: None,
        picked_up_at: None,
        out_for_delivery_at: None,
        delivered_at: None,
        cancelled_at: None,
    }
}

/// A single bag of rice sold by `vendor_id`, still carrying both of its codes.
pub fn order_item(id: i64, order_id: i64, vendor_id: i64, status: FulfillmentStatus) -> OrderItem {
    OrderItem {
        id,
        order_id,
        vendor_id,
        product_id: 100 + id,
        product_name: "Ponni rice 5kg".into(),
        quantity: 1,
        unit_price: Paise::from(18_000),
        line_total: Paise::from(18_000),
        item_status: status,
        pickup_otp: Some(PICKUP_CODE.into()),
        delivery_otp: Some(DELIVERY_CODE.into()),
        vendor_notes: None,
        is_urgent: false,
        auto_confirmed: false,
        cancellation_reason: None,
        cancellation_details: None,
        cancelled_by: None,
        created_at: timestamp(),
        updated_at: timestamp(),
        confirmed_at: None,
        packed_at: None,
        picked_up_at: None,
        delivered_at: None,
        cancelled_at: None,
        escalated_at: None,
    }
}

pub const PICKUP_CODE: &str = "123456";
pub const DELIVERY_CODE: &str = "654321";

pub fn json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response is not JSON: {e}. {body}"))
}
