//! Request handler definitions
//!
//! Define each route and its handler here. Handlers translate between HTTP and the engine APIs and nothing more:
//! every rule about who may do what to which order lives in the engine. Handlers that are more than a few lines MUST
//! go into a separate module. Keep this module neat and tidy 🙏
//!
//! Every route under `/api` sits behind the identity middleware, so handlers receive the verified caller through the
//! [`Caller`] extractor. The role list in each `route!` declaration is enforced by the ACL middleware before the
//! handler runs.
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every engine call is async, so keep it that way.
use actix_web::{get, web, HttpResponse, Responder};
use chrono::{Local, NaiveDate};
use fulfillment_engine::{
    db_types::{NewOrder, PayoutSettings, Role, VendorSettings},
    traits::{CatalogManagement, FulfillmentDatabase, PayoutQueryFilter, SlotManagement, WalletManagement},
    wallet_objects::PayoutApplication,
    AssignmentApi,
    CatalogApi,
    DeliveryVerificationApi,
    OrderFlowApi,
    PayoutApi,
    SlotApi,
    WalletApi,
};
use log::*;

use crate::{
    data_objects::{
        AssignDeliveryParams,
        CancelItemParams,
        OrderCreated,
        OtpParams,
        PayoutDecisionParams,
        PayoutSearchParams,
        RejectItemParams,
        SectorAssignmentParams,
        VendorNotesParams,
    },
    errors::ServerError,
    middleware::Caller,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

/// Wall-clock time in the service's local time zone. Slot dates and cutoffs are local times.
fn local_now() -> chrono::NaiveDateTime {
    Local::now().naive_local()
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Slots  ----------------------------------------------------
route!(available_slots => Get "/slots/{sector_id}/{date}" impl SlotManagement where requires [Role::Customer, Role::Vendor, Role::DeliveryPartner, Role::Admin]);
/// The slots of a sector on a date that can still be booked right now.
pub async fn available_slots<B: SlotManagement>(
    path: web::Path<(i64, NaiveDate)>,
    api: web::Data<SlotApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (sector_id, date) = path.into_inner();
    debug!("💻️ GET slots for sector {sector_id} on {date}");
    let slots = api.list_available_slots(sector_id, date, local_now()).await?;
    Ok(HttpResponse::Ok().json(slots))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl FulfillmentDatabase where requires [Role::Customer, Role::Admin]);
/// Checkout. Reserves a place in the slot, takes the stock and creates the order with one item per line.
///
/// Responds with `201 Created` and `{"order_id": .., "order_number": ..}`. A full or closed slot is a `409`.
pub async fn create_order<B: FulfillmentDatabase>(
    caller: Caller,
    body: web::Json<NewOrder>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let Caller(actor) = caller;
    debug!("💻️ POST new order from {actor}");
    let placed = api.create_order(&actor, body.into_inner(), local_now()).await?;
    let result = OrderCreated { order_id: placed.order_id(), order_number: placed.order_number().to_string() };
    Ok(HttpResponse::Created().json(result))
}

route!(order_details => Get "/orders/{id}" impl FulfillmentDatabase where requires [Role::Customer, Role::Vendor, Role::DeliveryPartner, Role::Admin]);
pub async fn order_details<B: FulfillmentDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    trace!("💻️ GET order {order_id} for {}", caller.0);
    let details = api.order_details(&caller.0, order_id).await?;
    Ok(HttpResponse::Ok().json(details))
}

route!(assign_delivery => Post "/orders/{id}/assign" impl FulfillmentDatabase where requires [Role::Admin, Role::DeliveryPartner]);
pub async fn assign_delivery<B: FulfillmentDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<AssignDeliveryParams>,
    api: web::Data<AssignmentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ POST assign order {order_id} to partner {}", body.delivery_partner_id);
    let assignment = api.assign_delivery(&caller.0, order_id, body.delivery_partner_id).await?;
    Ok(HttpResponse::Ok().json(assignment))
}

route!(verify_pickup => Post "/orders/{id}/verify_pickup" impl FulfillmentDatabase where requires [Role::DeliveryPartner, Role::Admin]);
pub async fn verify_pickup<B: FulfillmentDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<OtpParams>,
    api: web::Data<DeliveryVerificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ POST pickup verification for order {order_id} by {}", caller.0);
    let updated = api.verify_pickup_otp(&caller.0, order_id, &body.otp).await?.redact_for(&caller.0);
    Ok(HttpResponse::Ok().json(updated))
}

route!(verify_delivery => Post "/orders/{id}/verify_delivery" impl FulfillmentDatabase where requires [Role::DeliveryPartner, Role::Admin]);
pub async fn verify_delivery<B: FulfillmentDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<OtpParams>,
    api: web::Data<DeliveryVerificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ POST delivery verification for order {order_id} by {}", caller.0);
    let updated = api.verify_delivery_otp(&caller.0, order_id, &body.otp).await?.redact_for(&caller.0);
    Ok(HttpResponse::Ok().json(updated))
}

route!(out_for_delivery => Post "/orders/{id}/out_for_delivery" impl FulfillmentDatabase where requires [Role::DeliveryPartner, Role::Admin]);
pub async fn out_for_delivery<B: FulfillmentDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ POST order {order_id} out for delivery");
    let updated = api.mark_out_for_delivery(&caller.0, order_id).await?.redact_for(&caller.0);
    Ok(HttpResponse::Ok().json(updated))
}

//----------------------------------------------   Items  ----------------------------------------------------
route!(confirm_item => Post "/items/{id}/confirm" impl FulfillmentDatabase where requires [Role::Vendor]);
pub async fn confirm_item<B: FulfillmentDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let item_id = path.into_inner();
    debug!("💻️ POST confirm item {item_id} by {}", caller.0);
    let updated = api.confirm_item(&caller.0, item_id).await?.redact_for(&caller.0);
    Ok(HttpResponse::Ok().json(updated))
}

route!(reject_item => Post "/items/{id}/reject" impl FulfillmentDatabase where requires [Role::Vendor]);
pub async fn reject_item<B: FulfillmentDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<RejectItemParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let item_id = path.into_inner();
    debug!("💻️ POST reject item {item_id} by {}", caller.0);
    let outcome = api.reject_item(&caller.0, item_id, &body.reason).await?.redact_for(&caller.0);
    Ok(HttpResponse::Ok().json(outcome))
}

route!(mark_processing => Post "/items/{id}/processing" impl FulfillmentDatabase where requires [Role::Vendor]);
pub async fn mark_processing<B: FulfillmentDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let updated = api.mark_processing(&caller.0, path.into_inner()).await?.redact_for(&caller.0);
    Ok(HttpResponse::Ok().json(updated))
}

route!(mark_packed => Post "/items/{id}/packed" impl FulfillmentDatabase where requires [Role::Vendor]);
pub async fn mark_packed<B: FulfillmentDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let updated = api.mark_packed(&caller.0, path.into_inner()).await?.redact_for(&caller.0);
    Ok(HttpResponse::Ok().json(updated))
}

route!(cancel_item => Post "/items/{id}/cancel" impl FulfillmentDatabase where requires [Role::Customer, Role::DeliveryPartner, Role::Admin]);
/// Cancels one item. The reason must be one the caller's role may give, and `other` needs `details`.
pub async fn cancel_item<B: FulfillmentDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<CancelItemParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let item_id = path.into_inner();
    let CancelItemParams { reason, details } = body.into_inner();
    debug!("💻️ POST cancel item {item_id} by {} ({reason})", caller.0);
    let outcome = api.cancel_item(&caller.0, item_id, reason, details).await?.redact_for(&caller.0);
    Ok(HttpResponse::Ok().json(outcome))
}

route!(vendor_notes => Put "/items/{id}/notes" impl FulfillmentDatabase where requires [Role::Vendor]);
pub async fn vendor_notes<B: FulfillmentDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<VendorNotesParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let mut item = api.update_vendor_notes(&caller.0, path.into_inner(), &body.notes).await?;
    item.redact_for(&caller.0);
    Ok(HttpResponse::Ok().json(item))
}

//----------------------------------------------   Wallets  ----------------------------------------------------
route!(wallet_summary => Get "/wallet/{vendor_id}" impl WalletManagement where requires [Role::Vendor, Role::Admin]);
/// The vendor's balances. Stale snapshots are recomputed before they are returned.
pub async fn wallet_summary<B: WalletManagement>(
    caller: Caller,
    path: web::Path<i64>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let vendor_id = path.into_inner();
    trace!("💻️ GET wallet of vendor {vendor_id}");
    let wallet = api.wallet_summary(&caller.0, vendor_id).await?;
    Ok(HttpResponse::Ok().json(wallet))
}

route!(sync_wallet => Post "/wallet/{vendor_id}/sync" impl WalletManagement where requires [Role::Vendor, Role::Admin]);
pub async fn sync_wallet<B: WalletManagement>(
    caller: Caller,
    path: web::Path<i64>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let wallet = api.sync_balance(&caller.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(wallet))
}

route!(payout_settings => Put "/wallet/{vendor_id}/settings" impl WalletManagement where requires [Role::Vendor, Role::Admin]);
pub async fn payout_settings<B: WalletManagement>(
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<PayoutSettings>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let vendor_id = path.into_inner();
    debug!("💻️ PUT payout settings for vendor {vendor_id}");
    let wallet = api.update_settings(&caller.0, vendor_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(wallet))
}

route!(request_payout => Post "/wallet/{vendor_id}/payouts" impl WalletManagement where requires [Role::Vendor]);
pub async fn request_payout<B: WalletManagement>(
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<PayoutApplication>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let vendor_id = path.into_inner();
    debug!("💻️ POST payout request of {} for vendor {vendor_id}", body.amount);
    let payout = api.request_payout(&caller.0, vendor_id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(payout))
}

//----------------------------------------------   Payouts  ----------------------------------------------------
route!(list_payouts => Get "/payouts" impl WalletManagement where requires [Role::Vendor, Role::Admin]);
/// Admins search across vendors. Vendors only ever see their own requests, whatever `vendor_id` they ask for.
pub async fn list_payouts<B: WalletManagement>(
    caller: Caller,
    query: web::Query<PayoutSearchParams>,
    wallets: web::Data<WalletApi<B>>,
    payouts: web::Data<PayoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let Caller(actor) = caller;
    let PayoutSearchParams { vendor_id, status } = query.into_inner();
    let result = match actor.role {
        Role::Admin => payouts.search(&actor, PayoutQueryFilter { vendor_id, status }).await?,
        _ => wallets.payouts(&actor, actor.id, status).await?,
    };
    Ok(HttpResponse::Ok().json(result))
}

route!(approve_payout => Post "/payouts/{id}/approve" impl WalletManagement where requires [Role::Admin]);
pub async fn approve_payout<B: WalletManagement>(
    caller: Caller,
    path: web::Path<i64>,
    api: web::Data<PayoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let payout_id = path.into_inner();
    info!("💻️ POST approve payout {payout_id} by {}", caller.0);
    let (payout, wallet) = api.approve(&caller.0, payout_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "payout": payout, "wallet": wallet })))
}

route!(reject_payout => Post "/payouts/{id}/reject" impl WalletManagement where requires [Role::Admin]);
pub async fn reject_payout<B: WalletManagement>(
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<PayoutDecisionParams>,
    api: web::Data<PayoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let payout_id = path.into_inner();
    let notes = body.into_inner().notes.unwrap_or_default();
    info!("💻️ POST reject payout {payout_id} by {}", caller.0);
    let payout = api.reject(&caller.0, payout_id, &notes).await?;
    Ok(HttpResponse::Ok().json(payout))
}

route!(complete_payout => Post "/payouts/{id}/complete" impl WalletManagement where requires [Role::Admin]);
pub async fn complete_payout<B: WalletManagement>(
    caller: Caller,
    path: web::Path<i64>,
    body: Option<web::Json<PayoutDecisionParams>>,
    api: web::Data<PayoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let notes = body.and_then(|b| b.into_inner().notes);
    let payout = api.complete(&caller.0, path.into_inner(), notes).await?;
    Ok(HttpResponse::Ok().json(payout))
}

route!(fail_payout => Post "/payouts/{id}/fail" impl WalletManagement where requires [Role::Admin]);
pub async fn fail_payout<B: WalletManagement>(
    caller: Caller,
    path: web::Path<i64>,
    body: Option<web::Json<PayoutDecisionParams>>,
    api: web::Data<PayoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let notes = body.and_then(|b| b.into_inner().notes);
    let (payout, wallet) = api.fail(&caller.0, path.into_inner(), notes).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "payout": payout, "wallet": wallet })))
}

route!(cancel_payout => Post "/payouts/{id}/cancel" impl WalletManagement where requires [Role::Vendor]);
pub async fn cancel_payout<B: WalletManagement>(
    caller: Caller,
    path: web::Path<i64>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let payout = api.cancel_payout(&caller.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(payout))
}

//----------------------------------------------   Operations  ----------------------------------------------------
route!(repair_day => Get "/repair/{date}" impl FulfillmentDatabase where requires [Role::Admin]);
/// Recreates missing assignment and pickup records for every rostered sector on `date`. Per-order failures are
/// reported in the body, never as an error status.
pub async fn repair_day<B: FulfillmentDatabase>(
    path: web::Path<NaiveDate>,
    api: web::Data<AssignmentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let date = path.into_inner();
    info!("💻️ GET repair for {date}");
    let report = api.repair_day(date).await?;
    Ok(HttpResponse::Ok().json(report))
}

route!(assign_sector => Post "/sectors/{id}/assignments" impl FulfillmentDatabase where requires [Role::Admin]);
pub async fn assign_sector<B: FulfillmentDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<SectorAssignmentParams>,
    api: web::Data<AssignmentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let sector_id = path.into_inner();
    let SectorAssignmentParams { delivery_partner_id, date } = body.into_inner();
    let entry = api.assign_sector(&caller.0, sector_id, delivery_partner_id, date).await?;
    Ok(HttpResponse::Ok().json(entry))
}

route!(sector_roster => Get "/roster/{date}" impl FulfillmentDatabase where requires [Role::Admin, Role::DeliveryPartner]);
pub async fn sector_roster<B: FulfillmentDatabase>(
    path: web::Path<NaiveDate>,
    api: web::Data<AssignmentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let roster = api.sector_assignments(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(roster))
}

route!(vendor_settings => Get "/vendors/{id}/settings" impl CatalogManagement where requires [Role::Vendor, Role::Admin]);
pub async fn vendor_settings<B: CatalogManagement>(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let settings = api.vendor_settings(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(settings))
}

route!(update_vendor_settings => Put "/vendors/{id}/settings" impl CatalogManagement where requires [Role::Vendor, Role::Admin]);
/// Auto-approval rules and the confirmation window. The vendor id in the path wins over any id in the body.
pub async fn update_vendor_settings<B: CatalogManagement>(
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<VendorSettings>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let settings = VendorSettings { vendor_id: path.into_inner(), ..body.into_inner() };
    debug!("💻️ PUT vendor settings for vendor {} by {}", settings.vendor_id, caller.0);
    let settings = api.update_vendor_settings(&caller.0, settings).await?;
    Ok(HttpResponse::Ok().json(settings))
}
