use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use fulfillment_engine::{
    events::EventProducers,
    AssignmentApi,
    CatalogApi,
    DeliveryVerificationApi,
    OrderFlowApi,
    PayoutApi,
    SlotApi,
    SlotRules,
    SqliteDatabase,
    WalletApi,
};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    middleware::IdentityMiddlewareFactory,
    notifications::create_notification_handlers,
    routes::{
        health,
        ApprovePayoutRoute,
        AssignDeliveryRoute,
        AssignSectorRoute,
        AvailableSlotsRoute,
        CancelItemRoute,
        CancelPayoutRoute,
        CompletePayoutRoute,
        ConfirmItemRoute,
        CreateOrderRoute,
        FailPayoutRoute,
        ListPayoutsRoute,
        MarkPackedRoute,
        MarkProcessingRoute,
        OrderDetailsRoute,
        OutForDeliveryRoute,
        PayoutSettingsRoute,
        RejectItemRoute,
        RejectPayoutRoute,
        RepairDayRoute,
        RequestPayoutRoute,
        SectorRosterRoute,
        SyncWalletRoute,
        UpdateVendorSettingsRoute,
        VendorNotesRoute,
        VendorSettingsRoute,
        VerifyDeliveryRoute,
        VerifyPickupRoute,
        WalletSummaryRoute,
    },
    workers::{start_confirmation_worker, start_repair_worker},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_notification_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let _sweeper = start_confirmation_worker(db.clone(), producers.clone(), config.policy, config.sweep_interval);
    if let Some(interval) = config.repair_interval {
        let _repairer = start_repair_worker(db.clone(), producers.clone(), interval);
    }
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    info!("💻️ Binding to {}:{}", config.host, config.port);
    let srv = HttpServer::new(move || {
        let policy = config.policy;
        let slot_api = SlotApi::new(db.clone(), SlotRules::new(policy.preorder_threshold));
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone()).with_policy(policy);
        let assignment_api = AssignmentApi::new(db.clone(), producers.clone());
        let verification_api = DeliveryVerificationApi::new(db.clone(), producers.clone());
        let wallet_api = WalletApi::new(db.clone(), producers.clone()).with_policy(policy);
        let payout_api = PayoutApi::new(db.clone(), producers.clone());
        let catalog_api = CatalogApi::new(db.clone()).with_policy(policy);
        let identity =
            IdentityMiddlewareFactory::new(config.identity.secret.clone(), config.identity.checks_enabled);
        let api_scope = web::scope("/api")
            .wrap(identity)
            .service(AvailableSlotsRoute::<SqliteDatabase>::new())
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(OrderDetailsRoute::<SqliteDatabase>::new())
            .service(AssignDeliveryRoute::<SqliteDatabase>::new())
            .service(VerifyPickupRoute::<SqliteDatabase>::new())
            .service(VerifyDeliveryRoute::<SqliteDatabase>::new())
            .service(OutForDeliveryRoute::<SqliteDatabase>::new())
            .service(ConfirmItemRoute::<SqliteDatabase>::new())
            .service(RejectItemRoute::<SqliteDatabase>::new())
            .service(MarkProcessingRoute::<SqliteDatabase>::new())
            .service(MarkPackedRoute::<SqliteDatabase>::new())
            .service(CancelItemRoute::<SqliteDatabase>::new())
            .service(VendorNotesRoute::<SqliteDatabase>::new())
            .service(WalletSummaryRoute::<SqliteDatabase>::new())
            .service(SyncWalletRoute::<SqliteDatabase>::new())
            .service(PayoutSettingsRoute::<SqliteDatabase>::new())
            .service(RequestPayoutRoute::<SqliteDatabase>::new())
            .service(ListPayoutsRoute::<SqliteDatabase>::new())
            .service(ApprovePayoutRoute::<SqliteDatabase>::new())
            .service(RejectPayoutRoute::<SqliteDatabase>::new())
            .service(CompletePayoutRoute::<SqliteDatabase>::new())
            .service(FailPayoutRoute::<SqliteDatabase>::new())
            .service(CancelPayoutRoute::<SqliteDatabase>::new())
            .service(RepairDayRoute::<SqliteDatabase>::new())
            .service(AssignSectorRoute::<SqliteDatabase>::new())
            .service(SectorRosterRoute::<SqliteDatabase>::new())
            .service(VendorSettingsRoute::<SqliteDatabase>::new())
            .service(UpdateVendorSettingsRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("fms::access_log"))
            .app_data(web::Data::new(slot_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(assignment_api))
            .app_data(web::Data::new(verification_api))
            .app_data(web::Data::new(wallet_api))
            .app_data(web::Data::new(payout_api))
            .app_data(web::Data::new(catalog_api))
            .service(health)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
