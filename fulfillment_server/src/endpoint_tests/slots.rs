use actix_web::{http::Method, web, web::ServiceConfig};
use chrono::{NaiveDate, NaiveTime};
use fulfillment_engine::{
    db_types::{Actor, DeliverySlot},
    SlotApi,
    SlotRules,
};

use super::{
    helpers::{call_as, json, timestamp},
    mocks::MockSlotManager,
};
use crate::routes::AvailableSlotsRoute;

fn slot(id: i64, start_hour: u32, available_orders: i64) -> DeliverySlot {
    let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
    DeliverySlot {
        id,
        sector_id: 3,
        slot_date: NaiveDate::from_ymd_opt(2099, 1, 15).unwrap(),
        start_time: t(start_hour),
        end_time: t(start_hour + 2),
        cutoff_time: t(start_hour - 2),
        max_orders: 10,
        available_orders,
        is_active: true,
        created_at: timestamp(),
    }
}

fn configure_with(slots: MockSlotManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = SlotApi::new(slots, SlotRules::new(NaiveTime::from_hms_opt(6, 0, 0).unwrap()));
        cfg.service(AvailableSlotsRoute::<MockSlotManager>::new()).app_data(web::Data::new(api));
    }
}

#[actix_web::test]
async fn full_slots_are_not_offered() {
    let _ = env_logger::try_init().ok();
    let mut slots = MockSlotManager::new();
    slots
        .expect_fetch_slots_for_sector()
        .withf(|sector, date| *sector == 3 && *date == NaiveDate::from_ymd_opt(2099, 1, 15).unwrap())
        .times(1)
        .returning(|_, _| Ok(vec![slot(1, 8, 4), slot(2, 12, 0), slot(3, 16, 1)]));
    let (status, body) =
        call_as(&Actor::customer(42), Method::GET, "/api/slots/3/2099-01-15", None, configure_with(slots)).await;
    assert_eq!(status.as_u16(), 200);
    let ids = json(&body).as_array().unwrap().iter().map(|s| s["id"].as_i64().unwrap()).collect::<Vec<_>>();
    assert_eq!(ids, vec![1, 3]);
}

#[actix_web::test]
async fn past_dates_have_no_slots() {
    let _ = env_logger::try_init().ok();
    let mut slots = MockSlotManager::new();
    slots.expect_fetch_slots_for_sector().never();
    let (status, body) =
        call_as(&Actor::customer(42), Method::GET, "/api/slots/3/2001-01-15", None, configure_with(slots)).await;
    assert_eq!(status.as_u16(), 200);
    assert_eq!(body, "[]");
}

#[actix_web::test]
async fn malformed_dates_are_rejected() {
    let _ = env_logger::try_init().ok();
    let mut slots = MockSlotManager::new();
    slots.expect_fetch_slots_for_sector().never();
    let (status, _) =
        call_as(&Actor::vendor(5), Method::GET, "/api/slots/3/tomorrow", None, configure_with(slots)).await;
    assert_eq!(status.as_u16(), 404);
}
