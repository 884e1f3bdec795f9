//! Background jobs that run alongside the HTTP server.
//!
//! Both workers own their own copy of the database handle and loop forever. Do not await the returned handles.
use std::time::Duration;

use chrono::{Local, Utc};
use fulfillment_engine::{events::EventProducers, AssignmentApi, FulfillmentPolicy, OrderFlowApi, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

/// Starts the confirmation timeout sweep. Pending items older than their vendor's window are auto-confirmed or
/// escalated on every tick.
pub fn start_confirmation_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    policy: FulfillmentPolicy,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = OrderFlowApi::new(db, producers).with_policy(policy);
        info!("🕰️ Confirmation timeout worker started. Sweeping every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            trace!("🕰️ Running confirmation timeout sweep");
            match api.run_confirmation_timeouts(Utc::now()).await {
                Ok(report) if report.is_quiet() => {
                    trace!("🕰️ {} pending items checked. Nothing to do.", report.checked)
                },
                Ok(report) => {
                    info!(
                        "🕰️ {} pending items checked. {} auto-confirmed, {} escalated, {} skipped, {} errors",
                        report.checked,
                        report.auto_confirmed.len(),
                        report.escalated.len(),
                        report.skipped.len(),
                        report.errors.len()
                    );
                    debug!("🕰️ Auto-confirmed: {:?}. Escalated: {:?}", report.auto_confirmed, report.escalated);
                    for (item_id, e) in &report.errors {
                        warn!("🕰️ Item {item_id} could not be swept. {e}");
                    }
                },
                Err(e) => error!("🕰️ Error running the confirmation timeout sweep: {e}"),
            }
        }
    })
}

/// Starts the backstop repair job. Each tick recreates any missing assignment or pickup records for today's orders.
pub fn start_repair_worker(db: SqliteDatabase, producers: EventProducers, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = AssignmentApi::new(db, producers);
        info!("🕰️ Assignment repair worker started. Running every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            let today = Local::now().date_naive();
            match api.repair_day(today).await {
                Ok(report) if report.is_clean() => debug!("🕰️ Repair for {today}: all records present"),
                Ok(report) => {
                    info!(
                        "🕰️ Repair for {today}: {} orders checked. {} assignments, {} pickups created. {} errors",
                        report.orders_checked,
                        report.assignments_created,
                        report.pickups_created,
                        report.errors.len()
                    );
                    for e in &report.errors {
                        warn!("🕰️ Order {} could not be repaired. {}", e.order_id, e.message);
                    }
                },
                Err(e) => error!("🕰️ Error running the assignment repair job: {e}"),
            }
        }
    })
}
