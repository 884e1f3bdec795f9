use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDate, Utc};
use fulfillment_engine::{
    db_types::{Actor, NewDeliverySlot, NewSector},
    events::EventProducers,
    traits::PayoutQueryFilter,
    AssignmentApi,
    CatalogApi,
    FulfillmentDatabase,
    OrderFlowApi,
    PayoutApi,
    SlotApi,
    SlotRules,
    SqliteDatabase,
    WalletApi,
};
use fulfillment_server::config::policy_from_env;
use log::*;

use crate::{
    formatting::{format_payouts, format_repair_report, format_slots, format_timeout_report, format_wallet},
    PayoutParams,
    SeedParams,
    SlotParams,
};

// Events raised here have no listeners. The server's workers notify on their own runs.
async fn connect() -> Result<SqliteDatabase> {
    let db = SqliteDatabase::new(1).await?;
    debug!("🗃️ Connected to {}", db.url());
    Ok(db)
}

pub async fn repair_day(date: NaiveDate) -> Result<()> {
    let api = AssignmentApi::new(connect().await?, EventProducers::default());
    let report = api.repair_day(date).await?;
    println!("{}", format_repair_report(&report)?);
    Ok(())
}

pub async fn sync_wallet(operator: &Actor, vendor_id: i64) -> Result<()> {
    let api = WalletApi::new(connect().await?, EventProducers::default()).with_policy(policy_from_env());
    let wallet = api.sync_balance(operator, vendor_id).await?;
    println!("{}", format_wallet(&wallet)?);
    Ok(())
}

pub async fn sweep_confirmations() -> Result<()> {
    let api = OrderFlowApi::new(connect().await?, EventProducers::default()).with_policy(policy_from_env());
    let report = api.run_confirmation_timeouts(Utc::now()).await?;
    println!("{}", format_timeout_report(&report)?);
    Ok(())
}

pub async fn print_slots(params: SlotParams) -> Result<()> {
    let rules = SlotRules::new(policy_from_env().preorder_threshold);
    let api = SlotApi::new(connect().await?, rules);
    let date = params.date.date_or_today();
    let slots = if params.all {
        api.all_slots(params.sector, date).await?
    } else {
        api.list_available_slots(params.sector, date, Local::now().naive_local()).await?
    };
    println!("Sector {} on {date}", params.sector);
    println!("{}", format_slots(&slots, &rules, Local::now().naive_local()));
    Ok(())
}

pub async fn seed_slots(operator: &Actor, params: SeedParams) -> Result<()> {
    if params.days < 1 {
        return Err(anyhow!("--days must be at least 1"));
    }
    let db = connect().await?;
    let api = CatalogApi::new(db).with_policy(policy_from_env());
    let sector = match (params.sector, params.name) {
        (Some(id), _) => api.fetch_sector(id).await?,
        (None, Some(name)) => api.create_sector(operator, NewSector { name, postal_codes: params.postal_codes }).await?,
        (None, None) => return Err(anyhow!("Give either --sector or --name")),
    };
    let from = params.from.unwrap_or_else(|| Local::now().date_naive());
    let to = from + chrono::Duration::days(params.days - 1);
    let template = NewDeliverySlot {
        sector_id: sector.id,
        slot_date: from,
        start_time: params.start,
        end_time: params.end,
        cutoff_time: params.cutoff,
        max_orders: params.capacity,
    };
    let created = api.create_slots_for_range(operator, template, from, to).await?;
    let skipped = params.days - created.len() as i64;
    if skipped > 0 {
        warn!("🗃️ {skipped} dates already had a {}-{} slot in sector {}", params.start, params.end, sector.id);
    }
    println!("{} slots created in sector {} ({})", created.len(), sector.id, sector.name);
    let rules = SlotRules::new(policy_from_env().preorder_threshold);
    println!("{}", format_slots(&created, &rules, Local::now().naive_local()));
    Ok(())
}

pub async fn print_payouts(operator: &Actor, params: PayoutParams) -> Result<()> {
    let api = PayoutApi::new(connect().await?, EventProducers::default());
    let filter = PayoutQueryFilter { vendor_id: params.vendor, status: params.status };
    let payouts = api.search(operator, filter).await?;
    println!("{}", format_payouts(&payouts));
    Ok(())
}
