use chrono::{Local, NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use fulfillment_engine::db_types::{Actor, PayoutStatus};

mod commands;
mod formatting;
mod setup;

use crate::{
    commands::{print_payouts, print_slots, repair_day, seed_slots, sweep_confirmations, sync_wallet},
    setup::{migrate_db, MigrateParams},
};

/// Operator tools for the fulfillment engine. Every command works directly against the database in
/// `FMS_DATABASE_URL`, so run them on the host that owns it.
#[derive(Parser, Debug)]
#[command(version = "0.1.0", about)]
pub struct Arguments {
    /// The admin id recorded against changes made by these tools
    #[arg(long, global = true, default_value_t = 0)]
    operator: i64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the database if needed and run the schema migrations.
    Migrate(MigrateParams),
    /// Recreate missing delivery assignments and pickup records for a day.
    #[clap(name = "repair-day")]
    RepairDay(DateParams),
    /// Recompute a vendor's wallet balances from their order history.
    #[clap(name = "sync-wallet")]
    SyncWallet {
        #[arg(short, long)]
        vendor: i64,
    },
    /// Run one pass of the confirmation timeout sweep.
    #[clap(name = "sweep-confirmations")]
    SweepConfirmations,
    /// List the delivery slots of a sector.
    Slots(SlotParams),
    /// Create a run of daily delivery slots, optionally in a new sector.
    #[clap(name = "seed-slots")]
    SeedSlots(SeedParams),
    /// List payout requests.
    Payouts(PayoutParams),
}

#[derive(Debug, Args)]
pub struct DateParams {
    /// YYYY-MM-DD. Defaults to today.
    #[arg(short, long)]
    pub date: Option<NaiveDate>,
}

impl DateParams {
    pub fn date_or_today(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[derive(Debug, Args)]
pub struct SlotParams {
    #[arg(short, long)]
    pub sector: i64,
    #[command(flatten)]
    pub date: DateParams,
    /// Include full and closed slots
    #[arg(short, long)]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct SeedParams {
    /// Add the slots to this existing sector
    #[arg(short, long, conflicts_with = "name")]
    pub sector: Option<i64>,
    /// Create a new sector with this name
    #[arg(short, long, requires = "postal_codes")]
    pub name: Option<String>,
    /// Comma separated postal codes served by the new sector
    #[arg(short, long, value_delimiter = ',')]
    pub postal_codes: Vec<String>,
    /// First date to create slots on. Defaults to today.
    #[arg(short, long)]
    pub from: Option<NaiveDate>,
    #[arg(long, default_value_t = 7)]
    pub days: i64,
    /// HH:MM
    #[arg(long)]
    pub start: NaiveTime,
    /// HH:MM
    #[arg(long)]
    pub end: NaiveTime,
    /// HH:MM. Orders are not accepted after this time on the slot date.
    #[arg(long)]
    pub cutoff: NaiveTime,
    #[arg(short, long, default_value_t = 20)]
    pub capacity: i64,
}

#[derive(Debug, Args)]
pub struct PayoutParams {
    #[arg(short, long)]
    pub vendor: Option<i64>,
    /// pending, processing, completed, failed or cancelled
    #[arg(short, long)]
    pub status: Option<PayoutStatus>,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    let operator = Actor::admin(cli.operator);
    let result = match cli.command {
        Command::Migrate(params) => migrate_db(params).await,
        Command::RepairDay(params) => repair_day(params.date_or_today()).await,
        Command::SyncWallet { vendor } => sync_wallet(&operator, vendor).await,
        Command::SweepConfirmations => sweep_confirmations().await,
        Command::Slots(params) => print_slots(params).await,
        Command::SeedSlots(params) => seed_slots(&operator, params).await,
        Command::Payouts(params) => print_payouts(&operator, params).await,
    };
    if let Err(e) = result {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
