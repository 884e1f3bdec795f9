use std::path::Path;

use anyhow::Result;
use clap::Args;
use log::*;
use fulfillment_engine::{sqlite::db::db_url, SqliteDatabase};
use sqlx::{
    migrate::{MigrateDatabase, Migrator},
    Sqlite,
};

#[derive(Debug, Args)]
pub struct MigrateParams {
    /// The path to the migrations directory. The migrations are embedded in the binary by default, and so this
    /// parameter is optional. If provided, the migrations at <path> will be executed instead.
    #[arg(short, long)]
    pub path: Option<String>,
}

pub async fn migrate_db(params: MigrateParams) -> Result<()> {
    let url = db_url();
    create_database_if_not_exist(&url).await?;
    let db = SqliteDatabase::new_with_url(&url, 1).await?;
    debug!("🗃️ Connected to {url}");
    match &params.path {
        Some(path) => {
            println!("Running migrations at: {path}");
            let migrator = Migrator::new(Path::new(path)).await?;
            migrator.run(db.pool()).await?;
        },
        None => {
            println!("Running embedded migrations");
            db.migrate().await?;
        },
    }
    db.pool().close().await;
    println!("Migrations complete");
    Ok(())
}

async fn create_database_if_not_exist(url: &str) -> Result<()> {
    if !Sqlite::database_exists(url).await? {
        println!("Creating new database at: {url}");
        Sqlite::create_database(url).await?;
    }
    Ok(())
}
