use fulfillment_common::Paise;
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{PayoutSettings, VendorWallet};

/// Recomputes every balance column from source records in a single statement, creating the wallet on first use.
///
/// * delivered: the sum of the vendor's delivered line totals,
/// * accruing: the sum of line totals of items that are neither delivered nor cancelled,
/// * paid out: the sum of payouts that are processing or completed.
///
/// `available = delivered - paid out`, `pending = accruing` and `earned = delivered + accruing`, so the ledger identity
/// holds by construction. Payout preferences are not touched.
pub async fn sync_balances(vendor_id: i64, conn: &mut SqliteConnection) -> Result<VendorWallet, sqlx::Error> {
    let wallet: VendorWallet = sqlx::query_as(
        r#"
        INSERT INTO vendor_wallets (
            vendor_id,
            available_balance,
            pending_balance,
            total_earned,
            total_paid_out,
            last_updated_balance_at
        )
        SELECT $1, d.amount - p.amount, a.amount, d.amount + a.amount, p.amount, CURRENT_TIMESTAMP
        FROM
            (SELECT COALESCE(SUM(line_total), 0) AS amount FROM order_items
                WHERE vendor_id = $1 AND item_status = 'delivered') AS d,
            (SELECT COALESCE(SUM(line_total), 0) AS amount FROM order_items
                WHERE vendor_id = $1 AND item_status NOT IN ('delivered', 'cancelled')) AS a,
            (SELECT COALESCE(SUM(amount), 0) AS amount FROM payout_requests
                WHERE vendor_id = $1 AND payout_status IN ('processing', 'completed')) AS p
        WHERE true
        ON CONFLICT (vendor_id) DO UPDATE SET
            available_balance = excluded.available_balance,
            pending_balance = excluded.pending_balance,
            total_earned = excluded.total_earned,
            total_paid_out = excluded.total_paid_out,
            last_updated_balance_at = excluded.last_updated_balance_at
        RETURNING *
        "#,
    )
    .bind(vendor_id)
    .fetch_one(conn)
    .await?;
    trace!(
        "🗃️ Wallet for vendor {vendor_id} synced. available {}, pending {}, earned {}, paid out {}",
        wallet.available_balance,
        wallet.pending_balance,
        wallet.total_earned,
        wallet.total_paid_out
    );
    Ok(wallet)
}

pub async fn fetch_wallet(vendor_id: i64, conn: &mut SqliteConnection) -> Result<Option<VendorWallet>, sqlx::Error> {
    let wallet =
        sqlx::query_as("SELECT * FROM vendor_wallets WHERE vendor_id = $1").bind(vendor_id).fetch_optional(conn).await?;
    Ok(wallet)
}

/// Moves `amount` from available to paid out, if the available balance covers it. Returns `None` otherwise.
pub async fn debit_available(
    vendor_id: i64,
    amount: Paise,
    conn: &mut SqliteConnection,
) -> Result<Option<VendorWallet>, sqlx::Error> {
    let wallet = sqlx::query_as(
        r#"
        UPDATE vendor_wallets SET
            available_balance = available_balance - $1,
            total_paid_out = total_paid_out + $1
        WHERE vendor_id = $2 AND available_balance >= $1
        RETURNING *
        "#,
    )
    .bind(amount)
    .bind(vendor_id)
    .fetch_optional(conn)
    .await?;
    Ok(wallet)
}

/// Reverses [`debit_available`].
pub async fn credit_available(
    vendor_id: i64,
    amount: Paise,
    conn: &mut SqliteConnection,
) -> Result<VendorWallet, sqlx::Error> {
    let wallet = sqlx::query_as(
        r#"
        UPDATE vendor_wallets SET
            available_balance = available_balance + $1,
            total_paid_out = total_paid_out - $1
        WHERE vendor_id = $2
        RETURNING *
        "#,
    )
    .bind(amount)
    .bind(vendor_id)
    .fetch_one(conn)
    .await?;
    Ok(wallet)
}

pub async fn update_payout_settings(
    vendor_id: i64,
    settings: PayoutSettings,
    conn: &mut SqliteConnection,
) -> Result<Option<VendorWallet>, sqlx::Error> {
    let wallet = sqlx::query_as(
        r#"
        UPDATE vendor_wallets SET
            payout_method = COALESCE($1, payout_method),
            minimum_payout_amount = COALESCE($2, minimum_payout_amount),
            bank_account_holder = COALESCE($3, bank_account_holder),
            bank_account_number = COALESCE($4, bank_account_number),
            bank_ifsc = COALESCE($5, bank_ifsc),
            upi_id = COALESCE($6, upi_id)
        WHERE vendor_id = $7
        RETURNING *
        "#,
    )
    .bind(settings.payout_method)
    .bind(settings.minimum_payout_amount)
    .bind(settings.bank_account_holder)
    .bind(settings.bank_account_number)
    .bind(settings.bank_ifsc)
    .bind(settings.upi_id)
    .bind(vendor_id)
    .fetch_optional(conn)
    .await?;
    Ok(wallet)
}
