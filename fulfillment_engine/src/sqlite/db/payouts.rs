use log::debug;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewPayoutRequest, PayoutRequest, PayoutStatus},
    traits::PayoutQueryFilter,
};

pub async fn insert_payout(request: NewPayoutRequest, conn: &mut SqliteConnection) -> Result<PayoutRequest, sqlx::Error> {
    let payout: PayoutRequest = sqlx::query_as(
        r#"
        INSERT INTO payout_requests (vendor_id, amount, payout_method, available_balance_at_request, notes)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(request.vendor_id)
    .bind(request.amount)
    .bind(request.payout_method)
    .bind(request.available_balance_at_request)
    .bind(request.notes)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Payout request {} for {} saved for vendor {}", payout.id, payout.amount, payout.vendor_id);
    Ok(payout)
}

pub async fn fetch_payout(payout_id: i64, conn: &mut SqliteConnection) -> Result<Option<PayoutRequest>, sqlx::Error> {
    let payout =
        sqlx::query_as("SELECT * FROM payout_requests WHERE id = $1").bind(payout_id).fetch_optional(conn).await?;
    Ok(payout)
}

/// Resulting payouts are ordered by `requested_at` in descending order.
pub async fn search_payouts(
    filter: PayoutQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<PayoutRequest>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM payout_requests WHERE 1 = 1");
    if let Some(vendor_id) = filter.vendor_id {
        builder.push(" AND vendor_id = ");
        builder.push_bind(vendor_id);
    }
    if let Some(status) = filter.status {
        builder.push(" AND payout_status = ");
        builder.push_bind(status);
    }
    builder.push(" ORDER BY requested_at DESC, id DESC");
    let payouts = builder.build_query_as::<PayoutRequest>().fetch_all(conn).await?;
    Ok(payouts)
}

/// Moves the payout from `from` to `to` if it is still in `from`, stamping the approval or processing time as
/// appropriate. Returns `None` if the payout is missing or no longer in `from`.
pub async fn transition(
    payout_id: i64,
    from: PayoutStatus,
    to: PayoutStatus,
    decided_by: Option<i64>,
    notes: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Option<PayoutRequest>, sqlx::Error> {
    let payout = sqlx::query_as(
        r#"
        UPDATE payout_requests SET
            payout_status = $1,
            approved_by = COALESCE($2, approved_by),
            notes = COALESCE($3, notes),
            approved_at = CASE WHEN $1 = 'processing' THEN CURRENT_TIMESTAMP ELSE approved_at END,
            processed_at = CASE WHEN $1 IN ('completed', 'failed') THEN CURRENT_TIMESTAMP ELSE processed_at END,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $4 AND payout_status = $5
        RETURNING *
        "#,
    )
    .bind(to)
    .bind(decided_by)
    .bind(notes)
    .bind(payout_id)
    .bind(from)
    .fetch_optional(conn)
    .await?;
    Ok(payout)
}
