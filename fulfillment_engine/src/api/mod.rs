//! # Fulfillment engine public API
//!
//! The API is modular, so that clients can pick the parts they need. Each API struct is created from a backend that
//! implements the traits that API requires, and from the event producers it should publish to.
//!
//! * [`slot_api`] lists bookable delivery slots and reserves or releases capacity.
//! * [`order_flow_api`] places orders and drives items through their lifecycle, including cancellation and the
//!   confirmation timeout sweep.
//! * [`assignment_api`] assigns orders to delivery partners and repairs missing assignment records.
//! * [`verification_api`] verifies pickup and delivery OTPs.
//! * [`wallet_api`] exposes vendor wallets and lets vendors request payouts.
//! * [`payout_api`] is the admin side of payouts.
//! * [`catalog_api`] manages sectors, slots, products and vendor settings.
//!
//! ```rust,ignore
//! use fulfillment_engine::{events::EventProducers, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(url, 25).await?;
//! let api = OrderFlowApi::new(db, EventProducers::default());
//! let placed = api.create_order(&customer, new_order, now).await?;
//! ```
use chrono::NaiveTime;
use log::warn;

use crate::{
    db_types::{Actor, Role},
    traits::{FulfillmentError, WalletManagement},
};

pub mod assignment_api;
pub mod assignment_objects;
pub mod catalog_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod payout_api;
pub mod slot_api;
pub mod verification_api;
pub mod wallet_api;
pub mod wallet_objects;

/// The longest confirmation window a vendor may configure: one week.
pub const MAX_CONFIRMATION_TIMEOUT_MINUTES: i64 = 7 * 24 * 60;

/// Tunable rules shared by the APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FulfillmentPolicy {
    /// Before this time of day, all of today's slots can still be booked even if their cutoff has passed.
    pub preorder_threshold: NaiveTime,
    /// Confirmation window for vendors that have not configured their own.
    pub confirmation_timeout_minutes: i64,
    /// Wallet snapshots older than this are recomputed when read.
    pub wallet_staleness_secs: i64,
}

impl Default for FulfillmentPolicy {
    fn default() -> Self {
        Self {
            preorder_threshold: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or_default(),
            confirmation_timeout_minutes: 15,
            wallet_staleness_secs: 300,
        }
    }
}

impl FulfillmentPolicy {
    /// The wallet staleness threshold. A value too large to represent counts as zero, so wallets resync on every read.
    pub fn wallet_max_age(&self) -> chrono::Duration {
        chrono::Duration::try_seconds(self.wallet_staleness_secs).unwrap_or_else(chrono::Duration::zero)
    }
}

pub(crate) fn require_role(actor: &Actor, roles: &[Role]) -> Result<(), FulfillmentError> {
    if roles.contains(&actor.role) {
        Ok(())
    } else {
        Err(FulfillmentError::NotAuthorized(format!("{} may not perform this action", actor.role)))
    }
}

/// Recomputes the wallets of the given vendors after a money-affecting change has been committed. Failures are
/// logged and swallowed: the change itself stands, and the next read resyncs the stale wallet.
pub(crate) async fn sync_wallets<B: WalletManagement>(db: &B, vendor_ids: impl IntoIterator<Item = i64>) {
    for vendor_id in vendor_ids {
        if let Err(e) = db.sync_wallet(vendor_id).await {
            warn!("💰️ Could not resync the wallet of vendor {vendor_id}. {e}");
        }
    }
}
