use crate::{
    db_types::{NewPayoutRequest, PayoutRequest, PayoutSettings, VendorWallet},
    traits::{FulfillmentError, PayoutQueryFilter},
};

/// Vendor wallets and payouts.
///
/// Balances are derived from item statuses and payout records, and a backend recomputes them in a single statement
/// so that the wallet row never holds a partially updated set of balances. The identity
/// `total_earned = total_paid_out + pending_balance + available_balance` holds after every write.
#[allow(async_fn_in_trait)]
pub trait WalletManagement {
    /// Recomputes every balance of the vendor's wallet from source records, creating the wallet if needed. Payout
    /// preferences are left untouched.
    async fn sync_wallet(&self, vendor_id: i64) -> Result<VendorWallet, FulfillmentError>;

    async fn fetch_wallet(&self, vendor_id: i64) -> Result<Option<VendorWallet>, FulfillmentError>;

    /// Updates the payout preferences. Fields that are `None` in `settings` are left unchanged.
    async fn update_payout_settings(
        &self,
        vendor_id: i64,
        settings: PayoutSettings,
    ) -> Result<VendorWallet, FulfillmentError>;

    async fn insert_payout_request(&self, request: NewPayoutRequest) -> Result<PayoutRequest, FulfillmentError>;

    async fn fetch_payout(&self, payout_id: i64) -> Result<Option<PayoutRequest>, FulfillmentError>;

    async fn search_payouts(&self, filter: PayoutQueryFilter) -> Result<Vec<PayoutRequest>, FulfillmentError>;

    /// In one transaction: resyncs the wallet, moves the request from `pending` to `processing` and debits the
    /// amount from the available balance. Fails with `InsufficientBalance`, writing nothing, if the available
    /// balance cannot cover the amount.
    async fn approve_payout(
        &self,
        payout_id: i64,
        approved_by: i64,
    ) -> Result<(PayoutRequest, VendorWallet), FulfillmentError>;

    /// Moves a `pending` request to `cancelled`. No funds move.
    async fn cancel_payout(
        &self,
        payout_id: i64,
        decided_by: Option<i64>,
        notes: Option<String>,
    ) -> Result<PayoutRequest, FulfillmentError>;

    /// Moves a `processing` request to `completed`. No funds move.
    async fn complete_payout(&self, payout_id: i64, notes: Option<String>) -> Result<PayoutRequest, FulfillmentError>;

    /// Moves a `processing` request to `failed` and credits the amount back to the available balance.
    async fn fail_payout(
        &self,
        payout_id: i64,
        notes: Option<String>,
    ) -> Result<(PayoutRequest, VendorWallet), FulfillmentError>;
}
