use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    api::{
        require_role,
        wallet_objects::{PayoutApplication, WalletSnapshot},
        FulfillmentPolicy,
    },
    db_types::{Actor, NewPayoutRequest, PayoutMethod, PayoutRequest, PayoutSettings, PayoutStatus, Role, VendorWallet},
    events::{EventProducers, PayoutStatusChangedEvent},
    traits::{FulfillmentError, PayoutQueryFilter, WalletManagement},
};

/// The vendor side of the wallet ledger.
///
/// Balances are never edited directly. They are recomputed from order items and payout records, lazily when a
/// snapshot is older than the staleness threshold, and eagerly by the other APIs after any change that moves money.
pub struct WalletApi<B> {
    db: B,
    producers: EventProducers,
    policy: FulfillmentPolicy,
}

impl<B> Debug for WalletApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi ({}s staleness)", self.policy.wallet_staleness_secs)
    }
}

impl<B> WalletApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, policy: FulfillmentPolicy::default() }
    }

    pub fn with_policy(mut self, policy: FulfillmentPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<B> WalletApi<B>
where B: WalletManagement
{
    /// Recomputes the vendor's balances from order history and returns the fresh snapshot.
    pub async fn sync_balance(&self, actor: &Actor, vendor_id: i64) -> Result<WalletSnapshot, FulfillmentError> {
        require_wallet_access(actor, vendor_id)?;
        let wallet = self.db.sync_wallet(vendor_id).await?;
        debug!("💰️ Wallet of vendor {vendor_id} synced. {} available", wallet.available_balance);
        Ok(wallet.into())
    }

    /// The vendor's wallet, resynced first if the stored snapshot is stale.
    pub async fn wallet_summary(&self, actor: &Actor, vendor_id: i64) -> Result<WalletSnapshot, FulfillmentError> {
        require_wallet_access(actor, vendor_id)?;
        let wallet = self.fresh_wallet(vendor_id).await?;
        Ok(wallet.into())
    }

    /// Updates the payout preferences. Only the fields present in `settings` change, and the result must describe
    /// a usable payout destination for the selected method.
    pub async fn update_settings(
        &self,
        actor: &Actor,
        vendor_id: i64,
        settings: PayoutSettings,
    ) -> Result<WalletSnapshot, FulfillmentError> {
        require_wallet_access(actor, vendor_id)?;
        validate_payout_settings(&settings)?;
        let current = self.fresh_wallet(vendor_id).await?;
        let merged = merge_settings(&current, &settings);
        if let Some(method) = merged.payout_method {
            check_destination(&merged, method)?;
        }
        let wallet = self.db.update_payout_settings(vendor_id, settings).await?;
        info!("💰️ Payout settings of vendor {vendor_id} updated");
        Ok(wallet.into())
    }

    /// Files a payout request. No funds move until an admin approves it.
    ///
    /// The amount must be positive, at least the vendor's minimum payout amount and no more than the available
    /// balance, measured against freshly synced balances.
    pub async fn request_payout(
        &self,
        actor: &Actor,
        vendor_id: i64,
        application: PayoutApplication,
    ) -> Result<PayoutRequest, FulfillmentError> {
        require_role(actor, &[Role::Vendor])?;
        require_wallet_access(actor, vendor_id)?;
        let amount = application.amount;
        if !amount.is_positive() {
            return Err(FulfillmentError::Validation("The payout amount must be positive".into()));
        }
        let wallet = self.db.sync_wallet(vendor_id).await?;
        if amount < wallet.minimum_payout_amount {
            return Err(FulfillmentError::Validation(format!(
                "The minimum payout amount is {}",
                wallet.minimum_payout_amount
            )));
        }
        if amount > wallet.available_balance {
            return Err(FulfillmentError::InsufficientBalance { requested: amount, available: wallet.available_balance });
        }
        let method = application
            .method
            .or(wallet.payout_method)
            .ok_or_else(|| FulfillmentError::Validation("Choose a payout method first".into()))?;
        check_destination(&wallet, method)?;
        let request = NewPayoutRequest {
            vendor_id,
            amount,
            payout_method: method,
            available_balance_at_request: wallet.available_balance,
            notes: application.notes.filter(|n| !n.trim().is_empty()),
        };
        let payout = self.db.insert_payout_request(request).await?;
        info!("💰️ Vendor {vendor_id} requested a payout of {amount} by {method} (#{})", payout.id);
        Ok(payout)
    }

    /// Withdraws one of the vendor's own requests while it is still pending.
    pub async fn cancel_payout(&self, actor: &Actor, payout_id: i64) -> Result<PayoutRequest, FulfillmentError> {
        require_role(actor, &[Role::Vendor])?;
        let payout = self
            .db
            .fetch_payout(payout_id)
            .await?
            .ok_or_else(|| FulfillmentError::NotFound(format!("Payout request {payout_id}")))?;
        if payout.vendor_id != actor.id {
            return Err(FulfillmentError::NotAuthorized(format!("Payout request {payout_id} is not yours")));
        }
        let old_status = payout.payout_status;
        let payout = self.db.cancel_payout(payout_id, None, Some("Withdrawn by the vendor".into())).await?;
        info!("💰️ Vendor {} withdrew payout request {payout_id}", actor.id);
        self.producers.publish_payout_status_changed(PayoutStatusChangedEvent::new(payout.clone(), old_status)).await;
        Ok(payout)
    }

    pub async fn payouts(
        &self,
        actor: &Actor,
        vendor_id: i64,
        status: Option<PayoutStatus>,
    ) -> Result<Vec<PayoutRequest>, FulfillmentError> {
        require_wallet_access(actor, vendor_id)?;
        let filter = PayoutQueryFilter { vendor_id: Some(vendor_id), status };
        self.db.search_payouts(filter).await
    }

    async fn fresh_wallet(&self, vendor_id: i64) -> Result<VendorWallet, FulfillmentError> {
        let max_age = self.policy.wallet_max_age();
        match self.db.fetch_wallet(vendor_id).await? {
            Some(w) if !w.is_stale(Utc::now(), max_age) => Ok(w),
            _ => {
                trace!("💰️ Wallet of vendor {vendor_id} is missing or stale. Resyncing");
                self.db.sync_wallet(vendor_id).await
            },
        }
    }
}

fn require_wallet_access(actor: &Actor, vendor_id: i64) -> Result<(), FulfillmentError> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Vendor if actor.id == vendor_id => Ok(()),
        _ => Err(FulfillmentError::NotAuthorized(format!("{actor} may not access the wallet of vendor {vendor_id}"))),
    }
}

/// Format checks on the fields present in an update.
pub fn validate_payout_settings(settings: &PayoutSettings) -> Result<(), FulfillmentError> {
    if let Some(min) = settings.minimum_payout_amount {
        if !min.is_positive() {
            return Err(FulfillmentError::Validation("The minimum payout amount must be positive".into()));
        }
    }
    if let Some(ifsc) = &settings.bank_ifsc {
        if !is_valid_ifsc(ifsc) {
            return Err(FulfillmentError::Validation(format!("{ifsc} is not a valid IFSC code")));
        }
    }
    if let Some(account) = &settings.bank_account_number {
        if !(9..=18).contains(&account.len()) || !account.chars().all(|c| c.is_ascii_digit()) {
            return Err(FulfillmentError::Validation("Bank account numbers have 9 to 18 digits".into()));
        }
    }
    if let Some(holder) = &settings.bank_account_holder {
        if holder.trim().is_empty() {
            return Err(FulfillmentError::Validation("The account holder name cannot be blank".into()));
        }
    }
    if let Some(upi) = &settings.upi_id {
        let valid = match upi.split_once('@') {
            Some((handle, provider)) => !handle.is_empty() && !provider.is_empty() && !provider.contains('@'),
            None => false,
        };
        if !valid {
            return Err(FulfillmentError::Validation(format!("{upi} is not a valid UPI id")));
        }
    }
    Ok(())
}

/// Four letters, a zero, then six letters or digits.
fn is_valid_ifsc(ifsc: &str) -> bool {
    let b = ifsc.as_bytes();
    b.len() == 11
        && b[..4].iter().all(|c| c.is_ascii_uppercase())
        && b[4] == b'0'
        && b[5..].iter().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

fn merge_settings(current: &VendorWallet, update: &PayoutSettings) -> VendorWallet {
    let mut merged = current.clone();
    if update.payout_method.is_some() {
        merged.payout_method = update.payout_method;
    }
    if let Some(min) = update.minimum_payout_amount {
        merged.minimum_payout_amount = min;
    }
    if update.bank_account_holder.is_some() {
        merged.bank_account_holder = update.bank_account_holder.clone();
    }
    if update.bank_account_number.is_some() {
        merged.bank_account_number = update.bank_account_number.clone();
    }
    if update.bank_ifsc.is_some() {
        merged.bank_ifsc = update.bank_ifsc.clone();
    }
    if update.upi_id.is_some() {
        merged.upi_id = update.upi_id.clone();
    }
    merged
}

/// The wallet holds every detail needed to pay out by `method`.
fn check_destination(wallet: &VendorWallet, method: PayoutMethod) -> Result<(), FulfillmentError> {
    let complete = match method {
        PayoutMethod::BankTransfer => {
            wallet.bank_account_holder.is_some() && wallet.bank_account_number.is_some() && wallet.bank_ifsc.is_some()
        },
        PayoutMethod::Upi => wallet.upi_id.is_some(),
    };
    if complete {
        Ok(())
    } else {
        Err(FulfillmentError::Validation(format!("The payout details for {method} are incomplete")))
    }
}
