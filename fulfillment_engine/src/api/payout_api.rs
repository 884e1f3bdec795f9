use std::fmt::Debug;

use log::*;

use crate::{
    api::{require_role, wallet_objects::WalletSnapshot},
    db_types::{Actor, PayoutRequest, PayoutStatus, Role},
    events::{EventProducers, PayoutStatusChangedEvent},
    traits::{FulfillmentError, PayoutQueryFilter, WalletManagement},
};

/// The admin side of payouts.
///
/// ```text
/// pending ─► processing ─► completed
///    │            └──────► failed     (amount credited back)
///    └─► cancelled
/// ```
///
/// Approval debits the available balance and counts the amount as paid out in the same transaction. No other
/// transition except `failed` touches the balances.
pub struct PayoutApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for PayoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PayoutApi")
    }
}

impl<B> PayoutApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> PayoutApi<B>
where B: WalletManagement
{
    pub async fn approve(&self, actor: &Actor, payout_id: i64) -> Result<(PayoutRequest, WalletSnapshot), FulfillmentError> {
        require_role(actor, &[Role::Admin])?;
        let (payout, wallet) = self.db.approve_payout(payout_id, actor.id).await.map_err(|e| {
            if let FulfillmentError::InsufficientBalance { requested, available } = &e {
                warn!("💸️ Payout {payout_id} of {requested} cannot be approved. Only {available} is available");
            }
            e
        })?;
        info!("💸️ Payout {payout_id} of {} approved by admin {}", payout.amount, actor.id);
        self.notify(&payout, PayoutStatus::Pending).await;
        Ok((payout, wallet.into()))
    }

    /// Declines a pending request. `notes` explain the decision to the vendor and are required.
    pub async fn reject(&self, actor: &Actor, payout_id: i64, notes: &str) -> Result<PayoutRequest, FulfillmentError> {
        require_role(actor, &[Role::Admin])?;
        let notes = notes.trim();
        if notes.is_empty() {
            return Err(FulfillmentError::Validation("A note is required when rejecting a payout".into()));
        }
        let payout = self.db.cancel_payout(payout_id, Some(actor.id), Some(notes.to_string())).await?;
        info!("💸️ Payout {payout_id} rejected by admin {}. {notes}", actor.id);
        self.notify(&payout, PayoutStatus::Pending).await;
        Ok(payout)
    }

    /// Records that the transfer for an approved payout went through.
    pub async fn complete(
        &self,
        actor: &Actor,
        payout_id: i64,
        notes: Option<String>,
    ) -> Result<PayoutRequest, FulfillmentError> {
        require_role(actor, &[Role::Admin])?;
        let payout = self.db.complete_payout(payout_id, notes).await?;
        info!("💸️ Payout {payout_id} of {} completed", payout.amount);
        self.notify(&payout, PayoutStatus::Processing).await;
        Ok(payout)
    }

    /// Records that the transfer for an approved payout failed, returning the amount to the vendor's available
    /// balance.
    pub async fn fail(
        &self,
        actor: &Actor,
        payout_id: i64,
        notes: Option<String>,
    ) -> Result<(PayoutRequest, WalletSnapshot), FulfillmentError> {
        require_role(actor, &[Role::Admin])?;
        let (payout, wallet) = self.db.fail_payout(payout_id, notes).await?;
        warn!("💸️ Payout {payout_id} of {} to vendor {} failed", payout.amount, payout.vendor_id);
        self.notify(&payout, PayoutStatus::Processing).await;
        Ok((payout, wallet.into()))
    }

    pub async fn search(&self, actor: &Actor, filter: PayoutQueryFilter) -> Result<Vec<PayoutRequest>, FulfillmentError> {
        require_role(actor, &[Role::Admin])?;
        self.db.search_payouts(filter).await
    }

    async fn notify(&self, payout: &PayoutRequest, old_status: PayoutStatus) {
        self.producers.publish_payout_status_changed(PayoutStatusChangedEvent::new(payout.clone(), old_status)).await;
    }
}
