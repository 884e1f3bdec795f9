use chrono::{DateTime, Utc};
use fulfillment_common::{helpers::mask_tail, Paise};
use serde::{Deserialize, Serialize};

use crate::db_types::{PayoutMethod, VendorWallet};

/// The read model of a vendor wallet. Account details only ever appear masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub vendor_id: i64,
    pub available_balance: Paise,
    pub pending_balance: Paise,
    pub total_earned: Paise,
    pub total_paid_out: Paise,
    pub minimum_payout_amount: Paise,
    pub payout_method: Option<PayoutMethod>,
    /// `****1234` for bank transfers, the UPI id for UPI.
    pub payout_destination: Option<String>,
    pub last_updated_balance_at: Option<DateTime<Utc>>,
}

impl From<VendorWallet> for WalletSnapshot {
    fn from(wallet: VendorWallet) -> Self {
        let payout_destination = match wallet.payout_method {
            Some(PayoutMethod::BankTransfer) => wallet.bank_account_number.as_deref().map(mask_tail),
            Some(PayoutMethod::Upi) => wallet.upi_id.clone(),
            None => None,
        };
        Self {
            vendor_id: wallet.vendor_id,
            available_balance: wallet.available_balance,
            pending_balance: wallet.pending_balance,
            total_earned: wallet.total_earned,
            total_paid_out: wallet.total_paid_out,
            minimum_payout_amount: wallet.minimum_payout_amount,
            payout_method: wallet.payout_method,
            payout_destination,
            last_updated_balance_at: wallet.last_updated_balance_at,
        }
    }
}

impl WalletSnapshot {
    pub fn is_balanced(&self) -> bool {
        self.total_earned == self.total_paid_out + self.pending_balance + self.available_balance
    }
}

/// A vendor's request to withdraw part of their available balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutApplication {
    pub amount: Paise,
    /// Falls back to the method saved in the wallet.
    #[serde(default)]
    pub method: Option<PayoutMethod>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PayoutApplication {
    pub fn new(amount: Paise) -> Self {
        Self { amount, method: None, notes: None }
    }

    pub fn with_method(mut self, method: PayoutMethod) -> Self {
        self.method = Some(method);
        self
    }
}
