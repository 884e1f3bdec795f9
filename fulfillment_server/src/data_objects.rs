use chrono::NaiveDate;
use fulfillment_engine::db_types::{CancellationReason, PayoutStatus};
use serde::{Deserialize, Serialize};

/// Response to a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: i64,
    pub order_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectItemParams {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelItemParams {
    pub reason: CancellationReason,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignDeliveryParams {
    pub delivery_partner_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpParams {
    pub otp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorNotesParams {
    pub notes: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayoutDecisionParams {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayoutSearchParams {
    #[serde(default)]
    pub vendor_id: Option<i64>,
    #[serde(default)]
    pub status: Option<PayoutStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorAssignmentParams {
    pub delivery_partner_id: i64,
    pub date: NaiveDate,
}
