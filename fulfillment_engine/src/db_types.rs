use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use fulfillment_common::{helpers::serialize_masked, Paise};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(pub String);

/// Generates the `as_str`, `Display` and `FromStr` boilerplate for enums that are stored as snake_case TEXT.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    s => Err(ConversionError(format!("{s} is not a valid {}", stringify!($name)))),
                }
            }
        }
    };
}

//--------------------------------------        Role           ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Vendor,
    DeliveryPartner,
    Admin,
}

text_enum!(Role {
    Customer => "customer",
    Vendor => "vendor",
    DeliveryPartner => "delivery_partner",
    Admin => "admin",
});

//--------------------------------------        Actor          ---------------------------------------------------------
/// The authenticated caller of an operation. Identities are resolved before the engine is invoked; the engine only
/// checks that the role and id are allowed to act on the records involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    pub fn customer(id: i64) -> Self {
        Self::new(id, Role::Customer)
    }

    pub fn vendor(id: i64) -> Self {
        Self::new(id, Role::Vendor)
    }

    pub fn delivery_partner(id: i64) -> Self {
        Self::new(id, Role::DeliveryPartner)
    }

    pub fn admin(id: i64) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.role, self.id)
    }
}

//--------------------------------------  FulfillmentStatus    ---------------------------------------------------------
/// The status of a single order item. The order-level status is a projection over the statuses of its items and
/// uses the same set of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    Pending,
    Confirmed,
    Processing,
    Packed,
    AssignedToDelivery,
    PickedUp,
    OutForDelivery,
    Delivered,
    Cancelled,
}

text_enum!(FulfillmentStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Processing => "processing",
    Packed => "packed",
    AssignedToDelivery => "assigned_to_delivery",
    PickedUp => "picked_up",
    OutForDelivery => "out_for_delivery",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

//-------------------------------------- CancellationReason    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    // Customer reasons
    ChangedMind,
    BetterPrice,
    OrderedByMistake,
    DeliveryTooSlow,
    WrongItems,
    AddressChange,
    Financial,
    QualityConcern,
    // Delivery partner reasons
    CustomerUnavailable,
    IncorrectAddress,
    DamagedProduct,
    CustomerRefused,
    PaymentIssue,
    DeliveryIssue,
    Weather,
    VehicleBreakdown,
    // Shared
    Other,
    /// Recorded when a vendor rejects a pending item. Not selectable through the cancellation flow.
    VendorRejected,
}

text_enum!(CancellationReason {
    ChangedMind => "changed_mind",
    BetterPrice => "better_price",
    OrderedByMistake => "ordered_by_mistake",
    DeliveryTooSlow => "delivery_too_slow",
    WrongItems => "wrong_items",
    AddressChange => "address_change",
    Financial => "financial",
    QualityConcern => "quality_concern",
    CustomerUnavailable => "customer_unavailable",
    IncorrectAddress => "incorrect_address",
    DamagedProduct => "damaged_product",
    CustomerRefused => "customer_refused",
    PaymentIssue => "payment_issue",
    DeliveryIssue => "delivery_issue",
    Weather => "weather",
    VehicleBreakdown => "vehicle_breakdown",
    Other => "other",
    VendorRejected => "vendor_rejected",
});

impl CancellationReason {
    pub fn is_customer_reason(&self) -> bool {
        use CancellationReason::*;
        matches!(
            self,
            ChangedMind
                | BetterPrice
                | OrderedByMistake
                | DeliveryTooSlow
                | WrongItems
                | AddressChange
                | Financial
                | QualityConcern
                | Other
        )
    }

    pub fn is_delivery_reason(&self) -> bool {
        use CancellationReason::*;
        matches!(
            self,
            CustomerUnavailable
                | IncorrectAddress
                | DamagedProduct
                | CustomerRefused
                | PaymentIssue
                | DeliveryIssue
                | Weather
                | VehicleBreakdown
                | Other
        )
    }

    /// Whether an actor with the given role may cite this reason when cancelling an item.
    pub fn allowed_for(&self, role: Role) -> bool {
        match role {
            Role::Customer => self.is_customer_reason(),
            Role::DeliveryPartner => self.is_delivery_reason(),
            Role::Admin => *self != CancellationReason::VendorRejected,
            Role::Vendor => false,
        }
    }

    pub fn requires_details(&self) -> bool {
        matches!(self, CancellationReason::Other)
    }
}

//--------------------------------------   AssignmentStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Assigned,
    PickedUp,
    Delivered,
    Cancelled,
}

text_enum!(AssignmentStatus {
    Assigned => "assigned",
    PickedUp => "picked_up",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

//--------------------------------------     PickupStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PickupStatus {
    Pending,
    PickedUp,
    Cancelled,
}

text_enum!(PickupStatus {
    Pending => "pending",
    PickedUp => "picked_up",
    Cancelled => "cancelled",
});

//--------------------------------------     PayoutStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    /// Requested by the vendor and waiting for an admin decision. No funds have moved.
    Pending,
    /// Approved. The amount has been debited from the available balance.
    Processing,
    Completed,
    /// The transfer failed after approval. The amount has been credited back.
    Failed,
    /// Rejected by an admin, or withdrawn by the vendor, before approval.
    Cancelled,
}

text_enum!(PayoutStatus {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
});

impl PayoutStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, PayoutStatus::Completed | PayoutStatus::Failed | PayoutStatus::Cancelled)
    }
}

//--------------------------------------     PayoutMethod      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayoutMethod {
    BankTransfer,
    Upi,
}

text_enum!(PayoutMethod {
    BankTransfer => "bank_transfer",
    Upi => "upi",
});

//--------------------------------------       Sector          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Sector {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSector {
    pub name: String,
    pub postal_codes: Vec<String>,
}

//--------------------------------------    DeliverySlot       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DeliverySlot {
    pub id: i64,
    pub sector_id: i64,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Orders for this slot must be placed before this time on `slot_date`.
    pub cutoff_time: NaiveTime,
    pub max_orders: i64,
    pub available_orders: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl DeliverySlot {
    pub fn is_full(&self) -> bool {
        self.available_orders <= 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeliverySlot {
    pub sector_id: i64,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub cutoff_time: NaiveTime,
    pub max_orders: i64,
}

//--------------------------------------  SectorAssignment     ---------------------------------------------------------
/// The daily roster entry that makes a delivery partner responsible for a sector on a given date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SectorAssignment {
    pub id: i64,
    pub sector_id: i64,
    pub delivery_partner_id: i64,
    pub assignment_date: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       Product         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub vendor_id: i64,
    pub name: String,
    pub unit_price: Paise,
    pub stock_quantity: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub vendor_id: i64,
    pub name: String,
    pub unit_price: Paise,
    pub stock_quantity: i64,
}

//--------------------------------------   VendorSettings      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct VendorSettings {
    pub vendor_id: i64,
    /// Confirm every pending item automatically once the confirmation window lapses.
    pub auto_approve_orders: bool,
    /// Confirm automatically when the order total is strictly below this amount.
    pub auto_approve_under_amount: Option<Paise>,
    pub confirmation_timeout_minutes: i64,
}

impl VendorSettings {
    pub fn defaults_for(vendor_id: i64, confirmation_timeout_minutes: i64) -> Self {
        Self { vendor_id, auto_approve_orders: false, auto_approve_under_amount: None, confirmation_timeout_minutes }
    }

    pub fn should_auto_confirm(&self, order_total: Paise) -> bool {
        self.auto_approve_orders || self.auto_approve_under_amount.map(|limit| order_total < limit).unwrap_or(false)
    }
}

//--------------------------------------   AddressSnapshot     ---------------------------------------------------------
/// A copy of the delivery address taken when the order is placed. Later edits to the customer's address book do not
/// affect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub recipient_name: String,
    pub phone: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
    pub city: String,
    pub postal_code: String,
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub customer_id: i64,
    #[sqlx(json)]
    pub address: AddressSnapshot,
    pub slot_id: i64,
    pub subtotal: Paise,
    pub delivery_fee: Paise,
    pub total_amount: Paise,
    pub order_status: FulfillmentStatus,
    pub delivery_partner_id: Option<i64>,
    pub cancellation_reason: Option<CancellationReason>,
    pub cancellation_details: Option<String>,
    pub cancelled_by: Option<Role>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub out_for_delivery_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

//--------------------------------------      OrderItem        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub vendor_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Paise,
    pub line_total: Paise,
    pub item_status: FulfillmentStatus,
    /// Cleared once the pickup has been verified.
    pub pickup_otp: Option<String>,
    /// Cleared once the delivery has been verified.
    pub delivery_otp: Option<String>,
    pub vendor_notes: Option<String>,
    pub is_urgent: bool,
    pub auto_confirmed: bool,
    pub cancellation_reason: Option<CancellationReason>,
    pub cancellation_details: Option<String>,
    pub cancelled_by: Option<Role>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub packed_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub escalated_at: Option<DateTime<Utc>>,
}

impl OrderItem {
    pub fn is_terminal(&self) -> bool {
        self.item_status.is_terminal()
    }

    /// Clears the codes `actor` must not learn from this item.
    ///
    /// The customer holds the delivery code and the vendor holds the pickup code. A delivery partner is shown
    /// neither, since they must obtain both in person.
    pub fn redact_for(&mut self, actor: &Actor) {
        match actor.role {
            Role::Admin => {},
            Role::Customer => self.pickup_otp = None,
            Role::Vendor => self.delivery_otp = None,
            Role::DeliveryPartner => {
                self.pickup_otp = None;
                self.delivery_otp = None;
            },
        }
    }
}

//--------------------------------------      NewOrder         ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: i64,
    pub slot_id: i64,
    pub address: AddressSnapshot,
    pub items: Vec<NewOrderItem>,
    #[serde(default)]
    pub delivery_fee: Paise,
}

//--------------------------------------      Cancellation     ---------------------------------------------------------
/// The who and why of an item cancellation, as recorded on the item (and on the order when every item is cancelled).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub reason: CancellationReason,
    pub details: Option<String>,
    pub cancelled_by: Role,
}

//-------------------------------------- DeliveryPartnerOrder  ---------------------------------------------------------
/// Links an order to the delivery partner responsible for it. At most one non-cancelled record exists per order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DeliveryPartnerOrder {
    pub id: i64,
    pub order_id: i64,
    pub delivery_partner_id: i64,
    pub status: AssignmentStatus,
    pub assigned_at: DateTime<Utc>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

//--------------------------------------     OrderPickup       ---------------------------------------------------------
/// One pickup stop per (order, vendor, delivery partner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrderPickup {
    pub id: i64,
    pub order_id: i64,
    pub vendor_id: i64,
    pub delivery_partner_id: i64,
    pub pickup_status: PickupStatus,
    pub created_at: DateTime<Utc>,
    pub picked_up_at: Option<DateTime<Utc>>,
}

//--------------------------------------     VendorWallet      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct VendorWallet {
    pub vendor_id: i64,
    pub available_balance: Paise,
    pub pending_balance: Paise,
    pub total_earned: Paise,
    pub total_paid_out: Paise,
    pub payout_method: Option<PayoutMethod>,
    pub minimum_payout_amount: Paise,
    pub bank_account_holder: Option<String>,
    #[serde(serialize_with = "serialize_masked")]
    pub bank_account_number: Option<String>,
    pub bank_ifsc: Option<String>,
    pub upi_id: Option<String>,
    pub last_updated_balance_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl VendorWallet {
    /// `total_earned == total_paid_out + pending_balance + available_balance`
    pub fn is_balanced(&self) -> bool {
        self.total_earned == self.total_paid_out + self.pending_balance + self.available_balance
    }

    /// True if the balances have not been recomputed within `max_age` of `now`.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        match self.last_updated_balance_at {
            Some(t) => now - t > max_age,
            None => true,
        }
    }
}

/// Payout preferences a vendor can edit. Balances are never written through this struct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutSettings {
    pub payout_method: Option<PayoutMethod>,
    pub minimum_payout_amount: Option<Paise>,
    pub bank_account_holder: Option<String>,
    pub bank_account_number: Option<String>,
    pub bank_ifsc: Option<String>,
    pub upi_id: Option<String>,
}

//--------------------------------------    PayoutRequest      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PayoutRequest {
    pub id: i64,
    pub vendor_id: i64,
    pub amount: Paise,
    pub payout_method: PayoutMethod,
    pub payout_status: PayoutStatus,
    /// The vendor's available balance when the request was made.
    pub available_balance_at_request: Paise,
    pub notes: Option<String>,
    pub approved_by: Option<i64>,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayoutRequest {
    pub vendor_id: i64,
    pub amount: Paise,
    pub payout_method: PayoutMethod,
    pub available_balance_at_request: Paise,
    pub notes: Option<String>,
}
