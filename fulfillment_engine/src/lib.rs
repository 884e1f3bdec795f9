//! Fulfillment Engine
//!
//! The fulfillment engine coordinates multi-vendor orders from checkout to the customer's door, and keeps the wallet
//! ledger that vendors are paid out from. It is transport-agnostic: the HTTP server and the operator tools are thin
//! layers over the APIs exported here.
//!
//! The library is divided into these sections:
//! 1. Domain types ([`mod@db_types`]) and the item state machine ([`mod@lifecycle`]).
//! 2. Backend contracts ([`mod@traits`]). Storage backends implement these traits. [`SqliteDatabase`] is the
//!    provided implementation. You should never need to talk to the database directly.
//! 3. The public API ([`mod@api`]): slot booking, the order flow, delivery assignment, OTP verification, wallets
//!    and payouts.
//!
//! The engine also emits events when orders are placed, items change status, deliveries are assigned and payouts
//! move. Hook into them with [`events::EventHooks`] to send notifications; a failing hook never affects the
//! transition that triggered it.
pub mod api;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod lifecycle;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{
    assignment_api::AssignmentApi,
    assignment_objects,
    catalog_api::CatalogApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    payout_api::PayoutApi,
    slot_api::{SlotApi, SlotRules},
    verification_api::DeliveryVerificationApi,
    wallet_api::WalletApi,
    wallet_objects,
    FulfillmentPolicy,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    AssignmentManagement,
    CatalogManagement,
    FulfillmentDatabase,
    FulfillmentError,
    OrderManagement,
    SlotManagement,
    WalletManagement,
};
