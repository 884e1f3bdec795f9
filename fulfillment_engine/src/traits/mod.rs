//! # Backend contracts
//!
//! The traits in this module define what a storage backend must provide to drive the fulfillment engine. The public
//! API structs in [`crate::api`] are generic over these traits, and never talk to a database directly.
//!
//! Every state change a backend performs is a conditional write. A backend must never read a status, decide in
//! memory, and then write unconditionally; the status it expects has to be part of the write itself so that two
//! concurrent callers cannot both succeed.
//!
//! * [`CatalogManagement`] sectors, slots, products and per-vendor confirmation settings.
//! * [`SlotManagement`] slot capacity: listing, reserving and releasing.
//! * [`OrderManagement`] order creation, item transitions, cancellation and OTP verification.
//! * [`AssignmentManagement`] delivery partner assignments, pickup stops and the daily sector roster.
//! * [`WalletManagement`] vendor wallet balances and payout requests.
//! * [`FulfillmentDatabase`] ties them together.
mod assignment_management;
mod catalog_management;
mod data_objects;
mod fulfillment_database;
mod order_management;
mod slot_management;
mod wallet_management;

pub use assignment_management::AssignmentManagement;
pub use catalog_management::CatalogManagement;
pub use data_objects::{CancelOutcome, ItemUpdated, ItemsUpdated, PayoutQueryFilter, PendingConfirmation};
pub use fulfillment_database::{FulfillmentDatabase, FulfillmentError};
pub use order_management::OrderManagement;
pub use slot_management::SlotManagement;
pub use wallet_management::WalletManagement;
