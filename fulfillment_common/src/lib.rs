//! Types shared by every crate in the fulfillment workspace.
//!
//! * [`Paise`] is the single monetary type used by the ledger. All amounts are integral paise (1/100 rupee).
//! * [`Secret`] hides configuration secrets from `Debug` and `Display` output.
//! * [`helpers`] holds small parsing and formatting utilities used by configuration and serialization code.
mod money;

pub mod helpers;
pub mod op;
mod secret;

pub use money::{Paise, PaiseParseError, CURRENCY_CODE, CURRENCY_SYMBOL};
pub use secret::Secret;
