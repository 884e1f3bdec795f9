use fulfillment_common::Paise;
use thiserror::Error;

use crate::traits::{AssignmentManagement, CatalogManagement, OrderManagement, SlotManagement, WalletManagement};

/// The highest level of behaviour for backends supporting the fulfillment engine.
#[allow(async_fn_in_trait)]
pub trait FulfillmentDatabase:
    Clone + CatalogManagement + SlotManagement + OrderManagement + AssignmentManagement + WalletManagement
{
    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), FulfillmentError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FulfillmentError {
    #[error("Invalid request. {0}")]
    Validation(String),
    #[error("Not authorized. {0}")]
    NotAuthorized(String),
    #[error("{0} does not exist")]
    NotFound(String),
    /// The record was changed by someone else, or the requested change has already been made.
    #[error("Conflict. {0}")]
    Conflict(String),
    #[error("Illegal status change. {0}")]
    InvalidTransition(String),
    #[error("Delivery slot {0} has no remaining capacity")]
    CapacityExceeded(i64),
    #[error("The delivery slot cannot be booked. {0}")]
    SlotUnavailable(String),
    #[error("Product {product_id} does not have {requested} units in stock")]
    OutOfStock { product_id: i64, requested: i64 },
    #[error("The verification code is not valid")]
    InvalidOtp,
    #[error("Insufficient balance. Requested {requested}, but only {available} is available")]
    InsufficientBalance { requested: Paise, available: Paise },
    #[error("Database error. {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for FulfillmentError {
    fn from(e: sqlx::Error) -> Self {
        FulfillmentError::DatabaseError(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for FulfillmentError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        FulfillmentError::DatabaseError(format!("Migration failed. {e}"))
    }
}
