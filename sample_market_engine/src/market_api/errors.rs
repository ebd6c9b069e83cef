use thiserror::Error;

use crate::{
    db_types::{MinorUnits, PaymentId, SampleId, Tokens},
    traits::{GatewayError, StorageError},
};

#[derive(Debug, Clone, Error)]
pub enum PaymentFlowError {
    #[error("Payment amounts must be positive, but {0} was requested")]
    InvalidAmount(MinorUnits),
    #[error("{0} is too large to be converted into tokens")]
    AmountTooLarge(MinorUnits),
    #[error("Payment gateway error: {0}")]
    GatewayError(#[from] GatewayError),
    #[error("Database error: {0}")]
    PersistenceError(String),
    #[error("Payment not found: {0}")]
    NotFound(PaymentId),
}

#[derive(Debug, Clone, Error)]
pub enum PurchaseFlowError {
    #[error("{0} does not exist")]
    NotFound(String),
    #[error("The sample has already been purchased")]
    AlreadyPurchased,
    #[error("Sample {0} is free. It does not need to be purchased")]
    SampleIsFree(SampleId),
    #[error("Insufficient tokens. The balance is {balance}, but the price is {price}")]
    InsufficientTokens { balance: Tokens, price: Tokens },
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    #[error("Database error: {0}")]
    PersistenceError(String),
}
