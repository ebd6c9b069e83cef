use thiserror::Error;

use crate::db_types::{PaymentId, PaymentStatus, Tokens, UserId};

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("User account not found: {0}")]
    AccountNotFound(UserId),
    #[error("Balance of account {user_id} is {balance}, which cannot cover a debit of {debit}")]
    InsufficientBalance { user_id: UserId, balance: Tokens, debit: Tokens },
    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),
    #[error("A payment cannot be settled with status '{0}'")]
    InvalidSettlementStatus(PaymentStatus),
}
