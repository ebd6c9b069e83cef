use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    db::traits::{InsertPaymentResult, SettlePaymentResult},
    db_types::{NewPayment, Payment, PaymentId, PaymentStatus, Tokens, UserId},
};

/// The `PaymentManagement` trait defines the behaviour for storing gateway payments and applying their status
/// transitions.
///
/// Payments are keyed on the id the payment gateway assigned to them.
#[async_trait]
pub trait PaymentManagement: Send + Sync {
    type Error: std::error::Error + Send;

    /// Stores a brand-new payment with `pending` status.
    ///
    /// If a payment with the same id already exists, nothing is changed and `AlreadyExists` is returned.
    async fn insert_payment(&self, payment: NewPayment) -> Result<InsertPaymentResult, Self::Error>;

    async fn fetch_payment(&self, id: &PaymentId) -> Result<Option<Payment>, Self::Error>;

    /// Fetches every payment that currently has the given status, oldest first.
    async fn fetch_payments_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>, Self::Error>;

    async fn fetch_payments_for_user(&self, user_id: &UserId) -> Result<Vec<Payment>, Self::Error>;

    /// Moves a payment from `pending` to the terminal `status`, and in the same atomic transaction
    /// * sets `captured_at`,
    /// * adds `credit` to the balance of the payment's owner (if `credit` is non-zero).
    ///
    /// The status update only applies if the payment is still `pending` at write time. If it is not, nothing is
    /// changed and `AlreadySettled` is returned. This is what guarantees that a payment credits its owner at most once,
    /// no matter how many reconciliations race for it.
    ///
    /// Passing `Pending` as the new status, or an unknown payment id, is an error.
    async fn settle_payment(
        &self,
        id: &PaymentId,
        status: PaymentStatus,
        credit: Tokens,
        captured_at: DateTime<Utc>,
    ) -> Result<SettlePaymentResult, Self::Error>;
}
