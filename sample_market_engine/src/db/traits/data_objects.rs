use crate::db_types::{Payment, PaymentId, Purchase, Tokens};

#[derive(Debug, Clone)]
pub enum InsertPaymentResult {
    Inserted(Payment),
    AlreadyExists(PaymentId),
}

/// The outcome of [`super::PaymentManagement::settle_payment`].
#[derive(Debug, Clone)]
pub enum SettlePaymentResult {
    /// The payment was still pending and has now been moved to its terminal status. `credited` tokens were added to
    /// the owner's balance in the same transaction.
    Settled { payment: Payment, credited: Tokens },
    /// The payment had already left the pending state (e.g. a concurrent reconciliation got there first). Nothing was
    /// changed.
    AlreadySettled(Payment),
}

/// The outcome of [`super::PurchaseManagement::insert_purchase_and_debit`].
#[derive(Debug, Clone)]
pub enum InsertPurchaseResult {
    /// The purchase was recorded and the buyer's balance is now `new_balance`.
    Inserted { purchase: Purchase, new_balance: Tokens },
    /// A purchase for this user and sample already exists. Nothing was changed.
    AlreadyPurchased,
    /// The buyer could not cover the price at the time of the debit. Nothing was changed.
    InsufficientTokens { balance: Tokens },
}
