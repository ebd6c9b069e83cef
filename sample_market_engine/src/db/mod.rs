//! # Database management and control.
//!
//! This module defines the interface contracts that persistence *backends* must satisfy, and ships the SQLite
//! backend.
//!
//! All the financial invariants of the marketplace are pushed down into these contracts rather than into application
//! level locks:
//!
//! * [`PaymentManagement::settle_payment`] moves a payment out of `pending` and credits its owner in one atomic unit,
//!   guarded by the payment's current status. A payment can therefore never be credited twice.
//! * [`PurchaseManagement::insert_purchase_and_debit`] records a purchase and debits the buyer in one atomic unit,
//!   guarded by a uniqueness constraint on `(user, sample)` and by the balance itself.
//! * [`BalanceManagement::adjust_balance`] is an arithmetic update in the database, never a read followed by a write.
//!
//! [`PaymentManagement::settle_payment`]: traits::PaymentManagement::settle_payment
//! [`PurchaseManagement::insert_purchase_and_debit`]: traits::PurchaseManagement::insert_purchase_and_debit
//! [`BalanceManagement::adjust_balance`]: traits::BalanceManagement::adjust_balance
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;
