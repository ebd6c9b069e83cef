//! Behaviour that database backends need to expose in order to be supported by the marketplace engine.
//!
//! * [`PaymentManagement`] stores payments and applies gateway-confirmed status transitions.
//! * [`BalanceManagement`] reads user accounts and applies atomic balance adjustments.
//! * [`PurchaseManagement`] stores purchases and executes the purchase-and-debit transaction.
//! * [`CatalogManagement`] looks up samples.
mod balance_management;
mod catalog_management;
mod data_objects;
mod payment_management;
mod purchase_management;

pub use balance_management::BalanceManagement;
pub use catalog_management::CatalogManagement;
pub use data_objects::{InsertPaymentResult, InsertPurchaseResult, SettlePaymentResult};
pub use payment_management::PaymentManagement;
pub use purchase_management::PurchaseManagement;
