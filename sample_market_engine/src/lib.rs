//! Sample Market Engine
//!
//! The engine holds the financial core of the sample marketplace: users top up a token balance by paying through an
//! external payment gateway, and spend those tokens on audio samples. This library is provider-agnostic.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@db`]). SQLite is the supported backend. The backend traits push every
//!    balance change into a single atomic database operation, so that correctness never depends on in-process locks.
//!    The data types used in the database are defined in the [`db_types`] module and are public.
//! 2. The external collaborators ([`traits`]): the payment gateway and the object storage that hosts the audio.
//! 3. The public API ([`PaymentFlowApi`] and [`PurchaseApi`]).
pub mod db;

pub mod db_types;
mod market_api;
pub mod traits;

#[cfg(all(feature = "sqlite", feature = "test_utils"))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{
    BalanceManagement,
    CatalogManagement,
    InsertPaymentResult,
    InsertPurchaseResult,
    PaymentManagement,
    PurchaseManagement,
    SettlePaymentResult,
};
pub use market_api::{
    errors::{PaymentFlowError, PurchaseFlowError},
    payment_flow_api::{PaymentFlowApi, PaymentFlowConfig, ReconcileOutcome, DEFAULT_TOKENS_PER_MAJOR_UNIT},
    purchase_api::PurchaseApi,
};
