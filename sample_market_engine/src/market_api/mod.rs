//! # Marketplace engine public API
//!
//! * [`payment_flow_api`] opens payments at the payment gateway and reconciles their status back into the database,
//!   crediting tokens to the payer when a payment succeeds.
//! * [`purchase_api`] spends tokens on samples and answers entitlement questions.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend that implements the backend traits the API requires,
//! along with the external collaborators it talks to.
//!
//! ```rust,ignore
//! use sample_market_engine::{PaymentFlowApi, PaymentFlowConfig, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/market.db", 5).await?;
//! let api = PaymentFlowApi::new(db, my_gateway, PaymentFlowConfig::default());
//! let confirmation_url = api.create_payment("https://example.com/return", &user_id, MinorUnits::from(10_000)).await?;
//! ```
pub mod errors;
pub mod payment_flow_api;
pub mod purchase_api;
