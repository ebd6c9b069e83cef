//! Adapters for the services the marketplace depends on.
//!
//! * [`yookassa`] is a [`PaymentGateway`](sample_market_engine::traits::PaymentGateway) over the YooKassa REST API.
//! * [`object_storage`] resolves sample URLs in a publicly readable S3-compatible bucket.
pub mod object_storage;
pub mod yookassa;
