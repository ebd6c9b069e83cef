//! # Sample Market server
//! This crate hosts the server for the sample marketplace. It is responsible for:
//! * Wiring the marketplace engine to its real collaborators: the YooKassa payment gateway and a public object storage
//!   bucket.
//! * Running the payment reconciliation worker, which settles pending payments as the gateway decides on them.
//! * Serving HTTP.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
pub mod cli;
pub mod config;
pub mod errors;
pub mod integrations;
pub mod reconciliation_worker;
pub mod routes;
pub mod server;
