//! # External collaborators
//!
//! The marketplace engine does not talk to the outside world directly. It relies on two collaborators, whose
//! contracts are defined here:
//!
//! * [`PaymentGateway`] creates payment intents and reports the authoritative status of a payment.
//! * [`StorageUrlResolver`] turns the storage key of a sample into a URL the buyer can fetch the audio from.
//!
//! Concrete adapters (e.g. an HTTP client for a specific payment provider) live with the server.
mod payment_gateway;
mod storage;

pub use payment_gateway::{GatewayError, GatewayPaymentStatus, PaymentGateway, PaymentIntent, PaymentIntentRequest};
pub use storage::{StorageError, StorageUrlResolver};
