use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{MinorUnits, PaymentId, PaymentStatus, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Could not reach the payment gateway: {0}")]
    RequestFailed(String),
    #[error("The payment gateway rejected the request with code {code}. {description}")]
    Rejected { code: u16, description: String },
    #[error("The payment gateway sent a response we could not understand: {0}")]
    UnexpectedResponse(String),
    #[error("The payment gateway does not know payment {0}")]
    PaymentNotFound(PaymentId),
}

/// Everything the gateway needs to open a redirect-confirmed payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentRequest {
    pub amount: MinorUnits,
    /// ISO-4217 currency code
    pub currency: String,
    pub description: String,
    /// Where the gateway sends the customer after they confirm (or abandon) the payment
    pub return_url: String,
    /// The merchant-side customer reference. This is the id of the paying user.
    pub customer_ref: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// The gateway-issued payment id. All later status queries are keyed on it.
    pub id: PaymentId,
    /// The URL the customer must visit to confirm the payment
    pub confirmation_url: String,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPaymentStatus {
    pub id: PaymentId,
    pub status: PaymentStatus,
    pub captured_at: Option<DateTime<Utc>>,
}

/// A remote payment processor. The gateway holds the authoritative status of every payment; the engine only mirrors
/// it.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a new payment intent at the gateway. The returned id must be persisted as is.
    async fn create_payment_intent(&self, request: PaymentIntentRequest) -> Result<PaymentIntent, GatewayError>;

    /// Fetches the current status of a payment. Calling this has no side effects.
    async fn fetch_payment_status(&self, id: &PaymentId) -> Result<GatewayPaymentStatus, GatewayError>;
}
