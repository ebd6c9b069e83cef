use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::*;
use reqwest::{header::HeaderValue, Client, RequestBuilder, StatusCode};
use sample_market_engine::{
    db_types::{PaymentId, PaymentStatus},
    traits::{GatewayError, GatewayPaymentStatus, PaymentGateway, PaymentIntent, PaymentIntentRequest},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::GatewayConfig;

const IDEMPOTENCE_KEY_HEADER: &str = "Idempotence-Key";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    /// Decimal amount in major units, e.g. "100.00"
    pub value: String,
    pub currency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePaymentRequest {
    pub amount: Amount,
    pub description: String,
    pub test: bool,
    pub confirmation: Confirmation,
    pub merchant_customer_id: String,
    /// Capture immediately once the customer confirms. There is no separate capture step.
    pub capture: bool,
    pub metadata: HashMap<String, String>,
}

impl CreatePaymentRequest {
    pub fn new(request: PaymentIntentRequest, test: bool) -> Self {
        let customer = request.customer_ref.to_string();
        let metadata = HashMap::from([("user_id".to_string(), customer.clone())]);
        Self {
            amount: Amount { value: request.amount.to_decimal_string(), currency: request.currency },
            description: request.description,
            test,
            confirmation: Confirmation {
                kind: "redirect".to_string(),
                return_url: Some(request.return_url),
                confirmation_url: None,
            },
            merchant_customer_id: customer,
            capture: true,
            metadata,
        }
    }
}

/// The parts of a YooKassa payment object that we care about
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentResponse {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub confirmation: Option<Confirmation>,
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub test: bool,
}

/// YooKassa has two statuses before a decision is reached. Since payments are created with automatic capture,
/// `waiting_for_capture` is only ever transient and is treated as pending.
pub fn parse_payment_status(status: &str) -> Result<PaymentStatus, GatewayError> {
    match status {
        "pending" | "waiting_for_capture" => Ok(PaymentStatus::Pending),
        "succeeded" => Ok(PaymentStatus::Succeeded),
        "canceled" => Ok(PaymentStatus::Canceled),
        s => Err(GatewayError::UnexpectedResponse(format!("Unknown payment status '{s}'"))),
    }
}

impl TryFrom<PaymentResponse> for PaymentIntent {
    type Error = GatewayError;

    fn try_from(value: PaymentResponse) -> Result<Self, Self::Error> {
        let status = parse_payment_status(&value.status)?;
        let confirmation_url = value.confirmation.and_then(|c| c.confirmation_url).ok_or_else(|| {
            GatewayError::UnexpectedResponse(format!("Payment {} has no confirmation URL", value.id))
        })?;
        Ok(PaymentIntent { id: PaymentId::from(value.id), confirmation_url, status })
    }
}

impl TryFrom<PaymentResponse> for GatewayPaymentStatus {
    type Error = GatewayError;

    fn try_from(value: PaymentResponse) -> Result<Self, Self::Error> {
        let status = parse_payment_status(&value.status)?;
        Ok(GatewayPaymentStatus { id: PaymentId::from(value.id), status, captured_at: value.captured_at })
    }
}

#[derive(Clone)]
pub struct YooKassaClient {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl std::fmt::Debug for YooKassaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "YooKassaClient ({}, account {})", self.config.url, self.config.account_id)
    }
}

impl YooKassaClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .user_agent(concat!("sample_market_server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v3{path}", self.config.url.trim_end_matches('/'))
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.basic_auth(&self.config.account_id, Some(self.config.secret_key.reveal()))
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, GatewayError> {
        let response = req.send().await.map_err(|e| GatewayError::RequestFailed(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            trace!("💳️ Gateway request successful. {status}");
            response.json::<T>().await.map_err(|e| GatewayError::UnexpectedResponse(e.to_string()))
        } else {
            let description = response.text().await.map_err(|e| GatewayError::RequestFailed(e.to_string()))?;
            Err(GatewayError::Rejected { code: status.as_u16(), description })
        }
    }
}

#[async_trait]
impl PaymentGateway for YooKassaClient {
    async fn create_payment_intent(&self, request: PaymentIntentRequest) -> Result<PaymentIntent, GatewayError> {
        let body = CreatePaymentRequest::new(request, self.config.test_mode);
        let key = uuid::Uuid::new_v4().to_string();
        let key = HeaderValue::from_str(&key).map_err(|e| GatewayError::RequestFailed(e.to_string()))?;
        debug!("💳️ Creating a payment of {} {} at the gateway", body.amount.value, body.amount.currency);
        let req = self.authorized(self.client.post(self.url("/payments"))).header(IDEMPOTENCE_KEY_HEADER, key).json(&body);
        let response = self.send::<PaymentResponse>(req).await?;
        PaymentIntent::try_from(response)
    }

    async fn fetch_payment_status(&self, id: &PaymentId) -> Result<GatewayPaymentStatus, GatewayError> {
        let req = self.authorized(self.client.get(self.url(&format!("/payments/{id}"))));
        match self.send::<PaymentResponse>(req).await {
            Ok(response) => GatewayPaymentStatus::try_from(response),
            Err(GatewayError::Rejected { code, .. }) if code == StatusCode::NOT_FOUND.as_u16() => {
                Err(GatewayError::PaymentNotFound(id.clone()))
            },
            Err(e) => Err(e),
        }
    }
}
