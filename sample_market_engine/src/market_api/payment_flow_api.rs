use std::fmt::Debug;

use chrono::Utc;
use log::*;
use market_common::DEFAULT_CURRENCY_CODE;

use crate::{
    db::traits::{InsertPaymentResult, PaymentManagement, SettlePaymentResult},
    db_types::{MinorUnits, NewPayment, Payment, PaymentId, PaymentStatus, Tokens, UserId},
    market_api::errors::PaymentFlowError,
    traits::{PaymentGateway, PaymentIntentRequest},
};

pub const DEFAULT_TOKENS_PER_MAJOR_UNIT: i64 = 10;
pub const DEFAULT_PAYMENT_DESCRIPTION: &str = "Token top-up";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentFlowConfig {
    /// How many tokens one whole unit of the payment currency buys
    pub tokens_per_major_unit: i64,
    pub currency: String,
    /// The description attached to every payment intent
    pub description: String,
}

impl Default for PaymentFlowConfig {
    fn default() -> Self {
        Self {
            tokens_per_major_unit: DEFAULT_TOKENS_PER_MAJOR_UNIT,
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            description: DEFAULT_PAYMENT_DESCRIPTION.to_string(),
        }
    }
}

/// The result of reconciling a single payment against the gateway.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// The gateway has not reached a decision yet. Nothing was changed.
    StillPending,
    /// This call moved the payment to its terminal status and credited `credited` tokens to the owner.
    Settled { payment: Payment, credited: Tokens },
    /// The payment had already been settled, by an earlier or a concurrent call. Nothing was changed.
    AlreadySettled(Payment),
}

/// `PaymentFlowApi` handles the token top-up flow: creating payments at the gateway and mirroring their outcome into
/// the local database.
///
/// Balances are only ever credited as part of moving a payment out of the `pending` state, so it is safe to call
/// [`Self::reconcile_payment`] for the same payment any number of times, from any number of tasks or processes.
pub struct PaymentFlowApi<B, G> {
    db: B,
    gateway: G,
    config: PaymentFlowConfig,
}

impl<B, G> Debug for PaymentFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi ({:?})", self.config)
    }
}

impl<B, G> PaymentFlowApi<B, G> {
    pub fn new(db: B, gateway: G, config: PaymentFlowConfig) -> Self {
        Self { db, gateway, config }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn config(&self) -> &PaymentFlowConfig {
        &self.config
    }

    /// The number of tokens a successful payment of `amount` earns, or `None` if that overflows.
    pub fn tokens_for_amount(&self, amount: MinorUnits) -> Option<Tokens> {
        market_common::tokens_for_amount(amount, self.config.tokens_per_major_unit)
    }
}

impl<B, G> PaymentFlowApi<B, G>
where
    B: PaymentManagement,
    G: PaymentGateway,
{
    /// Opens a new payment of `amount` at the gateway on behalf of `user_id`, and records it locally as pending.
    ///
    /// Returns the URL the customer must be redirected to in order to confirm the payment.
    ///
    /// Nothing is written locally if the gateway call fails. If the gateway call succeeds but the local write fails,
    /// the gateway-side intent is orphaned; this is logged as an error, since it needs operator attention.
    pub async fn create_payment(
        &self,
        return_url: &str,
        user_id: &UserId,
        amount: MinorUnits,
    ) -> Result<String, PaymentFlowError> {
        if amount.value() <= 0 {
            return Err(PaymentFlowError::InvalidAmount(amount));
        }
        if self.tokens_for_amount(amount).is_none() {
            return Err(PaymentFlowError::AmountTooLarge(amount));
        }
        let request = PaymentIntentRequest {
            amount,
            currency: self.config.currency.clone(),
            description: self.config.description.clone(),
            return_url: return_url.to_string(),
            customer_ref: user_id.clone(),
        };
        trace!("💳️ Requesting a payment intent of {amount} {} for {user_id}", self.config.currency);
        let intent = self.gateway.create_payment_intent(request).await.map_err(|e| {
            warn!("💳️ Could not create a payment intent for {user_id}: {e}");
            PaymentFlowError::from(e)
        })?;
        let payment = NewPayment::new(intent.id.clone(), user_id.clone(), amount)
            .with_description(self.config.description.as_str());
        match self.db.insert_payment(payment).await {
            Ok(InsertPaymentResult::Inserted(p)) => {
                info!("💳️ Payment {} of {} created for {user_id}", p.id, p.amount);
                Ok(intent.confirmation_url)
            },
            Ok(InsertPaymentResult::AlreadyExists(id)) => {
                error!("💳️ The gateway issued payment id {id}, which we already have on record. Gateway intent is orphaned.");
                Err(PaymentFlowError::PersistenceError(format!("Payment {id} already exists")))
            },
            Err(e) => {
                error!("💳️ Could not save payment {} for {user_id}. Gateway intent is orphaned. {e}", intent.id);
                Err(PaymentFlowError::PersistenceError(format!("Could not save payment {}: {e}", intent.id)))
            },
        }
    }

    /// Brings the local state of `payment` in line with the gateway.
    ///
    /// 1. The gateway is asked for the payment's status. On failure, nothing changes and the error is returned.
    /// 2. If the gateway still reports the payment as pending, nothing changes.
    /// 3. Otherwise the payment is settled with the gateway's status and capture time. A successful payment credits
    ///    [`Self::tokens_for_amount`] tokens to its owner in the same atomic step, and only if the payment was still
    ///    pending at that moment.
    ///
    /// If the database write fails, the payment stays pending and the whole step can be retried.
    pub async fn reconcile_payment(&self, payment: &Payment) -> Result<ReconcileOutcome, PaymentFlowError> {
        let id = &payment.id;
        let remote = self.gateway.fetch_payment_status(id).await.map_err(|e| {
            debug!("💳️ Could not fetch the status of payment {id} from the gateway: {e}");
            PaymentFlowError::from(e)
        })?;
        let credit = match remote.status {
            PaymentStatus::Pending => {
                trace!("💳️ Payment {id} is still pending");
                return Ok(ReconcileOutcome::StillPending);
            },
            PaymentStatus::Succeeded => self.tokens_for_amount(payment.amount).ok_or_else(|| {
                error!("💳️ Payment {id} of {} cannot be converted into tokens. It stays pending.", payment.amount);
                PaymentFlowError::AmountTooLarge(payment.amount)
            })?,
            PaymentStatus::Canceled => Tokens::default(),
        };
        let result = self
            .db
            .settle_payment(id, remote.status, credit, remote.captured_at.unwrap_or_else(Utc::now))
            .await
            .map_err(|e| PaymentFlowError::PersistenceError(format!("Could not settle payment {id}: {e}")))?;
        match result {
            SettlePaymentResult::Settled { payment, credited } => {
                info!("💳️ Payment {id} is {}. {credited} credited to {}", payment.status, payment.user_id);
                Ok(ReconcileOutcome::Settled { payment, credited })
            },
            SettlePaymentResult::AlreadySettled(payment) => {
                debug!("💳️ Payment {id} had already been settled as {}", payment.status);
                Ok(ReconcileOutcome::AlreadySettled(payment))
            },
        }
    }

    /// Looks the payment up by id and reconciles it. See [`Self::reconcile_payment`].
    pub async fn reconcile_payment_by_id(&self, id: &PaymentId) -> Result<ReconcileOutcome, PaymentFlowError> {
        let payment = self
            .db
            .fetch_payment(id)
            .await
            .map_err(|e| PaymentFlowError::PersistenceError(e.to_string()))?
            .ok_or_else(|| PaymentFlowError::NotFound(id.clone()))?;
        if payment.status.is_terminal() {
            return Ok(ReconcileOutcome::AlreadySettled(payment));
        }
        self.reconcile_payment(&payment).await
    }

    /// All payments still waiting for a decision from the gateway, oldest first.
    pub async fn pending_payments(&self) -> Result<Vec<Payment>, PaymentFlowError> {
        self.db
            .fetch_payments_by_status(PaymentStatus::Pending)
            .await
            .map_err(|e| PaymentFlowError::PersistenceError(format!("Could not fetch pending payments: {e}")))
    }

    pub async fn payments_for_user(&self, user_id: &UserId) -> Result<Vec<Payment>, PaymentFlowError> {
        self.db
            .fetch_payments_for_user(user_id)
            .await
            .map_err(|e| PaymentFlowError::PersistenceError(e.to_string()))
    }
}
