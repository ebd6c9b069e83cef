use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::{BalanceManagement, CatalogManagement, InsertPurchaseResult, PurchaseManagement},
    db_types::{NewPurchase, Purchase, PurchasedSample, Sample, SampleId, UserId},
    market_api::errors::PurchaseFlowError,
    traits::StorageUrlResolver,
};

/// `PurchaseApi` spends a user's tokens on samples.
///
/// The final insert-and-debit happens in one transaction in the backend, so the pre-checks in
/// [`Self::purchase_sample`] only serve to fail fast with a precise error. Two racing purchases of the same sample by
/// the same user can never both succeed.
pub struct PurchaseApi<B, S> {
    db: B,
    storage: S,
}

impl<B, S> Debug for PurchaseApi<B, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PurchaseApi")
    }
}

impl<B, S> PurchaseApi<B, S> {
    pub fn new(db: B, storage: S) -> Self {
        Self { db, storage }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

fn persistence_error<E: std::error::Error>(e: E) -> PurchaseFlowError {
    PurchaseFlowError::PersistenceError(e.to_string())
}

impl<B, S> PurchaseApi<B, S>
where
    B: PurchaseManagement + BalanceManagement + CatalogManagement,
    S: StorageUrlResolver,
{
    /// Buys `sample_id` for `user_id` at the sample's current price.
    ///
    /// Free samples cannot be bought ([`PurchaseFlowError::SampleIsFree`]). The storage URLs are resolved before any
    /// tokens change hands, so a storage outage aborts the purchase without side effects.
    pub async fn purchase_sample(
        &self,
        user_id: &UserId,
        sample_id: &SampleId,
    ) -> Result<PurchasedSample, PurchaseFlowError> {
        let sample = self.fetch_sample(sample_id).await?;
        if sample.is_free() {
            return Err(PurchaseFlowError::SampleIsFree(sample_id.clone()));
        }
        if self.db.purchase_exists(user_id, sample_id).await.map_err(persistence_error)? {
            debug!("🛒️ {user_id} already owns sample {sample_id}");
            return Err(PurchaseFlowError::AlreadyPurchased);
        }
        let account = self
            .db
            .fetch_user_account(user_id)
            .await
            .map_err(persistence_error)?
            .ok_or_else(|| PurchaseFlowError::NotFound(format!("User {user_id}")))?;
        let price = sample.price;
        if account.tokens < price {
            debug!("🛒️ {user_id} has {} and cannot afford sample {sample_id} at {price}", account.tokens);
            return Err(PurchaseFlowError::InsufficientTokens { balance: account.tokens, price });
        }
        let download_url = self.storage.download_url(&sample.storage_key).await?;
        let listen_url = self.storage.listen_url(&sample.storage_key).await?;
        let purchase = NewPurchase::new(user_id.clone(), sample_id.clone(), price);
        match self.db.insert_purchase_and_debit(purchase).await.map_err(persistence_error)? {
            InsertPurchaseResult::Inserted { purchase, new_balance } => {
                info!("🛒️ {user_id} bought sample {sample_id} for {price}. {new_balance} left");
                Ok(PurchasedSample { purchase, sample, download_url, listen_url })
            },
            InsertPurchaseResult::AlreadyPurchased => {
                debug!("🛒️ A concurrent purchase of sample {sample_id} by {user_id} got there first");
                Err(PurchaseFlowError::AlreadyPurchased)
            },
            InsertPurchaseResult::InsufficientTokens { balance } => {
                Err(PurchaseFlowError::InsufficientTokens { balance, price })
            },
        }
    }

    /// All of the user's purchases, most recent first.
    pub async fn purchases_for_user(&self, user_id: &UserId) -> Result<Vec<Purchase>, PurchaseFlowError> {
        self.db.fetch_purchases_for_user(user_id).await.map_err(persistence_error)
    }

    pub async fn is_purchased(&self, user_id: &UserId, sample_id: &SampleId) -> Result<bool, PurchaseFlowError> {
        self.db.purchase_exists(user_id, sample_id).await.map_err(persistence_error)
    }

    /// Whether the user may download the sample: it is free, or they have bought it.
    pub async fn has_entitlement(&self, user_id: &UserId, sample_id: &SampleId) -> Result<bool, PurchaseFlowError> {
        let sample = self.fetch_sample(sample_id).await?;
        if sample.is_free() {
            return Ok(true);
        }
        self.is_purchased(user_id, sample_id).await
    }

    async fn fetch_sample(&self, sample_id: &SampleId) -> Result<Sample, PurchaseFlowError> {
        self.db
            .fetch_sample(sample_id)
            .await
            .map_err(persistence_error)?
            .ok_or_else(|| PurchaseFlowError::NotFound(format!("Sample {sample_id}")))
    }
}
