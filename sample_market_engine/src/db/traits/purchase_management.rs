use async_trait::async_trait;

use crate::{
    db::traits::InsertPurchaseResult,
    db_types::{NewPurchase, Purchase, SampleId, UserId},
};

/// The `PurchaseManagement` trait defines the behaviour for recording sample purchases.
#[async_trait]
pub trait PurchaseManagement: Send + Sync {
    type Error: std::error::Error + Send;

    async fn purchase_exists(&self, user_id: &UserId, sample_id: &SampleId) -> Result<bool, Self::Error>;

    /// All purchases made by the user, most recent first.
    async fn fetch_purchases_for_user(&self, user_id: &UserId) -> Result<Vec<Purchase>, Self::Error>;

    /// Takes a new purchase, and in a single atomic transaction,
    /// * inserts the purchase record. At most one purchase may exist per user and sample; if one already does,
    ///   nothing further is done and `AlreadyPurchased` is returned.
    /// * debits the purchase price from the buyer's balance. If the balance does not cover the price, the insert is
    ///   rolled back and `InsufficientTokens` is returned.
    ///
    /// Either both records change, or neither does.
    async fn insert_purchase_and_debit(&self, purchase: NewPurchase) -> Result<InsertPurchaseResult, Self::Error>;
}
