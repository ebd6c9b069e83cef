use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::{db_url, new_pool, payments, purchases, samples, user_accounts, SqliteDatabaseError};
use crate::{
    db::traits::{
        BalanceManagement,
        CatalogManagement,
        InsertPaymentResult,
        InsertPurchaseResult,
        PaymentManagement,
        PurchaseManagement,
        SettlePaymentResult,
    },
    db_types::{
        NewPayment,
        NewPurchase,
        NewSample,
        Payment,
        PaymentId,
        PaymentStatus,
        Purchase,
        Sample,
        SampleId,
        Tokens,
        UserAccount,
        UserId,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `SM_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        trace!("🗃️ Created new SQLite connection pool for {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        debug!("🗃️ Connection pool to {} closed", self.url);
    }

    pub async fn create_user_account(&self, login: &str, tokens: Tokens) -> Result<UserAccount, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let account = user_accounts::create_user_account(login, tokens, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Created account {} for {login}", account.id);
        Ok(account)
    }

    pub async fn insert_sample(&self, sample: NewSample) -> Result<Sample, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let sample = samples::insert_sample(sample, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Added sample {} to the catalog", sample.id);
        Ok(sample)
    }

    pub async fn update_sample_price(&self, id: &SampleId, price: Tokens) -> Result<Option<Sample>, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let sample = samples::update_price(id, price, &mut tx).await?;
        tx.commit().await?;
        Ok(sample)
    }
}

#[async_trait]
impl PaymentManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn insert_payment(&self, payment: NewPayment) -> Result<InsertPaymentResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let result = payments::idempotent_insert(payment, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_payment(&self, id: &PaymentId) -> Result<Option<Payment>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payment(id, &mut conn).await
    }

    async fn fetch_payments_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payments_by_status(status, &mut conn).await
    }

    async fn fetch_payments_for_user(&self, user_id: &UserId) -> Result<Vec<Payment>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payments_for_user(user_id, &mut conn).await
    }

    async fn settle_payment(
        &self,
        id: &PaymentId,
        status: PaymentStatus,
        credit: Tokens,
        captured_at: DateTime<Utc>,
    ) -> Result<SettlePaymentResult, Self::Error> {
        if !status.is_terminal() {
            return Err(SqliteDatabaseError::InvalidSettlementStatus(status));
        }
        let mut tx = self.pool.begin().await?;
        let Some(payment) = payments::transition_from_pending(id, status, captured_at, &mut tx).await? else {
            let payment = payments::fetch_payment(id, &mut tx)
                .await?
                .ok_or_else(|| SqliteDatabaseError::PaymentNotFound(id.clone()))?;
            tx.rollback().await?;
            debug!("🗃️ Payment {id} was already settled as {}. Nothing to do.", payment.status);
            return Ok(SettlePaymentResult::AlreadySettled(payment));
        };
        let credited = if credit.is_positive() {
            let balance = user_accounts::adjust_balance(&payment.user_id, credit, &mut tx)
                .await?
                .ok_or_else(|| SqliteDatabaseError::AccountNotFound(payment.user_id.clone()))?;
            debug!("🗃️ Credited {credit} to {}. New balance is {balance}", payment.user_id);
            credit
        } else {
            Tokens::default()
        };
        tx.commit().await?;
        info!("🗃️ Payment {id} settled as {status}");
        Ok(SettlePaymentResult::Settled { payment, credited })
    }
}

#[async_trait]
impl BalanceManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn fetch_user_account(&self, user_id: &UserId) -> Result<Option<UserAccount>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        user_accounts::user_account_by_id(user_id, &mut conn).await
    }

    async fn adjust_balance(&self, user_id: &UserId, delta: Tokens) -> Result<Tokens, Self::Error> {
        let mut tx = self.pool.begin().await?;
        match user_accounts::adjust_balance(user_id, delta, &mut tx).await? {
            Some(balance) => {
                tx.commit().await?;
                Ok(balance)
            },
            None => {
                let account = user_accounts::user_account_by_id(user_id, &mut tx)
                    .await?
                    .ok_or_else(|| SqliteDatabaseError::AccountNotFound(user_id.clone()))?;
                Err(SqliteDatabaseError::InsufficientBalance {
                    user_id: user_id.clone(),
                    balance: account.tokens,
                    debit: -delta,
                })
            },
        }
    }
}

#[async_trait]
impl PurchaseManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn purchase_exists(&self, user_id: &UserId, sample_id: &SampleId) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        purchases::purchase_exists(user_id, sample_id, &mut conn).await
    }

    async fn fetch_purchases_for_user(&self, user_id: &UserId) -> Result<Vec<Purchase>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        purchases::fetch_purchases_for_user(user_id, &mut conn).await
    }

    async fn insert_purchase_and_debit(&self, purchase: NewPurchase) -> Result<InsertPurchaseResult, Self::Error> {
        let user_id = purchase.user_id.clone();
        let price = purchase.price;
        let mut tx = self.pool.begin().await?;
        let Some(purchase) = purchases::idempotent_insert(purchase, &mut tx).await? else {
            tx.rollback().await?;
            return Ok(InsertPurchaseResult::AlreadyPurchased);
        };
        match user_accounts::adjust_balance(&user_id, -price, &mut tx).await? {
            Some(new_balance) => {
                tx.commit().await?;
                info!("🗃️ {user_id} bought sample {} for {price}. New balance is {new_balance}", purchase.sample_id);
                Ok(InsertPurchaseResult::Inserted { purchase, new_balance })
            },
            None => {
                let account = user_accounts::user_account_by_id(&user_id, &mut tx)
                    .await?
                    .ok_or_else(|| SqliteDatabaseError::AccountNotFound(user_id.clone()))?;
                tx.rollback().await?;
                debug!("🗃️ {user_id} cannot afford {price} with {}. Purchase rolled back", account.tokens);
                Ok(InsertPurchaseResult::InsufficientTokens { balance: account.tokens })
            },
        }
    }
}

#[async_trait]
impl CatalogManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn fetch_sample(&self, sample_id: &SampleId) -> Result<Option<Sample>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        samples::fetch_sample(sample_id, &mut conn).await
    }
}
