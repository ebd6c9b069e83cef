#![allow(dead_code)]
use async_trait::async_trait;
use chrono::Utc;
use mockall::mock;
use sample_market_engine::{
    db_types::{MinorUnits, NewPayment, NewSample, Payment, PaymentId, PaymentStatus, Sample, Tokens, UserAccount},
    test_utils::prepare_env::new_test_db,
    traits::{
        GatewayError,
        GatewayPaymentStatus,
        PaymentGateway,
        PaymentIntent,
        PaymentIntentRequest,
        StorageError,
        StorageUrlResolver,
    },
    InsertPaymentResult,
    PaymentManagement,
    SqliteDatabase,
};

mock! {
    pub Gateway {}

    #[async_trait]
    impl PaymentGateway for Gateway {
        async fn create_payment_intent(&self, request: PaymentIntentRequest) -> Result<PaymentIntent, GatewayError>;
        async fn fetch_payment_status(&self, id: &PaymentId) -> Result<GatewayPaymentStatus, GatewayError>;
    }
}

mock! {
    pub Storage {}

    #[async_trait]
    impl StorageUrlResolver for Storage {
        async fn download_url(&self, storage_key: &str) -> Result<String, StorageError>;
        async fn listen_url(&self, storage_key: &str) -> Result<String, StorageError>;
    }
}

/// A gateway that reports every payment with the given status.
pub fn gateway_reporting(status: PaymentStatus) -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payment_status().returning(move |id| {
        let captured_at = status.is_terminal().then(Utc::now);
        Ok(GatewayPaymentStatus { id: id.clone(), status, captured_at })
    });
    gateway
}

/// A storage resolver that serves everything from a fake CDN.
pub fn working_storage() -> MockStorage {
    let mut storage = MockStorage::new();
    storage.expect_download_url().returning(|key| Ok(format!("https://cdn.example.com/samples/{key}")));
    storage.expect_listen_url().returning(|key| Ok(format!("https://cdn.example.com/samples/{key}?inline=1")));
    storage
}

pub struct Fixture {
    pub db: SqliteDatabase,
    pub user: UserAccount,
}

pub async fn setup(tokens: i64) -> Fixture {
    let db = new_test_db().await;
    let user = db.create_user_account("alice", Tokens::from(tokens)).await.expect("Error creating user");
    Fixture { db, user }
}

pub async fn add_sample(db: &SqliteDatabase, title: &str, price: i64) -> Sample {
    let sample = NewSample::new(title, Tokens::from(price), &format!("{title}.wav")).with_author("DJ Test");
    db.insert_sample(sample).await.expect("Error inserting sample")
}

pub async fn add_pending_payment(db: &SqliteDatabase, user: &UserAccount, id: &str, amount: i64) -> Payment {
    let payment = NewPayment::new(PaymentId::from(id), user.id.clone(), MinorUnits::from(amount));
    match db.insert_payment(payment).await.expect("Error inserting payment") {
        InsertPaymentResult::Inserted(p) => p,
        InsertPaymentResult::AlreadyExists(id) => panic!("Payment {id} already exists"),
    }
}

pub async fn balance_of(db: &SqliteDatabase, user: &UserAccount) -> Tokens {
    use sample_market_engine::BalanceManagement;
    db.fetch_user_account(&user.id).await.expect("Error fetching account").expect("Account does not exist").tokens
}
