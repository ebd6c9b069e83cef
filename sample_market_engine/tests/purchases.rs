use std::sync::Arc;

use sample_market_engine::{
    db_types::{SampleId, Tokens, UserId},
    traits::StorageError,
    PurchaseApi,
    PurchaseFlowError,
};
use support::*;

mod support;

#[tokio::test]
async fn purchase_with_exact_balance() {
    let Fixture { db, user } = setup(50).await;
    let sample = add_sample(&db, "808_boom", 50).await;
    let api = PurchaseApi::new(db.clone(), working_storage());

    let bought = api.purchase_sample(&user.id, &sample.id).await.unwrap();
    assert_eq!(bought.purchase.price, Tokens::from(50));
    assert_eq!(bought.purchase.user_id, user.id);
    assert_eq!(bought.sample, sample);
    assert_eq!(bought.download_url, "https://cdn.example.com/samples/808_boom.wav");
    assert_eq!(bought.listen_url, "https://cdn.example.com/samples/808_boom.wav?inline=1");
    assert_eq!(balance_of(&db, &user).await, Tokens::from(0));

    let purchases = api.purchases_for_user(&user.id).await.unwrap();
    assert_eq!(purchases, vec![bought.purchase]);
    assert!(api.is_purchased(&user.id, &sample.id).await.unwrap());
}

#[tokio::test]
async fn insufficient_funds() {
    let Fixture { db, user } = setup(5).await;
    let sample = add_sample(&db, "snare", 10).await;
    let api = PurchaseApi::new(db.clone(), working_storage());

    let err = api.purchase_sample(&user.id, &sample.id).await.unwrap_err();
    assert!(matches!(
        err,
        PurchaseFlowError::InsufficientTokens { balance, price } if balance == Tokens::from(5) && price == Tokens::from(10)
    ));
    assert_eq!(balance_of(&db, &user).await, Tokens::from(5));
    assert!(api.purchases_for_user(&user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn free_samples_cannot_be_purchased() {
    let Fixture { db, user } = setup(100).await;
    let sample = add_sample(&db, "free_hat", 0).await;
    let mut storage = MockStorage::new();
    storage.expect_download_url().never();
    storage.expect_listen_url().never();
    let api = PurchaseApi::new(db.clone(), storage);

    let err = api.purchase_sample(&user.id, &sample.id).await.unwrap_err();
    assert!(matches!(err, PurchaseFlowError::SampleIsFree(id) if id == sample.id));
    assert_eq!(balance_of(&db, &user).await, Tokens::from(100));
    assert!(!api.is_purchased(&user.id, &sample.id).await.unwrap());
    // Free samples are available to everyone without a purchase
    assert!(api.has_entitlement(&user.id, &sample.id).await.unwrap());
}

#[tokio::test]
async fn buying_the_same_sample_twice() {
    let Fixture { db, user } = setup(100).await;
    let sample = add_sample(&db, "pad", 30).await;
    let api = PurchaseApi::new(db.clone(), working_storage());

    api.purchase_sample(&user.id, &sample.id).await.unwrap();
    let err = api.purchase_sample(&user.id, &sample.id).await.unwrap_err();
    assert!(matches!(err, PurchaseFlowError::AlreadyPurchased));
    assert_eq!(balance_of(&db, &user).await, Tokens::from(70));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_purchases_debit_once() {
    let Fixture { db, user } = setup(100).await;
    let sample = add_sample(&db, "vocal_chop", 40).await;
    let api = Arc::new(PurchaseApi::new(db.clone(), working_storage()));

    let mut handles = Vec::new();
    for _ in 0..2 {
        let api = Arc::clone(&api);
        let user_id = user.id.clone();
        let sample_id = sample.id.clone();
        handles.push(tokio::spawn(async move { api.purchase_sample(&user_id, &sample_id).await }));
    }
    let mut successes = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(PurchaseFlowError::AlreadyPurchased) => duplicates += 1,
            Err(e) => panic!("Unexpected error: {e}"),
        }
    }
    assert_eq!((successes, duplicates), (1, 1));
    assert_eq!(balance_of(&db, &user).await, Tokens::from(60));
    assert_eq!(api.purchases_for_user(&user.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn storage_failure_aborts_the_purchase() {
    let Fixture { db, user } = setup(100).await;
    let sample = add_sample(&db, "bassline", 25).await;
    let mut storage = MockStorage::new();
    storage.expect_download_url().returning(|_| Err(StorageError::Unavailable("bucket is offline".into())));
    let api = PurchaseApi::new(db.clone(), storage);

    let err = api.purchase_sample(&user.id, &sample.id).await.unwrap_err();
    assert!(matches!(err, PurchaseFlowError::StorageError(StorageError::Unavailable(_))));
    assert_eq!(balance_of(&db, &user).await, Tokens::from(100));
    assert!(!api.is_purchased(&user.id, &sample.id).await.unwrap());
}

#[tokio::test]
async fn purchase_price_is_a_snapshot() {
    let Fixture { db, user } = setup(100).await;
    let sample = add_sample(&db, "arp", 20).await;
    let api = PurchaseApi::new(db.clone(), working_storage());
    api.purchase_sample(&user.id, &sample.id).await.unwrap();

    let repriced = db.update_sample_price(&sample.id, Tokens::from(45)).await.unwrap().unwrap();
    assert_eq!(repriced.price, Tokens::from(45));
    let purchases = api.purchases_for_user(&user.id).await.unwrap();
    assert_eq!(purchases[0].price, Tokens::from(20));
}

#[tokio::test]
async fn unknown_users_and_samples() {
    let Fixture { db, user } = setup(100).await;
    let sample = add_sample(&db, "riser", 20).await;
    let api = PurchaseApi::new(db.clone(), working_storage());

    let err = api.purchase_sample(&user.id, &SampleId::from("missing")).await.unwrap_err();
    assert!(matches!(err, PurchaseFlowError::NotFound(_)));
    let err = api.purchase_sample(&UserId::from("nobody"), &sample.id).await.unwrap_err();
    assert!(matches!(err, PurchaseFlowError::NotFound(_)));
    let err = api.has_entitlement(&user.id, &SampleId::from("missing")).await.unwrap_err();
    assert!(matches!(err, PurchaseFlowError::NotFound(_)));
}

#[tokio::test]
async fn entitlement_follows_purchases() {
    let Fixture { db, user } = setup(100).await;
    let sample = add_sample(&db, "tom", 10).await;
    let other = add_sample(&db, "clap", 10).await;
    let api = PurchaseApi::new(db.clone(), working_storage());

    assert!(!api.has_entitlement(&user.id, &sample.id).await.unwrap());
    api.purchase_sample(&user.id, &sample.id).await.unwrap();
    assert!(api.has_entitlement(&user.id, &sample.id).await.unwrap());
    assert!(!api.has_entitlement(&user.id, &other.id).await.unwrap());
}
