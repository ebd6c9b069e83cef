use std::sync::Arc;

use chrono::{TimeZone, Utc};

use sample_market_engine::{
    db_types::{MinorUnits, PaymentId, PaymentStatus, Tokens, UserId},
    traits::{GatewayError, GatewayPaymentStatus, PaymentIntent},
    PaymentFlowApi,
    PaymentFlowConfig,
    PaymentFlowError,
    PaymentManagement,
    ReconcileOutcome,
};
use support::*;

mod support;

#[tokio::test]
async fn successful_payment_round_trip() {
    let Fixture { db, user } = setup(0).await;
    let mut gateway = MockGateway::new();
    let user_id = user.id.clone();
    gateway
        .expect_create_payment_intent()
        .withf(move |req| {
            req.amount == MinorUnits::from(10_000) &&
                req.currency == "RUB" &&
                req.return_url == "https://x/return" &&
                req.customer_ref == user_id
        })
        .times(1)
        .returning(|_| {
            Ok(PaymentIntent {
                id: PaymentId::from("pay_1"),
                confirmation_url: "https://gateway/confirm/pay_1".to_string(),
                status: PaymentStatus::Pending,
            })
        });
    gateway.expect_fetch_payment_status().times(1).returning(|id| {
        Ok(sample_market_engine::traits::GatewayPaymentStatus {
            id: id.clone(),
            status: PaymentStatus::Succeeded,
            captured_at: Some(chrono::Utc::now()),
        })
    });
    let api = PaymentFlowApi::new(db.clone(), gateway, PaymentFlowConfig::default());

    let url = api.create_payment("https://x/return", &user.id, MinorUnits::from(10_000)).await.unwrap();
    assert_eq!(url, "https://gateway/confirm/pay_1");
    let payment = db.fetch_payment(&PaymentId::from("pay_1")).await.unwrap().expect("payment was not saved");
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, MinorUnits::from(10_000));
    assert_eq!(payment.user_id, user.id);
    assert!(payment.captured_at.is_none());

    let pending = api.pending_payments().await.unwrap();
    assert_eq!(pending.len(), 1);
    let outcome = api.reconcile_payment(&pending[0]).await.unwrap();
    match outcome {
        ReconcileOutcome::Settled { payment, credited } => {
            assert_eq!(payment.status, PaymentStatus::Succeeded);
            assert!(payment.captured_at.is_some());
            assert_eq!(credited, Tokens::from(1000));
        },
        other => panic!("Expected the payment to settle, got {other:?}"),
    }
    assert_eq!(balance_of(&db, &user).await, Tokens::from(1000));
    assert!(api.pending_payments().await.unwrap().is_empty());
}

#[tokio::test]
async fn reconciling_twice_credits_once() {
    let Fixture { db, user } = setup(0).await;
    let payment = add_pending_payment(&db, &user, "pay_twice", 10_000).await;
    let api = PaymentFlowApi::new(db.clone(), gateway_reporting(PaymentStatus::Succeeded), PaymentFlowConfig::default());

    let first = api.reconcile_payment(&payment).await.unwrap();
    assert!(matches!(first, ReconcileOutcome::Settled { .. }));
    // The stale copy still says pending
    let second = api.reconcile_payment(&payment).await.unwrap();
    assert!(matches!(second, ReconcileOutcome::AlreadySettled(ref p) if p.status == PaymentStatus::Succeeded));
    assert_eq!(balance_of(&db, &user).await, Tokens::from(1000));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reconciliations_credit_once() {
    let Fixture { db, user } = setup(5).await;
    let payment = add_pending_payment(&db, &user, "pay_race", 25_050).await;
    let api =
        Arc::new(PaymentFlowApi::new(db.clone(), gateway_reporting(PaymentStatus::Succeeded), PaymentFlowConfig::default()));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let api = Arc::clone(&api);
        let payment = payment.clone();
        handles.push(tokio::spawn(async move { api.reconcile_payment(&payment).await }));
    }
    let mut settled = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            ReconcileOutcome::Settled { credited, .. } => {
                assert_eq!(credited, Tokens::from(2500));
                settled += 1;
            },
            ReconcileOutcome::AlreadySettled(_) => {},
            ReconcileOutcome::StillPending => panic!("Gateway said succeeded"),
        }
    }
    assert_eq!(settled, 1);
    assert_eq!(balance_of(&db, &user).await, Tokens::from(2505));
}

#[tokio::test]
async fn still_pending_payments_are_left_alone() {
    let Fixture { db, user } = setup(7).await;
    let payment = add_pending_payment(&db, &user, "pay_wait", 10_000).await;
    let api = PaymentFlowApi::new(db.clone(), gateway_reporting(PaymentStatus::Pending), PaymentFlowConfig::default());

    let outcome = api.reconcile_payment(&payment).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::StillPending));
    let stored = db.fetch_payment(&payment.id).await.unwrap().unwrap();
    assert_eq!(stored, payment);
    assert_eq!(balance_of(&db, &user).await, Tokens::from(7));
}

#[tokio::test]
async fn canceled_payments_credit_nothing() {
    let Fixture { db, user } = setup(0).await;
    let payment = add_pending_payment(&db, &user, "pay_cancel", 10_000).await;
    let api = PaymentFlowApi::new(db.clone(), gateway_reporting(PaymentStatus::Canceled), PaymentFlowConfig::default());

    match api.reconcile_payment(&payment).await.unwrap() {
        ReconcileOutcome::Settled { payment, credited } => {
            assert_eq!(payment.status, PaymentStatus::Canceled);
            assert!(credited.is_zero());
        },
        other => panic!("Expected the payment to settle, got {other:?}"),
    }
    assert_eq!(balance_of(&db, &user).await, Tokens::from(0));
    assert!(api.pending_payments().await.unwrap().is_empty());
}

#[tokio::test]
async fn gateway_failure_leaves_payment_pending() {
    let Fixture { db, user } = setup(0).await;
    let payment = add_pending_payment(&db, &user, "pay_flaky", 10_000).await;
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payment_status().returning(|_| Err(GatewayError::RequestFailed("connection reset".into())));
    let api = PaymentFlowApi::new(db.clone(), gateway, PaymentFlowConfig::default());

    let err = api.reconcile_payment(&payment).await.unwrap_err();
    assert!(matches!(err, PaymentFlowError::GatewayError(GatewayError::RequestFailed(_))));
    let stored = db.fetch_payment(&payment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Pending);
    assert_eq!(balance_of(&db, &user).await, Tokens::from(0));
}

#[tokio::test]
async fn sub_unit_remainders_earn_nothing() {
    let Fixture { db, user } = setup(0).await;
    let payment = add_pending_payment(&db, &user, "pay_odd", 10_099).await;
    let api = PaymentFlowApi::new(db.clone(), gateway_reporting(PaymentStatus::Succeeded), PaymentFlowConfig::default());
    api.reconcile_payment(&payment).await.unwrap();
    assert_eq!(balance_of(&db, &user).await, Tokens::from(1000));
}

#[tokio::test]
async fn gateway_failure_on_create_writes_nothing() {
    let Fixture { db, user } = setup(0).await;
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_payment_intent()
        .times(1)
        .returning(|_| Err(GatewayError::Rejected { code: 401, description: "invalid credentials".into() }));
    let api = PaymentFlowApi::new(db.clone(), gateway, PaymentFlowConfig::default());

    let err = api.create_payment("https://x/return", &user.id, MinorUnits::from(500)).await.unwrap_err();
    assert!(matches!(err, PaymentFlowError::GatewayError(GatewayError::Rejected { code: 401, .. })));
    assert!(api.payments_for_user(&user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn non_positive_amounts_are_rejected_before_the_gateway() {
    let Fixture { db, user } = setup(0).await;
    let mut gateway = MockGateway::new();
    gateway.expect_create_payment_intent().never();
    let api = PaymentFlowApi::new(db, gateway, PaymentFlowConfig::default());
    for amount in [0, -100] {
        let err = api.create_payment("https://x/return", &user.id, MinorUnits::from(amount)).await.unwrap_err();
        assert!(matches!(err, PaymentFlowError::InvalidAmount(_)));
    }
}

#[tokio::test]
async fn orphaned_gateway_intent_is_a_persistence_error() {
    let Fixture { db, .. } = setup(0).await;
    let mut gateway = MockGateway::new();
    gateway.expect_create_payment_intent().returning(|_| {
        Ok(PaymentIntent {
            id: PaymentId::from("pay_orphan"),
            confirmation_url: "https://gateway/confirm/pay_orphan".to_string(),
            status: PaymentStatus::Pending,
        })
    });
    let api = PaymentFlowApi::new(db.clone(), gateway, PaymentFlowConfig::default());
    // No such user, so the foreign key rejects the insert
    let ghost = UserId::from("ghost");
    let err = api.create_payment("https://x/return", &ghost, MinorUnits::from(500)).await.unwrap_err();
    assert!(matches!(err, PaymentFlowError::PersistenceError(_)));
    assert!(db.fetch_payment(&PaymentId::from("pay_orphan")).await.unwrap().is_none());
}

#[tokio::test]
async fn reconcile_by_id() {
    let Fixture { db, user } = setup(0).await;
    add_pending_payment(&db, &user, "pay_by_id", 300).await;
    let api = PaymentFlowApi::new(db.clone(), gateway_reporting(PaymentStatus::Succeeded), PaymentFlowConfig {
        tokens_per_major_unit: 2,
        ..Default::default()
    });

    let err = api.reconcile_payment_by_id(&PaymentId::from("nope")).await.unwrap_err();
    assert!(matches!(err, PaymentFlowError::NotFound(_)));
    let outcome = api.reconcile_payment_by_id(&PaymentId::from("pay_by_id")).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::Settled { credited, .. } if credited == Tokens::from(6)));
    let outcome = api.reconcile_payment_by_id(&PaymentId::from("pay_by_id")).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::AlreadySettled(_)));
    assert_eq!(balance_of(&db, &user).await, Tokens::from(6));
}

#[tokio::test]
async fn capture_time_comes_from_the_gateway() {
    let Fixture { db, user } = setup(0).await;
    let payment = add_pending_payment(&db, &user, "pay_captured", 10_000).await;
    let captured_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payment_status().returning(move |id| {
        Ok(GatewayPaymentStatus { id: id.clone(), status: PaymentStatus::Succeeded, captured_at: Some(captured_at) })
    });
    let api = PaymentFlowApi::new(db.clone(), gateway, PaymentFlowConfig::default());

    api.reconcile_payment(&payment).await.unwrap();
    let stored = db.fetch_payment(&payment.id).await.unwrap().unwrap();
    assert_eq!(stored.captured_at, Some(captured_at));
}

#[tokio::test]
async fn oversized_credits_are_refused() {
    let Fixture { db, user } = setup(0).await;
    let config = PaymentFlowConfig { tokens_per_major_unit: i64::MAX / 10, ..Default::default() };
    let mut gateway = MockGateway::new();
    gateway.expect_create_payment_intent().never();
    let api = PaymentFlowApi::new(db.clone(), gateway, config.clone());
    let err = api.create_payment("https://x/return", &user.id, MinorUnits::from(100_000)).await.unwrap_err();
    assert!(matches!(err, PaymentFlowError::AmountTooLarge(a) if a == MinorUnits::from(100_000)));

    // A payment recorded under a smaller rate still cannot overflow the balance
    let payment = add_pending_payment(&db, &user, "pay_huge", 100_000).await;
    let api = PaymentFlowApi::new(db.clone(), gateway_reporting(PaymentStatus::Succeeded), config);
    let err = api.reconcile_payment(&payment).await.unwrap_err();
    assert!(matches!(err, PaymentFlowError::AmountTooLarge(_)));
    let stored = db.fetch_payment(&payment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Pending);
    assert_eq!(balance_of(&db, &user).await, Tokens::from(0));
}
