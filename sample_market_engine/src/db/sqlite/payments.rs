use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db::{sqlite::SqliteDatabaseError, traits::InsertPaymentResult},
    db_types::{NewPayment, Payment, PaymentId, PaymentStatus, UserId},
};

/// Stores a new pending payment. Inserting a payment id that is already known is not an error: the existing record is
/// left untouched and [`InsertPaymentResult::AlreadyExists`] is returned.
pub async fn idempotent_insert(
    payment: NewPayment,
    conn: &mut SqliteConnection,
) -> Result<InsertPaymentResult, SqliteDatabaseError> {
    let result = sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments (id, user_id, status, description, amount, created_at)
        VALUES ($1, $2, 'pending', $3, $4, $5)
        RETURNING id, user_id, status, description, amount, captured_at, created_at"#,
    )
    .bind(payment.id.clone())
    .bind(payment.user_id.clone())
    .bind(payment.description.clone())
    .bind(payment.amount)
    .bind(payment.created_at)
    .fetch_one(conn)
    .await;
    match result {
        Ok(saved) => {
            debug!("🗃️ Payment {} for {} saved for user {}", saved.id, saved.amount, saved.user_id);
            Ok(InsertPaymentResult::Inserted(saved))
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            debug!("🗃️ Payment {} already exists", payment.id);
            Ok(InsertPaymentResult::AlreadyExists(payment.id))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_payment(id: &PaymentId, conn: &mut SqliteConnection) -> Result<Option<Payment>, SqliteDatabaseError> {
    let payment = sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, user_id, status, description, amount, captured_at, created_at
        FROM payments
        WHERE id = $1"#,
    )
    .bind(id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

pub async fn fetch_payments_by_status(
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, SqliteDatabaseError> {
    let payments = sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, user_id, status, description, amount, captured_at, created_at
        FROM payments
        WHERE status = $1
        ORDER BY created_at ASC"#,
    )
    .bind(status)
    .fetch_all(conn)
    .await?;
    trace!("🗃️ {} payments with status {status}", payments.len());
    Ok(payments)
}

pub async fn fetch_payments_for_user(
    user_id: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, SqliteDatabaseError> {
    let payments = sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, user_id, status, description, amount, captured_at, created_at
        FROM payments
        WHERE user_id = $1
        ORDER BY created_at DESC"#,
    )
    .bind(user_id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(payments)
}

/// Moves a payment out of `pending` into `status`.
///
/// The update only matches rows that are still pending, so of any number of concurrent callers exactly one receives
/// `Some(payment)`. Everyone else gets `None` and must not apply any side effects of the transition.
pub async fn transition_from_pending(
    id: &PaymentId,
    status: PaymentStatus,
    captured_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, SqliteDatabaseError> {
    let payment = sqlx::query_as::<_, Payment>(
        r#"
        UPDATE payments
        SET status = $1, captured_at = $2
        WHERE id = $3 AND status = 'pending'
        RETURNING id, user_id, status, description, amount, captured_at, created_at"#,
    )
    .bind(status)
    .bind(captured_at)
    .bind(id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}
