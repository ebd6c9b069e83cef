use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{NewPurchase, Purchase, SampleId, UserId},
};

/// Records a purchase. Returns `None` if the user already owns the sample, in which case nothing is written.
pub async fn idempotent_insert(
    purchase: NewPurchase,
    conn: &mut SqliteConnection,
) -> Result<Option<Purchase>, SqliteDatabaseError> {
    let result = sqlx::query_as::<_, Purchase>(
        r#"
        INSERT INTO purchases (id, user_id, sample_id, price, created_at) VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, sample_id, price, created_at"#,
    )
    .bind(purchase.id.clone())
    .bind(purchase.user_id.clone())
    .bind(purchase.sample_id.clone())
    .bind(purchase.price)
    .bind(purchase.created_at)
    .fetch_one(conn)
    .await;
    match result {
        Ok(saved) => {
            debug!("🗃️ Purchase {} of sample {} by {} saved", saved.id, saved.sample_id, saved.user_id);
            Ok(Some(saved))
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            trace!("🗃️ {} already owns sample {}", purchase.user_id, purchase.sample_id);
            Ok(None)
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn purchase_exists(
    user_id: &UserId,
    sample_id: &SampleId,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM purchases WHERE user_id = $1 AND sample_id = $2)",
    )
    .bind(user_id.as_str())
    .bind(sample_id.as_str())
    .fetch_one(conn)
    .await?;
    Ok(exists)
}

pub async fn fetch_purchases_for_user(
    user_id: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Purchase>, SqliteDatabaseError> {
    let purchases = sqlx::query_as::<_, Purchase>(
        r#"
        SELECT id, user_id, sample_id, price, created_at
        FROM purchases
        WHERE user_id = $1
        ORDER BY created_at DESC"#,
    )
    .bind(user_id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(purchases)
}
