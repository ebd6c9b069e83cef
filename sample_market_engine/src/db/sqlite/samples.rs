use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{NewSample, Sample, SampleId, Tokens},
};

pub async fn fetch_sample(id: &SampleId, conn: &mut SqliteConnection) -> Result<Option<Sample>, SqliteDatabaseError> {
    let sample = sqlx::query_as::<_, Sample>(
        r#"
        SELECT id, title, author, price, storage_key, created_at
        FROM samples
        WHERE id = $1"#,
    )
    .bind(id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(sample)
}

pub async fn insert_sample(sample: NewSample, conn: &mut SqliteConnection) -> Result<Sample, SqliteDatabaseError> {
    let sample = sqlx::query_as::<_, Sample>(
        r#"
        INSERT INTO samples (id, title, author, price, storage_key) VALUES ($1, $2, $3, $4, $5)
        RETURNING id, title, author, price, storage_key, created_at"#,
    )
    .bind(sample.id)
    .bind(sample.title)
    .bind(sample.author)
    .bind(sample.price)
    .bind(sample.storage_key)
    .fetch_one(conn)
    .await?;
    debug!("🎵️ Sample {} '{}' added to the catalog at {}", sample.id, sample.title, sample.price);
    Ok(sample)
}

/// Changes the catalog price of a sample. Purchases already made keep the price they were made at.
pub async fn update_price(
    id: &SampleId,
    price: Tokens,
    conn: &mut SqliteConnection,
) -> Result<Option<Sample>, SqliteDatabaseError> {
    let sample = sqlx::query_as::<_, Sample>(
        r#"
        UPDATE samples SET price = $1 WHERE id = $2
        RETURNING id, title, author, price, storage_key, created_at"#,
    )
    .bind(price)
    .bind(id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(sample)
}
