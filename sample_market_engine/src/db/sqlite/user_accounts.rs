use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{Tokens, UserAccount, UserId},
};

pub async fn user_account_by_id(
    user_id: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Option<UserAccount>, SqliteDatabaseError> {
    let account = sqlx::query_as::<_, UserAccount>(
        r#"
        SELECT id, login, tokens, created_at, updated_at
        FROM users
        WHERE id = $1"#,
    )
    .bind(user_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(account)
}

pub async fn create_user_account(
    login: &str,
    tokens: Tokens,
    conn: &mut SqliteConnection,
) -> Result<UserAccount, SqliteDatabaseError> {
    let account = sqlx::query_as::<_, UserAccount>(
        r#"
        INSERT INTO users (id, login, tokens) VALUES ($1, $2, $3)
        RETURNING id, login, tokens, created_at, updated_at"#,
    )
    .bind(UserId::random())
    .bind(login)
    .bind(tokens)
    .fetch_one(conn)
    .await?;
    debug!("🧑️ Created user account {} ({login}) with {tokens}", account.id);
    Ok(account)
}

/// Adds `delta` (which may be negative) to the user's token balance in a single statement.
///
/// Returns the new balance, or `None` if the user does not exist or the change would leave a negative balance. In the
/// latter case the balance is not modified.
pub async fn adjust_balance(
    user_id: &UserId,
    delta: Tokens,
    conn: &mut SqliteConnection,
) -> Result<Option<Tokens>, SqliteDatabaseError> {
    let balance = sqlx::query_scalar::<_, Tokens>(
        r#"
        UPDATE users
        SET tokens = tokens + $1, updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND tokens + $1 >= 0
        RETURNING tokens"#,
    )
    .bind(delta)
    .bind(user_id.as_str())
    .fetch_optional(conn)
    .await?;
    trace!("🧑️ Balance adjustment of {delta} for {user_id}: {balance:?}");
    Ok(balance)
}
