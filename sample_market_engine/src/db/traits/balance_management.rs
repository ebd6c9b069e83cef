use async_trait::async_trait;

use crate::db_types::{Tokens, UserAccount, UserId};

/// The `BalanceManagement` trait defines behaviour for reading user accounts and changing their token balance.
#[async_trait]
pub trait BalanceManagement: Send + Sync {
    type Error: std::error::Error + Send;

    /// Fetches the user account with the given id. If no account exists, `None` is returned.
    async fn fetch_user_account(&self, user_id: &UserId) -> Result<Option<UserAccount>, Self::Error>;

    /// Adds `delta` (which may be negative) to the user's balance in a single atomic update and returns the new
    /// balance. The balance can never drop below zero; a debit that would overdraw the account is an error.
    async fn adjust_balance(&self, user_id: &UserId, delta: Tokens) -> Result<Tokens, Self::Error>;
}
