use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::database::Database;
use crate::errors::{AppError, Result};
use crate::models::QuotaAccount;

/// Point ledger contract. Deduct and add must be atomic per account: the
/// read-modify-write happens in one statement, never as a read followed by a
/// separate write.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QuotaLedger: Send + Sync {
    /// Current snapshot, creating the account with the signup grant if the
    /// user has never been seen.
    async fn account(&self, user_id: &str) -> Result<QuotaAccount>;

    /// Atomically spends `points`, stamping the usage time. Fails with
    /// `InsufficientQuota` when the balance is too low; the balance is never
    /// clamped. Returns the new balance.
    async fn deduct(&self, user_id: &str, points: i64) -> Result<i64>;

    /// Atomically returns `points` to the account. Only used as compensation
    /// after a downstream pipeline failure. Returns the new balance.
    async fn add(&self, user_id: &str, points: i64) -> Result<i64>;
}

pub struct PgQuotaLedger {
    database: Database,
    signup_grant: i64,
}

impl PgQuotaLedger {
    pub fn new(database: Database, signup_grant: i64) -> Self {
        Self {
            database,
            signup_grant,
        }
    }
}

#[async_trait]
impl QuotaLedger for PgQuotaLedger {
    async fn account(&self, user_id: &str) -> Result<QuotaAccount> {
        self.database
            .ensure_quota_account(user_id, self.signup_grant)
            .await?;

        self.database
            .get_quota_account(user_id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("quota account vanished after insert")))
    }

    async fn deduct(&self, user_id: &str, points: i64) -> Result<i64> {
        match self.database.deduct_points(user_id, points).await? {
            Some(remaining) => {
                tracing::debug!(user_id, points, remaining, "points deducted");
                Ok(remaining)
            }
            None => Err(AppError::InsufficientQuota),
        }
    }

    async fn add(&self, user_id: &str, points: i64) -> Result<i64> {
        match self.database.add_points(user_id, points).await? {
            Some(remaining) => {
                tracing::debug!(user_id, points, remaining, "points returned");
                Ok(remaining)
            }
            None => Err(AppError::Internal(anyhow::anyhow!(
                "refund target account does not exist"
            ))),
        }
    }
}
