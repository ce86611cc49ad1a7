use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Per-user point balance. Rows are created with the signup grant the first
/// time a user is seen and are never deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuotaAccount {
    pub user_id: String,
    pub remaining_points: i64,
    pub used_points: i64,
    pub last_usage_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuotaResponse {
    pub remaining_points: i64,
    pub used_points: i64,
    pub last_usage_time: Option<DateTime<Utc>>,
}

impl From<QuotaAccount> for QuotaResponse {
    fn from(account: QuotaAccount) -> Self {
        Self {
            remaining_points: account.remaining_points,
            used_points: account.used_points,
            last_usage_time: account.last_usage_time,
        }
    }
}
