use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{CardRecord, QuotaAccount};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    /// Builds a pool without opening a connection. Used by tests that only
    /// exercise routes which never touch the database.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect_lazy(database_url)?;

        Ok(Database { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // Quota account operations

    pub async fn ensure_quota_account(&self, user_id: &str, grant_points: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO quota_accounts (user_id, remaining_points, used_points)
            VALUES ($1, $2, 0)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(grant_points)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_quota_account(&self, user_id: &str) -> Result<Option<QuotaAccount>> {
        let account = sqlx::query_as::<_, QuotaAccount>(
            "SELECT user_id, remaining_points, used_points, last_usage_time FROM quota_accounts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Guard and decrement in a single statement so concurrent requests from
    /// the same account cannot both win the last point. Returns the new
    /// balance, or `None` when the balance was too low (or the account does
    /// not exist).
    pub async fn deduct_points(&self, user_id: &str, points: i64) -> Result<Option<i64>> {
        let remaining = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE quota_accounts
            SET remaining_points = remaining_points - $2,
                used_points = used_points + $2,
                last_usage_time = NOW()
            WHERE user_id = $1 AND remaining_points >= $2
            RETURNING remaining_points
            "#,
        )
        .bind(user_id)
        .bind(points)
        .fetch_optional(&self.pool)
        .await?;

        Ok(remaining)
    }

    pub async fn add_points(&self, user_id: &str, points: i64) -> Result<Option<i64>> {
        let remaining = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE quota_accounts
            SET remaining_points = remaining_points + $2
            WHERE user_id = $1
            RETURNING remaining_points
            "#,
        )
        .bind(user_id)
        .bind(points)
        .fetch_optional(&self.pool)
        .await?;

        Ok(remaining)
    }

    // Card history operations

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_card(
        &self,
        user_id: &str,
        image_url: &str,
        html_file_url: &str,
        image_key: &str,
        html_key: &str,
        prompt_excerpt: &str,
        orientation: &str,
        width: i32,
        height: i32,
    ) -> Result<CardRecord> {
        let record = sqlx::query_as::<_, CardRecord>(
            r#"
            INSERT INTO card_history (id, user_id, image_url, html_file_url, image_key, html_key, prompt_excerpt, orientation, width, height)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, user_id, image_url, html_file_url, image_key, html_key, prompt_excerpt, orientation, width, height, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(image_url)
        .bind(html_file_url)
        .bind(image_key)
        .bind(html_key)
        .bind(prompt_excerpt)
        .bind(orientation)
        .bind(width)
        .bind(height)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn list_cards(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CardRecord>> {
        let records = sqlx::query_as::<_, CardRecord>(
            r#"
            SELECT id, user_id, image_url, html_file_url, image_key, html_key, prompt_excerpt, orientation, width, height, created_at
            FROM card_history
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn latest_card(&self, user_id: &str) -> Result<Option<CardRecord>> {
        let record = sqlx::query_as::<_, CardRecord>(
            r#"
            SELECT id, user_id, image_url, html_file_url, image_key, html_key, prompt_excerpt, orientation, width, height, created_at
            FROM card_history
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn get_card(&self, card_id: Uuid) -> Result<Option<CardRecord>> {
        let record = sqlx::query_as::<_, CardRecord>(
            r#"
            SELECT id, user_id, image_url, html_file_url, image_key, html_key, prompt_excerpt, orientation, width, height, created_at
            FROM card_history
            WHERE id = $1
            "#,
        )
        .bind(card_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
