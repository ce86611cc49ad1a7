use async_trait::async_trait;
use chrono::Utc;
#[cfg(test)]
use mockall::automock;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::{AppError, Result};

pub mod local;
pub mod supabase;

/// Object storage for card artifacts. `store` returns a publicly resolvable
/// URL for the stored blob.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Storage: Send + Sync {
    async fn store(&self, key: &str, data: &[u8], content_type: &str) -> Result<String>;

    async fn retrieve(&self, key: &str) -> Result<Vec<u8>>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;
}

pub fn create_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    match config.storage.backend.as_str() {
        "local" => {
            let storage = local::LocalStorage::new(
                &config.storage.local_path,
                &config.storage.public_base_url,
            )?;
            Ok(Arc::new(storage))
        }
        "supabase" => {
            let base_url = config.storage.supabase_url.as_deref().ok_or_else(|| {
                AppError::Storage("SUPABASE_URL is required for the supabase backend".to_string())
            })?;
            let service_key = config.storage.supabase_service_key.as_deref().ok_or_else(|| {
                AppError::Storage(
                    "SUPABASE_SERVICE_KEY is required for the supabase backend".to_string(),
                )
            })?;
            let storage = supabase::SupabaseStorage::new(
                base_url,
                &config.storage.supabase_bucket,
                service_key,
            );
            Ok(Arc::new(storage))
        }
        other => Err(AppError::Storage(format!(
            "Unsupported storage backend: {}",
            other
        ))),
    }
}

/// Storage key for a new artifact: user prefix, millisecond timestamp, and a
/// short random suffix so bursts from the same user do not collide.
pub fn object_key(user_id: &str, extension: &str) -> String {
    let stamp = Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();

    format!("{}/{}-{}.{}", user_id, stamp, suffix.to_lowercase(), extension)
}
