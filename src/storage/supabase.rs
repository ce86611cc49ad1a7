use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::errors::{AppError, Result};
use crate::storage::Storage;

/// Supabase Storage backend. Objects are written through the authenticated
/// object API and exposed through the bucket's public URL space.
pub struct SupabaseStorage {
    client: Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

impl SupabaseStorage {
    pub fn new(base_url: &str, bucket: &str, service_key: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            service_key: service_key.to_string(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, key)
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, key
        )
    }
}

#[async_trait]
impl Storage for SupabaseStorage {
    async fn store(&self, key: &str, data: &[u8], content_type: &str) -> Result<String> {
        let response = self
            .client
            .post(self.object_url(key))
            .bearer_auth(&self.service_key)
            .header("content-type", content_type)
            .header("cache-control", "max-age=3600")
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Supabase upload failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!(
                "Supabase upload rejected ({}): {}",
                status, body
            )));
        }

        Ok(self.public_url(key))
    }

    async fn retrieve(&self, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(self.object_url(key))
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Supabase download failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound);
        }
        if !response.status().is_success() {
            return Err(AppError::Storage(format!(
                "Supabase download rejected: {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Storage(format!("Supabase download failed: {}", e)))?;

        Ok(bytes.to_vec())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.object_url(key))
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Supabase delete failed: {}", e)))?;

        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(AppError::Storage(format!(
                "Supabase delete rejected: {}",
                response.status()
            )));
        }

        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let response = self
            .client
            .get(self.object_url(key))
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Supabase lookup failed: {}", e)))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(AppError::Storage(format!(
                "Supabase lookup rejected: {}",
                status
            ))),
        }
    }
}
