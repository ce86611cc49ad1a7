use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::errors::{AppError, Result};
use crate::storage::Storage;

/// Filesystem backend. Stored objects are served back under
/// `{public_base_url}/files/{key}` by the application's static-file route.
pub struct LocalStorage {
    base_path: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub fn new<P: AsRef<Path>>(base_path: P, public_base_url: &str) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();

        std::fs::create_dir_all(&base_path)
            .map_err(|e| AppError::Storage(format!("Failed to create storage directory: {}", e)))?;

        Ok(Self {
            base_path,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn full_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn store(&self, key: &str, data: &[u8], _content_type: &str) -> Result<String> {
        let full_path = self.full_path(key);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {}", e)))?;
        }

        fs::write(&full_path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {}", e)))?;

        Ok(format!("{}/files/{}", self.public_base_url, key))
    }

    async fn retrieve(&self, key: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(key);

        fs::read(&full_path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read file: {}", e)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full_path = self.full_path(key);

        fs::remove_file(&full_path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete file: {}", e)))?;

        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.full_path(key).exists())
    }
}
