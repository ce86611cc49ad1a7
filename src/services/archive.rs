use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;

use crate::database::Database;
use crate::errors::{AppError, Result};
use crate::models::Orientation;
use crate::storage::{object_key, Storage};

/// Outcome of persisting a generated card: the history row plus the public
/// URLs for both artifacts.
#[derive(Debug, Clone)]
pub struct SavedCard {
    pub record_id: uuid::Uuid,
    pub image_url: String,
    pub html_url: String,
}

/// Durable persistence for a finished card: both artifact uploads and the
/// history row. Failures here are not compensated by the pipeline.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CardArchive: Send + Sync {
    async fn persist(
        &self,
        user_id: &str,
        prompt_excerpt: &str,
        html: &str,
        png: &[u8],
        orientation: Orientation,
    ) -> Result<SavedCard>;
}

pub struct StorageArchive {
    storage: Arc<dyn Storage>,
    database: Database,
}

impl StorageArchive {
    pub fn new(storage: Arc<dyn Storage>, database: Database) -> Self {
        Self { storage, database }
    }
}

#[async_trait]
impl CardArchive for StorageArchive {
    async fn persist(
        &self,
        user_id: &str,
        prompt_excerpt: &str,
        html: &str,
        png: &[u8],
        orientation: Orientation,
    ) -> Result<SavedCard> {
        // The raster's real dimensions go into the history row; a card that
        // fails to decode is recorded with zeroed dimensions rather than
        // failing the save.
        let (width, height) = match image::load_from_memory(png) {
            Ok(decoded) => (decoded.width() as i32, decoded.height() as i32),
            Err(e) => {
                tracing::warn!("could not decode generated PNG for measurements: {}", e);
                (0, 0)
            }
        };

        let image_key = object_key(user_id, "png");
        let image_url = self
            .storage
            .store(&image_key, png, "image/png")
            .await
            .map_err(persistence_err)?;

        let html_key = object_key(user_id, "html");
        let html_url = self
            .storage
            .store(&html_key, html.as_bytes(), "text/html")
            .await
            .map_err(persistence_err)?;

        let record = self
            .database
            .insert_card(
                user_id,
                &image_url,
                &html_url,
                &image_key,
                &html_key,
                prompt_excerpt,
                orientation.as_str(),
                width,
                height,
            )
            .await
            .map_err(persistence_err)?;

        tracing::info!(
            user_id,
            record_id = %record.id,
            orientation = orientation.as_str(),
            width,
            height,
            "card persisted"
        );

        Ok(SavedCard {
            record_id: record.id,
            image_url: record.image_url,
            html_url: record.html_file_url,
        })
    }
}

fn persistence_err(e: AppError) -> AppError {
    match e {
        already @ AppError::Persistence(_) => already,
        other => AppError::Persistence(other.to_string()),
    }
}
