use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;

use crate::{
    config::Config,
    database::Database,
    errors::Result,
    services::{
        archive::StorageArchive, generator::CardGenerator, ledger::PgQuotaLedger,
        renderer::ChromeRenderer, summarizer::ChatCompletionSummarizer,
    },
    storage::{create_storage, Storage},
};

pub mod cards;
pub mod docs;
pub mod generate;
pub mod health;
pub mod metrics;
pub mod quota;

#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub generator: Arc<CardGenerator>,
    pub ledger: Arc<PgQuotaLedger>,
    pub metrics: PrometheusHandle,
}

impl AppState {
    pub fn build(config: Config, database: Database) -> Result<Self> {
        let storage = create_storage(&config)?;

        let ledger = Arc::new(PgQuotaLedger::new(
            database.clone(),
            config.signup_grant_points,
        ));
        let summarizer = Arc::new(ChatCompletionSummarizer::new(config.llm.clone()));
        let renderer = Arc::new(ChromeRenderer::new(config.render.clone()));
        let archive = Arc::new(StorageArchive::new(storage.clone(), database.clone()));

        let generator = Arc::new(CardGenerator::new(
            ledger.clone(),
            summarizer,
            renderer,
            archive,
            config.render.clone(),
        ));

        // The recorder is process-global; when several states are built in
        // one process (tests), later builds reuse the first recorder.
        let recorder = PrometheusBuilder::new().build_recorder();
        let metrics = recorder.handle();
        if ::metrics::set_global_recorder(recorder).is_err() {
            tracing::debug!("metrics recorder already installed");
        }

        Ok(Self {
            database,
            config,
            storage,
            generator,
            ledger,
            metrics,
        })
    }
}
