use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod prompts;
pub mod services;
pub mod storage;

pub use handlers::AppState;

pub fn create_app(state: AppState) -> Router {
    let api = Router::new()
        .route("/cards/generate", post(handlers::generate::generate_card))
        .route("/cards/history", get(handlers::cards::history))
        .route("/cards/latest", get(handlers::cards::latest))
        .route("/cards/:id/image", get(handlers::cards::download_image))
        .route("/cards/:id/html", get(handlers::cards::download_html))
        .route("/quota", get(handlers::quota::get_quota));

    let mut app = Router::new()
        .nest("/api/v1", api)
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        .route("/metrics", get(handlers::metrics::prometheus))
        .merge(handlers::docs::create_docs_router());

    // The local backend serves its artifacts itself; other backends hand out
    // absolute URLs.
    if state.config.storage.backend == "local" {
        app = app.nest_service("/files", ServeDir::new(&state.config.storage.local_path));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
