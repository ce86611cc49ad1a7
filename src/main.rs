use summary_card_server::{config::Config, create_app, database::Database, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("summary_card_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let port = config.port;

    let database = Database::new(&config.database_url).await?;
    database.migrate().await?;
    tracing::info!("connected to database, migrations applied");

    let state = AppState::build(config, database)?;
    let app = create_app(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
