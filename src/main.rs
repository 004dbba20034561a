use std::sync::Arc;

use giftwise_api::{
    api::{create_router, AppState},
    config::Config,
    db,
    services::{
        providers::{amazon::AmazonSearchProvider, gemini::GeminiProvider},
        rate_limit::FixedDelayLimiter,
        sessions::GiftService,
    },
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "giftwise_api=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let store = Arc::new(db::PostgresGiftStore::new(pool));
    let gemini = Arc::new(GeminiProvider::new(
        config.suggestion_api_key.clone(),
        config.suggestion_api_url.clone(),
        config.suggestion_model.clone(),
    ));
    let search = Arc::new(AmazonSearchProvider::new(
        config.search_api_key.clone(),
        config.search_api_url.clone(),
    ));

    let gifts = Arc::new(GiftService::new(
        store,
        gemini.clone(),
        search,
        gemini,
        Arc::new(FixedDelayLimiter::default()),
        config.search_region.clone(),
    ));

    let app = create_router(AppState::new(gifts));

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(host = %config.host, port = config.port, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
