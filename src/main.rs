use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use twfolio::{
    api, config::Config, db::init_db, CachedDataSource, MarketApiDataSource, MarketDataSource,
    Repository, UnconfiguredDataSource,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("configuration error")?;
    let port = config.port;

    let pool = init_db(&config.database_path)
        .await
        .with_context(|| format!("failed to initialize database at {}", config.database_path))?;
    let repo = Arc::new(Repository::new(pool));

    let datasource: Arc<dyn MarketDataSource> = match &config.market_api {
        Some(market_api) => {
            let http = MarketApiDataSource::new(market_api).context("failed to build market data client")?;
            tracing::info!(base_url = %market_api.base_url, "Market data backend configured");
            Arc::new(CachedDataSource::new(
                Arc::new(http),
                Duration::from_millis(config.dividend_cache_ttl_ms),
            ))
        }
        None => {
            tracing::warn!("MARKET_API_BASE_URL not set, quote and rights refreshes are disabled");
            Arc::new(UnconfiguredDataSource)
        }
    };

    let state = api::AppState::new(repo, config, datasource)
        .await
        .context("failed to load settings")?;
    let app = api::create_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
