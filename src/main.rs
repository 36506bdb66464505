use palate_api::api::{create_router, AppState};
use palate_api::config::Config;
use palate_api::db::{self, Cache};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("palate_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    sqlx::migrate!().run(&pool).await?;

    // The Redis cache is optional; running without it only costs
    // recomputation of recommendation lists
    let (cache, cache_writer) = if config.redis_url.is_empty() {
        (None, None)
    } else {
        match db::create_redis_client(&config.redis_url) {
            Ok(client) => {
                let (cache, handle) = Cache::new(client).await;
                (Some(cache), Some(handle))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, serving without cache");
                (None, None)
            }
        }
    };

    let state = AppState::postgres(pool, cache, config.cache_ttl_secs);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(host = %config.host, port = config.port, "Server running");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Flush pending cache writes and invalidations before exit
    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}
