//! HackJudge - Application Entry Point
//!
//! This is the main entry point for the HackJudge server.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use redis::Client as RedisClient;
use tokio::net::TcpListener;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hackjudge::{
    config::{Config, CONFIG},
    constants::{notification_backends, storage_backends},
    db::{
        self,
        repositories::{BoundedRepository, MemoryRepository, PgEngineRepository},
        EngineRepository,
    },
    handlers,
    notify::{LogNotifier, Notifier, RedisNotifier},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| CONFIG.server.rust_log.clone().into());
    let registry = tracing_subscriber::registry().with(filter);
    if CONFIG.server.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting HackJudge server...");

    let repo = build_repository(&CONFIG).await?;
    let notifier = build_notifier(&CONFIG).await?;

    // Create application state
    let state = AppState::new(repo, notifier, CONFIG.clone());

    // Build the router
    let app = handlers::routes(state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            CONFIG.server.request_timeout_secs,
        )))
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start the server
    let addr = SocketAddr::new(CONFIG.server.host.parse()?, CONFIG.server.port);
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_repository(config: &Config) -> anyhow::Result<Arc<dyn EngineRepository>> {
    let timeout = config.engine.repository_timeout();

    if config.database.backend == storage_backends::MEMORY {
        tracing::warn!("Using in-memory storage; data is lost on shutdown");
        return Ok(Arc::new(BoundedRepository::new(
            MemoryRepository::new(),
            timeout,
        )));
    }

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database).await?;
    db::test_connection(&pool).await?;

    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    Ok(Arc::new(BoundedRepository::new(
        PgEngineRepository::new(pool),
        timeout,
    )))
}

async fn build_notifier(config: &Config) -> anyhow::Result<Arc<dyn Notifier>> {
    if config.notifications.backend != notification_backends::REDIS {
        tracing::info!("Notifications are logged only");
        return Ok(Arc::new(LogNotifier));
    }

    tracing::info!("Connecting to Redis...");
    let client = RedisClient::open(config.redis.url.as_str())?;
    let manager = redis::aio::ConnectionManager::new(client).await?;

    Ok(Arc::new(RedisNotifier::new(
        manager,
        config.notifications.channel.clone(),
    )))
}
