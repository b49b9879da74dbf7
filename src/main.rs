//! CodeJudge - Application Entry Point
//!
//! This is the main entry point for the submission gateway.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use redis::Client as RedisClient;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use codejudge::{
    config::{Config, LogFormat, RateLimitBackend},
    db,
    db::repositories::{PgProblemStore, PgSubmissionStore},
    handlers,
    queue::{JobPublisher, QueueClient, RedisConnector},
    services::{
        JobQueues, LeaderboardService, MemoryRateLimitStore, RateLimitStore, RateLimiter,
        RedisRateLimitStore, SubmissionService,
    },
    state::AppState,
};

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.rust_log));

    let registry = tracing_subscriber::registry().with(filter);
    match config.server.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;
    init_tracing(&config);

    tracing::info!("Starting CodeJudge submission gateway...");

    // Initialize database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database).await?;

    // Run database migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&db_pool).await?;

    // Connect to the job broker; without it no submission can be accepted
    tracing::info!(url = %config.broker.url, "Connecting to job broker...");
    let connector = RedisConnector::new(&config.broker.url, config.broker.consumer_group.clone())?;
    let queue = QueueClient::from_config(connector, &config.broker);
    queue
        .connect()
        .await
        .context("Job broker unreachable, refusing to start")?;
    let monitor = queue.spawn_monitor(config.broker.monitor_interval);

    let rate_limit_store: Arc<dyn RateLimitStore> = match config.rate_limit.backend {
        RateLimitBackend::Redis => {
            tracing::info!("Connecting to Redis for rate limiting...");
            let client = RedisClient::open(config.redis.url.as_str())?;
            let conn = redis::aio::ConnectionManager::new(client).await?;
            Arc::new(RedisRateLimitStore::new(conn))
        }
        RateLimitBackend::Memory => Arc::new(MemoryRateLimitStore::new()),
    };

    let submissions = Arc::new(PgSubmissionStore::new(db_pool.clone()));
    let problems = Arc::new(PgProblemStore::new(db_pool.clone()));
    let publisher: Arc<dyn JobPublisher> = Arc::new(queue.clone());

    let submission_service = SubmissionService::new(
        submissions.clone(),
        problems,
        publisher.clone(),
        config.submission.clone(),
        JobQueues::from(&config.broker),
    );
    let leaderboard = LeaderboardService::new(submissions);
    let rate_limiter = RateLimiter::new(rate_limit_store, config.rate_limit.clone());

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    // Create application state
    let state = AppState::new(
        db_pool,
        config,
        submission_service,
        leaderboard,
        rate_limiter,
        publisher,
    );

    let app = handlers::build_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    queue.close();
    monitor.abort();
    tracing::info!("Server stopped");

    Ok(())
}
