//! Clubhouse fan-out worker entry point.

use std::sync::Arc;
use std::time::Duration;

use apalis::prelude::*;
use apalis_redis::RedisStorage;
use clubhouse_common::Config;
use clubhouse_core::{DisabledPushGateway, HttpPushGateway, MessageFanoutService, PushGateway};
use clubhouse_db::repositories::{
    CommunityMemberRepository, NotificationRepository, PushTokenRepository,
};
use clubhouse_queue::workers::{FanoutContext, message_created_worker};
use clubhouse_queue::{MessageCreatedJob, RetryConfig};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received SIGINT, initiating graceful shutdown...");
            },
            _ = terminate.recv() => {
                info!("Received SIGTERM, initiating graceful shutdown...");
            },
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received SIGINT, initiating graceful shutdown...");
    }

    Ok(())
}

/// Initialize tracing. `CLUBHOUSE_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,clubhouse_core=debug,clubhouse_queue=debug".into());
    let json = std::env::var("CLUBHOUSE_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn push_gateway(config: &Config) -> anyhow::Result<Arc<dyn PushGateway>> {
    match &config.push {
        Some(push) => {
            info!(endpoint = %push.endpoint, "Push delivery enabled");
            Ok(Arc::new(HttpPushGateway::new(push)?))
        }
        None => {
            warn!("No push configuration found, push delivery disabled");
            Ok(Arc::new(DisabledPushGateway))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting clubhouse fan-out worker...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = Arc::new(clubhouse_db::init(&config.database).await?);
    info!("Connected to database");

    info!("Running database migrations...");
    clubhouse_db::migrate(&db).await?;

    // Connect to Redis and initialize job queue
    info!("Connecting to Redis...");
    let redis_client = redis::Client::open(config.redis.url.as_str())?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client).await?;
    let storage = RedisStorage::<MessageCreatedJob>::new(redis_conn);
    info!("Connected to Redis job queue");

    let fanout = MessageFanoutService::new(
        Arc::new(CommunityMemberRepository::new(db.clone())),
        Arc::new(PushTokenRepository::new(db.clone())),
        Arc::new(NotificationRepository::new(db)),
        push_gateway(&config)?,
        &config.fanout,
    );

    let retry = RetryConfig::from(&config.worker);
    info!(
        concurrency = config.worker.concurrency,
        max_attempts = retry.max_attempts(),
        "Starting message fan-out worker"
    );

    let monitor = Monitor::new()
        .register({
            WorkerBuilder::new("message-fanout")
                .concurrency(config.worker.concurrency)
                .retry(retry.policy())
                .data(FanoutContext::new(fanout))
                .backend(storage)
                .build_fn(message_created_worker)
        })
        .shutdown_timeout(Duration::from_secs(30));

    monitor.run_with_signal(shutdown_signal()).await?;

    info!("Worker shutdown complete");
    Ok(())
}
