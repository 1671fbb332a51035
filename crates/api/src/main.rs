//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use api::{Backend, create_app, create_state};
use cache::{Cache, InMemoryCache, RedisCache};
use domain::{AesGcmEncryptor, InMemoryCredentialStore};
use ledger::{InMemoryLedger, PostgresLedger, TransactionLimits};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Falls back to an in-process cache when Redis is not configured or unreachable.
async fn connect_cache(config: &Config) -> Arc<dyn Cache> {
    let Some(url) = &config.redis_url else {
        tracing::info!("REDIS_URL not set, using in-memory cache");
        return Arc::new(InMemoryCache::new());
    };
    match RedisCache::connect(url).await {
        Ok(cache) => {
            tracing::info!("connected to redis");
            Arc::new(cache)
        }
        Err(e) => {
            tracing::warn!(error = %e, "redis unavailable, using in-memory cache");
            Arc::new(InMemoryCache::new())
        }
    }
}

async fn serve<L: Backend>(
    config: &Config,
    ledger: L,
    cache: Arc<dyn Cache>,
    metrics_handle: PrometheusHandle,
) {
    let key = config.encryption_key.as_bytes();
    let encryptor = AesGcmEncryptor::new(key).expect("ENCRYPTION_KEY must be exactly 32 bytes");
    if config.uses_development_key() {
        tracing::warn!("ENCRYPTION_KEY not set, using the development key");
    }

    let state = create_state(
        ledger,
        cache,
        Arc::new(encryptor),
        Arc::new(InMemoryCredentialStore::demo()),
        config.cache_ttl,
    );
    let app = create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = config.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Cache
    let cache = connect_cache(&config).await;

    // 4. Ledger, then serve
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await
                .expect("failed to connect to PostgreSQL");
            let ledger = PostgresLedger::new(pool).with_limits(TransactionLimits {
                statement_timeout: config.statement_timeout,
                lock_timeout: config.lock_timeout,
            });
            ledger
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL ledger");
            serve(&config, ledger, cache, metrics_handle).await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory ledger");
            serve(&config, InMemoryLedger::new(), cache, metrics_handle).await;
        }
    }

    tracing::info!("server shut down gracefully");
}
