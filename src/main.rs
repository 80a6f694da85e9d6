//! Account Server - user accounts behind a JSON API
//!
//! Binary entry point: wires configuration, the cache backend, mail delivery
//! and the HTTP router, then serves until SIGINT/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use account_server::cache::{CacheBackend, MemoryBackend, RedisBackend, ResponseCache};
use account_server::config::CacheBackendKind;
use account_server::mail::{LogMailer, Mailer, SmtpMailer};
use account_server::users::InMemoryUserStore;
use account_server::{create_router, spawn_cleanup_task, AppState, Config};

/// Whatever needs tearing down once the server stops accepting requests.
enum CacheRuntime {
    Redis(Arc<RedisBackend>),
    Memory(JoinHandle<()>),
}

impl CacheRuntime {
    fn shutdown(self) {
        match self {
            CacheRuntime::Redis(backend) => backend.close(),
            CacheRuntime::Memory(cleanup_handle) => {
                cleanup_handle.abort();
                warn!("Cleanup task aborted");
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "account_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Account Server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, cache_backend={:?}, cache_ttl={}s",
        config.server_port, config.cache_backend, config.cache_ttl
    );

    let (backend, runtime): (Arc<dyn CacheBackend>, CacheRuntime) = match config.cache_backend {
        CacheBackendKind::Redis => {
            // Never fatal: a disconnected backend only bypasses the cache
            let redis = Arc::new(RedisBackend::open(&config.redis_url).await);
            let backend: Arc<dyn CacheBackend> = redis.clone();
            (backend, CacheRuntime::Redis(redis))
        }
        CacheBackendKind::Memory => {
            let memory = Arc::new(MemoryBackend::new(config.cache_max_entries));
            let cleanup_handle = spawn_cleanup_task(memory.store(), config.cleanup_interval);
            info!("Background cleanup task started");
            let backend: Arc<dyn CacheBackend> = memory;
            (backend, CacheRuntime::Memory(cleanup_handle))
        }
    };

    let mailer: Arc<dyn Mailer> = if config.mail.host.is_some() {
        Arc::new(SmtpMailer::new(&config.mail).context("invalid mail configuration")?)
    } else {
        warn!("EMAIL_HOST not set, outgoing mail will only be logged");
        Arc::new(LogMailer::new())
    };

    let state = AppState::from_config(
        &config,
        ResponseCache::new(backend),
        Arc::new(InMemoryUserStore::new()),
        mailer,
    );
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    runtime.shutdown();
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
