use crate::config::Config;
use crate::error::{GuardError, Result};
use crate::fixed_window::now_millis;
use crate::guard::Guard;
use crate::handlers::{health_check, not_found, rate_limit_status};
use crate::middleware::{logging_middleware, security_middleware};
use crate::rate_limiter::RateLimiter;
use crate::redis::RedisStore;
use crate::route_policy::RoutePolicy;
use crate::store::{MemoryStore, WindowStore};
use axum::routing::get;
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Router with every route wrapped by logging and security middleware.
pub fn create_app(guard: Guard) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/rate-limit", get(rate_limit_status))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(logging_middleware))
                .layer(middleware::from_fn_with_state(
                    guard.clone(),
                    security_middleware,
                ))
                .layer(CorsLayer::permissive()),
        )
        .with_state(guard)
}

pub struct Server {
    app: Router,
    bind_addr: SocketAddr,
    sweeper: Option<(Arc<MemoryStore>, Duration, Duration)>,
}

impl Server {
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let policy = match &config.route_policy_file {
            Some(path) => RoutePolicy::from_json_file(path)?,
            None => RoutePolicy::default(),
        };

        let mut sweeper = None;
        let store: Arc<dyn WindowStore> = match &config.redis_url {
            Some(url) => {
                tracing::info!("Using Redis window store");
                Arc::new(RedisStore::connect(url).await?)
            }
            None => {
                let memory = Arc::new(MemoryStore::new(config.max_tracked_clients));
                sweeper = Some((
                    memory.clone(),
                    policy.window,
                    Duration::from_secs(config.cleanup_interval_secs),
                ));
                memory
            }
        };

        let guard = Guard::new(
            RateLimiter::new(store, policy.window),
            policy,
            config.environment,
            config.rate_limiting_enabled(),
        );

        tracing::info!(
            environment = %config.environment,
            rate_limiting = guard.rate_limiting(),
            default_limit = guard.policy().default_limit,
            "Security gate configured"
        );

        Ok(Self {
            app: create_app(guard),
            bind_addr: config.bind_addr,
            sweeper,
        })
    }

    pub async fn run(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.bind_addr)
            .await
            .map_err(|e| GuardError::Internal(format!("Failed to bind {}: {}", self.bind_addr, e)))?;

        if let Some((store, window, interval)) = self.sweeper {
            tokio::spawn(sweep_expired_windows(store, window, interval));
        }

        tracing::info!("catalog-guard listening on {}", self.bind_addr);
        tracing::info!("Health check available at /api/health");

        axum::serve(
            listener,
            self.app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GuardError::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }
}

async fn sweep_expired_windows(store: Arc<MemoryStore>, window: Duration, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match store.sweep_expired(window, now_millis()) {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed, "Swept expired rate windows"),
            Err(e) => tracing::warn!(error = %e, "Failed to sweep rate windows"),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
