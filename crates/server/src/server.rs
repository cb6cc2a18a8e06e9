//! Server initialization and routing

use crate::config::ServerConfig;
use crate::middleware::{log_requests, request_id};
use crate::routes::{api_info, chat, health, not_found, predict};
use crate::state::ServerState;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes and middleware
///
/// Middleware runs outermost first: trace, request id, request logging,
/// CORS, compression, timeout.
pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let service_routes = Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics));

    let model_routes = Router::new()
        .route("/predict_cluster", post(predict::predict_cluster))
        .route("/chat", post(chat::chat))
        .layer(DefaultBodyLimit::max(state.config.max_body_size()));

    Router::new()
        .merge(service_routes)
        .merge(model_routes)
        .fallback(not_found)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.timeout(),
        ))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HerHealth HTTP server
///
/// Loads the fitted artifacts, builds the generator and serves until
/// SIGTERM or Ctrl+C. Fails before binding if any artifact is missing or
/// corrupt.
///
/// ```rust,no_run
/// use server::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ServerConfig::load()?;
///     server::start_server(config).await?;
///     Ok(())
/// }
/// ```
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(config.log_level.as_str())
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .init();

    let state = Arc::new(ServerState::new(config.clone())?);
    let app = build_router(state.clone());
    let addr: SocketAddr = config.socket_addr()?;

    tracing::info!(
        %addr,
        model_dir = %config.model_dir.display(),
        clusters = state.serving.n_clusters(),
        generator = state.generator.name(),
        timeout_secs = config.timeout_secs,
        max_body_size_kb = config.max_body_size_kb,
        cors = config.enable_cors,
        metrics = config.metrics_enabled,
        "server_starting"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server_shutdown_complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM. A handler that fails to install never fires.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("shutdown_ctrl_c"),
        _ = terminate => tracing::info!("shutdown_sigterm"),
    }
}
