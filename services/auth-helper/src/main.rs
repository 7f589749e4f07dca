//! OAuth code helper
//!
//! Local single-user service that:
//! 1. Sends the browser to the provider's consent page (`/authorize-me`)
//! 2. Trades the returned code for an access/refresh pair (`/auth-code-redirect`)
//! 3. Persists the pair and uses it to call one protected resource (any other path)

mod config;
mod error;
mod metrics;
mod routes;

use anyhow::{Context, Result};
use auth_flow::{AuthFlowController, FlowSettings};
use axum::Router;
use oauth_client::{FileTokenStore, TokenStore};
use resource::{HttpResource, ProtectedResource};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::routes::AppState;

/// How long in-flight requests get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the axum router.
///
/// Every path goes through the dispatcher, regardless of method.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .fallback(routes::handle_request)
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting oauth-code-helper");

    let prometheus_handle = metrics::install_recorder()?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config =
        Config::load_for_startup(cli_config_path).context("failed to load configuration")?;

    info!(
        listen_addr = %config.server.listen_addr,
        credentials_path = %config.oauth.credentials_path.display(),
        token_path = %config.oauth.token_path.display(),
        resource_url = %config.resource.url,
        "configuration loaded"
    );

    // Credentials are required before the port is bound
    let credentials = oauth_client::load_client_credentials(&config.oauth.credentials_path)
        .await
        .with_context(|| {
            format!(
                "failed to load client credentials from {}",
                config.oauth.credentials_path.display()
            )
        })?;
    info!(client_id = %credentials.client_id, "client credentials loaded");

    let timeout = Duration::from_secs(config.resource.timeout_secs);
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build HTTP client")?;

    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(&config.oauth.token_path));
    let controller = Arc::new(AuthFlowController::new(
        credentials,
        FlowSettings {
            redirect_uri: config.oauth.redirect_uri.clone(),
            scope: config.oauth.scope.clone(),
        },
        store,
        client.clone(),
    ));
    let resource: Arc<dyn ProtectedResource> =
        Arc::new(HttpResource::new(client, config.resource.url.clone(), timeout));

    let app_state = AppState {
        controller,
        resource,
        landing_path: Arc::from(config.oauth.landing_path.as_str()),
    };
    let app = build_router(app_state, config.server.max_connections);

    if let Some(metrics_addr) = config.server.metrics_addr {
        let metrics_listener = TcpListener::bind(metrics_addr)
            .await
            .with_context(|| format!("failed to bind metrics listener to {metrics_addr}"))?;
        info!(addr = %metrics_addr, "serving metrics");
        let metrics_app = metrics::router(prometheus_handle);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, metrics_app).await {
                error!(error = %e, "metrics listener failed");
            }
        });
    }

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires: the server is
    // told to drain, then raced against DRAIN_TIMEOUT.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => info!("all in-flight requests drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!(
            drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
///
/// If a handler cannot be installed, that signal source never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
