//! HTTP server assembly and lifecycle

use std::net::SocketAddr;

use axum::{Router, middleware};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::require_auth;
use crate::core::{Config, Result, ServerState};

/// Build the router without state so tests can assemble the same app
/// the server runs.
pub fn build_app() -> Router<ServerState> {
    Router::new()
        .merge(crate::api::health::router())
        .merge(crate::api::meals::router())
        .merge(crate::api::reservations::router())
}

pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Reuse an already-initialized state instead of building one in
    /// [`run`](Self::run)
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    /// Bind and serve until ctrl-c.
    ///
    /// Authentication wraps the whole router; [`require_auth`] skips
    /// non-`/api` paths internally so the health probes stay open.
    pub async fn run(&self) -> Result<()> {
        let state = match &self.state {
            Some(state) => state.clone(),
            None => ServerState::initialize(&self.config),
        };

        let app = build_app()
            .layer(middleware::from_fn_with_state(state.clone(), require_auth))
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http());

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Canteen server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
