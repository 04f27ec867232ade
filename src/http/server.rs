//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the axum Router: health route, then the catch-all gateway route
//! - Wire up middleware (tracing)
//! - Serve with graceful shutdown bound to the shared cancellation token

use std::sync::Arc;

use axum::http::uri::InvalidUri;
use axum::routing::{any, get};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::http::handler::{gateway_handler, GatewayState};

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Assemble the router and its shared state.
    pub fn new(config: &Config, shutdown: CancellationToken) -> Result<Self, InvalidUri> {
        let state = Arc::new(GatewayState::new(config, shutdown)?);
        let router = Router::new()
            // The health path is a thin fixed-response layer in front of the
            // gateway logic; it never touches the readiness gate or budgets.
            .route(&config.health_endpoint, get(health))
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http());
        Ok(Self { router })
    }

    /// Run the server until the token fires, then drain and close.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "gateway listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        tracing::info!("gateway stopped");
        Ok(())
    }
}

async fn health() -> &'static str {
    "OK"
}
