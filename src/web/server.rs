//! Web server for feedy.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::function::function;
use crate::config::ServerConfig;
use crate::service::UseCase;
use crate::{FeedyError, Result};

/// Create the webhook router.
pub fn create_router(usecase: Arc<UseCase>) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/channeltalk/function", put(function))
        .layer(TraceLayer::new_for_http())
        .with_state(usecase)
}

/// Liveness check.
async fn ping() -> &'static str {
    "pong"
}

/// Webhook server.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    usecase: Arc<UseCase>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &ServerConfig, usecase: Arc<UseCase>) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| {
                FeedyError::Config(format!(
                    "invalid server address {}:{}: {e}",
                    config.host, config.port
                ))
            })?;

        Ok(Self { addr, usecase })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Run the web server until the listener fails.
    pub async fn run(self) -> Result<()> {
        let router = create_router(self.usecase);

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await?;
        Ok(())
    }
}
