//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use super::router;
use super::state::AppState;
use crate::error::{ConvertFlowError, Result};

/// HTTP server for the conversion API.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    state: Arc<AppState>,
}

impl HttpServer {
    pub fn new(addr: SocketAddr, state: Arc<AppState>) -> Self {
        Self { addr, state }
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;

        info!(
            addr = %self.addr,
            api_prefix = %self.state.api_prefix,
            "Starting HTTP server"
        );

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                ConvertFlowError::Io(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConvertFlowConfig;
    use crate::ratelimit::SystemClock;

    #[tokio::test]
    async fn test_server_starts_and_stops() {
        let config = ConvertFlowConfig::default();
        let state = Arc::new(AppState::from_config(&config, Arc::new(SystemClock)).unwrap());
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();

        let server = HttpServer::new(addr, state);
        server.serve_with_shutdown(async {}).await.unwrap();
    }
}
