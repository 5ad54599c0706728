//! Streamable HTTP transport.
//!
//! Each MCP session gets its own `DbService`, all of them sharing the one
//! executor and therefore the one pool. Responses stream back over SSE.

use crate::db::QueryExecutor;
use crate::error::{DbError, DbResult};
use crate::mcp::DbService;
use crate::transport::{Transport, wait_for_signal};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// How long open SSE streams may hold the process after the first signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpTransport {
    executor: Arc<QueryExecutor>,
    read_only: bool,
    host: String,
    port: u16,
    /// Path the MCP service is mounted on, `/` for the whole server
    endpoint: String,
}

impl HttpTransport {
    pub fn new(
        executor: Arc<QueryExecutor>,
        read_only: bool,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            read_only,
            host: host.into(),
            port,
            endpoint: endpoint.into(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn router(&self) -> axum::Router {
        let executor = self.executor.clone();
        let read_only = self.read_only;
        let service = StreamableHttpService::new(
            move || Ok(DbService::new(executor.clone(), read_only)),
            LocalSessionManager::default().into(),
            Default::default(),
        );

        // nest_service rejects "/"
        if self.endpoint == "/" {
            axum::Router::new().fallback_service(service)
        } else {
            axum::Router::new().nest_service(&self.endpoint, service)
        }
    }

    async fn serve(&self, listener: TcpListener) -> DbResult<()> {
        let signalled = Arc::new(Notify::new());
        let on_signal = signalled.clone();
        let server = axum::serve(listener, self.router()).with_graceful_shutdown(async move {
            wait_for_signal().await;
            on_signal.notify_one();
        });

        tokio::select! {
            result = server => match result {
                Ok(()) => {
                    info!("HTTP server stopped");
                    Ok(())
                }
                Err(e) => {
                    error!(error = %e, "HTTP server error");
                    Err(DbError::internal(format!("HTTP server error: {}", e)))
                }
            },
            _ = async {
                signalled.notified().await;
                info!(
                    timeout_secs = DRAIN_TIMEOUT.as_secs(),
                    "Draining open sessions (signal again to exit now)"
                );
                tokio::select! {
                    _ = tokio::time::sleep(DRAIN_TIMEOUT) => warn!("Drain timeout, forcing exit"),
                    _ = wait_for_signal() => warn!("Second signal, forcing exit"),
                }
            } => Ok(()),
        }
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> DbResult<()> {
        let bind_addr = self.bind_addr();
        let result = match TcpListener::bind(&bind_addr).await {
            Ok(listener) => {
                info!(
                    addr = %bind_addr,
                    endpoint = %self.endpoint,
                    read_only = self.read_only,
                    "Serving MCP over HTTP"
                );
                self.serve(listener).await
            }
            Err(e) => Err(DbError::connection(
                format!("Failed to bind to {}: {}", bind_addr, e),
                "Check that the port is available",
            )),
        };

        self.executor.provider().close().await;
        result
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
