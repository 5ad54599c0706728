//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.

use crate::db::QueryExecutor;
use crate::error::{DbError, DbResult};
use crate::mcp::DbService;
use crate::transport::{Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing::{info, warn};

/// Stdio transport implementation.
///
/// This transport reads JSON-RPC messages from stdin and writes
/// responses to stdout, following the MCP protocol specification.
pub struct StdioTransport {
    executor: Arc<QueryExecutor>,
    read_only: bool,
}

impl StdioTransport {
    /// Create a new stdio transport.
    ///
    /// # Arguments
    ///
    /// * `executor` - Shared executor for database operations
    /// * `read_only` - Whether the mutation tools are withheld
    pub fn new(executor: Arc<QueryExecutor>, read_only: bool) -> Self {
        Self {
            executor,
            read_only,
        }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!("Starting MCP server with stdio transport");

        let service = DbService::new(self.executor.clone(), self.read_only);

        // Create the stdio transport and run the service
        let transport = stdio();
        let running_service = service
            .serve(transport)
            .await
            .map_err(|e| DbError::internal(format!("Failed to start stdio transport: {}", e)))?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => {
                        info!("Stdio transport completed normally");
                    }
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        self.executor.provider().close().await;
                        return Err(DbError::internal(format!(
                            "Stdio transport error: {}",
                            e
                        )));
                    }
                }
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            // Spawn a task to listen for second signal and force exit
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        self.executor.provider().close().await;

        if shutdown_requested {
            // Force exit since stdio may still be blocking on stdin
            // tokio::select! cannot interrupt blocking stdin reads
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ConnectionProvider, PlanGuard};

    #[test]
    fn test_stdio_transport_creation() {
        let provider = ConnectionProvider::from_dsn("sqlite::memory:").unwrap();
        let executor = Arc::new(QueryExecutor::new(Arc::new(provider), PlanGuard::default()));
        let transport = StdioTransport::new(executor, true);
        assert_eq!(transport.name(), "stdio");
    }
}
