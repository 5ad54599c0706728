//! Guarded DB MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools for AI assistants
//! to interact with a SQL database (SQLite, PostgreSQL, MySQL).

use clap::Parser;
use guarded_db_mcp::config::{Config, TransportMode};
use guarded_db_mcp::db::{ConnectionProvider, PlanGuard, QueryExecutor};
use guarded_db_mcp::error::DbError;
use guarded_db_mcp::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; stdout belongs to the stdio transport.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    let db_config = config.database().map_err(|e| {
        DbError::connection(e, "Use postgres://, mysql:// or sqlite: connection strings")
    })?;

    info!(
        transport = %config.transport,
        db_type = %db_config.db_type,
        read_only = config.read_only,
        explain_check = config.with_explain_check,
        "Starting Guarded DB MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    // The pool is opened by the first tool call, not here
    let provider = Arc::new(ConnectionProvider::new(db_config));
    let executor = Arc::new(QueryExecutor::new(
        provider,
        PlanGuard::new(config.with_explain_check),
    ));

    // Run the appropriate transport
    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            let transport = StdioTransport::new(executor, config.read_only);
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                executor,
                config.read_only,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
