//! Data models for the guarded DB MCP server.

pub mod connection;
pub mod query;

pub use connection::{DatabaseType, mask_connection_string};
pub use query::{ExecOutcome, QueryRows, ResultRow, Scalar, StatementIntent};
