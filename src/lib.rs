//! Guarded DB MCP Server Library
//!
//! This library exposes a single SQL database (SQLite, PostgreSQL, MySQL) to
//! AI assistants as MCP tools, with an optional EXPLAIN-based check that a
//! statement really is the kind of statement the calling tool claims.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::DbService;
