//! MCP tool implementations.
//!
//! This module contains all database tool handlers:
//! - `query`: `read_query`
//! - `write`: `create_table`, `alter_table`, `write_query`, `update_query`, `delete_query`
//! - `schema`: `list_database`, `list_table`, `desc_table`, `count_query`
//! - `tabular`: CSV rendering of result sets

pub mod query;
pub mod schema;
pub mod tabular;
pub mod write;

pub use query::{QueryInput, QueryToolHandler};
pub use schema::{SchemaToolHandler, TableNameInput};
pub use write::{ExecuteInput, WriteToolHandler};
