//! MCP service implementation using rmcp.
//!
//! This module defines the DbService struct with all database tools
//! exposed via the MCP protocol using the rmcp framework's macros.
//! Read tools and mutation tools live in separate routers so read-only
//! mode can leave the mutation tools out of the tool list entirely.

use crate::db::QueryExecutor;
use crate::models::StatementIntent;
use crate::tools::query::{QueryInput, QueryToolHandler};
use crate::tools::schema::{SchemaToolHandler, TableNameInput};
use crate::tools::write::{ExecuteInput, WriteToolHandler};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

fn text_result(text: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}

#[derive(Clone)]
pub struct DbService {
    query: QueryToolHandler,
    schema: SchemaToolHandler,
    write: WriteToolHandler,
    read_only: bool,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl DbService {
    /// Create a new DbService instance.
    ///
    /// # Arguments
    ///
    /// * `executor` - Shared executor every tool runs its statements through
    /// * `read_only` - When true, only the read tools are registered
    pub fn new(executor: Arc<QueryExecutor>, read_only: bool) -> Self {
        let query = QueryToolHandler::new(executor.clone());
        let tool_router = if read_only {
            Self::read_tool_router()
        } else {
            Self::read_tool_router() + Self::write_tool_router()
        };

        Self {
            schema: SchemaToolHandler::new(query.clone()),
            write: WriteToolHandler::new(executor),
            query,
            read_only,
            tool_router,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    async fn execute(
        &self,
        input: ExecuteInput,
        intent: StatementIntent,
    ) -> Result<CallToolResult, McpError> {
        let summary = self.write.execute(input, intent).await?;
        Ok(text_result(summary))
    }
}

#[tool_router(router = read_tool_router)]
impl DbService {
    #[tool(description = "List all databases available on the connected server.")]
    async fn list_database(&self) -> Result<CallToolResult, McpError> {
        let csv = self.schema.list_databases().await?;
        Ok(text_result(csv))
    }

    #[tool(description = "List all tables in the database, with their schema.")]
    async fn list_table(&self) -> Result<CallToolResult, McpError> {
        let csv = self.schema.list_tables().await?;
        Ok(text_result(csv))
    }

    #[tool(description = "Describe a table by returning its CREATE TABLE statement.")]
    async fn desc_table(
        &self,
        Parameters(input): Parameters<TableNameInput>,
    ) -> Result<CallToolResult, McpError> {
        let csv = self.schema.describe_table(input).await?;
        Ok(text_result(csv))
    }

    #[tool(description = "Execute a read-only SQL query and return the result as CSV.")]
    async fn read_query(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<CallToolResult, McpError> {
        let csv = self.query.read_query(input).await?;
        Ok(text_result(csv))
    }

    #[tool(description = "Count the rows in a table.")]
    async fn count_query(
        &self,
        Parameters(input): Parameters<TableNameInput>,
    ) -> Result<CallToolResult, McpError> {
        let csv = self.schema.count_rows(input).await?;
        Ok(text_result(csv))
    }
}

#[tool_router(router = write_tool_router)]
impl DbService {
    #[tool(description = "Create a new table with a CREATE TABLE statement.")]
    async fn create_table(
        &self,
        Parameters(input): Parameters<ExecuteInput>,
    ) -> Result<CallToolResult, McpError> {
        self.execute(input, StatementIntent::Unchecked).await
    }

    #[tool(description = "Alter an existing table with an ALTER TABLE statement.")]
    async fn alter_table(
        &self,
        Parameters(input): Parameters<ExecuteInput>,
    ) -> Result<CallToolResult, McpError> {
        self.execute(input, StatementIntent::Unchecked).await
    }

    #[tool(
        description = "Execute an INSERT statement. Returns the affected rows and the last insert id."
    )]
    async fn write_query(
        &self,
        Parameters(input): Parameters<ExecuteInput>,
    ) -> Result<CallToolResult, McpError> {
        self.execute(input, StatementIntent::Insert).await
    }

    #[tool(description = "Execute an UPDATE statement. Returns the affected rows.")]
    async fn update_query(
        &self,
        Parameters(input): Parameters<ExecuteInput>,
    ) -> Result<CallToolResult, McpError> {
        self.execute(input, StatementIntent::Update).await
    }

    #[tool(description = "Execute a DELETE statement. Returns the affected rows.")]
    async fn delete_query(
        &self,
        Parameters(input): Parameters<ExecuteInput>,
    ) -> Result<CallToolResult, McpError> {
        self.execute(input, StatementIntent::Delete).await
    }
}

#[tool_handler]
impl ServerHandler for DbService {
    fn get_info(&self) -> ServerInfo {
        let mode = if self.read_only {
            "The server is read-only: only list_database, list_table, desc_table, \
             read_query and count_query are available."
        } else {
            "Use create_table and alter_table for DDL, and write_query, update_query \
             or delete_query for statements of that kind."
        };

        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_owned(),
                title: Some("Guarded DB MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Database tools for a single SQL database.\n\
                \n\
                Query results are returned as CSV with a header line. \
                Mutations return a summary of affected rows.\n\
                When the plan check is enabled, every statement is explained first \
                and denied if the engine reports a different kind of statement than \
                the tool it was sent to.\n\
                \n\
                {}",
                mode
            )),
        }
    }
}
