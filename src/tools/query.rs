//! Read query tool.
//!
//! This module implements the `read_query` MCP tool. The statement runs with
//! a SELECT intent, so with the plan check enabled anything the engine
//! reports as INSERT, UPDATE or DELETE is denied before it executes.

use crate::db::QueryExecutor;
use crate::error::DbResult;
use crate::models::StatementIntent;
use crate::tools::tabular;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Input for the read_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// SQL statement to execute
    pub query: String,
}

#[derive(Debug, Clone)]
pub struct QueryToolHandler {
    executor: Arc<QueryExecutor>,
}

impl QueryToolHandler {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Arc<QueryExecutor> {
        &self.executor
    }

    pub async fn read_query(&self, input: QueryInput) -> DbResult<String> {
        self.query_csv(&input.query, StatementIntent::Select).await
    }

    /// Run `sql` and render the result set as CSV.
    pub async fn query_csv(&self, sql: &str, intent: StatementIntent) -> DbResult<String> {
        let result = self.executor.query(sql, intent).await?;
        let csv = tabular::encode(&result.rows, &result.columns)?;

        info!(
            db_type = %self.executor.db_type(),
            intent = %intent,
            rows = result.len(),
            "Query executed"
        );

        Ok(csv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_input_deserialize() {
        let json = r#"{"query": "SELECT * FROM users"}"#;
        let input: QueryInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.query, "SELECT * FROM users");
    }

    #[test]
    fn test_query_input_requires_query() {
        let result: Result<QueryInput, _> = serde_json::from_str("{}");
        assert!(result.is_err());
    }
}
