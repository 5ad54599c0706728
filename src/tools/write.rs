//! Mutation tools.
//!
//! This module implements `create_table`, `alter_table`, `write_query`,
//! `update_query` and `delete_query`. All of them execute the given statement
//! and differ only in the intent the plan guard checks it against.

use crate::db::QueryExecutor;
use crate::error::DbResult;
use crate::models::StatementIntent;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Input for the mutation tools.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteInput {
    /// SQL statement to execute
    pub query: String,
}

#[derive(Debug, Clone)]
pub struct WriteToolHandler {
    executor: Arc<QueryExecutor>,
}

impl WriteToolHandler {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    /// Execute the statement and return its summary line.
    pub async fn execute(&self, input: ExecuteInput, intent: StatementIntent) -> DbResult<String> {
        let outcome = self.executor.execute(&input.query, intent).await?;

        info!(
            db_type = %self.executor.db_type(),
            intent = %intent,
            rows_affected = outcome.rows_affected,
            last_insert_id = ?outcome.last_insert_id,
            "Statement executed"
        );

        Ok(outcome.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_input_deserialize() {
        let json = r#"{"query": "INSERT INTO users (name) VALUES ('Alice')"}"#;
        let input: ExecuteInput = serde_json::from_str(json).unwrap();
        assert!(input.query.starts_with("INSERT"));
    }

    #[test]
    fn test_execute_input_schema_requires_query() {
        let schema = schemars::schema_for!(ExecuteInput);
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["required"], serde_json::json!(["query"]));
    }
}
