//! Schema introspection tools.
//!
//! This module implements `list_database`, `list_table`, `desc_table` and
//! `count_query`. Each one renders a fixed catalog statement for the connected
//! engine and runs it through the query path without a plan check.

use crate::error::{DbError, DbResult};
use crate::models::{DatabaseType, StatementIntent};
use crate::tools::query::QueryToolHandler;
use crate::tools::tabular;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::debug;

/// Input for the desc_table and count_query tools.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TableNameInput {
    /// Table name, optionally qualified with its schema (schema.table)
    pub name: String,
}

/// A validated `[schema.]table` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef<'a> {
    pub schema: Option<&'a str>,
    pub table: &'a str,
}

impl<'a> TableRef<'a> {
    /// Parse a table name the way it will be spliced into catalog SQL.
    ///
    /// Each part may only contain ASCII letters, digits, `_` and `$`.
    pub fn parse(name: &'a str) -> DbResult<Self> {
        let parts: Vec<&str> = name.split('.').collect();
        for part in &parts {
            if part.is_empty() {
                return Err(DbError::invalid_input(format!(
                    "Invalid table name '{}': empty identifier",
                    name
                )));
            }
            if !part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
            {
                return Err(DbError::invalid_input(format!(
                    "Invalid table name '{}': only letters, digits, '_' and '$' are allowed",
                    name
                )));
            }
        }

        match parts.as_slice() {
            [table] => Ok(Self {
                schema: None,
                table: *table,
            }),
            [schema, table] => Ok(Self {
                schema: Some(*schema),
                table: *table,
            }),
            _ => Err(DbError::invalid_input(format!(
                "Invalid table name '{}': expected table or schema.table",
                name
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchemaToolHandler {
    query: QueryToolHandler,
}

impl SchemaToolHandler {
    pub fn new(query: QueryToolHandler) -> Self {
        Self { query }
    }

    fn db_type(&self) -> DatabaseType {
        self.query.executor().db_type()
    }

    pub async fn list_databases(&self) -> DbResult<String> {
        let sql = list_databases_sql(self.db_type());
        self.query.query_csv(sql, StatementIntent::Unchecked).await
    }

    pub async fn list_tables(&self) -> DbResult<String> {
        let sql = list_tables_sql(self.db_type());
        self.query.query_csv(sql, StatementIntent::Unchecked).await
    }

    /// Reconstruct the table's DDL.
    pub async fn describe_table(&self, input: TableNameInput) -> DbResult<String> {
        let table = TableRef::parse(&input.name)?;
        let sql = describe_table_sql(self.db_type(), &table);
        debug!(table = %input.name, "Describing table");

        let result = self
            .query
            .executor()
            .query(&sql, StatementIntent::Unchecked)
            .await?;
        if result.is_empty() {
            return Err(DbError::schema("Table does not exist", input.name));
        }
        tabular::encode(&result.rows, &result.columns)
    }

    pub async fn count_rows(&self, input: TableNameInput) -> DbResult<String> {
        TableRef::parse(&input.name)?;
        let sql = format!("SELECT count(1) FROM {};", input.name);
        self.query.query_csv(&sql, StatementIntent::Unchecked).await
    }
}

// =============================================================================
// Catalog statements
// =============================================================================

fn list_databases_sql(db_type: DatabaseType) -> &'static str {
    match db_type {
        DatabaseType::PostgreSQL => "SELECT datname FROM pg_database WHERE datistemplate = false;",
        DatabaseType::MySQL => {
            "SELECT schema_name AS database_name FROM information_schema.schemata ORDER BY schema_name;"
        }
        DatabaseType::SQLite => "SELECT name, file FROM pragma_database_list ORDER BY seq;",
    }
}

fn list_tables_sql(db_type: DatabaseType) -> &'static str {
    match db_type {
        DatabaseType::PostgreSQL => {
            "SELECT table_schema,table_name FROM information_schema.tables ORDER BY table_schema,table_name;"
        }
        // MySQL 8 reports information_schema columns in upper case unless aliased.
        DatabaseType::MySQL => {
            "SELECT table_schema AS table_schema, table_name AS table_name \
             FROM information_schema.tables ORDER BY table_schema, table_name;"
        }
        DatabaseType::SQLite => {
            "SELECT 'main' AS table_schema, name AS table_name FROM sqlite_master \
             WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' ORDER BY name;"
        }
    }
}

fn describe_table_sql(db_type: DatabaseType, table: &TableRef<'_>) -> String {
    match db_type {
        DatabaseType::PostgreSQL => {
            let schema_filter = table
                .schema
                .map(|s| format!(" AND t.table_schema = '{}'", s))
                .unwrap_or_default();
            format!(
                r#"SELECT
    'CREATE TABLE ' || t.table_name || ' (' ||
    string_agg(
        c.column_name || ' ' || c.data_type ||
        CASE
            WHEN c.character_maximum_length IS NOT NULL THEN '(' || c.character_maximum_length || ')'
            ELSE ''
        END ||
        CASE
            WHEN c.is_nullable = 'NO' THEN ' NOT NULL'
            ELSE ''
        END, ', ' ORDER BY c.ordinal_position
    ) ||
    COALESCE(', PRIMARY KEY (' || (
        SELECT string_agg(kcu.column_name, ', ')
        FROM information_schema.key_column_usage kcu
        WHERE kcu.table_name = t.table_name
          AND kcu.table_schema = t.table_schema
          AND kcu.constraint_name LIKE '%_pkey'
    ) || ')', '') ||
    ');' AS create_table_sql
FROM
    information_schema.tables t
JOIN
    information_schema.columns c
    ON t.table_name = c.table_name AND t.table_schema = c.table_schema
WHERE
    t.table_name = '{}'{}
GROUP BY
    t.table_schema, t.table_name;"#,
                table.table, schema_filter
            )
        }
        DatabaseType::MySQL => match table.schema {
            Some(schema) => format!("SHOW CREATE TABLE `{}`.`{}`;", schema, table.table),
            None => format!("SHOW CREATE TABLE `{}`;", table.table),
        },
        DatabaseType::SQLite => format!(
            "SELECT sql AS create_table_sql FROM {}.sqlite_master WHERE name = '{}';",
            table.schema.unwrap_or("main"),
            table.table
        ),
    }
}
