//! Statement execution engine.
//!
//! Two entry points, both gated by the plan guard:
//! - `query`: runs a read statement and decodes every row
//! - `execute`: runs a mutation and reports the affected-row count
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific fetch and execute
//! - `postgres`: PostgreSQL-specific fetch and execute
//! - `sqlite`: SQLite-specific fetch and execute
//!
//! Statements are sent as raw SQL over each engine's text protocol. Nothing
//! is bound, so DDL and other statements that refuse to be prepared work too.

use crate::db::plan::PlanGuard;
use crate::db::provider::{ConnectionProvider, DbPool};
use crate::db::types::RowToScalars;
use crate::error::{DbError, DbResult};
use crate::models::{DatabaseType, ExecOutcome, QueryRows, StatementIntent};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Runs statements against the provider's pool.
#[derive(Debug)]
pub struct QueryExecutor {
    provider: Arc<ConnectionProvider>,
    guard: PlanGuard,
}

impl QueryExecutor {
    pub fn new(provider: Arc<ConnectionProvider>, guard: PlanGuard) -> Self {
        Self { provider, guard }
    }

    pub fn provider(&self) -> &Arc<ConnectionProvider> {
        &self.provider
    }

    pub fn guard(&self) -> PlanGuard {
        self.guard
    }

    pub fn db_type(&self) -> DatabaseType {
        self.provider.db_type()
    }

    /// Run a read statement and return every row it produced.
    ///
    /// Any failure aborts the call; rows decoded before the failure are dropped.
    pub async fn query(&self, sql: &str, intent: StatementIntent) -> DbResult<QueryRows> {
        self.run_query(sql, intent)
            .await
            .map_err(|e| e.with_timeout_limit(self.provider.acquire_timeout_secs()))
    }

    /// Run a mutation and summarize its effect.
    ///
    /// The generated row id is only read back for `Insert` intents.
    pub async fn execute(&self, sql: &str, intent: StatementIntent) -> DbResult<ExecOutcome> {
        self.run_execute(sql, intent)
            .await
            .map_err(|e| e.with_timeout_limit(self.provider.acquire_timeout_secs()))
    }

    async fn run_query(&self, sql: &str, intent: StatementIntent) -> DbResult<QueryRows> {
        let start = Instant::now();
        let pool = self.provider.acquire().await?;
        self.guard.check(pool, sql, intent).await?;

        debug!(sql = %sql, intent = %intent, "Executing query");

        let result = match pool {
            DbPool::MySql(p) => mysql::fetch(p, sql).await?,
            DbPool::Postgres(p) => postgres::fetch(p, sql).await?,
            DbPool::SQLite(p) => sqlite::fetch(p, sql).await?,
        };

        debug!(
            rows = result.len(),
            columns = result.columns.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Query complete"
        );
        Ok(result)
    }

    async fn run_execute(&self, sql: &str, intent: StatementIntent) -> DbResult<ExecOutcome> {
        let start = Instant::now();
        let pool = self.provider.acquire().await?;
        self.guard.check(pool, sql, intent).await?;

        debug!(sql = %sql, intent = %intent, "Executing statement");

        let want_id = intent == StatementIntent::Insert;
        let outcome = match pool {
            DbPool::MySql(p) => mysql::execute(p, sql, want_id).await?,
            DbPool::Postgres(p) => postgres::execute(p, sql, want_id).await?,
            DbPool::SQLite(p) => sqlite::execute(p, sql, want_id).await?,
        };

        debug!(
            rows_affected = outcome.rows_affected,
            last_insert_id = ?outcome.last_insert_id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Statement complete"
        );
        Ok(outcome)
    }
}

// =============================================================================
// Common Helper Functions
// =============================================================================

/// Decode fetched rows. `described` supplies the header when `rows` is empty.
fn collect_rows<R: RowToScalars>(rows: Vec<R>, described: Vec<String>) -> DbResult<QueryRows> {
    let columns = match rows.first() {
        Some(first) => first.column_names(),
        None => described,
    };

    let rows = rows
        .iter()
        .map(RowToScalars::to_result_row)
        .collect::<DbResult<Vec<_>>>()?;

    Ok(QueryRows { columns, rows })
}

/// Column names from the driver's statement description.
async fn describe_columns<'c, E>(executor: E, sql: &'c str) -> DbResult<Vec<String>>
where
    E: sqlx::Executor<'c>,
{
    use sqlx::Column;

    let described = executor
        .describe(sql)
        .await
        .map_err(|e| DbError::schema(format!("Failed to describe result columns: {}", e), sql))?;
    Ok(described
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect())
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.

mod mysql {
    use super::*;
    use futures_util::TryStreamExt;
    use sqlx::{Executor, MySqlPool};

    pub async fn fetch(pool: &MySqlPool, sql: &str) -> DbResult<QueryRows> {
        let rows = pool.fetch(sql).try_collect::<Vec<_>>().await?;
        let described = if rows.is_empty() {
            describe_columns(pool, sql).await?
        } else {
            Vec::new()
        };
        collect_rows(rows, described)
    }

    pub async fn execute(pool: &MySqlPool, sql: &str, want_id: bool) -> DbResult<ExecOutcome> {
        let result = pool.execute(sql).await?;
        let last_insert_id = if want_id {
            let id = i64::try_from(result.last_insert_id()).map_err(|_| {
                DbError::internal(format!(
                    "last insert id {} does not fit in a signed 64-bit integer",
                    result.last_insert_id()
                ))
            })?;
            Some(id)
        } else {
            None
        };
        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id,
        })
    }
}

mod postgres {
    use super::*;
    use futures_util::TryStreamExt;
    use sqlx::{Executor, PgPool};

    pub async fn fetch(pool: &PgPool, sql: &str) -> DbResult<QueryRows> {
        let rows = pool.fetch(sql).try_collect::<Vec<_>>().await?;
        let described = if rows.is_empty() {
            describe_columns(pool, sql).await?
        } else {
            Vec::new()
        };
        collect_rows(rows, described)
    }

    /// PostgreSQL has no last-insert-id; insert intents fail after the
    /// statement ran rather than report a success without the id.
    pub async fn execute(pool: &PgPool, sql: &str, want_id: bool) -> DbResult<ExecOutcome> {
        let result = pool.execute(sql).await?;
        if want_id {
            return Err(DbError::database(
                format!(
                    "PostgreSQL does not report a last insert id ({} rows affected)",
                    result.rows_affected()
                ),
                None,
                "Use INSERT ... RETURNING through read_query to get generated keys",
            ));
        }
        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: None,
        })
    }
}

mod sqlite {
    use super::*;
    use futures_util::TryStreamExt;
    use sqlx::{Executor, SqlitePool};

    pub async fn fetch(pool: &SqlitePool, sql: &str) -> DbResult<QueryRows> {
        let rows = pool.fetch(sql).try_collect::<Vec<_>>().await?;
        let described = if rows.is_empty() {
            describe_columns(pool, sql).await?
        } else {
            Vec::new()
        };
        collect_rows(rows, described)
    }

    pub async fn execute(pool: &SqlitePool, sql: &str, want_id: bool) -> DbResult<ExecOutcome> {
        let result = pool.execute(sql).await?;
        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: want_id.then(|| result.last_insert_rowid()),
        })
    }
}
