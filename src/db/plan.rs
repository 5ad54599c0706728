//! Intent verification through the engine's execution plan.
//!
//! Before a statement tagged with an intent runs, the guard asks the engine
//! to explain it and compares the operation the plan reports with what the
//! caller claimed. The engine is the oracle for the statement kind; SQL text
//! is only tokenized to find statement boundaries on SQLite.
//!
//! Rules, in order:
//! - the probe must yield exactly one plan row, anything else is denied
//! - INSERT / UPDATE / DELETE intents need an exact operation match
//! - SELECT intent accepts any operation that is not INSERT, UPDATE or DELETE

use crate::db::provider::DbPool;
use crate::db::types::RowToScalars;
use crate::error::{DbError, DbResult};
use crate::models::{ResultRow, StatementIntent};
use sqlx::Row;
use std::future::Future;
use tracing::{debug, warn};

/// Operations that a read-intent statement must never report.
pub const MUTATING_OPERATIONS: [&str; 3] = ["INSERT", "UPDATE", "DELETE"];

/// One row of plan output, reduced to what the guard looks at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanProbeRow {
    /// Upper-case operation the engine reports, when it reports one.
    pub operation: Option<String>,
    /// Remaining engine-specific columns (estimated rows, keys, ...).
    pub details: ResultRow,
}

impl PlanProbeRow {
    pub fn with_operation(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            details: ResultRow::new(),
        }
    }
}

/// An engine that can explain a statement without running it.
pub trait PlanProbe: Send + Sync {
    /// Explain `sql` and return its plan rows.
    fn probe(&self, sql: &str) -> impl Future<Output = DbResult<Vec<PlanProbeRow>>> + Send;

    /// Whether a reported operation satisfies the declared intent.
    fn operation_matches(&self, intent: StatementIntent, operation: Option<&str>) -> bool {
        default_operation_matches(intent, operation)
    }
}

pub fn default_operation_matches(intent: StatementIntent, operation: Option<&str>) -> bool {
    match intent {
        StatementIntent::Unchecked => true,
        StatementIntent::Select => {
            operation.is_none_or(|op| !MUTATING_OPERATIONS.contains(&op))
        }
        StatementIntent::Insert | StatementIntent::Update | StatementIntent::Delete => {
            operation.is_some() && operation == intent.label()
        }
    }
}

/// Gate in front of the executors; disabled unless configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanGuard {
    enabled: bool,
}

impl PlanGuard {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Deny `sql` unless its plan agrees with `intent`.
    ///
    /// A no-op when the guard is disabled or the intent is `Unchecked`.
    pub async fn check<P: PlanProbe>(
        &self,
        probe: &P,
        sql: &str,
        intent: StatementIntent,
    ) -> DbResult<()> {
        if !self.enabled || !intent.is_checked() {
            return Ok(());
        }

        let rows = probe.probe(sql).await?;
        let [row] = rows.as_slice() else {
            warn!(intent = %intent, plan_rows = rows.len(), "Plan check inconclusive");
            return Err(DbError::plan_check(format!(
                "unable to determine query plan ({} plan rows, expected 1), denied",
                rows.len()
            )));
        };

        let operation = row.operation.as_deref();
        if !probe.operation_matches(intent, operation) {
            warn!(
                intent = %intent,
                operation = operation.unwrap_or("<none>"),
                "Plan check rejected statement"
            );
            return Err(DbError::plan_check(format!(
                "query plan reports {} but the statement was declared {}, denied",
                operation.unwrap_or("no operation"),
                intent
            )));
        }

        debug!(intent = %intent, operation = ?operation, "Plan check passed");
        Ok(())
    }
}

impl PlanProbe for DbPool {
    async fn probe(&self, sql: &str) -> DbResult<Vec<PlanProbeRow>> {
        match self {
            DbPool::MySql(p) => mysql::probe(p, sql).await,
            DbPool::Postgres(p) => postgres::probe(p, sql).await,
            DbPool::SQLite(p) => sqlite::probe(p, sql).await,
        }
    }
}

// =============================================================================
// Database-Specific Probes
// =============================================================================

mod mysql {
    use super::*;
    use sqlx::MySqlPool;

    /// `EXPLAIN` yields one row per table access; `select_type` names the
    /// statement kind (SIMPLE, PRIMARY, INSERT, UPDATE, DELETE, ...).
    /// Prepared so that a second statement in `sql` is rejected, not run.
    pub async fn probe(pool: &MySqlPool, sql: &str) -> DbResult<Vec<PlanProbeRow>> {
        let explain = format!("EXPLAIN {}", sql);
        let rows = sqlx::query(&explain).fetch_all(pool).await?;

        rows.iter()
            .map(|row| {
                let mut details = row.to_result_row()?;
                let operation = details
                    .remove("select_type")
                    .filter(|v| !v.is_null())
                    .map(|v| v.to_string().to_uppercase());
                Ok(PlanProbeRow { operation, details })
            })
            .collect()
    }
}

mod postgres {
    use super::*;
    use crate::models::Scalar;
    use serde_json::Value as JsonValue;
    use sqlx::PgPool;

    /// `EXPLAIN (FORMAT JSON)` returns a single cell holding an array with one
    /// object per top-level plan. Data-modifying plans have a `ModifyTable`
    /// root whose `Operation` is Insert, Update or Delete.
    pub async fn probe(pool: &PgPool, sql: &str) -> DbResult<Vec<PlanProbeRow>> {
        let explain = format!("EXPLAIN (FORMAT JSON) {}", sql);
        let rows = sqlx::query(&explain).fetch_all(pool).await?;

        let mut probes = Vec::new();
        for row in &rows {
            let plans: JsonValue = row.try_get(0)?;
            let plans = plans.as_array().ok_or_else(|| {
                DbError::internal(format!("Unexpected EXPLAIN output: {}", plans))
            })?;
            probes.extend(plans.iter().map(plan_to_probe_row));
        }
        Ok(probes)
    }

    fn plan_to_probe_row(entry: &JsonValue) -> PlanProbeRow {
        let plan = &entry["Plan"];
        let node_type = plan["Node Type"].as_str();
        let operation = match (node_type, plan["Operation"].as_str()) {
            (Some("ModifyTable"), Some(op)) => Some(op.to_uppercase()),
            (Some(node), _) => Some(node.to_uppercase()),
            (None, _) => None,
        };

        let mut details = ResultRow::new();
        for key in ["Relation Name", "Plan Rows", "Total Cost"] {
            if let Some(value) = plan.get(key) {
                let cell = match value {
                    JsonValue::String(s) => Scalar::Text(s.clone()),
                    JsonValue::Number(n) => n
                        .as_i64()
                        .map(Scalar::Int)
                        .or_else(|| n.as_f64().map(Scalar::Float))
                        .unwrap_or(Scalar::Null),
                    other => Scalar::Text(other.to_string()),
                };
                details.insert(key.to_string(), cell);
            }
        }

        PlanProbeRow { operation, details }
    }

}

mod sqlite {
    use super::*;
    use crate::models::Scalar;
    use sqlparser::dialect::SQLiteDialect;
    use sqlparser::tokenizer::{Token, Tokenizer};
    use sqlx::SqlitePool;

    /// SQLite has no single plan row naming the statement kind, so the
    /// bytecode program from `EXPLAIN` is folded into one synthetic row.
    ///
    /// Only the first statement of a string would get the `EXPLAIN` prefix
    /// while the driver runs the rest, so input holding more than one
    /// statement is denied before anything reaches the engine. The explain
    /// itself still happens inside a transaction that is always rolled back.
    pub async fn probe(pool: &SqlitePool, sql: &str) -> DbResult<Vec<PlanProbeRow>> {
        let statements = statement_count(sql)?;
        if statements > 1 {
            warn!(statements, "Multiple statements submitted for plan check");
            return Err(DbError::plan_check(format!(
                "input holds {} statements, only one can be checked, denied",
                statements
            )));
        }

        let explain = format!("EXPLAIN {}", sql);
        let mut tx = pool.begin().await?;
        let fetched = sqlx::query(&explain).fetch_all(&mut *tx).await;
        tx.rollback().await?;
        let rows = fetched?;

        let opcodes = rows
            .iter()
            .map(|row| row.try_get_unchecked::<String, _>("opcode"))
            .collect::<Result<Vec<_>, _>>()?;

        if opcodes.is_empty() {
            return Ok(Vec::new());
        }

        let mut details = ResultRow::new();
        details.insert("opcodes".to_string(), Scalar::Int(opcodes.len() as i64));
        Ok(vec![PlanProbeRow {
            operation: Some(classify_program(&opcodes).to_string()),
            details,
        }])
    }

    /// Number of non-empty statements in `sql`.
    ///
    /// Semicolons inside literals, quoted identifiers and comments do not
    /// count as separators. Input the tokenizer cannot read is denied.
    pub(super) fn statement_count(sql: &str) -> DbResult<usize> {
        let tokens = Tokenizer::new(&SQLiteDialect {}, sql)
            .tokenize()
            .map_err(|e| {
                DbError::plan_check(format!("unable to split statements: {}, denied", e))
            })?;

        let mut count = 0;
        let mut in_statement = false;
        for token in &tokens {
            match token {
                Token::SemiColon => in_statement = false,
                Token::Whitespace(_) | Token::EOF => {}
                _ if !in_statement => {
                    count += 1;
                    in_statement = true;
                }
                _ => {}
            }
        }
        Ok(count)
    }

    /// Name the statement kind a bytecode program implements.
    pub(super) fn classify_program<S: AsRef<str>>(opcodes: &[S]) -> &'static str {
        let has = |name: &str| opcodes.iter().any(|op| op.as_ref() == name);

        if ["ParseSchema", "CreateBtree", "Destroy", "DropTable"]
            .iter()
            .any(|op| has(op))
        {
            "DDL"
        } else if has("Clear") {
            // DELETE without WHERE truncates the table without opening a cursor.
            "DELETE"
        } else if !has("OpenWrite") {
            "SELECT"
        } else if has("NewRowid") {
            "INSERT"
        } else if has("Insert") {
            "UPDATE"
        } else if has("Delete") {
            "DELETE"
        } else {
            "WRITE"
        }
    }
}
