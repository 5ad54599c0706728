//! Tests that need a running MySQL or PostgreSQL server.
//!
//! Set TEST_MYSQL_URL and/or TEST_POSTGRES_URL to run them; otherwise they
//! return early.

use guarded_db_mcp::db::{ConnectionProvider, PlanGuard, QueryExecutor};
use guarded_db_mcp::error::DbError;
use guarded_db_mcp::models::{Scalar, StatementIntent};
use std::sync::Arc;

fn executor_from_env(var: &str) -> Option<QueryExecutor> {
    let url = match std::env::var(var) {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: {} not set", var);
            return None;
        }
    };
    let provider = ConnectionProvider::from_dsn(&url).unwrap();
    Some(QueryExecutor::new(Arc::new(provider), PlanGuard::new(true)))
}

#[tokio::test]
async fn test_mysql_insert_id_and_plan_check() {
    let Some(executor) = executor_from_env("TEST_MYSQL_URL") else {
        return;
    };

    executor
        .execute("DROP TABLE IF EXISTS guard_items", StatementIntent::Unchecked)
        .await
        .unwrap();
    executor
        .execute(
            "CREATE TABLE guard_items (id INT AUTO_INCREMENT PRIMARY KEY, \
             label VARCHAR(50), price DECIMAL(10,2), payload VARBINARY(16)) \
             DEFAULT CHARSET=utf8mb4",
            StatementIntent::Unchecked,
        )
        .await
        .unwrap();

    let outcome = executor
        .execute(
            "INSERT INTO guard_items (label, price, payload) VALUES ('水果', 9.90, X'FF00')",
            StatementIntent::Insert,
        )
        .await
        .unwrap();
    assert_eq!(outcome.to_string(), "1 rows affected, last insert id: 1");

    let err = executor
        .query("DELETE FROM guard_items", StatementIntent::Select)
        .await
        .unwrap_err();
    assert!(err.is_denial());

    let result = executor
        .query(
            "SELECT id, label, price, payload FROM guard_items",
            StatementIntent::Select,
        )
        .await
        .unwrap();
    assert_eq!(result.columns, vec!["id", "label", "price", "payload"]);
    assert_eq!(result.rows[0]["id"], Scalar::Int(1));
    assert_eq!(result.rows[0]["label"], Scalar::from("水果"));
    assert_eq!(result.rows[0]["price"], Scalar::from("9.90"));
    assert_eq!(result.rows[0]["payload"], Scalar::from("/wA="));

    executor
        .execute("DROP TABLE guard_items", StatementIntent::Unchecked)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_postgres_insert_intent_has_no_insert_id() {
    let Some(executor) = executor_from_env("TEST_POSTGRES_URL") else {
        return;
    };

    executor
        .execute("DROP TABLE IF EXISTS guard_items", StatementIntent::Unchecked)
        .await
        .unwrap();
    executor
        .execute(
            "CREATE TABLE guard_items (id SERIAL PRIMARY KEY, label TEXT, ok BOOLEAN)",
            StatementIntent::Unchecked,
        )
        .await
        .unwrap();

    // The statement runs, but no id can be reported for it.
    let err = executor
        .execute(
            "INSERT INTO guard_items (label, ok) VALUES ('a', true)",
            StatementIntent::Insert,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Database { .. }));

    let update = executor
        .execute(
            "UPDATE guard_items SET label = 'b' WHERE id = 1",
            StatementIntent::Update,
        )
        .await
        .unwrap();
    assert_eq!(update.to_string(), "1 rows affected");

    let err = executor
        .execute("UPDATE guard_items SET label = 'c'", StatementIntent::Delete)
        .await
        .unwrap_err();
    assert!(err.is_denial());

    let result = executor
        .query("SELECT id, label, ok FROM guard_items", StatementIntent::Select)
        .await
        .unwrap();
    assert_eq!(result.rows[0]["id"], Scalar::Int(1));
    assert_eq!(result.rows[0]["label"], Scalar::from("b"));
    assert_eq!(result.rows[0]["ok"], Scalar::Bool(true));

    let empty = executor
        .query(
            "SELECT id, label FROM guard_items WHERE id < 0",
            StatementIntent::Select,
        )
        .await
        .unwrap();
    assert_eq!(empty.columns, vec!["id", "label"]);

    executor
        .execute("DROP TABLE guard_items", StatementIntent::Unchecked)
        .await
        .unwrap();
}
