//! Tool handler tests against a SQLite database.

use guarded_db_mcp::db::{ConnectionProvider, PlanGuard, QueryExecutor};
use guarded_db_mcp::error::DbError;
use guarded_db_mcp::models::StatementIntent;
use guarded_db_mcp::tools::query::{QueryInput, QueryToolHandler};
use guarded_db_mcp::tools::schema::{SchemaToolHandler, TableNameInput};
use guarded_db_mcp::tools::write::{ExecuteInput, WriteToolHandler};
use std::sync::Arc;
use tempfile::TempDir;

struct Tools {
    _dir: TempDir,
    query: QueryToolHandler,
    schema: SchemaToolHandler,
    write: WriteToolHandler,
}

async fn setup() -> Tools {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tools.db");
    let provider = ConnectionProvider::from_dsn(&format!("sqlite:{}", path.display())).unwrap();
    let executor = Arc::new(QueryExecutor::new(Arc::new(provider), PlanGuard::new(true)));

    let query = QueryToolHandler::new(executor.clone());
    let tools = Tools {
        _dir: dir,
        schema: SchemaToolHandler::new(query.clone()),
        write: WriteToolHandler::new(executor),
        query,
    };

    tools
        .write
        .execute(
            exec("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, email TEXT)"),
            StatementIntent::Unchecked,
        )
        .await
        .unwrap();
    tools
}

fn exec(sql: &str) -> ExecuteInput {
    ExecuteInput {
        query: sql.to_string(),
    }
}

fn table(name: &str) -> TableNameInput {
    TableNameInput {
        name: name.to_string(),
    }
}

#[tokio::test]
async fn test_write_then_read_query() {
    let tools = setup().await;

    let summary = tools
        .write
        .execute(
            exec("INSERT INTO users (name, email) VALUES ('Alice', 'alice@example.com')"),
            StatementIntent::Insert,
        )
        .await
        .unwrap();
    assert_eq!(summary, "1 rows affected, last insert id: 1");

    let csv = tools
        .query
        .read_query(QueryInput {
            query: "SELECT id, name, email FROM users".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(csv, "id,name,email\n1,Alice,alice@example.com\n");
}

#[tokio::test]
async fn test_null_and_quoted_cells() {
    let tools = setup().await;
    tools
        .write
        .execute(
            exec("INSERT INTO users (name, email) VALUES ('Smith, \"Jo\"', NULL)"),
            StatementIntent::Insert,
        )
        .await
        .unwrap();

    let csv = tools
        .query
        .read_query(QueryInput {
            query: "SELECT name, email FROM users".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(csv, "name,email\n\"Smith, \"\"Jo\"\"\",\n");
}

#[tokio::test]
async fn test_read_query_rejects_delete() {
    let tools = setup().await;
    tools
        .write
        .execute(exec("INSERT INTO users (name) VALUES ('Bob')"), StatementIntent::Insert)
        .await
        .unwrap();

    let err = tools
        .query
        .read_query(QueryInput {
            query: "DELETE FROM users".to_string(),
        })
        .await
        .unwrap_err();
    assert!(err.is_denial());

    let count = tools.schema.count_rows(table("users")).await.unwrap();
    assert_eq!(count, "count(1)\n1\n");
}

#[tokio::test]
async fn test_update_and_delete_summaries() {
    let tools = setup().await;
    tools
        .write
        .execute(
            exec("INSERT INTO users (name) VALUES ('a'), ('b'), ('c')"),
            StatementIntent::Insert,
        )
        .await
        .unwrap();

    let updated = tools
        .write
        .execute(
            exec("UPDATE users SET email = 'x@example.com' WHERE id <= 2"),
            StatementIntent::Update,
        )
        .await
        .unwrap();
    assert_eq!(updated, "2 rows affected");

    let deleted = tools
        .write
        .execute(exec("DELETE FROM users WHERE id = 3"), StatementIntent::Delete)
        .await
        .unwrap();
    assert_eq!(deleted, "1 rows affected");
}

#[tokio::test]
async fn test_alter_table_is_unchecked() {
    let tools = setup().await;
    let summary = tools
        .write
        .execute(
            exec("ALTER TABLE users ADD COLUMN age INTEGER"),
            StatementIntent::Unchecked,
        )
        .await
        .unwrap();
    assert_eq!(summary, "0 rows affected");

    let csv = tools
        .query
        .read_query(QueryInput {
            query: "SELECT age FROM users".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(csv, "age\n");
}

#[tokio::test]
async fn test_list_tables_and_databases() {
    let tools = setup().await;

    let tables = tools.schema.list_tables().await.unwrap();
    assert_eq!(tables, "table_schema,table_name\nmain,users\n");

    let databases = tools.schema.list_databases().await.unwrap();
    assert!(databases.starts_with("name,file\nmain,"));
    assert!(databases.contains("tools.db"));
}

#[tokio::test]
async fn test_desc_table() {
    let tools = setup().await;

    let ddl = tools.schema.describe_table(table("users")).await.unwrap();
    assert!(ddl.starts_with("create_table_sql\n"));
    assert!(ddl.contains("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, email TEXT)"));

    let qualified = tools.schema.describe_table(table("main.users")).await.unwrap();
    assert_eq!(ddl, qualified);
}

#[tokio::test]
async fn test_desc_missing_table() {
    let tools = setup().await;
    let err = tools
        .schema
        .describe_table(table("nothing_here"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Schema { .. }));
}

#[tokio::test]
async fn test_table_names_are_validated() {
    let tools = setup().await;

    let err = tools
        .schema
        .count_rows(table("users; DROP TABLE users"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidInput { .. }));

    let err = tools
        .schema
        .describe_table(table("users' OR '1'='1"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidInput { .. }));

    // The table is still there.
    assert_eq!(
        tools.schema.count_rows(table("users")).await.unwrap(),
        "count(1)\n0\n"
    );
}
