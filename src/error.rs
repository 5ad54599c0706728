//! Error types for the guarded DB MCP server.
//!
//! Every failure short-circuits back to the caller as a `DbError`; nothing
//! here retries. Variants carry enough context for an agent to adjust and
//! resubmit.

use crate::config::DEFAULT_ACQUIRE_TIMEOUT_SECS;
use std::fmt;
use thiserror::Error;

/// Stage of tabular encoding that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodePhase {
    Header,
    Row,
    Flush,
}

impl fmt::Display for EncodePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => write!(f, "failed to write headers"),
            Self::Row => write!(f, "failed to write row"),
            Self::Flush => write!(f, "error flushing CSV writer"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    /// The plan probe was inconclusive or disagreed with the declared intent.
    /// The statement was not executed.
    #[error("Plan check denied: {reason}")]
    PlanCheck { reason: String },

    #[error("Schema error: {message} (object: {object})")]
    Schema { message: String, object: String },

    #[error("{phase}: {message}")]
    Encode { phase: EncodePhase, message: String },

    #[error("key '{column}' not found in row")]
    MissingColumn { column: String },

    #[error("Timeout: {operation} exceeded {limit_secs}s")]
    Timeout { operation: String, limit_secs: u64 },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    pub fn plan_check(reason: impl Into<String>) -> Self {
        Self::PlanCheck {
            reason: reason.into(),
        }
    }

    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    pub fn encode(phase: EncodePhase, message: impl Into<String>) -> Self {
        Self::Encode {
            phase,
            message: message.into(),
        }
    }

    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, limit_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            limit_secs,
        }
    }

    /// Replace the limit of a timeout with the one actually configured.
    ///
    /// `sqlx::Error::PoolTimedOut` carries no duration, so conversions report
    /// the default until the owner of the pool settings fills it in.
    pub fn with_timeout_limit(self, limit_secs: u64) -> Self {
        match self {
            Self::Timeout { operation, .. } => Self::Timeout {
                operation,
                limit_secs,
            },
            other => other,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::PlanCheck { .. } => {
                Some("Submit the statement through the tool that matches its kind")
            }
            _ => None,
        }
    }

    /// True when the statement never reached the database.
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::PlanCheck { .. })
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => {
                DbError::timeout("connection pool acquire", DEFAULT_ACQUIRE_TIMEOUT_SECS)
            },
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Restart the server")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::TypeNotFound { type_name } => DbError::schema(
                format!("Type not found: {}", type_name),
                type_name.to_string(),
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::schema(format!("Column not found: {}", col), col.to_string())
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => DbError::database(
                format!("Failed to decode column {}: {}", index, source),
                None,
                "Cast the column to text in the query",
            ),
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Map `DbError` onto MCP error codes. The suggestion travels in `data`.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        match &err {
            DbError::InvalidInput { .. }
            | DbError::PlanCheck { .. }
            | DbError::Schema { .. }
            | DbError::MissingColumn { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), suggestion_data(err.suggestion()))
            }

            DbError::Connection { suggestion, .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), suggestion_data(Some(suggestion)))
            }
            DbError::Timeout { .. } => rmcp::ErrorData::internal_error(
                err.to_string(),
                suggestion_data(Some(
                    "Raise acquire_timeout in the connection string or reduce concurrent calls",
                )),
            ),

            DbError::Database {
                message,
                sql_state,
                suggestion,
            } => {
                let msg = match sql_state {
                    Some(code) => format!("{} (SQLSTATE: {})", message, code),
                    None => message.clone(),
                };
                rmcp::ErrorData::invalid_params(msg, suggestion_data(Some(suggestion)))
            }

            DbError::Encode { .. } | DbError::Internal { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), suggestion_data(err.suggestion()))
            }
        }
    }
}
