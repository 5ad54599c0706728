//! Query-related data models.
//!
//! Statement intents, dynamically typed result cells, and the shapes the
//! executors hand back to the tool layer.

use std::collections::HashMap;
use std::fmt;

/// What the caller says a statement does.
///
/// Anything other than `Unchecked` makes the plan guard compare this claim
/// against the engine's own classification before the statement runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatementIntent {
    #[default]
    Unchecked,
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementIntent {
    /// Upper-case keyword the engines report for this kind of statement.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::Unchecked => None,
            Self::Select => Some("SELECT"),
            Self::Insert => Some("INSERT"),
            Self::Update => Some("UPDATE"),
            Self::Delete => Some("DELETE"),
        }
    }

    pub fn is_checked(&self) -> bool {
        !matches!(self, Self::Unchecked)
    }
}

impl fmt::Display for StatementIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label().unwrap_or("UNCHECKED"))
    }
}

/// A single result cell.
///
/// Binary values never appear here; the decoders turn them into `Text`.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Null,
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Textual form used in tabular output. `Null` renders as an empty field.
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Text(v) => f.write_str(v),
            Self::Null => Ok(()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Column name to cell. Column order lives in [`QueryRows::columns`].
pub type ResultRow = HashMap<String, Scalar>;

/// Everything a read statement produced, in engine order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<ResultRow>,
}

impl QueryRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Result of a mutating statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    /// Only populated for insert-intent statements.
    pub last_insert_id: Option<i64>,
}

impl fmt::Display for ExecOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last_insert_id {
            Some(id) => write!(
                f,
                "{} rows affected, last insert id: {}",
                self.rows_affected, id
            ),
            None => write!(f, "{} rows affected", self.rows_affected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_labels() {
        assert_eq!(StatementIntent::Unchecked.label(), None);
        assert_eq!(StatementIntent::Select.label(), Some("SELECT"));
        assert_eq!(StatementIntent::Delete.to_string(), "DELETE");
        assert!(!StatementIntent::default().is_checked());
    }

    #[test]
    fn test_scalar_display() {
        assert_eq!(Scalar::Int(-7).to_string(), "-7");
        assert_eq!(Scalar::Float(1.5).to_string(), "1.5");
        assert_eq!(Scalar::Float(2.0).to_string(), "2");
        assert_eq!(Scalar::Bool(true).to_string(), "true");
        assert_eq!(Scalar::Bool(false).to_string(), "false");
        assert_eq!(Scalar::from("abc").to_string(), "abc");
        assert_eq!(Scalar::Null.to_string(), "");
    }

    #[test]
    fn test_scalar_from_option() {
        assert_eq!(Scalar::from(None::<i64>), Scalar::Null);
        assert_eq!(Scalar::from(Some(3_i64)), Scalar::Int(3));
    }

    #[test]
    fn test_exec_outcome_summary() {
        let insert = ExecOutcome {
            rows_affected: 1,
            last_insert_id: Some(123),
        };
        assert_eq!(insert.to_string(), "1 rows affected, last insert id: 123");

        let update = ExecOutcome {
            rows_affected: 2,
            last_insert_id: None,
        };
        assert_eq!(update.to_string(), "2 rows affected");
    }
}
