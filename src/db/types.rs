//! Row decoding into [`Scalar`] cells.
//!
//! # Architecture
//!
//! Decoding is two-phase:
//! 1. `categorize_type` classifies the column's declared type
//! 2. an engine-specific decoder extracts the value for that category
//!
//! Statements run over the engines' text protocols, so anything without a
//! numeric or boolean category is rendered in the engine's own textual form.
//! SQLite is dynamically typed and is decoded by the storage class of each
//! value instead of the declared column type.

use crate::error::DbResult;
use crate::models::{DatabaseType, ResultRow, Scalar};
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Boolean,
    Binary,
    /// Decimals, temporals, json, uuid, strings: everything read as text.
    Text,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    if db == DatabaseType::SQLite && lower == "numeric" {
        return TypeCategory::Float;
    }

    // Exact decimals keep the engine's own digits.
    if lower.contains("decimal") || lower.contains("numeric") {
        return TypeCategory::Text;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("int") || lower.contains("serial") {
        if lower.contains("point") || lower.contains("interval") {
            return TypeCategory::Text;
        }
        return TypeCategory::Integer;
    }

    if lower.contains("float")
        || lower.contains("double")
        || lower == "real"
        || lower == "float4"
        || lower == "float8"
    {
        return TypeCategory::Float;
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    TypeCategory::Text
}

/// Turn raw bytes into text: UTF-8 when valid, base64 otherwise.
pub fn decode_binary_value(bytes: &[u8]) -> String {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => STANDARD.encode(bytes),
    }
}

/// Conversion of a driver row into a [`ResultRow`].
pub trait RowToScalars {
    /// Column names in engine order.
    fn column_names(&self) -> Vec<String>;

    /// Decode every cell. Fails on the first cell that cannot be decoded.
    fn to_result_row(&self) -> DbResult<ResultRow>;
}

macro_rules! impl_row_to_scalars {
    ($row:ty, $db:expr, $decoder:path) => {
        impl RowToScalars for $row {
            fn column_names(&self) -> Vec<String> {
                self.columns().iter().map(|c| c.name().to_string()).collect()
            }

            fn to_result_row(&self) -> DbResult<ResultRow> {
                self.columns()
                    .iter()
                    .map(|col| {
                        let category = categorize_type(col.type_info().name(), $db);
                        let value = $decoder(self, col.ordinal(), category)?;
                        Ok((col.name().to_string(), value))
                    })
                    .collect()
            }
        }
    };
}

impl_row_to_scalars!(MySqlRow, DatabaseType::MySQL, mysql::decode_column);
impl_row_to_scalars!(PgRow, DatabaseType::PostgreSQL, postgres::decode_column);
impl_row_to_scalars!(SqliteRow, DatabaseType::SQLite, sqlite::decode_column);

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> DbResult<Scalar> {
        match category {
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => Ok(row.try_get::<Option<bool>, _>(idx)?.into()),
            TypeCategory::Float => decode_float(row, idx),
            // BIT, JSON and text columns arrive as raw bytes over the text protocol.
            TypeCategory::Binary | TypeCategory::Text => decode_bytes(row, idx),
        }
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> DbResult<Scalar> {
        if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            return Ok(v.into());
        }
        // BIGINT UNSIGNED beyond i64::MAX keeps its digits as text.
        let v = row.try_get::<Option<u64>, _>(idx)?;
        Ok(match v {
            Some(v) => i64::try_from(v).map_or_else(|_| Scalar::Text(v.to_string()), Scalar::Int),
            None => Scalar::Null,
        })
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> DbResult<Scalar> {
        if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            return Ok(v.into());
        }
        let v = row.try_get::<Option<f32>, _>(idx)?;
        Ok(v.map(f64::from).into())
    }

    fn decode_bytes(row: &MySqlRow, idx: usize) -> DbResult<Scalar> {
        let v = row.try_get_unchecked::<Option<Vec<u8>>, _>(idx)?;
        Ok(v.map(|bytes| decode_binary_value(&bytes)).into())
    }
}

mod postgres {
    use super::*;

    pub fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> DbResult<Scalar> {
        match category {
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => Ok(row.try_get::<Option<bool>, _>(idx)?.into()),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => decode_binary(row, idx),
            TypeCategory::Text => Ok(row.try_get_unchecked::<Option<String>, _>(idx)?.into()),
        }
    }

    fn decode_integer(row: &PgRow, idx: usize) -> DbResult<Scalar> {
        if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            return Ok(v.into());
        }
        if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
            return Ok(v.map(i64::from).into());
        }
        if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
            return Ok(v.map(i64::from).into());
        }
        // int2vector and other integer-like catalog types
        Ok(row.try_get_unchecked::<Option<String>, _>(idx)?.into())
    }

    fn decode_float(row: &PgRow, idx: usize) -> DbResult<Scalar> {
        if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            return Ok(v.into());
        }
        let v = row.try_get::<Option<f32>, _>(idx)?;
        Ok(v.map(f64::from).into())
    }

    fn decode_binary(row: &PgRow, idx: usize) -> DbResult<Scalar> {
        let v = row.try_get::<Option<Vec<u8>>, _>(idx)?;
        Ok(v.map(|bytes| decode_binary_value(&bytes)).into())
    }
}

mod sqlite {
    use super::*;

    /// The declared type only matters for booleans; everything else follows
    /// the storage class of the value itself.
    pub fn decode_column(row: &SqliteRow, idx: usize, category: TypeCategory) -> DbResult<Scalar> {
        let storage = {
            let raw = row.try_get_raw(idx)?;
            if raw.is_null() {
                return Ok(Scalar::Null);
            }
            raw.type_info().name().to_string()
        };

        match storage.as_str() {
            "INTEGER" if category == TypeCategory::Boolean => {
                Ok(Scalar::Bool(row.try_get_unchecked::<i64, _>(idx)? != 0))
            }
            "INTEGER" => Ok(Scalar::Int(row.try_get_unchecked::<i64, _>(idx)?)),
            "REAL" => Ok(Scalar::Float(row.try_get_unchecked::<f64, _>(idx)?)),
            "BLOB" => {
                let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx)?;
                Ok(Scalar::Text(decode_binary_value(&bytes)))
            }
            _ => Ok(Scalar::Text(row.try_get_unchecked::<String, _>(idx)?)),
        }
    }
}
