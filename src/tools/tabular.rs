//! Delimited-text rendering of query results.
//!
//! Output is RFC 4180 CSV with `\n` line endings: a header line with the
//! column names, then one line per row in the order given. Cells are rendered
//! with [`Scalar`]'s `Display`, so NULL becomes an empty field.

use crate::error::{DbError, DbResult, EncodePhase};
use crate::models::{ResultRow, Scalar};

/// Encode `rows` under the header `columns`.
///
/// Every row must carry every column; the first missing key aborts the
/// encoding and nothing is returned.
pub fn encode(rows: &[ResultRow], columns: &[String]) -> DbResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(columns)
        .map_err(|e| DbError::encode(EncodePhase::Header, e.to_string()))?;

    let mut record: Vec<String> = Vec::with_capacity(columns.len());
    for row in rows {
        record.clear();
        for column in columns {
            let cell: &Scalar = row
                .get(column)
                .ok_or_else(|| DbError::missing_column(column.as_str()))?;
            record.push(cell.to_string());
        }
        writer
            .write_record(&record)
            .map_err(|e| DbError::encode(EncodePhase::Row, e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DbError::encode(EncodePhase::Flush, e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DbError::encode(EncodePhase::Flush, e.to_string()))
}
