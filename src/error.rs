use thiserror::Error;

use crate::data::model::ColumnType;

/// Structural failures raised by the analysis engine.
///
/// Statistical degeneracies (too few groups, undefined baseline) are not
/// errors; they show up as absent values and [`crate::analysis::DataIssue`]s
/// in the report instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// A referenced column is not part of the table schema.
    #[error("column '{column}' does not exist")]
    UnknownColumn { column: String },

    /// A column exists but holds the wrong kind of values for the request.
    #[error("column '{column}' is {actual}, expected {expected}")]
    ColumnType {
        column: String,
        expected: ColumnType,
        actual: ColumnType,
    },

    /// A cell disagrees with the declared type of its column.
    #[error("row {row}: column '{column}' is declared {declared} but holds '{value}'")]
    TypeMismatch {
        row: usize,
        column: String,
        declared: ColumnType,
        value: String,
    },

    /// A row does not have one cell per schema column.
    #[error("row {row} has {found} values but the schema has {expected} columns")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
