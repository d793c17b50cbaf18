//! Error types for gsheets-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in gsheets-core
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Invalid cell range format
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of bounds
    #[error("Column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u32, u32),

    /// Invalid sheet title
    #[error("Invalid sheet title: {0}")]
    InvalidSheetTitle(String),

    /// Formula text that does not start with `=`
    #[error("Invalid formula '{0}': formulas must begin with '='")]
    InvalidFormula(String),

    /// Validation rule whose operands do not match its condition
    #[error("Invalid data validation rule: {0}")]
    InvalidRule(String),

    /// Invalid value type for operation
    #[error("Invalid value type: expected {expected}, got {actual}")]
    InvalidValueType {
        expected: &'static str,
        actual: &'static str,
    },
}
