//! # gsheets-core
//!
//! Core data types for the gsheets Google Sheets client.
//!
//! Nothing in this crate talks to the network. It provides:
//! - [`CellAddress`] and [`CellRange`] - A1-style addressing
//! - [`CellValue`] and [`CellErrorValue`] - Values as the Sheets engine reports them
//! - [`GetValuesRequestOptions`] - Read options for the values API
//! - [`DataValidationRule`] - Validation rules attachable to ranges
//! - [`CellFormat`] and [`Color`] - Cell formatting
//!
//! ## Example
//!
//! ```rust
//! use gsheets_core::{CellAddress, CellRange, CellValue};
//!
//! let addr = CellAddress::parse("B7").unwrap();
//! assert_eq!((addr.row, addr.col), (6, 1));
//!
//! let range = CellRange::parse("A1:C3").unwrap();
//! assert!(!range.contains(&addr));
//!
//! let value = CellValue::from(30);
//! assert_eq!(value.as_number(), Some(30.0));
//! ```

pub mod address;
pub mod error;
pub mod format;
pub mod options;
pub mod validation;
pub mod value;

pub use address::{quote_sheet_name, split_sheet_range, CellAddress, CellRange};
pub use error::{Error, Result};
pub use format::{
    CellFormat, Color, HorizontalAlign, NumberFormat, NumberFormatType, TextFormat,
    VerticalAlign, WrapStrategy,
};
pub use options::{
    DateTimeRenderOption, GetValuesRequestOptions, InsertDataOption, MajorDimension,
    ValueInputOption, ValueRenderOption,
};
pub use validation::{
    BooleanCondition, ConditionType, ConditionValue, DataValidationRule, RelativeDate,
};
pub use value::{CellErrorValue, CellValue, ErrorCode};

/// Maximum number of columns in a Google Sheets grid (column ZZZ)
pub const MAX_COLS: u32 = 18_278;

/// Maximum number of rows addressable in a grid (the 10 million cell cap with one column)
pub const MAX_ROWS: u32 = 10_000_000;

/// Maximum length of a sheet title
pub const MAX_SHEET_TITLE_LEN: usize = 100;
