//! Prelude module - common imports for gsheets users
//!
//! ```rust
//! use gsheets::prelude::*;
//! ```

pub use crate::{
    // Documents
    Spreadsheet,
    Worksheet,
    Row,
    Cell,
    NewSheet,
    CellFilter,

    // Options
    AddRowsOptions,
    GetRowsOptions,
    HeaderOptions,
    SaveOptions,
    SaveMode,
    ConcurrencyMode,
    SaveRowOptions,
    RowInput,
    Dimension,
    MergeType,

    // Batches
    BatchMode,
    BatchOutcome,
    RangeUpdate,

    // Client and auth
    SheetsClient,
    ApiKey,
    BearerToken,
    RefreshingCredentials,
    TokenSource,
    AccessToken,

    // Values and addressing
    CellAddress,
    CellRange,
    CellValue,
    CellErrorValue,
    ErrorCode,
    CellFormat,
    Color,
    DataValidationRule,
    GetValuesRequestOptions,
    ValueRenderOption,

    // Error types
    Error,
    ErrorKind,
    Result,
};
