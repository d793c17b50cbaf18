//! # gsheets
//!
//! A typed client for Google Sheets documents.
//!
//! The model mirrors how a document is organized:
//! - [`Spreadsheet`] - a document: properties, sheets, named ranges
//! - [`Worksheet`] - one sheet: grid properties, a header row, a cell cache
//! - [`Row`] - a data row keyed by the header row
//! - [`Cell`] - a loaded cell with its value, formula, note and format
//!
//! Values keep their types ([`CellValue`]); formulas are evaluated by the
//! server and errors such as `#DIV/0!` come back as [`CellErrorValue`].
//!
//! # Architecture
//!
//! ```text
//! Spreadsheet ── owns ──> Worksheet ── caches ──> Cell
//!      │                      │
//!      └──── SheetsClient <───┘   (Arc<dyn Transport>, Arc<dyn CredentialProvider>)
//!                 │
//!                 └── HttpTransport (reqwest) or any Transport
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gsheets::prelude::*;
//!
//! # async fn example() -> gsheets::Result<()> {
//! let client = SheetsClient::with_credentials(Arc::new(BearerToken::new("ya29...")))?;
//! let mut doc = client.spreadsheet("abc123");
//! doc.load_info().await?;
//!
//! let sheet = doc.sheet_by_index_mut(0).expect("document has a sheet");
//! sheet.set_header_row(["Name", "Age"], None).await?;
//! sheet
//!     .add_row(
//!         RowInput::named([("Name", CellValue::from("Ann")), ("Age", CellValue::from(30))]),
//!         AddRowsOptions::default(),
//!     )
//!     .await?;
//!
//! for row in sheet.get_rows(GetRowsOptions::default()).await? {
//!     println!("{:?} is {:?}", row.get("Name"), row.get("Age"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod batch;
pub mod cell;
pub mod client;
pub mod error;
#[cfg(feature = "reqwest")]
pub mod http;
pub mod prelude;
pub mod row;
pub mod spreadsheet;
pub mod transport;
pub mod wire;
pub mod worksheet;

pub use auth::{
    AccessToken, ApiKey, AuthError, AuthHeader, BearerToken, CredentialProvider,
    RefreshingCredentials, TokenSource,
};
pub use batch::{BatchMode, BatchOutcome, RangeRef, RangeUpdate};
pub use cell::{Cell, ValueType};
pub use client::SheetsClient;
pub use error::{Error, ErrorKind, RequestContext, Result};
#[cfg(feature = "reqwest")]
pub use http::{HttpConfig, HttpTransport};
pub use row::{HeaderRow, Row, SaveRowOptions};
pub use spreadsheet::{CellFilter, NewSheet, Spreadsheet, SpreadsheetPropertiesUpdate};
pub use transport::{ApiRequest, BoxFuture, Method, Transport, TransportError};
pub use worksheet::{
    AddRowsOptions, CellStats, ConcurrencyMode, Dimension, GetRowsOptions, HeaderOptions,
    MergeType, RowInput, Rows, SaveMode, SaveOptions, Worksheet, WorksheetPropertiesUpdate,
};

// Re-export core types
pub use gsheets_core::{
    CellAddress, CellErrorValue, CellFormat, CellRange, CellValue, Color, ConditionType,
    DataValidationRule, DateTimeRenderOption, ErrorCode, GetValuesRequestOptions,
    HorizontalAlign, MajorDimension, NumberFormat, NumberFormatType, RelativeDate, TextFormat,
    ValueInputOption, ValueRenderOption, VerticalAlign, WrapStrategy,
};
