//! Cell value types

use std::fmt;

/// The computed value of a cell, as reported by the Sheets engine
///
/// Numbers stay numbers and booleans stay booleans; nothing is stringified
/// on the way in or out. Dates and times are numbers (serial days) unless a
/// formatted render option was requested.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Empty cell (no value)
    #[default]
    Empty,

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Numeric value (dates and times are serial numbers)
    Number(f64),

    /// String value
    String(String),

    /// Error produced by the remote engine (#DIV/0!, #REF!, etc.)
    Error(CellErrorValue),
}

impl CellValue {
    /// Create a new string value
    pub fn string<S: Into<String>>(s: S) -> Self {
        CellValue::String(s.into())
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Check if the cell contains an error
    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    /// Get the value as a number (no coercion from other types)
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the value as a boolean (no coercion from other types)
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the value as a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the error value, if any
    pub fn as_error(&self) -> Option<&CellErrorValue> {
        match self {
            CellValue::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Boolean(_) => "boolean",
            CellValue::Number(_) => "number",
            CellValue::String(_) => "string",
            CellValue::Error(_) => "error",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => write!(f, ""),
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Error(e) => write!(f, "{}", e.display_code()),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::string(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

/// Error codes of the Sheets engine (`ErrorValue.type` in the API)
///
/// The vocabulary is server-defined; codes this crate does not know yet are
/// kept verbatim in [`ErrorCode::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// #ERROR! - Generic error (e.g. formula parse error)
    Error,
    /// #NULL! - Incorrect range operator
    NullValue,
    /// #DIV/0! - Division by zero
    DivideByZero,
    /// #VALUE! - Wrong type of argument or operand
    Value,
    /// #REF! - Invalid cell reference
    Ref,
    /// #NAME? - Unrecognized formula name
    Name,
    /// #NUM! - Invalid numeric value
    Num,
    /// #N/A - Value not available
    NotAvailable,
    /// Loading... - Value is still being computed
    Loading,
    /// A code not in the list above
    Unknown(String),
}

impl ErrorCode {
    /// Parse the API name of an error type (e.g. `DIVIDE_BY_ZERO`)
    pub fn from_api(s: &str) -> Self {
        match s {
            "ERROR" => ErrorCode::Error,
            "NULL_VALUE" => ErrorCode::NullValue,
            "DIVIDE_BY_ZERO" => ErrorCode::DivideByZero,
            "VALUE" => ErrorCode::Value,
            "REF" => ErrorCode::Ref,
            "NAME" => ErrorCode::Name,
            "NUM" => ErrorCode::Num,
            "N_A" => ErrorCode::NotAvailable,
            "LOADING" => ErrorCode::Loading,
            other => ErrorCode::Unknown(other.to_string()),
        }
    }

    /// The API name of this error type
    pub fn as_api_str(&self) -> &str {
        match self {
            ErrorCode::Error => "ERROR",
            ErrorCode::NullValue => "NULL_VALUE",
            ErrorCode::DivideByZero => "DIVIDE_BY_ZERO",
            ErrorCode::Value => "VALUE",
            ErrorCode::Ref => "REF",
            ErrorCode::Name => "NAME",
            ErrorCode::Num => "NUM",
            ErrorCode::NotAvailable => "N_A",
            ErrorCode::Loading => "LOADING",
            ErrorCode::Unknown(s) => s,
        }
    }

    /// The code as shown in a cell (e.g. `#DIV/0!`)
    pub fn display_code(&self) -> &str {
        match self {
            ErrorCode::Error => "#ERROR!",
            ErrorCode::NullValue => "#NULL!",
            ErrorCode::DivideByZero => "#DIV/0!",
            ErrorCode::Value => "#VALUE!",
            ErrorCode::Ref => "#REF!",
            ErrorCode::Name => "#NAME?",
            ErrorCode::Num => "#NUM!",
            ErrorCode::NotAvailable => "#N/A",
            ErrorCode::Loading => "Loading...",
            ErrorCode::Unknown(s) => s,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_api_str())
    }
}

/// An error value computed by the remote engine
///
/// Immutable. Instances only come from decoding server payloads; client code
/// cannot put an error into a cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellErrorValue {
    code: ErrorCode,
    message: String,
}

impl CellErrorValue {
    /// Build an error value from the `type` and `message` fields of an API
    /// `ErrorValue`. Error values only come from the server; this exists for
    /// the wire layer.
    #[doc(hidden)]
    pub fn from_remote(error_type: &str, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::from_api(error_type),
            message: message.into(),
        }
    }

    /// The error code
    pub fn code(&self) -> &ErrorCode {
        &self.code
    }

    /// Human-readable message from the engine
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The code as shown in a cell (e.g. `#DIV/0!`)
    pub fn display_code(&self) -> &str {
        self.code.display_code()
    }
}

impl fmt::Display for CellErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.code.display_code())
        } else {
            write!(f, "{} ({})", self.code.display_code(), self.message)
        }
    }
}
