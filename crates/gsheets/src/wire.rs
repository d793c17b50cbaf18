//! Sheets API v4 resources, as they appear on the wire.
//!
//! The API omits default-valued fields, so every struct here tolerates
//! missing fields.

use gsheets_core::{
    CellErrorValue, CellFormat, CellValue, Color, DataValidationRule, DateTimeRenderOption,
    GetValuesRequestOptions, NumberFormatType, ValueRenderOption,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpreadsheetResource {
    pub spreadsheet_id: String,
    pub properties: SpreadsheetProperties,
    pub sheets: Vec<SheetResource>,
    pub named_ranges: Vec<NamedRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spreadsheet_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpreadsheetProperties {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_recalc: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SheetResource {
    pub properties: SheetProperties,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<GridData>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub merges: Vec<GridRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_type: Option<String>,
    pub grid_properties: GridProperties,
    pub hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_color: Option<Color>,
    pub right_to_left: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridProperties {
    pub row_count: u32,
    pub column_count: u32,
    pub frozen_row_count: u32,
    pub frozen_column_count: u32,
    pub hide_gridlines: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridData {
    pub start_row: u32,
    pub start_column: u32,
    pub row_data: Vec<RowData>,
}

impl GridData {
    /// Cell data at an offset from the grid origin, if the server sent any
    pub fn cell(&self, row_offset: u32, col_offset: u32) -> Option<&CellData> {
        self.row_data
            .get(row_offset as usize)?
            .values
            .get(col_offset as usize)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowData {
    pub values: Vec<CellData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CellData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_entered_value: Option<ExtendedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_value: Option<ExtendedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_entered_format: Option<CellFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_format: Option<CellFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_validation: Option<DataValidationRule>,
}

impl CellData {
    pub fn has_value(&self) -> bool {
        self.user_entered_value.is_some() || self.effective_value.is_some()
    }

    /// The value a values-API read with `options` would report, except that
    /// formula errors stay [`CellValue::Error`] under every render option
    pub fn render(&self, options: &GetValuesRequestOptions) -> CellValue {
        let effective = self
            .effective_value
            .as_ref()
            .map(ExtendedValue::to_cell_value)
            .unwrap_or_default();
        if effective.is_error() {
            return effective;
        }
        match options.value_render_option.unwrap_or_default() {
            ValueRenderOption::FormattedValue => self.formatted(),
            ValueRenderOption::Formula => match self
                .user_entered_value
                .as_ref()
                .and_then(|v| v.formula_value.as_ref())
            {
                Some(formula) => CellValue::String(formula.clone()),
                None => self.unformatted(options, effective),
            },
            ValueRenderOption::UnformattedValue => self.unformatted(options, effective),
        }
    }

    fn formatted(&self) -> CellValue {
        match &self.formatted_value {
            Some(s) if !s.is_empty() => CellValue::String(s.clone()),
            _ => CellValue::Empty,
        }
    }

    /// Dates and times are serial numbers unless a formatted string was asked for
    fn unformatted(&self, options: &GetValuesRequestOptions, effective: CellValue) -> CellValue {
        let date_like = self
            .effective_format
            .as_ref()
            .and_then(|f| f.number_format.as_ref())
            .is_some_and(|n| {
                matches!(
                    n.format_type,
                    NumberFormatType::Date | NumberFormatType::Time | NumberFormatType::DateTime
                )
            });
        let as_string =
            options.date_time_render_option == Some(DateTimeRenderOption::FormattedString);
        if date_like && as_string && effective.as_number().is_some() {
            self.formatted()
        } else {
            effective
        }
    }
}

/// Exactly one field is set on a well-formed value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtendedValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bool_value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_value: Option<ErrorValue>,
}

impl ExtendedValue {
    pub fn formula(formula: impl Into<String>) -> Self {
        Self {
            formula_value: Some(formula.into()),
            ..Self::default()
        }
    }

    /// Encode a literal value. `Empty` and `Error` have no literal form.
    pub fn from_cell_value(value: &CellValue) -> Option<Self> {
        let mut v = Self::default();
        match value {
            CellValue::Empty | CellValue::Error(_) => return None,
            CellValue::Boolean(b) => v.bool_value = Some(*b),
            CellValue::Number(n) => v.number_value = Some(*n),
            CellValue::String(s) => v.string_value = Some(s.clone()),
        }
        Some(v)
    }

    /// Decode into a cell value. A bare formula decodes as `Empty`.
    pub fn to_cell_value(&self) -> CellValue {
        if let Some(e) = &self.error_value {
            CellValue::Error(CellErrorValue::from_remote(&e.error_type, e.message.clone()))
        } else if let Some(n) = self.number_value {
            CellValue::Number(n)
        } else if let Some(b) = self.bool_value {
            CellValue::Boolean(b)
        } else if let Some(s) = &self.string_value {
            CellValue::String(s.clone())
        } else {
            CellValue::Empty
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorValue {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

/// Half-open row/column bounds; unset bounds are unbounded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridRange {
    pub sheet_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_row_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_row_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_column_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_column_index: Option<u32>,
}

impl GridRange {
    pub fn from_range(sheet_id: i64, range: &gsheets_core::CellRange) -> Self {
        Self {
            sheet_id,
            start_row_index: Some(range.start.row),
            end_row_index: Some(range.end.row + 1),
            start_column_index: Some(range.start.col),
            end_column_index: Some(range.end.col + 1),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NamedRange {
    pub named_range_id: String,
    pub name: String,
    pub range: GridRange,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValueRange {
    pub range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,
    pub values: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateValuesResponse {
    pub spreadsheet_id: String,
    pub updated_range: String,
    pub updated_rows: u32,
    pub updated_columns: u32,
    pub updated_cells: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_data: Option<ValueRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppendValuesResponse {
    pub spreadsheet_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_range: Option<String>,
    pub updates: UpdateValuesResponse,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchGetValuesResponse {
    pub spreadsheet_id: String,
    pub value_ranges: Vec<ValueRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchUpdateResponse {
    pub spreadsheet_id: String,
    pub replies: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_spreadsheet: Option<SpreadsheetResource>,
}

impl BatchUpdateResponse {
    /// The body of reply `index` for request kind `kind` (e.g. `addSheet`)
    pub fn reply(&self, index: usize, kind: &str) -> Option<&Value> {
        self.replies.get(index)?.get(kind)
    }
}

/// Decode a value from the values API (unformatted or formatted render).
pub fn json_to_cell_value(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Empty,
        Value::Bool(b) => CellValue::Boolean(*b),
        Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Empty),
        Value::String(s) if s.is_empty() => CellValue::Empty,
        Value::String(s) => CellValue::String(s.clone()),
        other => CellValue::String(other.to_string()),
    }
}

/// Encode a value for the values API. `Empty` is written as `""`, which clears the cell.
pub fn cell_value_to_json(value: &CellValue) -> Value {
    match value {
        CellValue::Empty => Value::String(String::new()),
        CellValue::Boolean(b) => Value::Bool(*b),
        CellValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(n.to_string())),
        CellValue::String(s) => Value::String(s.clone()),
        CellValue::Error(e) => Value::String(e.display_code().to_string()),
    }
}
