//! A single loaded cell.
//!
//! A [`Cell`] keeps the last data the server reported plus any local edits
//! not yet saved. Reads return the local edit when there is one; formulas
//! are never evaluated locally, so a pending formula reports the last
//! server-computed value until it is saved.

use gsheets_core::{CellAddress, CellErrorValue, CellFormat, CellValue, DataValidationRule};
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::wire::{CellData, ExtendedValue};

/// Type of a cell's computed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Boolean,
    Number,
    String,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
enum PendingValue {
    Set(ExtendedValue),
    Clear,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Draft {
    value: Option<PendingValue>,
    note: Option<Option<String>>,
    format: Option<CellFormat>,
    clear_format: bool,
    validation: Option<Option<DataValidationRule>>,
}

impl Draft {
    fn is_empty(&self) -> bool {
        self.value.is_none()
            && self.note.is_none()
            && self.format.is_none()
            && !self.clear_format
            && self.validation.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    sheet_id: i64,
    address: CellAddress,
    data: CellData,
    draft: Draft,
}

impl Cell {
    pub(crate) fn new(sheet_id: i64, address: CellAddress, data: CellData) -> Self {
        Self {
            sheet_id,
            address,
            data,
            draft: Draft::default(),
        }
    }

    pub fn sheet_id(&self) -> i64 {
        self.sheet_id
    }

    pub fn address(&self) -> CellAddress {
        self.address
    }

    /// 0-based row index
    pub fn row_index(&self) -> u32 {
        self.address.row
    }

    /// 0-based column index
    pub fn column_index(&self) -> u32 {
        self.address.col
    }

    /// e.g. `"C7"`
    pub fn a1_address(&self) -> String {
        self.address.to_a1_string()
    }

    /// 1-based row number
    pub fn a1_row(&self) -> u32 {
        self.address.row + 1
    }

    /// Column letters, e.g. `"C"`
    pub fn a1_column(&self) -> String {
        CellAddress::column_to_letters(self.address.col)
    }

    /// The computed value, or the pending local value if one was set
    pub fn value(&self) -> CellValue {
        match &self.draft.value {
            Some(PendingValue::Set(v)) if v.formula_value.is_none() => v.to_cell_value(),
            Some(PendingValue::Clear) => CellValue::Empty,
            _ => self.server_value(),
        }
    }

    /// The value last reported by the server
    pub(crate) fn server_value(&self) -> CellValue {
        self.data
            .effective_value
            .as_ref()
            .map(ExtendedValue::to_cell_value)
            .unwrap_or_default()
    }

    /// Set a literal value. Strings starting with `=` are stored as formulas.
    ///
    /// Error values are computed by the server and cannot be written.
    pub fn set_value(&mut self, value: impl Into<CellValue>) -> Result<()> {
        match value.into() {
            CellValue::Error(e) => Err(Error::usage(format!(
                "cannot write error value {} to {}; errors are computed by the server",
                e.display_code(),
                self.a1_address()
            ))),
            CellValue::String(s) if s.starts_with('=') => self.set_formula(s),
            CellValue::Empty => {
                self.draft.value = Some(PendingValue::Clear);
                Ok(())
            }
            other => {
                self.draft.value = ExtendedValue::from_cell_value(&other).map(PendingValue::Set);
                Ok(())
            }
        }
    }

    pub fn set_formula(&mut self, formula: impl Into<String>) -> Result<()> {
        let formula = formula.into();
        if !formula.starts_with('=') {
            return Err(gsheets_core::Error::InvalidFormula(format!(
                "formula must start with '=': {formula}"
            ))
            .into());
        }
        self.draft.value = Some(PendingValue::Set(ExtendedValue::formula(formula)));
        Ok(())
    }

    /// Formula text, if the cell holds (or will hold) a formula
    pub fn formula(&self) -> Option<&str> {
        match &self.draft.value {
            Some(PendingValue::Set(v)) => v.formula_value.as_deref(),
            Some(PendingValue::Clear) => None,
            None => self
                .data
                .user_entered_value
                .as_ref()
                .and_then(|v| v.formula_value.as_deref()),
        }
    }

    /// The value as displayed, from the last server read
    pub fn formatted_value(&self) -> Option<&str> {
        self.data.formatted_value.as_deref()
    }

    pub fn value_type(&self) -> Option<ValueType> {
        match self.value() {
            CellValue::Empty => None,
            CellValue::Boolean(_) => Some(ValueType::Boolean),
            CellValue::Number(_) => Some(ValueType::Number),
            CellValue::String(_) => Some(ValueType::String),
            CellValue::Error(_) => Some(ValueType::Error),
        }
    }

    pub fn error_value(&self) -> Option<CellErrorValue> {
        match self.value() {
            CellValue::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn note(&self) -> Option<&str> {
        match &self.draft.note {
            Some(note) => note.as_deref(),
            None => self.data.note.as_deref(),
        }
    }

    /// Set or clear (`None`) the note
    pub fn set_note(&mut self, note: Option<&str>) {
        self.draft.note = Some(note.filter(|n| !n.is_empty()).map(str::to_string));
    }

    pub fn hyperlink(&self) -> Option<&str> {
        self.data.hyperlink.as_deref()
    }

    /// The format last saved on the server
    pub fn user_entered_format(&self) -> Option<&CellFormat> {
        self.data.user_entered_format.as_ref()
    }

    /// The format after conditional formatting and defaults
    pub fn effective_format(&self) -> Option<&CellFormat> {
        self.data.effective_format.as_ref()
    }

    /// Pending format changes, if any
    pub fn pending_format(&self) -> Option<&CellFormat> {
        self.draft.format.as_ref()
    }

    /// Overlay format fields; only the fields set in `format` are saved
    pub fn set_format(&mut self, format: &CellFormat) {
        self.draft
            .format
            .get_or_insert_with(CellFormat::default)
            .merge(format);
    }

    /// Drop all user formatting on save
    pub fn clear_all_formatting(&mut self) {
        self.draft.format = None;
        self.draft.clear_format = true;
    }

    pub fn data_validation(&self) -> Option<&DataValidationRule> {
        match &self.draft.validation {
            Some(rule) => rule.as_ref(),
            None => self.data.data_validation.as_ref(),
        }
    }

    /// Set or clear (`None`) the validation rule of this cell
    pub fn set_data_validation(&mut self, rule: Option<DataValidationRule>) -> Result<()> {
        if let Some(rule) = &rule {
            rule.validate()?;
        }
        self.draft.validation = Some(rule);
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        !self.draft.is_empty()
    }

    pub fn discard_unsaved_changes(&mut self) {
        self.draft = Draft::default();
    }

    /// Whether the cell holds anything worth keeping
    pub(crate) fn has_content(&self) -> bool {
        self.data.has_value()
            || matches!(self.draft.value, Some(PendingValue::Set(_)))
            || self.note().is_some()
    }

    pub(crate) fn data(&self) -> &CellData {
        &self.data
    }

    /// Replace server data, keeping pending edits
    pub(crate) fn refresh(&mut self, data: CellData) {
        self.data = data;
    }

    /// Replace server data after a save; pending edits are now applied
    pub(crate) fn apply_saved(&mut self, data: CellData) {
        self.data = data;
        self.draft = Draft::default();
    }

    pub(crate) fn clear_values(&mut self) {
        self.data.user_entered_value = None;
        self.data.effective_value = None;
        self.data.formatted_value = None;
    }

    pub(crate) fn set_validation_data(&mut self, rule: Option<DataValidationRule>) {
        self.data.data_validation = rule;
    }

    pub(crate) fn move_to(&mut self, address: CellAddress) {
        self.address = address;
    }

    /// An `updateCells` request writing this cell's pending edits.
    ///
    /// With `full`, the stored value is rewritten even when unchanged.
    pub(crate) fn update_request(&self, full: bool) -> Option<Value> {
        let mut fields: Vec<String> = Vec::new();
        let mut payload = Map::new();

        match &self.draft.value {
            Some(PendingValue::Set(v)) => {
                fields.push("userEnteredValue".into());
                payload.insert("userEnteredValue".into(), json!(v));
            }
            Some(PendingValue::Clear) => fields.push("userEnteredValue".into()),
            None if full => {
                fields.push("userEnteredValue".into());
                if let Some(v) = &self.data.user_entered_value {
                    payload.insert("userEnteredValue".into(), json!(v));
                }
            }
            None => {}
        }

        if let Some(note) = &self.draft.note {
            fields.push("note".into());
            if let Some(note) = note {
                payload.insert("note".into(), json!(note));
            }
        }

        if self.draft.clear_format {
            fields.push("userEnteredFormat".into());
        }
        if let Some(format) = &self.draft.format {
            if !self.draft.clear_format {
                fields.extend(
                    format
                        .set_fields()
                        .into_iter()
                        .map(|f| format!("userEnteredFormat.{f}")),
                );
            }
            payload.insert("userEnteredFormat".into(), json!(format));
        }

        if let Some(rule) = &self.draft.validation {
            fields.push("dataValidation".into());
            if let Some(rule) = rule {
                payload.insert("dataValidation".into(), json!(rule));
            }
        }

        if fields.is_empty() {
            return None;
        }

        Some(json!({
            "updateCells": {
                "rows": [{ "values": [Value::Object(payload)] }],
                "fields": fields.join(","),
                "start": {
                    "sheetId": self.sheet_id,
                    "rowIndex": self.address.row,
                    "columnIndex": self.address.col,
                }
            }
        }))
    }
}
