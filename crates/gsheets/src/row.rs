//! Header-keyed rows.

use std::sync::Arc;

use ahash::AHashMap;
use gsheets_core::{CellAddress, CellValue, ValueInputOption, ValueRenderOption};
use serde_json::{json, Value};

use crate::cell::Cell;
use crate::client::values_path;
use crate::error::{Error, Result};
use crate::transport::ApiRequest;
use crate::wire::{cell_value_to_json, json_to_cell_value, UpdateValuesResponse};
use crate::worksheet::{Dimension, Worksheet};

static EMPTY: CellValue = CellValue::Empty;

/// The header vocabulary of a worksheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRow {
    values: Vec<String>,
    index: AHashMap<String, usize>,
    row_number: u32,
}

impl HeaderRow {
    /// Build a header from trimmed values.
    ///
    /// Trailing blanks are dropped. Blank headers between names are
    /// rejected, as are duplicates unless `allow_duplicates` is set (lookups
    /// then resolve to the first occurrence).
    pub fn new<I, S>(values: I, row_number: u32, allow_duplicates: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values: Vec<String> = values
            .into_iter()
            .map(|v| v.as_ref().trim().to_string())
            .collect();
        while values.last().is_some_and(|v| v.is_empty()) {
            values.pop();
        }

        if values.is_empty() {
            return Err(Error::validation(format!(
                "header row {row_number} is empty"
            )));
        }

        let mut index = AHashMap::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            if value.is_empty() {
                return Err(Error::validation(format!(
                    "header row {row_number} has a blank header in column {}",
                    CellAddress::column_to_letters(i as u32)
                )));
            }
            if index.contains_key(value) {
                if !allow_duplicates {
                    return Err(Error::validation(format!(
                        "duplicate header \"{value}\" in row {row_number}"
                    )));
                }
                continue;
            }
            index.insert(value.clone(), i);
        }

        Ok(Self {
            values,
            index,
            row_number,
        })
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 1-based row number of the header
    pub fn row_number(&self) -> u32 {
        self.row_number
    }

    /// 0-based column of a header name
    pub fn column_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub(crate) fn shifted(&self, row_number: u32) -> Self {
        Self {
            row_number,
            ..self.clone()
        }
    }
}

/// Options for [`Row::save`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveRowOptions {
    /// Store values as-is instead of parsing them as typed input
    pub raw: bool,
}

/// A snapshot of one data row, keyed by the header row.
///
/// Rows are addressed by position. Once the worksheet's row structure
/// changes (a row deleted or inserted, a resize) older rows are stale and
/// refuse to save or delete; fetch them again.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    sheet_id: i64,
    row_number: u32,
    values: Vec<CellValue>,
    header: Arc<HeaderRow>,
    structure_version: u64,
}

impl Row {
    pub(crate) fn new(
        sheet_id: i64,
        row_number: u32,
        values: Vec<CellValue>,
        header: Arc<HeaderRow>,
        structure_version: u64,
    ) -> Self {
        Self {
            sheet_id,
            row_number,
            values,
            header,
            structure_version,
        }
    }

    /// 1-based row number in the sheet
    pub fn row_number(&self) -> u32 {
        self.row_number
    }

    pub fn sheet_id(&self) -> i64 {
        self.sheet_id
    }

    pub fn header(&self) -> &HeaderRow {
        &self.header
    }

    /// Width of the row in columns
    fn width(&self) -> usize {
        self.values.len().max(self.header.len())
    }

    /// Unqualified A1 range covering the row, e.g. `A5:C5`
    pub fn a1_range(&self) -> String {
        let last = self.width().max(1) as u32 - 1;
        let row = self.row_number - 1;
        CellAddress::new(row, 0)
            .to(CellAddress::new(row, last))
            .to_a1_string()
    }

    /// Value under a header name; `None` if the header does not exist
    pub fn get(&self, key: &str) -> Option<&CellValue> {
        let col = self.header.column_of(key)?;
        Some(self.values.get(col).unwrap_or(&EMPTY))
    }

    /// Value at a 0-based column
    pub fn get_index(&self, col: usize) -> &CellValue {
        self.values.get(col).unwrap_or(&EMPTY)
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    /// Set a value locally. Unknown headers are rejected.
    pub fn set(&mut self, key: &str, value: impl Into<CellValue>) -> Result<()> {
        let col = self.column_for(key)?;
        let value = writable(value.into())?;
        self.put(col, value);
        Ok(())
    }

    /// Set several values; either all apply or none
    pub fn assign<I, K, V>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<CellValue>,
    {
        let mut updates = Vec::new();
        for (key, value) in values {
            let col = self.column_for(key.as_ref())?;
            updates.push((col, writable(value.into())?));
        }
        for (col, value) in updates {
            self.put(col, value);
        }
        Ok(())
    }

    /// `(header, value)` pairs in header order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &CellValue)> + '_ {
        self.header
            .values()
            .iter()
            .enumerate()
            .map(|(i, h)| (h.as_str(), self.get_index(i)))
    }

    /// Header to value map; with duplicate headers the first column wins
    pub fn to_map(&self) -> AHashMap<String, CellValue> {
        let mut map = AHashMap::with_capacity(self.header.len());
        for (key, value) in self.entries() {
            map.entry(key.to_string()).or_insert_with(|| value.clone());
        }
        map
    }

    /// Whether the worksheet changed shape since this row was read
    pub fn is_stale(&self, sheet: &Worksheet) -> bool {
        self.sheet_id != sheet.sheet_id() || self.structure_version != sheet.structure_version()
    }

    /// The loaded cell under a header in this row
    pub fn cell<'a>(&self, sheet: &'a Worksheet, key: &str) -> Result<&'a Cell> {
        let col = self.column_for(key)?;
        sheet.cell(self.row_number - 1, col as u32)
    }

    /// Write the row's values back to its position in the sheet.
    ///
    /// Cached cells of the row are dropped from `sheet`, so they have to be
    /// loaded again before reading them through the cell API.
    pub async fn save(&mut self, sheet: &mut Worksheet, options: SaveRowOptions) -> Result<()> {
        self.check_current(sheet)?;

        let range = format!("{}!{}", sheet.a1_sheet_name(), self.a1_range());
        let mut values: Vec<Value> = self.values.iter().map(cell_value_to_json).collect();
        values.resize(self.width(), json!(""));

        let input = if options.raw {
            ValueInputOption::Raw
        } else {
            ValueInputOption::UserEntered
        };
        let request = ApiRequest::put(values_path(sheet.spreadsheet_id(), &range))
            .with_query("valueInputOption", input.as_str())
            .with_query("includeValuesInResponse", "true")
            .with_query(
                "responseValueRenderOption",
                ValueRenderOption::UnformattedValue.as_str(),
            )
            .with_body(json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": [values],
            }));

        let context = sheet.context(Some(range));
        let response: UpdateValuesResponse = sheet.client().call_json(request, &context).await?;

        if let Some(data) = response.updated_data {
            let mut saved: Vec<CellValue> = data
                .values
                .first()
                .map(|row| row.iter().map(json_to_cell_value).collect())
                .unwrap_or_default();
            saved.resize(self.values.len(), CellValue::Empty);
            self.values = saved;
        }
        let row = self.row_number - 1;
        let last = self.width().max(1) as u32 - 1;
        sheet.forget_range(&CellAddress::new(row, 0).to(CellAddress::new(row, last)));
        tracing::debug!(row = self.row_number, "saved row");
        Ok(())
    }

    /// Delete the row from the sheet. Rows below move up one.
    pub async fn delete(self, sheet: &mut Worksheet) -> Result<()> {
        self.check_current(sheet)?;
        let start = self.row_number - 1;
        sheet
            .delete_dimension(Dimension::Rows, start, start + 1)
            .await
    }

    fn check_current(&self, sheet: &Worksheet) -> Result<()> {
        if self.sheet_id != sheet.sheet_id() {
            return Err(Error::usage(format!(
                "row {} belongs to sheet {}, not sheet {}",
                self.row_number,
                self.sheet_id,
                sheet.sheet_id()
            )));
        }
        if self.structure_version != sheet.structure_version() {
            return Err(Error::usage(format!(
                "row {} is stale: rows were inserted, deleted or resized since it was read",
                self.row_number
            )));
        }
        Ok(())
    }

    fn column_for(&self, key: &str) -> Result<usize> {
        self.header.column_of(key).ok_or_else(|| {
            Error::validation(format!(
                "no header named \"{key}\" (headers: {})",
                self.header.values().join(", ")
            ))
        })
    }

    fn put(&mut self, col: usize, value: CellValue) {
        if self.values.len() <= col {
            self.values.resize(col + 1, CellValue::Empty);
        }
        self.values[col] = value;
    }
}

fn writable(value: CellValue) -> Result<CellValue> {
    match value {
        CellValue::Error(e) => Err(Error::usage(format!(
            "cannot write error value {}; errors are computed by the server",
            e.display_code()
        ))),
        other => Ok(other),
    }
}
