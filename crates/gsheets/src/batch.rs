//! Value writes spanning several ranges and sheets.

use gsheets_core::{CellAddress, CellRange, CellValue};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::wire::ExtendedValue;

/// How a multi-range write behaves when part of it fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BatchMode {
    /// One request: every range is written or none is
    #[default]
    Atomic,
    /// One request per range; failures are reported per range
    Independent,
}

/// Values to write into one range.
///
/// `values` is row-major and may be smaller than `range`; cells not covered
/// are left alone. Strings starting with `=` are written as formulas.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeUpdate {
    pub sheet_id: i64,
    pub range: CellRange,
    pub values: Vec<Vec<CellValue>>,
}

impl RangeUpdate {
    pub fn new(sheet_id: i64, range: CellRange, values: Vec<Vec<CellValue>>) -> Self {
        Self {
            sheet_id,
            range,
            values,
        }
    }

    /// An update whose range is sized to `values`, anchored at `start`
    pub fn at(sheet_id: i64, start: CellAddress, values: Vec<Vec<CellValue>>) -> Self {
        let rows = values.len().max(1) as u32;
        let cols = values.iter().map(Vec::len).max().unwrap_or(0).max(1) as u32;
        let range = CellRange::from_indices(
            start.row,
            start.col,
            start.row + rows - 1,
            start.col + cols - 1,
        );
        Self::new(sheet_id, range, values)
    }

    pub fn target(&self) -> RangeRef {
        RangeRef {
            sheet_id: self.sheet_id,
            range: self.range,
        }
    }

    /// Check the values fit the range and contain no error values
    pub fn validate(&self) -> Result<()> {
        let fits = self.values.len() <= self.range.row_count() as usize
            && self
                .values
                .iter()
                .all(|row| row.len() <= self.range.col_count() as usize);
        if !fits {
            return Err(Error::validation(format!(
                "values do not fit range {} of sheet {}",
                self.range, self.sheet_id
            )));
        }
        if let Some(e) = self.values.iter().flatten().find_map(CellValue::as_error) {
            return Err(Error::usage(format!(
                "cannot write error value {}; errors are computed by the server",
                e.display_code()
            )));
        }
        Ok(())
    }

    /// An `updateCells` request writing the values with typed-input semantics
    pub(crate) fn update_cells_request(&self) -> Value {
        let rows: Vec<Value> = self
            .values
            .iter()
            .map(|row| {
                let values: Vec<Value> = row.iter().map(cell_json).collect();
                json!({ "values": values })
            })
            .collect();
        json!({
            "updateCells": {
                "rows": rows,
                "fields": "userEnteredValue",
                "start": {
                    "sheetId": self.sheet_id,
                    "rowIndex": self.range.start.row,
                    "columnIndex": self.range.start.col,
                }
            }
        })
    }
}

fn cell_json(value: &CellValue) -> Value {
    let extended = match value {
        CellValue::String(s) if s.starts_with('=') => Some(ExtendedValue::formula(s.clone())),
        other => ExtendedValue::from_cell_value(other),
    };
    match extended {
        Some(v) => json!({ "userEnteredValue": v }),
        None => json!({}),
    }
}

/// A range of one sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeRef {
    pub sheet_id: i64,
    pub range: CellRange,
}

/// Result of [`crate::Spreadsheet::batch_update_values`]
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub applied: Vec<RangeRef>,
    pub failed: Vec<(RangeRef, Error)>,
}

impl BatchOutcome {
    /// Whether every range was written
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// The applied ranges, or the first failure
    pub fn into_result(self) -> Result<Vec<RangeRef>> {
        match self.failed.into_iter().next() {
            Some((_, err)) => Err(err),
            None => Ok(self.applied),
        }
    }
}
