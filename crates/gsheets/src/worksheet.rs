//! Worksheets: header-keyed rows and a local cell cache.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use gsheets_core::{
    quote_sheet_name, split_sheet_range, CellAddress, CellRange, CellValue, Color,
    DataValidationRule, GetValuesRequestOptions, InsertDataOption, MajorDimension,
    ValueInputOption, ValueRenderOption, MAX_COLS, MAX_ROWS,
};
use serde_json::{json, Map, Value};

use crate::cell::Cell;
use crate::client::{spreadsheet_path, values_path, SheetsClient};
use crate::error::{Error, RequestContext, Result};
use crate::row::{HeaderRow, Row};
use crate::transport::ApiRequest;
use crate::wire::{
    cell_value_to_json, json_to_cell_value, AppendValuesResponse, BatchGetValuesResponse,
    GridData, GridRange, SheetProperties, SpreadsheetResource, ValueRange,
};

/// Rows or columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Rows,
    Columns,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Rows => "ROWS",
            Dimension::Columns => "COLUMNS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MergeType {
    /// One merged cell for the whole range
    #[default]
    All,
    /// One merged cell per column
    Columns,
    /// One merged cell per row
    Rows,
}

impl MergeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeType::All => "MERGE_ALL",
            MergeType::Columns => "MERGE_COLUMNS",
            MergeType::Rows => "MERGE_ROWS",
        }
    }
}

/// Which loaded cells a save writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SaveMode {
    /// Only cells with pending edits
    #[default]
    DirtyOnly,
    /// Every requested cell, rewriting unchanged values too
    Full,
}

/// What happens when the server changed a cell since it was loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConcurrencyMode {
    /// Overwrite whatever is there
    #[default]
    LastWriteWins,
    /// Re-read the cells first and fail with [`Error::Conflict`] if any changed
    Optimistic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveOptions {
    pub mode: SaveMode,
    pub concurrency: ConcurrencyMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderOptions {
    /// 1-based header row; defaults to the current header row, else 1
    pub row_number: Option<u32>,
    pub allow_duplicates: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GetRowsOptions {
    /// Data rows to skip after the header
    pub offset: u32,
    pub limit: Option<u32>,
    /// Read options; rows are always read row-major and default to
    /// unformatted values
    pub value_options: GetValuesRequestOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddRowsOptions {
    /// Store values as-is instead of parsing them as typed input
    pub raw: bool,
    /// Insert new rows instead of writing into empty rows after the table
    pub insert: bool,
}

/// Sheet property changes; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorksheetPropertiesUpdate {
    pub hidden: Option<bool>,
    pub tab_color: Option<Color>,
    pub right_to_left: Option<bool>,
    pub frozen_row_count: Option<u32>,
    pub frozen_column_count: Option<u32>,
    pub hide_gridlines: Option<bool>,
}

/// Values for a new row
#[derive(Debug, Clone, PartialEq)]
pub enum RowInput {
    /// Values in column order starting at column A
    Values(Vec<CellValue>),
    /// Values keyed by header name
    Named(Vec<(String, CellValue)>),
}

impl RowInput {
    pub fn values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        RowInput::Values(values.into_iter().map(Into::into).collect())
    }

    pub fn named<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CellValue>,
    {
        RowInput::Named(
            values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<Vec<CellValue>> for RowInput {
    fn from(values: Vec<CellValue>) -> Self {
        RowInput::Values(values)
    }
}

/// Counts over the loaded cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellStats {
    pub loaded: usize,
    pub non_empty: usize,
    /// Cells in the grid
    pub total: u64,
}

/// Rows fetched by [`Worksheet::get_rows`]
#[derive(Debug)]
pub struct Rows {
    inner: std::vec::IntoIter<Row>,
}

impl Rows {
    fn new(rows: Vec<Row>) -> Self {
        Self {
            inner: rows.into_iter(),
        }
    }
}

impl Iterator for Rows {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Rows {}

/// One sheet of a spreadsheet.
///
/// Owned by its [`crate::Spreadsheet`]. Cells must be loaded before they can
/// be read; edits stay local until saved.
#[derive(Clone)]
pub struct Worksheet {
    client: SheetsClient,
    spreadsheet_id: String,
    properties: SheetProperties,
    header: Option<Arc<HeaderRow>>,
    cells: BTreeMap<CellAddress, Cell>,
    structure_version: u64,
}

impl fmt::Debug for Worksheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worksheet")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("sheet_id", &self.properties.sheet_id)
            .field("title", &self.properties.title)
            .field("loaded_cells", &self.cells.len())
            .finish()
    }
}

impl Worksheet {
    pub(crate) fn new(
        client: SheetsClient,
        spreadsheet_id: String,
        properties: SheetProperties,
    ) -> Self {
        Self {
            client,
            spreadsheet_id,
            properties,
            header: None,
            cells: BTreeMap::new(),
            structure_version: 0,
        }
    }

    // Accessors

    pub fn sheet_id(&self) -> i64 {
        self.properties.sheet_id
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn title(&self) -> &str {
        &self.properties.title
    }

    /// 0-based position among the document's tabs
    pub fn index(&self) -> u32 {
        self.properties.index
    }

    /// `GRID`, `OBJECT` or `DATA_SOURCE`; only grid sheets hold cells
    pub fn sheet_type(&self) -> Option<&str> {
        self.properties.sheet_type.as_deref()
    }

    pub fn hidden(&self) -> bool {
        self.properties.hidden
    }

    pub fn tab_color(&self) -> Option<Color> {
        self.properties.tab_color
    }

    pub fn right_to_left(&self) -> bool {
        self.properties.right_to_left
    }

    /// Rows in the grid, including empty ones
    pub fn row_count(&self) -> u32 {
        self.properties.grid_properties.row_count
    }

    pub fn column_count(&self) -> u32 {
        self.properties.grid_properties.column_count
    }

    pub fn frozen_row_count(&self) -> u32 {
        self.properties.grid_properties.frozen_row_count
    }

    pub fn frozen_column_count(&self) -> u32 {
        self.properties.grid_properties.frozen_column_count
    }

    pub fn properties(&self) -> &SheetProperties {
        &self.properties
    }

    /// Quoted title for A1 ranges, e.g. `'Sheet 1'`
    pub fn a1_sheet_name(&self) -> String {
        quote_sheet_name(self.title())
    }

    /// Letters of the last grid column
    pub fn last_column_letter(&self) -> String {
        CellAddress::column_to_letters(self.column_count().saturating_sub(1))
    }

    /// The whole grid as a range
    pub fn grid_range(&self) -> Option<CellRange> {
        if self.row_count() == 0 || self.column_count() == 0 {
            return None;
        }
        Some(CellRange::from_indices(
            0,
            0,
            self.row_count() - 1,
            self.column_count() - 1,
        ))
    }

    pub fn header_row(&self) -> Option<&HeaderRow> {
        self.header.as_deref()
    }

    pub fn header_values(&self) -> Option<&[String]> {
        self.header.as_deref().map(HeaderRow::values)
    }

    /// Bumped whenever rows shift position; rows read before a bump are stale
    pub fn structure_version(&self) -> u64 {
        self.structure_version
    }

    /// Counts over the cell cache
    pub fn cell_stats(&self) -> CellStats {
        CellStats {
            loaded: self.cells.len(),
            non_empty: self.cells.values().filter(|c| c.has_content()).count(),
            total: self.row_count() as u64 * self.column_count() as u64,
        }
    }

    pub(crate) fn client(&self) -> &SheetsClient {
        &self.client
    }

    pub(crate) fn context(&self, range: Option<String>) -> RequestContext {
        let context = RequestContext::spreadsheet(&self.spreadsheet_id).with_sheet(self.sheet_id());
        match range {
            Some(range) => context.with_range(range),
            None => context,
        }
    }

    /// Take new properties from the server. A changed grid size counts as
    /// a structural change.
    pub(crate) fn set_properties(&mut self, properties: SheetProperties) {
        let old = &self.properties.grid_properties;
        let new = &properties.grid_properties;
        if old.row_count != new.row_count || old.column_count != new.column_count {
            let (rows, cols) = (new.row_count, new.column_count);
            self.cells.retain(|a, _| a.row < rows && a.col < cols);
            self.structure_version += 1;
        }
        self.properties = properties;
    }

    pub(crate) fn set_title(&mut self, title: String) {
        self.properties.title = title;
    }

    pub(crate) fn set_index(&mut self, index: u32) {
        self.properties.index = index;
    }

    // Bounds

    fn bounds_error(&self, what: String) -> Error {
        Error::Validation {
            message: format!(
                "{what} is outside the grid ({} rows x {} columns)",
                self.row_count(),
                self.column_count()
            ),
            context: Some(self.context(None)),
        }
    }

    fn check_cell(&self, row: u32, col: u32) -> Result<()> {
        if row >= self.row_count() || col >= self.column_count() {
            return Err(self.bounds_error(format!("cell {}", CellAddress::new(row, col))));
        }
        Ok(())
    }

    pub(crate) fn check_range(&self, range: &CellRange) -> Result<()> {
        if !range.fits_within(self.row_count(), self.column_count()) {
            return Err(self.bounds_error(format!("range {range}")));
        }
        Ok(())
    }

    fn check_row_number(&self, row_number: u32) -> Result<()> {
        if row_number == 0 || row_number > self.row_count() {
            return Err(self.bounds_error(format!("row {row_number}")));
        }
        Ok(())
    }

    /// Parse an A1 range that is unqualified or names this sheet
    fn parse_own_range(&self, a1: &str) -> Result<CellRange> {
        let (sheet, cells) = split_sheet_range(a1);
        if let Some(sheet) = sheet {
            if sheet != self.title() {
                return Err(Error::validation(format!(
                    "range {a1} refers to sheet '{sheet}', not '{}'",
                    self.title()
                )));
            }
        }
        let range = CellRange::parse(cells)?;
        self.check_range(&range)?;
        Ok(range)
    }

    // Properties

    /// Change tab properties and grid settings in one request.
    ///
    /// Only fields set in `update` are sent. Frozen counts may not exceed
    /// the grid size. Local properties change only after the server accepts.
    pub async fn update_properties(&mut self, update: WorksheetPropertiesUpdate) -> Result<()> {
        if let Some(n) = update.frozen_row_count {
            if n > self.row_count() {
                return Err(self.bounds_error(format!("{n} frozen rows")));
            }
        }
        if let Some(n) = update.frozen_column_count {
            if n > self.column_count() {
                return Err(self.bounds_error(format!("{n} frozen columns")));
            }
        }

        let mut props = Map::new();
        let mut grid = Map::new();
        let mut fields = Vec::new();
        props.insert("sheetId".into(), json!(self.sheet_id()));
        if let Some(hidden) = update.hidden {
            props.insert("hidden".into(), json!(hidden));
            fields.push("hidden");
        }
        if let Some(color) = update.tab_color {
            props.insert("tabColor".into(), json!(color));
            fields.push("tabColor");
        }
        if let Some(rtl) = update.right_to_left {
            props.insert("rightToLeft".into(), json!(rtl));
            fields.push("rightToLeft");
        }
        if let Some(n) = update.frozen_row_count {
            grid.insert("frozenRowCount".into(), json!(n));
            fields.push("gridProperties.frozenRowCount");
        }
        if let Some(n) = update.frozen_column_count {
            grid.insert("frozenColumnCount".into(), json!(n));
            fields.push("gridProperties.frozenColumnCount");
        }
        if let Some(hide) = update.hide_gridlines {
            grid.insert("hideGridlines".into(), json!(hide));
            fields.push("gridProperties.hideGridlines");
        }
        if fields.is_empty() {
            return Ok(());
        }
        if !grid.is_empty() {
            props.insert("gridProperties".into(), Value::Object(grid));
        }

        let request = json!({
            "updateSheetProperties": {
                "properties": Value::Object(props),
                "fields": fields.join(","),
            }
        });
        self.client
            .batch_update(&self.spreadsheet_id, vec![request], None, &self.context(None))
            .await?;

        let p = &mut self.properties;
        if let Some(hidden) = update.hidden {
            p.hidden = hidden;
        }
        if update.tab_color.is_some() {
            p.tab_color = update.tab_color;
        }
        if let Some(rtl) = update.right_to_left {
            p.right_to_left = rtl;
        }
        if let Some(n) = update.frozen_row_count {
            p.grid_properties.frozen_row_count = n;
        }
        if let Some(n) = update.frozen_column_count {
            p.grid_properties.frozen_column_count = n;
        }
        if let Some(hide) = update.hide_gridlines {
            p.grid_properties.hide_gridlines = hide;
        }
        Ok(())
    }

    // Header row

    /// Read the header row from the sheet
    pub async fn load_header_row(&mut self, options: HeaderOptions) -> Result<Arc<HeaderRow>> {
        let row_number = options
            .row_number
            .or(self.header.as_ref().map(|h| h.row_number()))
            .unwrap_or(1);
        self.check_row_number(row_number)?;
        if self.column_count() == 0 {
            return Err(self.bounds_error(format!("row {row_number}")));
        }

        let last_col = self.column_count() - 1;
        let range = CellRange::from_indices(row_number - 1, 0, row_number - 1, last_col)
            .with_sheet(self.title());
        let request = ApiRequest::get(values_path(&self.spreadsheet_id, &range))
            .with_query("majorDimension", MajorDimension::Rows.as_str())
            .with_query("valueRenderOption", ValueRenderOption::FormattedValue.as_str());
        let context = self.context(Some(range));
        let response: ValueRange = self.client.call_json(request, &context).await?;

        let names: Vec<String> = response
            .values
            .first()
            .map(|row| row.iter().map(header_text).collect())
            .unwrap_or_default();
        let header = Arc::new(HeaderRow::new(names, row_number, options.allow_duplicates)?);
        tracing::debug!(sheet = %self.title(), headers = header.len(), "loaded header row");
        self.header = Some(header.clone());
        Ok(header)
    }

    /// Write a header row, clearing the rest of that row
    pub async fn set_header_row<I, S>(&mut self, headers: I, row_number: Option<u32>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let row_number = row_number
            .or(self.header.as_ref().map(|h| h.row_number()))
            .unwrap_or(1);
        self.check_row_number(row_number)?;
        let header = HeaderRow::new(headers, row_number, false)?;
        if header.len() > self.column_count() as usize {
            return Err(self.bounds_error(format!("{} headers", header.len())));
        }

        let mut values: Vec<Value> = header.values().iter().map(|h| json!(h)).collect();
        values.resize(self.column_count() as usize, json!(""));
        let cells =
            CellRange::from_indices(row_number - 1, 0, row_number - 1, self.column_count() - 1);
        let range = cells.with_sheet(self.title());
        let request = ApiRequest::put(values_path(&self.spreadsheet_id, &range))
            .with_query("valueInputOption", ValueInputOption::Raw.as_str())
            .with_body(json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": [values],
            }));
        let context = self.context(Some(range));
        self.client.call(request, &context).await?;

        self.forget_range(&cells);
        self.header = Some(Arc::new(header));
        Ok(())
    }

    async fn ensure_header(&mut self) -> Result<Arc<HeaderRow>> {
        match &self.header {
            Some(header) => Ok(header.clone()),
            None => self.load_header_row(HeaderOptions::default()).await,
        }
    }

    // Rows

    /// Read data rows below the header, loading the header first if needed.
    ///
    /// All rows come from one grid read, so formula errors arrive as
    /// [`CellValue::Error`] whatever render option is asked for. Values
    /// default to unformatted (numbers and booleans keep their types).
    /// Trailing empty rows are not returned.
    pub async fn get_rows(&mut self, options: GetRowsOptions) -> Result<Rows> {
        let header = self.ensure_header().await?;
        let first = header
            .row_number()
            .saturating_add(1)
            .saturating_add(options.offset);
        if first > self.row_count() || options.limit == Some(0) {
            return Ok(Rows::new(Vec::new()));
        }
        let last = match options.limit {
            Some(limit) => first.saturating_add(limit - 1).min(self.row_count()),
            None => self.row_count(),
        };

        let cells = CellRange::from_indices(first - 1, 0, last - 1, header.len() as u32 - 1);
        let a1 = cells.with_sheet(self.title());
        let context = self.context(Some(a1.clone()));
        let resource =
            fetch_grid(&self.client, &self.spreadsheet_id, std::slice::from_ref(&a1), &context)
                .await?;
        let grid = sheet_grids(&resource, self.sheet_id()).first();

        let mut values: Vec<Vec<CellValue>> = (cells.start.row..=cells.end.row)
            .map(|row| {
                (0..header.len() as u32)
                    .map(|col| {
                        grid.and_then(|g| {
                            g.cell(row.checked_sub(g.start_row)?, col.checked_sub(g.start_column)?)
                        })
                        .map(|data| data.render(&options.value_options))
                        .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();
        while values.last().is_some_and(|row| row.iter().all(CellValue::is_empty)) {
            values.pop();
        }

        let rows = values
            .into_iter()
            .enumerate()
            .map(|(i, values)| {
                Row::new(
                    self.sheet_id(),
                    first + i as u32,
                    values,
                    header.clone(),
                    self.structure_version,
                )
            })
            .collect();
        Ok(Rows::new(rows))
    }

    /// Append rows after the last row of the table under the header
    pub async fn add_rows<I>(&mut self, rows: I, options: AddRowsOptions) -> Result<Vec<Row>>
    where
        I: IntoIterator<Item = RowInput>,
    {
        let header = self.ensure_header().await?;
        let encoded = rows
            .into_iter()
            .map(|row| encode_row(&header, row))
            .collect::<Result<Vec<_>>>()?;
        if encoded.is_empty() {
            return Ok(Vec::new());
        }

        let anchor = format!("{}!A{}", self.a1_sheet_name(), header.row_number());
        let input = if options.raw {
            ValueInputOption::Raw
        } else {
            ValueInputOption::UserEntered
        };
        let insert = if options.insert {
            InsertDataOption::InsertRows
        } else {
            InsertDataOption::Overwrite
        };
        let request = ApiRequest::post(format!(
            "{}:append",
            values_path(&self.spreadsheet_id, &anchor)
        ))
        .with_query("valueInputOption", input.as_str())
        .with_query("insertDataOption", insert.as_str())
        .with_query("includeValuesInResponse", "true")
        .with_query(
            "responseValueRenderOption",
            ValueRenderOption::UnformattedValue.as_str(),
        )
        .with_body(json!({
            "range": anchor,
            "majorDimension": "ROWS",
            "values": encoded,
        }));
        let context = self.context(Some(anchor));
        let response: AppendValuesResponse = self.client.call_json(request, &context).await?;

        let updated = &response.updates.updated_range;
        let (_, cells) = split_sheet_range(updated);
        let written = CellRange::parse(cells).map_err(|e| {
            Error::unexpected(format!("bad updatedRange '{updated}': {e}"), &context)
        })?;

        let count = encoded.len() as u32;
        if options.insert {
            self.shift_rows(written.start.row, count as i64);
            self.properties.grid_properties.row_count += count;
            self.structure_version += 1;
        } else {
            let needed = written.end.row + 1;
            if needed > self.row_count() {
                self.properties.grid_properties.row_count = needed;
            }
            self.forget_range(&written);
        }

        let values: Vec<Vec<CellValue>> = match response.updates.updated_data {
            Some(data) => data
                .values
                .iter()
                .map(|row| row.iter().map(json_to_cell_value).collect())
                .collect(),
            None => encoded
                .iter()
                .map(|row| row.iter().map(json_to_cell_value).collect())
                .collect(),
        };
        tracing::debug!(sheet = %self.title(), range = %written, "appended rows");

        Ok(values
            .into_iter()
            .enumerate()
            .map(|(i, values)| {
                Row::new(
                    self.sheet_id(),
                    written.start.row + 1 + i as u32,
                    values,
                    header.clone(),
                    self.structure_version,
                )
            })
            .collect())
    }

    /// Append one row; see [`Worksheet::add_rows`]
    pub async fn add_row(&mut self, row: RowInput, options: AddRowsOptions) -> Result<Row> {
        let mut rows = self.add_rows([row], options).await?;
        rows.pop()
            .ok_or_else(|| Error::unexpected("append returned no rows", &self.context(None)))
    }

    /// Clear values of rows `start..=end` (1-based). Without `start`, the
    /// header is loaded if needed and clearing begins right below it.
    pub async fn clear_rows(&mut self, start: Option<u32>, end: Option<u32>) -> Result<()> {
        let start = match start {
            Some(start) => start,
            None => self.ensure_header().await?.row_number() + 1,
        };
        let end = end.unwrap_or(self.row_count());
        if start > end || start == 0 || end > self.row_count() {
            return Err(self.bounds_error(format!("rows {start}..={end}")));
        }
        if self.column_count() == 0 {
            return Ok(());
        }
        let range = CellRange::from_indices(start - 1, 0, end - 1, self.column_count() - 1);
        self.clear_values(Some(range)).await
    }

    // Cells

    /// Load cells of a range into the cache, replacing server data but
    /// keeping pending edits
    pub async fn load_cells(&mut self, range: CellRange) -> Result<()> {
        self.check_range(&range)?;
        let a1 = range.with_sheet(self.title());
        let context = self.context(Some(a1.clone()));
        let resource =
            fetch_grid(&self.client, &self.spreadsheet_id, std::slice::from_ref(&a1), &context)
                .await?;
        let grids = sheet_grids(&resource, self.sheet_id());
        self.apply_grid(&range, grids.first());
        Ok(())
    }

    /// Load the whole grid. An empty grid loads nothing.
    pub async fn load_all_cells(&mut self) -> Result<()> {
        match self.grid_range() {
            Some(range) => self.load_cells(range).await,
            None => Ok(()),
        }
    }

    /// Overlay fetched grid data on `range`; cells the server omitted are empty
    pub(crate) fn apply_grid(&mut self, range: &CellRange, grid: Option<&GridData>) {
        let sheet_id = self.sheet_id();
        for addr in range.cells() {
            let data = grid
                .and_then(|g| {
                    let row = addr.row.checked_sub(g.start_row)?;
                    let col = addr.col.checked_sub(g.start_column)?;
                    g.cell(row, col).cloned()
                })
                .unwrap_or_default();
            match self.cells.get_mut(&addr) {
                Some(cell) => cell.refresh(data),
                None => {
                    self.cells.insert(addr, Cell::new(sheet_id, addr, data));
                }
            }
        }
    }

    /// A loaded cell by 0-based indices
    pub fn cell(&self, row: u32, col: u32) -> Result<&Cell> {
        self.check_cell(row, col)?;
        let addr = CellAddress::new(row, col);
        self.cells.get(&addr).ok_or_else(|| not_loaded(addr))
    }

    /// Mutable access to a loaded cell for staging edits
    pub fn cell_mut(&mut self, row: u32, col: u32) -> Result<&mut Cell> {
        self.check_cell(row, col)?;
        let addr = CellAddress::new(row, col);
        self.cells.get_mut(&addr).ok_or_else(|| not_loaded(addr))
    }

    /// A loaded cell by A1 address, e.g. `B3`
    pub fn cell_by_a1(&self, a1: &str) -> Result<&Cell> {
        let addr = CellAddress::parse(a1)?;
        self.cell(addr.row, addr.col)
    }

    pub fn cell_by_a1_mut(&mut self, a1: &str) -> Result<&mut Cell> {
        let addr = CellAddress::parse(a1)?;
        self.cell_mut(addr.row, addr.col)
    }

    /// Loaded cells of a range, row by row. Every cell must be inside the
    /// grid and loaded.
    pub fn get_cells(&self, range: &CellRange) -> Result<Vec<Vec<&Cell>>> {
        self.check_range(range)?;
        (range.start.row..=range.end.row)
            .map(|row| {
                (range.start.col..=range.end.col)
                    .map(|col| self.cell(row, col))
                    .collect()
            })
            .collect()
    }

    /// Like [`Worksheet::get_cells`], with `None` for cells outside the grid
    /// or not loaded
    pub fn get_cells_padded(&self, range: &CellRange) -> Vec<Vec<Option<&Cell>>> {
        (range.start.row..=range.end.row)
            .map(|row| {
                (range.start.col..=range.end.col)
                    .map(|col| self.cells.get(&CellAddress::new(row, col)))
                    .collect()
            })
            .collect()
    }

    /// Loaded cells with pending edits
    pub fn dirty_cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.values().filter(|c| c.is_dirty())
    }

    /// Save every loaded cell with pending edits. Returns the number saved.
    pub async fn save_updated_cells(&mut self, options: SaveOptions) -> Result<usize> {
        let dirty: Vec<CellAddress> = self.dirty_cells().map(Cell::address).collect();
        self.save_cells(&dirty, options).await
    }

    /// Save the given loaded cells in one atomic request and refresh them
    /// with the values the server computed
    pub async fn save_cells(
        &mut self,
        addresses: &[CellAddress],
        options: SaveOptions,
    ) -> Result<usize> {
        let mut targets = Vec::with_capacity(addresses.len());
        for &addr in addresses {
            self.check_cell(addr.row, addr.col)?;
            let cell = self.cells.get(&addr).ok_or_else(|| not_loaded(addr))?;
            if options.mode == SaveMode::Full || cell.is_dirty() {
                targets.push(addr);
            }
        }
        targets.sort();
        targets.dedup();

        let full = options.mode == SaveMode::Full;
        let mut requests = Vec::with_capacity(targets.len());
        let mut saved = Vec::with_capacity(targets.len());
        for addr in targets {
            if let Some(request) = self.cells.get(&addr).and_then(|c| c.update_request(full)) {
                requests.push(request);
                saved.push(addr);
            }
        }
        if saved.is_empty() {
            return Ok(0);
        }

        let ranges: Vec<String> = saved
            .iter()
            .map(|a| CellRange::single(*a).with_sheet(self.title()))
            .collect();
        let context = self.context(None);

        if options.concurrency == ConcurrencyMode::Optimistic {
            self.check_unchanged(&saved, &ranges, &context).await?;
        }

        let response = self
            .client
            .batch_update(
                &self.spreadsheet_id,
                requests,
                Some(json!({
                    "includeSpreadsheetInResponse": true,
                    "responseRanges": ranges,
                    "responseIncludeGridData": true,
                })),
                &context,
            )
            .await?;

        let grids = response
            .updated_spreadsheet
            .as_ref()
            .map(|s| sheet_grids(s, self.sheet_id()))
            .unwrap_or(&[]);
        if grids.len() == saved.len() {
            for (addr, grid) in saved.iter().zip(grids) {
                let data = grid.cell(0, 0).cloned().unwrap_or_default();
                if let Some(cell) = self.cells.get_mut(addr) {
                    cell.apply_saved(data);
                }
            }
        } else {
            tracing::warn!(
                sheet = %self.title(),
                expected = saved.len(),
                got = grids.len(),
                "save response lacked cell data; dropping saved cells from the cache"
            );
            for addr in &saved {
                self.cells.remove(addr);
            }
        }
        tracing::debug!(sheet = %self.title(), cells = saved.len(), "saved cells");
        Ok(saved.len())
    }

    async fn check_unchanged(
        &self,
        addresses: &[CellAddress],
        ranges: &[String],
        context: &RequestContext,
    ) -> Result<()> {
        let resource = fetch_grid(&self.client, &self.spreadsheet_id, ranges, context).await?;
        let grids = sheet_grids(&resource, self.sheet_id());
        for (i, addr) in addresses.iter().enumerate() {
            let remote = grids
                .get(i)
                .and_then(|g| g.cell(0, 0))
                .and_then(|d| d.user_entered_value.as_ref());
            let local = self
                .cells
                .get(addr)
                .and_then(|c| c.data().user_entered_value.as_ref());
            if remote != local {
                return Err(Error::Conflict {
                    message: format!("cell {addr} changed on the server since it was loaded"),
                    context: context.clone().with_range(ranges[i].clone()),
                });
            }
        }
        Ok(())
    }

    /// Revert staged edits of every loaded cell
    pub fn discard_unsaved_changes(&mut self) {
        for cell in self.cells.values_mut() {
            cell.discard_unsaved_changes();
        }
    }

    /// Drop loaded cells; unless `data_only`, forget the header row too
    pub fn reset_local_cache(&mut self, data_only: bool) {
        self.cells.clear();
        if !data_only {
            self.header = None;
        }
    }

    /// Read raw values of an A1 range without touching the cache
    pub async fn get_cells_in_range(
        &self,
        a1: &str,
        options: GetValuesRequestOptions,
    ) -> Result<Vec<Vec<CellValue>>> {
        let range = self.parse_own_range(a1)?.with_sheet(self.title());
        let mut request = ApiRequest::get(values_path(&self.spreadsheet_id, &range));
        for (key, value) in options.to_query() {
            request = request.with_query(key, value);
        }
        let context = self.context(Some(range));
        let response: ValueRange = self.client.call_json(request, &context).await?;
        Ok(decode_values(&response))
    }

    /// Read several A1 ranges in one request
    pub async fn batch_get_cells_in_range(
        &self,
        ranges: &[&str],
        options: GetValuesRequestOptions,
    ) -> Result<Vec<Vec<Vec<CellValue>>>> {
        let ranges = ranges
            .iter()
            .map(|r| Ok(self.parse_own_range(r)?.with_sheet(self.title())))
            .collect::<Result<Vec<_>>>()?;
        if ranges.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = ApiRequest::get(format!(
            "{}/values:batchGet",
            spreadsheet_path(&self.spreadsheet_id)
        ));
        for range in &ranges {
            request = request.with_query("ranges", range.as_str());
        }
        for (key, value) in options.to_query() {
            request = request.with_query(key, value);
        }
        let response: BatchGetValuesResponse =
            self.client.call_json(request, &self.context(None)).await?;
        Ok(response.value_ranges.iter().map(decode_values).collect())
    }

    // Structure

    /// Change the grid size. Shrinking past loaded non-empty cells is
    /// refused unless `force` is set.
    pub async fn resize(&mut self, rows: u32, cols: u32, force: bool) -> Result<()> {
        if rows == 0 || cols == 0 || rows > MAX_ROWS || cols > MAX_COLS {
            return Err(Error::validation(format!(
                "invalid grid size {rows} x {cols}"
            )));
        }
        if !force {
            if let Some(cell) = self
                .cells
                .values()
                .find(|c| (c.row_index() >= rows || c.column_index() >= cols) && c.has_content())
            {
                return Err(Error::Validation {
                    message: format!(
                        "resizing to {rows} x {cols} would discard loaded non-empty cell {}; \
                         pass force to shrink anyway",
                        cell.a1_address()
                    ),
                    context: Some(self.context(None)),
                });
            }
        }

        let request = json!({
            "updateSheetProperties": {
                "properties": {
                    "sheetId": self.sheet_id(),
                    "gridProperties": { "rowCount": rows, "columnCount": cols },
                },
                "fields": "gridProperties.rowCount,gridProperties.columnCount",
            }
        });
        self.client
            .batch_update(&self.spreadsheet_id, vec![request], None, &self.context(None))
            .await?;

        self.cells.retain(|a, _| a.row < rows && a.col < cols);
        if self
            .header
            .as_ref()
            .is_some_and(|h| h.row_number() > rows || h.len() > cols as usize)
        {
            self.header = None;
        }
        let grid = &mut self.properties.grid_properties;
        grid.row_count = rows;
        grid.column_count = cols;
        grid.frozen_row_count = grid.frozen_row_count.min(rows);
        grid.frozen_column_count = grid.frozen_column_count.min(cols);
        self.structure_version += 1;
        Ok(())
    }

    fn dimension_count(&self, dimension: Dimension) -> u32 {
        match dimension {
            Dimension::Rows => self.row_count(),
            Dimension::Columns => self.column_count(),
        }
    }

    /// Insert rows or columns at 0-based `start..end`
    pub async fn insert_dimension(
        &mut self,
        dimension: Dimension,
        start: u32,
        end: u32,
        inherit_from_before: bool,
    ) -> Result<()> {
        let count = self.dimension_count(dimension);
        if start >= end || start > count {
            return Err(self.bounds_error(format!(
                "insert of {} {start}..{end}",
                dimension.as_str().to_lowercase()
            )));
        }
        if inherit_from_before && start == 0 {
            return Err(Error::validation(
                "cannot inherit properties from before the first row or column",
            ));
        }

        let request = json!({
            "insertDimension": {
                "range": {
                    "sheetId": self.sheet_id(),
                    "dimension": dimension.as_str(),
                    "startIndex": start,
                    "endIndex": end,
                },
                "inheritFromBefore": inherit_from_before,
            }
        });
        self.client
            .batch_update(&self.spreadsheet_id, vec![request], None, &self.context(None))
            .await?;

        let n = end - start;
        match dimension {
            Dimension::Rows => {
                self.shift_rows(start, n as i64);
                self.properties.grid_properties.row_count += n;
            }
            Dimension::Columns => {
                self.shift_columns(start, n as i64);
                self.properties.grid_properties.column_count += n;
                // header columns moved; names may no longer line up
                if start < self.header.as_ref().map_or(0, |h| h.len() as u32) {
                    self.header = None;
                }
            }
        }
        self.structure_version += 1;
        Ok(())
    }

    /// Delete rows or columns at 0-based `start..end`
    pub async fn delete_dimension(
        &mut self,
        dimension: Dimension,
        start: u32,
        end: u32,
    ) -> Result<()> {
        let count = self.dimension_count(dimension);
        if start >= end || end > count {
            return Err(self.bounds_error(format!(
                "delete of {} {start}..{end}",
                dimension.as_str().to_lowercase()
            )));
        }
        if end - start >= count {
            return Err(Error::validation(format!(
                "cannot delete every {} of a sheet",
                if dimension == Dimension::Rows { "row" } else { "column" }
            )));
        }

        let request = json!({
            "deleteDimension": {
                "range": {
                    "sheetId": self.sheet_id(),
                    "dimension": dimension.as_str(),
                    "startIndex": start,
                    "endIndex": end,
                }
            }
        });
        self.client
            .batch_update(&self.spreadsheet_id, vec![request], None, &self.context(None))
            .await?;

        let n = end - start;
        match dimension {
            Dimension::Rows => {
                self.cells.retain(|a, _| a.row < start || a.row >= end);
                self.shift_rows(end, -(n as i64));
                self.properties.grid_properties.row_count -= n;
            }
            Dimension::Columns => {
                self.cells.retain(|a, _| a.col < start || a.col >= end);
                self.shift_columns(end, -(n as i64));
                self.properties.grid_properties.column_count -= n;
                if start < self.header.as_ref().map_or(0, |h| h.len() as u32) {
                    self.header = None;
                }
            }
        }
        self.structure_version += 1;
        Ok(())
    }

    /// Move cached cells (and the header) at rows `>= from` by `delta`.
    /// Headers inside a deleted band are dropped by the caller's retain.
    fn shift_rows(&mut self, from: u32, delta: i64) {
        let cells = std::mem::take(&mut self.cells);
        self.cells = cells
            .into_iter()
            .map(|(addr, mut cell)| {
                if addr.row >= from {
                    let moved = CellAddress::new((addr.row as i64 + delta) as u32, addr.col);
                    cell.move_to(moved);
                    (moved, cell)
                } else {
                    (addr, cell)
                }
            })
            .collect();

        if let Some(header) = &self.header {
            let index = header.row_number() - 1;
            if delta < 0 && index >= from.saturating_sub((-delta) as u32) && index < from {
                self.header = None;
            } else if index >= from {
                let row_number = (header.row_number() as i64 + delta) as u32;
                self.header = Some(Arc::new(header.shifted(row_number)));
            }
        }
    }

    fn shift_columns(&mut self, from: u32, delta: i64) {
        let cells = std::mem::take(&mut self.cells);
        self.cells = cells
            .into_iter()
            .map(|(addr, mut cell)| {
                if addr.col >= from {
                    let moved = CellAddress::new(addr.row, (addr.col as i64 + delta) as u32);
                    cell.move_to(moved);
                    (moved, cell)
                } else {
                    (addr, cell)
                }
            })
            .collect();
    }

    /// Merge the cells of `range`.
    ///
    /// The server keeps only the top-left value of each merged block; the
    /// cell cache is not touched, so reload the range to see the result.
    pub async fn merge_cells(&mut self, range: CellRange, merge_type: MergeType) -> Result<()> {
        self.check_range(&range)?;
        let request = json!({
            "mergeCells": {
                "range": GridRange::from_range(self.sheet_id(), &range),
                "mergeType": merge_type.as_str(),
            }
        });
        let context = self.context(Some(range.with_sheet(self.title())));
        self.client
            .batch_update(&self.spreadsheet_id, vec![request], None, &context)
            .await?;
        Ok(())
    }

    /// Split every merge that intersects `range`
    pub async fn unmerge_cells(&mut self, range: CellRange) -> Result<()> {
        self.check_range(&range)?;
        let request = json!({
            "unmergeCells": { "range": GridRange::from_range(self.sheet_id(), &range) }
        });
        let context = self.context(Some(range.with_sheet(self.title())));
        self.client
            .batch_update(&self.spreadsheet_id, vec![request], None, &context)
            .await?;
        Ok(())
    }

    /// Set (or clear, with `None`) the validation rule of a range
    pub async fn set_data_validation(
        &mut self,
        range: CellRange,
        rule: Option<&DataValidationRule>,
    ) -> Result<()> {
        self.check_range(&range)?;
        if let Some(rule) = rule {
            rule.validate()?;
        }

        let mut body = Map::new();
        body.insert(
            "range".into(),
            json!(GridRange::from_range(self.sheet_id(), &range)),
        );
        if let Some(rule) = rule {
            body.insert("rule".into(), json!(rule));
        }
        let request = json!({ "setDataValidation": Value::Object(body) });
        let context = self.context(Some(range.with_sheet(self.title())));
        self.client
            .batch_update(&self.spreadsheet_id, vec![request], None, &context)
            .await?;

        for (_, cell) in self.cells.range_mut(range.start..=range.end) {
            if range.contains(&cell.address()) {
                cell.set_validation_data(rule.cloned());
            }
        }
        Ok(())
    }

    /// Clear values (not formatting) of a range, or the whole sheet
    pub async fn clear_values(&mut self, range: Option<CellRange>) -> Result<()> {
        let a1 = match &range {
            Some(range) => {
                self.check_range(range)?;
                range.with_sheet(self.title())
            }
            None => self.a1_sheet_name(),
        };
        let request =
            ApiRequest::post(format!("{}:clear", values_path(&self.spreadsheet_id, &a1)))
                .with_body(json!({}));
        let context = self.context(Some(a1));
        self.client.call(request, &context).await?;

        for cell in self.cells.values_mut() {
            if range.as_ref().map_or(true, |r| r.contains(&cell.address())) {
                cell.clear_values();
            }
        }
        Ok(())
    }

    /// Drop cached cells of a range written outside the cell cache
    pub(crate) fn forget_range(&mut self, range: &CellRange) {
        self.cells.retain(|a, _| !range.contains(a));
    }

    /// Drop cached cells of ranges written elsewhere
    pub(crate) fn forget_ranges(&mut self, ranges: &[CellRange]) {
        for range in ranges {
            self.forget_range(range);
        }
    }
}

fn not_loaded(addr: CellAddress) -> Error {
    Error::usage(format!("cell {addr} has not been loaded; call load_cells first"))
}

fn header_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn decode_values(range: &ValueRange) -> Vec<Vec<CellValue>> {
    range
        .values
        .iter()
        .map(|row| row.iter().map(json_to_cell_value).collect())
        .collect()
}

fn encode_row(header: &HeaderRow, row: RowInput) -> Result<Vec<Value>> {
    let check = |value: &CellValue| -> Result<()> {
        if let CellValue::Error(e) = value {
            return Err(Error::usage(format!(
                "cannot write error value {}; errors are computed by the server",
                e.display_code()
            )));
        }
        Ok(())
    };
    match row {
        RowInput::Values(values) => values
            .iter()
            .map(|v| {
                check(v)?;
                Ok(cell_value_to_json(v))
            })
            .collect(),
        RowInput::Named(pairs) => {
            let mut out = vec![json!(""); header.len()];
            for (key, value) in &pairs {
                let col = header.column_of(key).ok_or_else(|| {
                    Error::validation(format!(
                        "no header named \"{key}\" (headers: {})",
                        header.values().join(", ")
                    ))
                })?;
                check(value)?;
                out[col] = cell_value_to_json(value);
            }
            Ok(out)
        }
    }
}

/// `spreadsheets.getByDataFilter` with grid data for each A1 range
pub(crate) async fn fetch_grid(
    client: &SheetsClient,
    spreadsheet_id: &str,
    a1_ranges: &[String],
    context: &RequestContext,
) -> Result<SpreadsheetResource> {
    let filters: Vec<Value> = a1_ranges.iter().map(|r| json!({ "a1Range": r })).collect();
    let request = ApiRequest::post(format!(
        "{}:getByDataFilter",
        spreadsheet_path(spreadsheet_id)
    ))
    .with_body(json!({
        "dataFilters": filters,
        "includeGridData": true,
    }));
    client.call_json(request, context).await
}

/// Grid data returned for one sheet, in request order
pub(crate) fn sheet_grids(resource: &SpreadsheetResource, sheet_id: i64) -> &[GridData] {
    resource
        .sheets
        .iter()
        .find(|s| s.properties.sheet_id == sheet_id)
        .map(|s| s.data.as_slice())
        .unwrap_or(&[])
}
