//! Spreadsheet documents and their sheet collection.

use std::fmt;

use ahash::{AHashMap, AHashSet};
use gsheets_core::{CellAddress, CellRange, Color, MAX_SHEET_TITLE_LEN};
use serde_json::{json, Map, Value};

use crate::batch::{BatchMode, BatchOutcome, RangeUpdate};
use crate::client::{decode, spreadsheet_path, SheetsClient};
use crate::error::{Error, RequestContext, Result};
use crate::transport::ApiRequest;
use crate::wire::{
    GridRange, NamedRange, SheetProperties, SpreadsheetProperties, SpreadsheetResource,
};
use crate::worksheet::{fetch_grid, sheet_grids, Worksheet};

const INFO_FIELDS: &str = "spreadsheetId,properties,spreadsheetUrl,sheets.properties,namedRanges";

/// Document property changes; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpreadsheetPropertiesUpdate {
    pub title: Option<String>,
    pub locale: Option<String>,
    pub time_zone: Option<String>,
    /// `ON_CHANGE`, `MINUTE` or `HOUR`
    pub auto_recalc: Option<String>,
}

/// Properties of a sheet to add
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSheet {
    /// Server picks `SheetN` when unset
    pub title: Option<String>,
    /// Position among the sheets; appended when unset
    pub index: Option<u32>,
    pub row_count: Option<u32>,
    pub column_count: Option<u32>,
    pub frozen_row_count: Option<u32>,
    pub frozen_column_count: Option<u32>,
    pub hidden: bool,
    pub tab_color: Option<Color>,
    pub right_to_left: bool,
    /// Header row written right after the sheet is created
    pub headers: Option<Vec<String>>,
}

impl NewSheet {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_grid(mut self, rows: u32, columns: u32) -> Self {
        self.row_count = Some(rows);
        self.column_count = Some(columns);
        self
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = Some(headers.into_iter().map(Into::into).collect());
        self
    }
}

/// Cells of one sheet to load; the whole grid when `range` is `None`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellFilter {
    pub sheet_id: i64,
    pub range: Option<CellRange>,
}

impl CellFilter {
    pub fn sheet(sheet_id: i64) -> Self {
        Self {
            sheet_id,
            range: None,
        }
    }

    pub fn range(sheet_id: i64, range: CellRange) -> Self {
        Self {
            sheet_id,
            range: Some(range),
        }
    }
}

/// A spreadsheet document.
///
/// Owns its [`Worksheet`]s, ordered by sheet index. Properties are
/// unavailable until [`Spreadsheet::load_info`] succeeds.
pub struct Spreadsheet {
    client: SheetsClient,
    id: String,
    properties: Option<SpreadsheetProperties>,
    url: Option<String>,
    named_ranges: Vec<NamedRange>,
    sheets: Vec<Worksheet>,
}

impl fmt::Debug for Spreadsheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spreadsheet")
            .field("id", &self.id)
            .field("title", &self.title())
            .field("sheets", &self.sheets)
            .finish()
    }
}

impl Spreadsheet {
    pub fn new(client: SheetsClient, id: impl Into<String>) -> Self {
        Self {
            client,
            id: id.into(),
            properties: None,
            url: None,
            named_ranges: Vec::new(),
            sheets: Vec::new(),
        }
    }

    /// Create a new document with one default sheet
    pub async fn create(client: SheetsClient, title: &str) -> Result<Self> {
        if title.trim().is_empty() {
            return Err(Error::validation("spreadsheet title must not be empty"));
        }
        let request = ApiRequest::post("spreadsheets").with_body(json!({
            "properties": { "title": title },
        }));
        let context = RequestContext::default();
        let body = client.call(request, &context).await?;
        let resource: SpreadsheetResource = decode(body, &context)?;

        let mut doc = Self::new(client, resource.spreadsheet_id.clone());
        doc.apply_resource(resource)?;
        tracing::info!(id = %doc.id, "created spreadsheet");
        Ok(doc)
    }

    fn context(&self) -> RequestContext {
        RequestContext::spreadsheet(&self.id)
    }

    /// Fetch document properties and the sheet list.
    ///
    /// Loaded sheets keep their cell caches. On failure nothing changes.
    pub async fn load_info(&mut self) -> Result<()> {
        let request =
            ApiRequest::get(spreadsheet_path(&self.id)).with_query("fields", INFO_FIELDS);
        let resource: SpreadsheetResource =
            self.client.call_json(request, &self.context()).await?;
        self.apply_resource(resource)
    }

    fn apply_resource(&mut self, resource: SpreadsheetResource) -> Result<()> {
        let mut seen = AHashSet::with_capacity(resource.sheets.len());
        for sheet in &resource.sheets {
            if !seen.insert(sheet.properties.sheet_id) {
                return Err(Error::unexpected(
                    format!("duplicate sheet id {}", sheet.properties.sheet_id),
                    &self.context(),
                ));
            }
        }

        let mut existing: AHashMap<i64, Worksheet> = self
            .sheets
            .drain(..)
            .map(|ws| (ws.sheet_id(), ws))
            .collect();
        let mut sheets: Vec<Worksheet> = resource
            .sheets
            .into_iter()
            .map(|sheet| match existing.remove(&sheet.properties.sheet_id) {
                Some(mut ws) => {
                    ws.set_properties(sheet.properties);
                    ws
                }
                None => Worksheet::new(self.client.clone(), self.id.clone(), sheet.properties),
            })
            .collect();
        sheets.sort_by_key(Worksheet::index);

        self.sheets = sheets;
        self.properties = Some(resource.properties);
        self.url = resource.spreadsheet_url;
        self.named_ranges = resource.named_ranges;
        Ok(())
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.properties.is_none() {
            return Err(Error::usage(
                "spreadsheet info is not loaded; call load_info first",
            ));
        }
        Ok(())
    }

    // Accessors

    /// The spreadsheet id from its URL
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn client(&self) -> &SheetsClient {
        &self.client
    }

    /// Whether [`Spreadsheet::load_info`] has succeeded
    pub fn is_loaded(&self) -> bool {
        self.properties.is_some()
    }

    /// Document properties; `None` until loaded
    pub fn properties(&self) -> Option<&SpreadsheetProperties> {
        self.properties.as_ref()
    }

    pub fn title(&self) -> Option<&str> {
        self.properties.as_ref().map(|p| p.title.as_str())
    }

    pub fn locale(&self) -> Option<&str> {
        self.properties.as_ref()?.locale.as_deref()
    }

    pub fn time_zone(&self) -> Option<&str> {
        self.properties.as_ref()?.time_zone.as_deref()
    }

    pub fn auto_recalc(&self) -> Option<&str> {
        self.properties.as_ref()?.auto_recalc.as_deref()
    }

    /// Link to the document in the web UI
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn named_ranges(&self) -> &[NamedRange] {
        &self.named_ranges
    }

    /// Sheets in index order
    pub fn sheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    pub fn sheets_mut(&mut self) -> &mut [Worksheet] {
        &mut self.sheets
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheet_by_index(&self, index: usize) -> Option<&Worksheet> {
        self.sheets.get(index)
    }

    pub fn sheet_by_index_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.sheets.get_mut(index)
    }

    pub fn sheet_by_id(&self, sheet_id: i64) -> Option<&Worksheet> {
        self.sheets.iter().find(|s| s.sheet_id() == sheet_id)
    }

    pub fn sheet_by_id_mut(&mut self, sheet_id: i64) -> Option<&mut Worksheet> {
        self.sheets.iter_mut().find(|s| s.sheet_id() == sheet_id)
    }

    /// Titles match exactly, case included
    pub fn sheet_by_title(&self, title: &str) -> Option<&Worksheet> {
        self.sheets.iter().find(|s| s.title() == title)
    }

    pub fn sheet_by_title_mut(&mut self, title: &str) -> Option<&mut Worksheet> {
        self.sheets.iter_mut().find(|s| s.title() == title)
    }

    fn sheet_not_found(&self, sheet_id: i64) -> Error {
        Error::NotFound {
            message: format!("no sheet with id {sheet_id} in the loaded sheet list"),
            context: self.context().with_sheet(sheet_id),
        }
    }

    /// Titles are unique ignoring case
    fn check_title(&self, title: &str, ignore: Option<i64>) -> Result<()> {
        if title.trim().is_empty() || title.chars().count() > MAX_SHEET_TITLE_LEN {
            return Err(gsheets_core::Error::InvalidSheetTitle(format!(
                "'{title}' must be 1 to {MAX_SHEET_TITLE_LEN} characters"
            ))
            .into());
        }
        let taken = self
            .sheets
            .iter()
            .any(|s| Some(s.sheet_id()) != ignore && s.title().eq_ignore_ascii_case(title));
        if taken {
            return Err(Error::validation(format!(
                "a sheet named '{title}' already exists"
            )));
        }
        Ok(())
    }

    // Document properties

    /// Change document properties (title, locale, time zone, recalculation).
    ///
    /// Requires loaded info. Unset fields are left alone, and an update with
    /// nothing set sends no request.
    pub async fn update_properties(&mut self, update: SpreadsheetPropertiesUpdate) -> Result<()> {
        self.ensure_loaded()?;
        if let Some(title) = &update.title {
            if title.trim().is_empty() {
                return Err(Error::validation("spreadsheet title must not be empty"));
            }
        }

        let mut props = Map::new();
        let mut fields = Vec::new();
        for (key, value) in [
            ("title", &update.title),
            ("locale", &update.locale),
            ("timeZone", &update.time_zone),
            ("autoRecalc", &update.auto_recalc),
        ] {
            if let Some(value) = value {
                props.insert(key.into(), json!(value));
                fields.push(key);
            }
        }
        if fields.is_empty() {
            return Ok(());
        }

        let request = json!({
            "updateSpreadsheetProperties": {
                "properties": Value::Object(props),
                "fields": fields.join(","),
            }
        });
        self.client
            .batch_update(&self.id, vec![request], None, &self.context())
            .await?;

        if let Some(p) = self.properties.as_mut() {
            if let Some(title) = update.title {
                p.title = title;
            }
            if update.locale.is_some() {
                p.locale = update.locale;
            }
            if update.time_zone.is_some() {
                p.time_zone = update.time_zone;
            }
            if update.auto_recalc.is_some() {
                p.auto_recalc = update.auto_recalc;
            }
        }
        Ok(())
    }

    // Sheets

    /// Add a sheet. The local list changes only after the server accepts it.
    ///
    /// When `headers` are given they are written in a second request; if
    /// that fails the sheet still exists and the error is returned.
    pub async fn add_sheet(&mut self, new: NewSheet) -> Result<&mut Worksheet> {
        self.ensure_loaded()?;
        if let Some(title) = &new.title {
            self.check_title(title, None)?;
        }
        if let Some(index) = new.index {
            if index as usize > self.sheets.len() {
                return Err(Error::validation(format!(
                    "sheet index {index} is past the end ({} sheets)",
                    self.sheets.len()
                )));
            }
        }
        if let Some(headers) = &new.headers {
            crate::row::HeaderRow::new(headers, 1, false)?;
            if let Some(cols) = new.column_count {
                if headers.len() > cols as usize {
                    return Err(Error::validation(format!(
                        "{} headers do not fit in {cols} columns",
                        headers.len()
                    )));
                }
            }
        }

        let mut props = Map::new();
        let mut grid = Map::new();
        if let Some(title) = &new.title {
            props.insert("title".into(), json!(title));
        }
        if let Some(index) = new.index {
            props.insert("index".into(), json!(index));
        }
        if new.hidden {
            props.insert("hidden".into(), json!(true));
        }
        if new.right_to_left {
            props.insert("rightToLeft".into(), json!(true));
        }
        if let Some(color) = new.tab_color {
            props.insert("tabColor".into(), json!(color));
        }
        for (key, value) in [
            ("rowCount", new.row_count),
            ("columnCount", new.column_count),
            ("frozenRowCount", new.frozen_row_count),
            ("frozenColumnCount", new.frozen_column_count),
        ] {
            if let Some(value) = value {
                grid.insert(key.into(), json!(value));
            }
        }
        if !grid.is_empty() {
            props.insert("gridProperties".into(), Value::Object(grid));
        }

        let request = json!({ "addSheet": { "properties": Value::Object(props) } });
        let context = self.context();
        let response = self
            .client
            .batch_update(&self.id, vec![request], None, &context)
            .await?;
        let properties: SheetProperties = reply(&response.replies, 0, "addSheet", &context)?;

        let sheet_id = properties.sheet_id;
        tracing::info!(sheet_id, title = %properties.title, "added sheet");
        self.insert_sheet(properties);

        let ws = self
            .sheet_by_id_mut(sheet_id)
            .ok_or_else(|| Error::unexpected("added sheet missing", &context))?;
        if let Some(headers) = new.headers {
            ws.set_header_row(headers, None).await?;
        }
        Ok(ws)
    }

    fn insert_sheet(&mut self, properties: SheetProperties) {
        let index = properties.index;
        for ws in &mut self.sheets {
            if ws.index() >= index {
                ws.set_index(ws.index() + 1);
            }
        }
        self.sheets
            .push(Worksheet::new(self.client.clone(), self.id.clone(), properties));
        self.sheets.sort_by_key(Worksheet::index);
    }

    /// Delete a sheet. On failure the local list is unchanged.
    pub async fn delete_sheet(&mut self, sheet_id: i64) -> Result<()> {
        let position = self
            .sheets
            .iter()
            .position(|s| s.sheet_id() == sheet_id)
            .ok_or_else(|| self.sheet_not_found(sheet_id))?;

        let request = json!({ "deleteSheet": { "sheetId": sheet_id } });
        self.client
            .batch_update(&self.id, vec![request], None, &self.context().with_sheet(sheet_id))
            .await?;

        let removed = self.sheets.remove(position);
        for ws in &mut self.sheets {
            if ws.index() > removed.index() {
                ws.set_index(ws.index() - 1);
            }
        }
        self.named_ranges.retain(|n| n.range.sheet_id != sheet_id);
        tracing::info!(sheet_id, title = %removed.title(), "deleted sheet");
        Ok(())
    }

    /// Rename a sheet. The new title is checked against the other sheets
    /// before anything is sent.
    pub async fn rename_sheet(&mut self, sheet_id: i64, title: &str) -> Result<()> {
        if self.sheet_by_id(sheet_id).is_none() {
            return Err(self.sheet_not_found(sheet_id));
        }
        self.check_title(title, Some(sheet_id))?;

        let request = json!({
            "updateSheetProperties": {
                "properties": { "sheetId": sheet_id, "title": title },
                "fields": "title",
            }
        });
        self.client
            .batch_update(&self.id, vec![request], None, &self.context().with_sheet(sheet_id))
            .await?;

        if let Some(ws) = self.sheet_by_id_mut(sheet_id) {
            ws.set_title(title.to_string());
        }
        Ok(())
    }

    /// Copy a sheet, contents included. The copy starts with an empty cache.
    pub async fn duplicate_sheet(
        &mut self,
        sheet_id: i64,
        new_title: Option<&str>,
        insert_index: Option<u32>,
    ) -> Result<&mut Worksheet> {
        if self.sheet_by_id(sheet_id).is_none() {
            return Err(self.sheet_not_found(sheet_id));
        }
        if let Some(title) = new_title {
            self.check_title(title, None)?;
        }

        let mut body = Map::new();
        body.insert("sourceSheetId".into(), json!(sheet_id));
        if let Some(title) = new_title {
            body.insert("newSheetName".into(), json!(title));
        }
        if let Some(index) = insert_index {
            body.insert("insertSheetIndex".into(), json!(index));
        }
        let request = json!({ "duplicateSheet": Value::Object(body) });
        let context = self.context().with_sheet(sheet_id);
        let response = self
            .client
            .batch_update(&self.id, vec![request], None, &context)
            .await?;
        let properties: SheetProperties = reply(&response.replies, 0, "duplicateSheet", &context)?;

        let new_id = properties.sheet_id;
        self.insert_sheet(properties);
        self.sheet_by_id_mut(new_id)
            .ok_or_else(|| Error::unexpected("duplicated sheet missing", &context))
    }

    // Named ranges

    pub fn named_range(&self, name: &str) -> Option<&NamedRange> {
        self.named_ranges
            .iter()
            .find(|n| n.name.eq_ignore_ascii_case(name))
    }

    /// Name a range of a sheet
    pub async fn add_named_range(
        &mut self,
        name: &str,
        sheet_id: i64,
        range: CellRange,
    ) -> Result<&NamedRange> {
        self.ensure_loaded()?;
        check_range_name(name)?;
        if self.named_range(name).is_some() {
            return Err(Error::validation(format!(
                "a named range '{name}' already exists"
            )));
        }
        self.sheet_by_id(sheet_id)
            .ok_or_else(|| self.sheet_not_found(sheet_id))?
            .check_range(&range)?;

        let request = json!({
            "addNamedRange": {
                "namedRange": {
                    "name": name,
                    "range": GridRange::from_range(sheet_id, &range),
                }
            }
        });
        let context = self.context().with_sheet(sheet_id);
        let response = self
            .client
            .batch_update(&self.id, vec![request], None, &context)
            .await?;
        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct AddNamedRangeReply {
            named_range: NamedRange,
        }
        let added: AddNamedRangeReply = reply(&response.replies, 0, "addNamedRange", &context)?;

        self.named_ranges.push(added.named_range);
        self.named_ranges
            .last()
            .ok_or_else(|| Error::unexpected("named range missing", &context))
    }

    /// Delete a named range by id
    pub async fn delete_named_range(&mut self, named_range_id: &str) -> Result<()> {
        let position = self
            .named_ranges
            .iter()
            .position(|n| n.named_range_id == named_range_id)
            .ok_or_else(|| Error::NotFound {
                message: format!("no named range with id {named_range_id}"),
                context: self.context(),
            })?;

        let request = json!({ "deleteNamedRange": { "namedRangeId": named_range_id } });
        self.client
            .batch_update(&self.id, vec![request], None, &self.context())
            .await?;
        self.named_ranges.remove(position);
        Ok(())
    }

    // Cells across sheets

    /// Load cells of several sheets in one request
    pub async fn load_cells(&mut self, filters: &[CellFilter]) -> Result<()> {
        let mut targets = Vec::with_capacity(filters.len());
        for filter in filters {
            let ws = self
                .sheet_by_id(filter.sheet_id)
                .ok_or_else(|| self.sheet_not_found(filter.sheet_id))?;
            let range = match filter.range {
                Some(range) => {
                    ws.check_range(&range)?;
                    range
                }
                None => match ws.grid_range() {
                    Some(range) => range,
                    None => continue,
                },
            };
            targets.push((filter.sheet_id, range, range.with_sheet(ws.title())));
        }
        if targets.is_empty() {
            return Ok(());
        }

        let a1: Vec<String> = targets.iter().map(|(_, _, a1)| a1.clone()).collect();
        let resource = fetch_grid(&self.client, &self.id, &a1, &self.context()).await?;

        let mut next: AHashMap<i64, usize> = AHashMap::new();
        for (sheet_id, range, _) in &targets {
            let slot = next.entry(*sheet_id).or_insert(0);
            let grid = sheet_grids(&resource, *sheet_id).get(*slot);
            *slot += 1;
            if let Some(ws) = self.sheet_by_id_mut(*sheet_id) {
                ws.apply_grid(range, grid);
            }
        }
        Ok(())
    }

    /// Write values into ranges of one or more sheets.
    ///
    /// In [`BatchMode::Atomic`] the whole batch is one request and any
    /// failure is returned as an error with nothing written. In
    /// [`BatchMode::Independent`] each range is its own request and the
    /// outcome lists what was applied and what failed. Both modes write
    /// values typed, so a string stays a string. Cached cells of
    /// written ranges are dropped from the cache.
    pub async fn batch_update_values(
        &mut self,
        updates: Vec<RangeUpdate>,
        mode: BatchMode,
    ) -> Result<BatchOutcome> {
        for update in &updates {
            update.validate()?;
            self.sheet_by_id(update.sheet_id)
                .ok_or_else(|| self.sheet_not_found(update.sheet_id))?
                .check_range(&update.range)?;
        }
        let mut outcome = BatchOutcome::default();
        if updates.is_empty() {
            return Ok(outcome);
        }

        match mode {
            BatchMode::Atomic => {
                let requests = updates.iter().map(RangeUpdate::update_cells_request).collect();
                self.client
                    .batch_update(&self.id, requests, None, &self.context())
                    .await?;
                for update in &updates {
                    self.forget(update);
                    outcome.applied.push(update.target());
                }
            }
            BatchMode::Independent => {
                for update in &updates {
                    match self.write_values(update).await {
                        Ok(()) => {
                            self.forget(update);
                            outcome.applied.push(update.target());
                        }
                        Err(err) => {
                            tracing::warn!(
                                sheet_id = update.sheet_id,
                                range = %update.range,
                                error = %err,
                                "range update failed"
                            );
                            outcome.failed.push((update.target(), err));
                        }
                    }
                }
            }
        }
        Ok(outcome)
    }

    /// One range as its own `updateCells` batch, encoded like the atomic path
    async fn write_values(&self, update: &RangeUpdate) -> Result<()> {
        let ws = self
            .sheet_by_id(update.sheet_id)
            .ok_or_else(|| self.sheet_not_found(update.sheet_id))?;
        let a1 = update.range.with_sheet(ws.title());
        let context = self.context().with_sheet(update.sheet_id).with_range(a1);
        self.client
            .batch_update(&self.id, vec![update.update_cells_request()], None, &context)
            .await?;
        Ok(())
    }

    fn forget(&mut self, update: &RangeUpdate) {
        if let Some(ws) = self.sheet_by_id_mut(update.sheet_id) {
            ws.forget_ranges(&[update.range]);
        }
    }
}

/// Decode reply `index` of a batch update
fn reply<T: serde::de::DeserializeOwned>(
    replies: &[Value],
    index: usize,
    kind: &str,
    context: &RequestContext,
) -> Result<T> {
    let body = replies
        .get(index)
        .and_then(|r| r.get(kind))
        .and_then(|r| r.get("properties").or(Some(r)))
        .cloned()
        .ok_or_else(|| Error::unexpected(format!("missing {kind} reply"), context))?;
    decode(body, context)
}

/// Names start with a letter or underscore, use letters, digits and
/// underscores, and must not look like a cell reference
fn check_range_name(name: &str) -> Result<()> {
    let valid_chars = name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    let valid_start = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_');
    if !valid_chars || !valid_start || CellAddress::parse(name).is_ok() {
        return Err(Error::validation(format!("invalid range name '{name}'")));
    }
    Ok(())
}
