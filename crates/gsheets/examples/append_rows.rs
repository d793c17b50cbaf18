//! Append a row to a sheet and print the table.
//!
//! ```text
//! GSHEETS_TOKEN=ya29... cargo run -p gsheets --example append_rows -- <spreadsheet-id> [sheet]
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use gsheets::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let id = args.next().context("usage: append_rows <spreadsheet-id> [sheet]")?;
    let title = args.next().unwrap_or_else(|| "Sheet1".to_string());
    let token = std::env::var("GSHEETS_TOKEN").context("GSHEETS_TOKEN is not set")?;

    let client = SheetsClient::with_credentials(Arc::new(BearerToken::new(token)))?
        .with_timeout(std::time::Duration::from_secs(60));
    let mut doc = client.spreadsheet(id.as_str());
    doc.load_info()
        .await
        .with_context(|| format!("Failed to load spreadsheet '{id}'"))?;
    println!("{}", doc.title().unwrap_or_default());

    let sheet = doc
        .sheet_by_title_mut(&title)
        .with_context(|| format!("Sheet '{title}' not found"))?;
    let added = sheet
        .add_row(
            RowInput::named([("Name", CellValue::from("Ann")), ("Age", CellValue::Number(30.0))]),
            AddRowsOptions::default(),
        )
        .await
        .context("Failed to append row")?;
    println!("appended row {}", added.row_number());

    for row in sheet.get_rows(GetRowsOptions::default()).await? {
        let fields: Vec<String> = row
            .entries()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        println!("{:>4}  {}", row.row_number(), fields.join("  "));
    }
    Ok(())
}
