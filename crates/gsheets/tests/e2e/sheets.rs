//! Document properties and the sheet collection.

use crate::{range, FakeSheets};
use gsheets::{
    CellFilter, CellValue, Dimension, ErrorKind, MergeType, NewSheet, Spreadsheet,
    SpreadsheetPropertiesUpdate, WorksheetPropertiesUpdate,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const DOC: &str = "abc123";

#[tokio::test]
async fn test_load_info_is_idempotent_and_keeps_caches() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    fake.add_sheet(DOC, "Archive", 10, 3);
    fake.set_cell(DOC, "'Sheet1'!A1", json!("kept"));

    let mut doc = fake.client().spreadsheet(DOC);
    assert!(!doc.is_loaded());
    doc.load_info().await.unwrap();
    assert_eq!(doc.title(), Some("Untitled spreadsheet"));
    assert_eq!(doc.locale(), Some("en_US"));
    assert!(doc.url().unwrap().contains(DOC));

    let ids: Vec<i64> = doc.sheets().iter().map(|s| s.sheet_id()).collect();
    doc.sheet_by_index_mut(0)
        .unwrap()
        .load_cells(range("A1"))
        .await
        .unwrap();

    doc.load_info().await.unwrap();
    assert_eq!(doc.sheets().iter().map(|s| s.sheet_id()).collect::<Vec<_>>(), ids);
    assert_eq!(doc.sheet_count(), 2);
    assert_eq!(doc.sheet_by_title("Archive").unwrap().column_count(), 3);
    let sheet1 = doc.sheet_by_index(0).unwrap();
    assert_eq!(sheet1.cell_by_a1("A1").unwrap().value(), CellValue::from("kept"));
}

#[tokio::test]
async fn test_missing_document_and_unloaded_info() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    let mut missing = fake.client().spreadsheet("nope");
    let err = missing.load_info().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.context().unwrap().spreadsheet_id, "nope");

    let mut doc = fake.client().spreadsheet(DOC);
    let err = doc.add_sheet(NewSheet::titled("Early")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Usage);
}

#[tokio::test]
async fn test_create_document() {
    let fake = FakeSheets::new();
    let doc = Spreadsheet::create(fake.client(), "Budget 2026").await.unwrap();
    assert_eq!(doc.title(), Some("Budget 2026"));
    assert_eq!(doc.sheet_count(), 1);
    assert_eq!(fake.sheet_titles(doc.id()), ["Sheet1"]);

    let err = Spreadsheet::create(fake.client(), "  ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_add_sheet_with_headers_at_front() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    let mut doc = fake.open(DOC).await;

    let people = doc
        .add_sheet(
            NewSheet::titled("People")
                .with_grid(50, 4)
                .with_index(0)
                .with_headers(["Name", "Email"]),
        )
        .await
        .unwrap();
    assert_eq!(people.index(), 0);
    assert_eq!(people.row_count(), 50);
    assert_eq!(people.header_values().unwrap(), ["Name", "Email"]);
    let people_id = people.sheet_id();

    assert_eq!(doc.sheet_by_title("Sheet1").unwrap().index(), 1);
    assert_eq!(doc.sheets()[0].sheet_id(), people_id);
    assert_eq!(fake.sheet_titles(DOC), ["People", "Sheet1"]);
    assert_eq!(fake.value(DOC, "'People'!B1"), json!("Email"));
}

#[tokio::test]
async fn test_add_sheet_rejections_leave_the_list_alone() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    let mut doc = fake.open(DOC).await;
    let sent = fake.request_count();

    let err = doc.add_sheet(NewSheet::titled("sheet1")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = doc
        .add_sheet(NewSheet::titled("x".repeat(101)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = doc
        .add_sheet(NewSheet::titled("Far").with_index(5))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = doc
        .add_sheet(NewSheet::titled("Narrow").with_grid(10, 1).with_headers(["A", "B"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(fake.request_count(), sent);

    fake.fail_next(500, "Internal error encountered.");
    let err = doc.add_sheet(NewSheet::titled("Later")).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(doc.sheet_count(), 1);
    assert_eq!(fake.sheet_titles(DOC), ["Sheet1"]);

    let added = doc.add_sheet(NewSheet::default()).await.unwrap();
    assert_eq!(added.title(), "Sheet2");
    assert_eq!(added.column_count(), 26);
}

#[tokio::test]
async fn test_delete_sheet() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    let archive = fake.add_sheet(DOC, "Archive", 10, 3);
    let mut doc = fake.open(DOC).await;

    fake.fail_next(403, "The caller does not have permission");
    let err = doc.delete_sheet(archive).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(doc.sheet_count(), 2);

    let sent = fake.request_count();
    let err = doc.delete_sheet(999).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(fake.request_count(), sent);

    let sheet1 = doc.sheet_by_index(0).unwrap().sheet_id();
    doc.delete_sheet(sheet1).await.unwrap();
    assert_eq!(doc.sheet_count(), 1);
    assert_eq!(doc.sheet_by_id(archive).unwrap().index(), 0);
    assert_eq!(fake.sheet_titles(DOC), ["Archive"]);

    // the server refuses to delete the last sheet
    let err = doc.delete_sheet(archive).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(doc.sheet_count(), 1);
}

#[tokio::test]
async fn test_rename_and_duplicate() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    let archive = fake.add_sheet(DOC, "Archive", 10, 3);
    fake.set_cell(DOC, "'Sheet1'!A1", json!("source"));
    let mut doc = fake.open(DOC).await;
    let sheet1 = doc.sheet_by_index(0).unwrap().sheet_id();

    doc.rename_sheet(sheet1, "Data").await.unwrap();
    assert_eq!(doc.sheet_by_id(sheet1).unwrap().title(), "Data");
    let err = doc.rename_sheet(sheet1, "ARCHIVE").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    // same title with different case is fine for the sheet itself
    doc.rename_sheet(archive, "archive").await.unwrap();

    let copy = doc.duplicate_sheet(sheet1, Some("Data copy"), None).await.unwrap();
    assert_eq!(copy.index(), 1);
    assert_eq!(copy.cell_stats().loaded, 0);
    assert_eq!(doc.sheet_by_id(archive).unwrap().index(), 2);
    assert_eq!(fake.sheet_titles(DOC), ["Data", "Data copy", "archive"]);
    assert_eq!(fake.value(DOC, "'Data copy'!A1"), json!("source"));
}

#[tokio::test]
async fn test_property_updates() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    let mut doc = fake.open(DOC).await;

    doc.update_properties(SpreadsheetPropertiesUpdate {
        title: Some("Budget".into()),
        time_zone: Some("Europe/Paris".into()),
        ..Default::default()
    })
    .await
    .unwrap();
    assert_eq!(doc.title(), Some("Budget"));

    let sheet = doc.sheet_by_index_mut(0).unwrap();
    sheet
        .update_properties(WorksheetPropertiesUpdate {
            frozen_row_count: Some(1),
            hidden: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(sheet.frozen_row_count(), 1);
    let err = sheet
        .update_properties(WorksheetPropertiesUpdate {
            frozen_column_count: Some(6),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let reloaded = fake.open(DOC).await;
    assert_eq!(reloaded.title(), Some("Budget"));
    assert_eq!(reloaded.time_zone(), Some("Europe/Paris"));
    let sheet = reloaded.sheet_by_index(0).unwrap();
    assert_eq!(sheet.frozen_row_count(), 1);
    assert!(sheet.hidden());
}

#[tokio::test]
async fn test_resize_guards_loaded_content() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    fake.set_cell(DOC, "'Sheet1'!E10", json!("x"));
    let mut doc = fake.open(DOC).await;
    let sheet = doc.sheet_by_index_mut(0).unwrap();
    sheet.load_all_cells().await.unwrap();
    let version = sheet.structure_version();

    let err = sheet.resize(5, 5, false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(fake.grid_size(DOC, "Sheet1"), (20, 5));

    sheet.resize(5, 5, true).await.unwrap();
    assert_eq!(fake.grid_size(DOC, "Sheet1"), (5, 5));
    assert_eq!(sheet.row_count(), 5);
    assert_eq!(sheet.cell_stats().loaded, 25);
    assert_eq!(sheet.cell(9, 4).unwrap_err().kind(), ErrorKind::Validation);
    assert!(sheet.structure_version() > version);

    sheet.resize(30, 8, false).await.unwrap();
    assert_eq!(fake.grid_size(DOC, "Sheet1"), (30, 8));
}

#[tokio::test]
async fn test_insert_and_delete_rows_shift_the_cache() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    fake.set_cell(DOC, "'Sheet1'!A1", json!("a"));
    fake.set_cell(DOC, "'Sheet1'!A2", json!("b"));
    let mut doc = fake.open(DOC).await;
    let sheet = doc.sheet_by_index_mut(0).unwrap();
    sheet.load_cells(range("A1:A3")).await.unwrap();

    sheet
        .insert_dimension(Dimension::Rows, 1, 2, true)
        .await
        .unwrap();
    assert_eq!(sheet.row_count(), 21);
    assert_eq!(sheet.cell_by_a1("A3").unwrap().value(), CellValue::from("b"));
    assert_eq!(sheet.cell_by_a1("A3").unwrap().a1_address(), "A3");
    assert_eq!(sheet.cell_by_a1("A2").unwrap_err().kind(), ErrorKind::Usage);
    assert_eq!(fake.value(DOC, "'Sheet1'!A3"), json!("b"));

    sheet.delete_dimension(Dimension::Rows, 0, 1).await.unwrap();
    assert_eq!(sheet.row_count(), 20);
    assert_eq!(sheet.cell_by_a1("A2").unwrap().value(), CellValue::from("b"));
    assert_eq!(fake.value(DOC, "'Sheet1'!A2"), json!("b"));

    let err = sheet
        .insert_dimension(Dimension::Columns, 0, 1, true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_named_ranges() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    let mut doc = fake.open(DOC).await;
    let sheet_id = doc.sheet_by_index(0).unwrap().sheet_id();

    let id = doc
        .add_named_range("Totals", sheet_id, range("A1:B2"))
        .await
        .unwrap()
        .named_range_id
        .clone();
    assert!(doc.named_range("totals").is_some());

    let sent = fake.request_count();
    for name in ["Totals", "A1", "two words"] {
        let err = doc
            .add_named_range(name, sheet_id, range("C1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{name}");
    }
    let err = doc
        .add_named_range("Wide", sheet_id, range("A1:Z1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(fake.request_count(), sent);

    assert_eq!(fake.open(DOC).await.named_ranges().len(), 1);
    doc.delete_named_range(&id).await.unwrap();
    assert!(doc.named_ranges().is_empty());
    assert!(fake.open(DOC).await.named_ranges().is_empty());
}

#[tokio::test]
async fn test_merge_and_unmerge() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    let mut doc = fake.open(DOC).await;
    let sheet = doc.sheet_by_index_mut(0).unwrap();

    sheet.merge_cells(range("A1:B2"), MergeType::All).await.unwrap();
    sheet.merge_cells(range("D1:E3"), MergeType::Rows).await.unwrap();
    assert_eq!(fake.merges(DOC, "Sheet1").len(), 2);

    sheet.unmerge_cells(range("A1:A1")).await.unwrap();
    let merges = fake.merges(DOC, "Sheet1");
    assert_eq!(merges.len(), 1);
    assert_eq!(merges[0].start_column_index, Some(3));
}

#[tokio::test]
async fn test_load_cells_across_sheets_in_one_request() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    let small = fake.add_sheet(DOC, "Small", 3, 2);
    fake.set_cell(DOC, "'Sheet1'!B1", json!(7));
    fake.set_cell(DOC, "'Small'!B3", json!("corner"));
    let mut doc = fake.open(DOC).await;
    let sheet1 = doc.sheet_by_index(0).unwrap().sheet_id();

    let sent = fake.request_count();
    doc.load_cells(&[
        CellFilter::range(sheet1, range("A1:B1")),
        CellFilter::sheet(small),
    ])
    .await
    .unwrap();
    assert_eq!(fake.request_count(), sent + 1);

    let first = doc.sheet_by_id(sheet1).unwrap();
    assert_eq!(first.cell_by_a1("B1").unwrap().value(), CellValue::Number(7.0));
    assert_eq!(first.cell_stats().loaded, 2);
    let small = doc.sheet_by_id(small).unwrap();
    assert_eq!(small.cell_stats().loaded, 6);
    assert_eq!(small.cell_by_a1("B3").unwrap().value(), CellValue::from("corner"));

    let err = doc.load_cells(&[CellFilter::sheet(42)]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
