//! Header-keyed rows: reading, appending, saving and deleting.

use crate::{range, FakeSheets};
use gsheets::{
    AddRowsOptions, CellErrorValue, CellValue, ErrorCode, ErrorKind, GetRowsOptions,
    HeaderOptions, Row, RowInput, SaveRowOptions,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const DOC: &str = "abc123";

/// A sheet with a `Name, Age` header and three people
fn people() -> std::sync::Arc<FakeSheets> {
    let fake = FakeSheets::with_document(DOC, 100, 5);
    fake.put_row(DOC, "'Sheet1'!A1", &[json!("Name"), json!("Age")]);
    fake.put_row(DOC, "'Sheet1'!A2", &[json!("Bob"), json!(41)]);
    fake.put_row(DOC, "'Sheet1'!A3", &[json!("Cy")]);
    fake.put_row(DOC, "'Sheet1'!A4", &[json!("Di"), json!(28)]);
    fake
}

#[tokio::test]
async fn test_add_row_then_read_it_back() {
    let fake = FakeSheets::with_document(DOC, 100, 5);
    let mut doc = fake.open(DOC).await;
    let sheet = doc.sheet_by_title_mut("Sheet1").unwrap();

    sheet.set_header_row(["Name", "Age"], None).await.unwrap();
    let row = sheet
        .add_row(
            RowInput::named([("Name", CellValue::from("Ann")), ("Age", CellValue::from(30))]),
            AddRowsOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(row.row_number(), 2);
    assert_eq!(row.a1_range(), "A2:B2");

    let rows: Vec<Row> = sheet
        .get_rows(GetRowsOptions::default())
        .await
        .unwrap()
        .collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].row_number(), 2);
    assert_eq!(rows[0].get("Name"), Some(&CellValue::from("Ann")));
    assert_eq!(rows[0].get("Age"), Some(&CellValue::Number(30.0)));

    assert_eq!(fake.value(DOC, "'Sheet1'!A1"), json!("Name"));
    assert_eq!(fake.value(DOC, "'Sheet1'!B2"), json!(30.0));
}

#[tokio::test]
async fn test_get_rows_loads_header_and_pads_short_rows() {
    let fake = people();
    let mut doc = fake.open(DOC).await;
    let sheet = doc.sheet_by_index_mut(0).unwrap();

    let rows: Vec<Row> = sheet
        .get_rows(GetRowsOptions::default())
        .await
        .unwrap()
        .collect();
    assert_eq!(sheet.header_values().unwrap(), ["Name", "Age"]);
    assert_eq!(rows.len(), 3);

    let cy = &rows[1];
    assert_eq!(cy.row_number(), 3);
    assert_eq!(cy.get("Age"), Some(&CellValue::Empty));
    assert_eq!(cy.get("Email"), None);
    assert_eq!(
        cy.entries().collect::<Vec<_>>(),
        vec![("Name", &CellValue::from("Cy")), ("Age", &CellValue::Empty)]
    );

    let di = rows[2].to_map();
    assert_eq!(di["Age"], CellValue::Number(28.0));
}

#[tokio::test]
async fn test_get_rows_offset_and_limit() {
    let fake = people();
    let mut doc = fake.open(DOC).await;
    let sheet = doc.sheet_by_index_mut(0).unwrap();

    let rows: Vec<Row> = sheet
        .get_rows(GetRowsOptions {
            offset: 1,
            limit: Some(1),
            ..Default::default()
        })
        .await
        .unwrap()
        .collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].row_number(), 3);
    assert_eq!(rows[0].get("Name"), Some(&CellValue::from("Cy")));

    let none = sheet
        .get_rows(GetRowsOptions {
            offset: 500,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(none.len(), 0);
}

#[tokio::test]
async fn test_save_row_writes_its_values() {
    let fake = people();
    let mut doc = fake.open(DOC).await;
    let sheet = doc.sheet_by_index_mut(0).unwrap();
    let mut rows: Vec<Row> = sheet
        .get_rows(GetRowsOptions::default())
        .await
        .unwrap()
        .collect();

    let cy = &mut rows[1];
    cy.assign([("Age", CellValue::from(19)), ("Name", CellValue::from("Cyd"))])
        .unwrap();
    cy.save(sheet, SaveRowOptions::default()).await.unwrap();

    assert_eq!(fake.value(DOC, "'Sheet1'!A3"), json!("Cyd"));
    assert_eq!(fake.value(DOC, "'Sheet1'!B3"), json!(19.0));
    assert_eq!(cy.get("Age"), Some(&CellValue::Number(19.0)));
}

#[tokio::test]
async fn test_row_edits_are_checked_locally() {
    let fake = people();
    let mut doc = fake.open(DOC).await;
    let sheet = doc.sheet_by_index_mut(0).unwrap();
    let mut row = sheet
        .get_rows(GetRowsOptions::default())
        .await
        .unwrap()
        .next()
        .unwrap();

    let err = row.set("Email", "bob@example.com").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = row
        .set("Age", CellValue::Error(CellErrorValue::from_remote("N_A", "")))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Usage);

    // all-or-nothing: the valid pair is not applied either
    let err = row
        .assign([("Age", CellValue::from(50)), ("Nope", CellValue::from(1))])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(row.get("Age"), Some(&CellValue::Number(41.0)));
}

#[tokio::test]
async fn test_deleting_a_row_makes_older_rows_stale() {
    let fake = people();
    let mut doc = fake.open(DOC).await;
    let sheet = doc.sheet_by_index_mut(0).unwrap();
    let mut rows: Vec<Row> = sheet
        .get_rows(GetRowsOptions::default())
        .await
        .unwrap()
        .collect();

    rows.remove(0).delete(sheet).await.unwrap();
    assert_eq!(fake.value(DOC, "'Sheet1'!A2"), json!("Cy"));
    assert_eq!(sheet.row_count(), 99);

    let mut cy = rows.remove(0);
    assert!(cy.is_stale(sheet));
    let sent = fake.request_count();
    let err = cy.save(sheet, SaveRowOptions::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Usage);
    assert_eq!(fake.request_count(), sent);

    let fresh: Vec<Row> = sheet
        .get_rows(GetRowsOptions::default())
        .await
        .unwrap()
        .collect();
    assert_eq!(fresh.len(), 2);
    assert_eq!(fresh[0].row_number(), 2);
    assert_eq!(fresh[0].get("Name"), Some(&CellValue::from("Cy")));
    assert!(!fresh[0].is_stale(sheet));
}

#[tokio::test]
async fn test_row_of_another_sheet_is_refused() {
    let fake = people();
    let other_id = fake.add_sheet(DOC, "Other", 10, 3);
    fake.put_row(DOC, "'Other'!A1", &[json!("Key")]);
    fake.put_row(DOC, "'Other'!A2", &[json!("k1")]);
    let mut doc = fake.open(DOC).await;

    let mut row = doc
        .sheet_by_id_mut(other_id)
        .unwrap()
        .get_rows(GetRowsOptions::default())
        .await
        .unwrap()
        .next()
        .unwrap();
    let sheet1 = doc.sheet_by_title_mut("Sheet1").unwrap();
    let err = row.save(sheet1, SaveRowOptions::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Usage);
}

#[tokio::test]
async fn test_duplicate_headers_need_opt_in() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    fake.put_row(DOC, "'Sheet1'!A1", &[json!("Name"), json!("Name"), json!("Age")]);
    fake.put_row(DOC, "'Sheet1'!A2", &[json!("first"), json!("second"), json!(3)]);
    let mut doc = fake.open(DOC).await;
    let sheet = doc.sheet_by_index_mut(0).unwrap();

    let err = sheet
        .load_header_row(HeaderOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(sheet.header_row().is_none());

    let header = sheet
        .load_header_row(HeaderOptions {
            allow_duplicates: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(header.len(), 3);
    assert_eq!(header.column_of("Name"), Some(0));

    let row = sheet
        .get_rows(GetRowsOptions::default())
        .await
        .unwrap()
        .next()
        .unwrap();
    assert_eq!(row.get("Name"), Some(&CellValue::from("first")));
    assert_eq!(row.get_index(1), &CellValue::from("second"));
}

#[tokio::test]
async fn test_blank_or_missing_header_is_rejected() {
    let fake = FakeSheets::with_document(DOC, 20, 5);
    let mut doc = fake.open(DOC).await;
    let sheet = doc.sheet_by_index_mut(0).unwrap();

    let err = sheet.get_rows(GetRowsOptions::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    fake.put_row(DOC, "'Sheet1'!A1", &[json!("Name"), json!(""), json!("Age")]);
    let err = sheet
        .load_header_row(HeaderOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("column B"));
}

#[tokio::test]
async fn test_add_rows_with_unknown_header_sends_nothing() {
    let fake = people();
    let mut doc = fake.open(DOC).await;
    let sheet = doc.sheet_by_index_mut(0).unwrap();
    sheet.load_header_row(HeaderOptions::default()).await.unwrap();

    let sent = fake.request_count();
    let err = sheet
        .add_rows(
            [
                RowInput::values(["Eve"]),
                RowInput::named([("Email", "eve@example.com")]),
            ],
            AddRowsOptions::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(fake.request_count(), sent);
}

#[tokio::test]
async fn test_raw_input_keeps_strings() {
    let fake = FakeSheets::with_document(DOC, 20, 3);
    let mut doc = fake.open(DOC).await;
    let sheet = doc.sheet_by_index_mut(0).unwrap();
    sheet.set_header_row(["Code"], None).await.unwrap();

    let parsed = sheet
        .add_row(RowInput::values(["007"]), AddRowsOptions::default())
        .await
        .unwrap();
    let raw = sheet
        .add_row(
            RowInput::values(["007"]),
            AddRowsOptions {
                raw: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(parsed.get("Code"), Some(&CellValue::Number(7.0)));
    assert_eq!(raw.get("Code"), Some(&CellValue::from("007")));
    assert_eq!(raw.row_number(), 3);
}

#[tokio::test]
async fn test_insert_mode_grows_the_grid_and_bumps_structure() {
    let fake = people();
    let mut doc = fake.open(DOC).await;
    let sheet = doc.sheet_by_index_mut(0).unwrap();
    let before: Vec<Row> = sheet
        .get_rows(GetRowsOptions::default())
        .await
        .unwrap()
        .collect();

    let rows = sheet
        .add_rows(
            [RowInput::values(["Eve", "33"]), RowInput::values(["Fay", "27"])],
            AddRowsOptions {
                insert: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(rows.iter().map(Row::row_number).collect::<Vec<_>>(), [5, 6]);
    assert_eq!(sheet.row_count(), 102);
    assert_eq!(fake.grid_size(DOC, "Sheet1"), (102, 5));
    assert!(before.iter().all(|r| r.is_stale(sheet)));
    assert!(rows.iter().all(|r| !r.is_stale(sheet)));
}

#[tokio::test]
async fn test_clear_rows_below_header() {
    let fake = people();
    let mut doc = fake.open(DOC).await;
    let sheet = doc.sheet_by_index_mut(0).unwrap();
    sheet.load_header_row(HeaderOptions::default()).await.unwrap();
    sheet.load_cells(range("A1:B4")).await.unwrap();

    sheet.clear_rows(None, None).await.unwrap();
    assert_eq!(sheet.get_rows(GetRowsOptions::default()).await.unwrap().len(), 0);
    assert_eq!(fake.value(DOC, "'Sheet1'!A1"), json!("Name"));
    assert_eq!(sheet.cell_by_a1("A1").unwrap().value(), CellValue::from("Name"));
    assert_eq!(sheet.cell_by_a1("A2").unwrap().value(), CellValue::Empty);

    let err = sheet.clear_rows(Some(5), Some(2)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_clear_rows_loads_the_header_first() {
    let fake = people();
    let mut doc = fake.open(DOC).await;
    let sheet = doc.sheet_by_index_mut(0).unwrap();
    assert!(sheet.header_values().is_none());

    sheet.clear_rows(None, None).await.unwrap();
    assert_eq!(sheet.header_values().unwrap(), ["Name", "Age"]);
    assert_eq!(fake.value(DOC, "'Sheet1'!A1"), json!("Name"));
    assert_eq!(fake.value(DOC, "'Sheet1'!B1"), json!("Age"));
    assert_eq!(fake.value(DOC, "'Sheet1'!A2"), json!(""));
    assert_eq!(fake.value(DOC, "'Sheet1'!A4"), json!(""));
}

#[tokio::test]
async fn test_formula_errors_in_rows_stay_errors() {
    let fake = FakeSheets::with_document(DOC, 20, 3);
    fake.put_row(DOC, "'Sheet1'!A1", &[json!("Name"), json!("Ratio")]);
    fake.put_row(DOC, "'Sheet1'!A2", &[json!("Ann"), json!("=1/0")]);
    fake.put_row(DOC, "'Sheet1'!A3", &[json!("Bo"), json!("=6/3")]);
    let mut doc = fake.open(DOC).await;
    let sheet = doc.sheet_by_index_mut(0).unwrap();

    let rows: Vec<Row> = sheet
        .get_rows(GetRowsOptions::default())
        .await
        .unwrap()
        .collect();
    assert_eq!(rows.len(), 2);
    let ratio = rows[0].get("Ratio").unwrap();
    assert!(ratio.is_error());
    assert_eq!(ratio.as_error().unwrap().code(), &ErrorCode::DivideByZero);
    assert_eq!(rows[1].get("Ratio"), Some(&CellValue::Number(2.0)));

    sheet.load_cells(range("B2")).await.unwrap();
    assert_eq!(&sheet.cell_by_a1("B2").unwrap().value(), ratio);
}

#[tokio::test]
async fn test_saving_a_row_drops_its_cached_cells() {
    let fake = people();
    let mut doc = fake.open(DOC).await;
    let sheet = doc.sheet_by_index_mut(0).unwrap();
    sheet.load_cells(range("A1:B4")).await.unwrap();
    let mut bob = sheet
        .get_rows(GetRowsOptions::default())
        .await
        .unwrap()
        .next()
        .unwrap();

    bob.set("Name", "Ann").unwrap();
    bob.save(sheet, SaveRowOptions::default()).await.unwrap();
    assert_eq!(sheet.cell_by_a1("A2").unwrap_err().kind(), ErrorKind::Usage);
    assert_eq!(sheet.cell_by_a1("A3").unwrap().value(), CellValue::from("Cy"));

    sheet.load_cells(range("A2:B2")).await.unwrap();
    assert_eq!(sheet.cell_by_a1("A2").unwrap().value(), CellValue::from("Ann"));
    assert_eq!(sheet.cell_by_a1("B2").unwrap().value(), CellValue::Number(41.0));
}
