use std::sync::Arc;

use gsheet_mcp::error::SheetsError;
use gsheet_mcp::model::{OperationStatus, SpreadsheetTarget};
use gsheet_mcp::tools::{
    DeleteColumnParams, DeleteRowParams, GetSheetParams, InsertRowParams, ListSpreadsheetsParams,
    ReadSpreadsheetParams, SpreadsheetRef, UpdateCellParams,
};
use gsheet_mcp::GsheetServer;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::ErrorCode;

mod support;
use support::{Call, FakeBackend, grid};

fn read_params(spreadsheet: SpreadsheetRef, sheet: &str) -> ReadSpreadsheetParams {
    ReadSpreadsheetParams {
        spreadsheet,
        sheet_name: sheet.to_string(),
    }
}

#[tokio::test(flavor = "current_thread")]
async fn list_spreadsheets_returns_every_file() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_spreadsheet("a", "Alpha", Vec::new())
            .with_spreadsheet("b", "Beta", Vec::new()),
    );
    let server = support::server(backend.clone());

    let list = server
        .list_spreadsheets(Parameters(ListSpreadsheetsParams::default()))
        .await
        .expect("list spreadsheets")
        .0;

    let names = list
        .spreadsheets
        .iter()
        .map(|file| file.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Alpha", "Beta"]);
    assert_eq!(list.spreadsheets[1].id, "b");
    assert_eq!(backend.calls(), vec![Call::ListFiles]);
}

#[tokio::test(flavor = "current_thread")]
async fn get_sheet_by_title_lists_sheet_names() {
    let backend = support::budget_backend();
    let server = support::server(backend.clone());

    let info = server
        .get_sheet(Parameters(GetSheetParams {
            spreadsheet: SpreadsheetRef::by_title("Budget"),
        }))
        .await
        .expect("get sheet")
        .0;

    assert_eq!(info.id, "sheet-1");
    assert_eq!(info.title, "Budget");
    let titles = info
        .sheets
        .iter()
        .map(|sheet| sheet.title.as_str())
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["Summary", "Notes"]);
    assert_eq!(
        backend.calls(),
        vec![Call::Open(SpreadsheetTarget::ByTitle("Budget".to_string()))]
    );
}

#[tokio::test(flavor = "current_thread")]
async fn id_takes_precedence_over_title() {
    let backend = support::budget_backend();
    let server = support::server(backend.clone());

    server
        .get_sheet(Parameters(GetSheetParams {
            spreadsheet: SpreadsheetRef {
                spreadsheet_id: Some("sheet-1".to_string()),
                title: Some("Something else".to_string()),
            },
        }))
        .await
        .expect("get sheet by id");

    assert_eq!(
        backend.calls(),
        vec![Call::Open(SpreadsheetTarget::ById("sheet-1".to_string()))]
    );
}

#[tokio::test(flavor = "current_thread")]
async fn read_spreadsheet_renders_markdown_table() {
    let server = support::server(support::budget_backend());

    let response = server
        .read_spreadsheet(Parameters(read_params(
            SpreadsheetRef::by_id("sheet-1"),
            "Summary",
        )))
        .await
        .expect("read spreadsheet")
        .0;

    assert_eq!(response.status, OperationStatus::Success);
    assert_eq!(
        response.message,
        "Read sheet 'Summary' from spreadsheet 'Budget' successfully."
    );
    assert!(response.table.starts_with("First row and column are index"));
    assert!(response.table.ends_with(
        "| Index | 1 |\n| 1 | Item | Cost |\n| 2 | Rent | 1200 |\n| 3 | Food | 300 |\n"
    ));
}

#[tokio::test(flavor = "current_thread")]
async fn empty_worksheet_reports_no_data() {
    let server = support::server(support::budget_backend());

    let response = server
        .read_spreadsheet(Parameters(read_params(
            SpreadsheetRef::by_id("sheet-1"),
            "Notes",
        )))
        .await
        .expect("read empty sheet")
        .0;

    assert_eq!(response.table, "Empty sheet, no data to display.");
}

#[tokio::test(flavor = "current_thread")]
async fn zero_only_rows_are_hidden_but_indices_are_preserved() {
    let backend = Arc::new(FakeBackend::new().with_spreadsheet(
        "z",
        "Zeros",
        vec![(
            "Sheet1",
            grid(&[&["h1", "h2"], &["0", ""], &["", "y"]]),
        )],
    ));
    let server = support::server(backend);

    let table = server
        .read_spreadsheet(Parameters(read_params(SpreadsheetRef::by_id("z"), "Sheet1")))
        .await
        .expect("read")
        .0
        .table;

    assert!(table.contains("| 1 | h1 | h2 |\n"));
    assert!(!table.contains("| 2 |"));
    assert!(table.ends_with("| 3 |  | y |\n"));
}

#[tokio::test(flavor = "current_thread")]
async fn missing_identifier_fails_before_any_remote_call() {
    let backend = support::budget_backend();
    let server = support::server(backend.clone());

    let error = match server
        .read_spreadsheet(Parameters(read_params(
            SpreadsheetRef {
                spreadsheet_id: Some(String::new()),
                title: None,
            },
            "Summary",
        )))
        .await
    {
        Ok(_) => panic!("missing identifier should error"),
        Err(error) => error,
    };

    assert_eq!(error.code, ErrorCode::INVALID_PARAMS);
    assert_eq!(
        error.message,
        "Either spreadsheet_id or title must be provided."
    );
    assert!(backend.calls().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn zero_index_is_rejected_before_any_remote_call() {
    let backend = support::budget_backend();
    let server = support::server(backend.clone());

    let error = match server
        .del_row(Parameters(DeleteRowParams {
            spreadsheet: SpreadsheetRef::by_id("sheet-1"),
            sheet_name: "Summary".to_string(),
            row_index: 0,
        }))
        .await
    {
        Ok(_) => panic!("row 0 should be rejected"),
        Err(error) => error,
    };

    assert_eq!(error.code, ErrorCode::INVALID_PARAMS);
    assert!(error.message.contains("row_index"));
    assert!(backend.calls().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn unknown_worksheet_maps_to_not_found() {
    let server = support::server(support::budget_backend());

    let error = match server
        .read_spreadsheet(Parameters(read_params(
            SpreadsheetRef::by_id("sheet-1"),
            "Missing",
        )))
        .await
    {
        Ok(_) => panic!("missing worksheet should error"),
        Err(error) => error,
    };

    assert_eq!(error.code, ErrorCode::RESOURCE_NOT_FOUND);
    assert!(error.message.contains("Missing"));
}

#[tokio::test(flavor = "current_thread")]
async fn insert_row_shifts_rows_down_and_rereads() {
    let backend = support::budget_backend();
    let server = support::server(backend.clone());

    let response = server
        .insert_row(Parameters(InsertRowParams {
            spreadsheet: SpreadsheetRef::by_id("sheet-1"),
            sheet_name: "Summary".to_string(),
            insert_index: 2,
        }))
        .await
        .expect("insert row")
        .0;

    assert_eq!(
        response.message,
        "Inserted row at index 2 in sheet 'Summary' of spreadsheet 'Budget'."
    );
    assert!(!response.table.contains("| 2 |"));
    assert!(response.table.contains("| 3 | Rent | 1200 |\n"));
    assert!(response.table.contains("| 4 | Food | 300 |\n"));

    let calls = backend.calls();
    assert_eq!(
        calls[1],
        Call::InsertRow {
            sheet: "Summary".to_string(),
            index: 2
        }
    );
    assert_eq!(
        calls.last(),
        Some(&Call::GetValues {
            sheet: "Summary".to_string()
        })
    );
}

#[tokio::test(flavor = "current_thread")]
async fn del_row_and_del_col_edit_the_grid() {
    let backend = support::budget_backend();
    let server = support::server(backend.clone());

    let response = server
        .del_row(Parameters(DeleteRowParams {
            spreadsheet: SpreadsheetRef::by_title("Budget"),
            sheet_name: "Summary".to_string(),
            row_index: 2,
        }))
        .await
        .expect("delete row")
        .0;
    assert_eq!(
        response.message,
        "Deleted row at index 2 in sheet 'Summary' of spreadsheet 'Budget'."
    );
    assert!(response.table.contains("| 2 | Food | 300 |\n"));
    assert!(!response.table.contains("Rent"));

    let response = server
        .del_col(Parameters(DeleteColumnParams {
            spreadsheet: SpreadsheetRef::by_title("Budget"),
            sheet_name: "Summary".to_string(),
            col_index: 1,
        }))
        .await
        .expect("delete column")
        .0;
    assert_eq!(
        response.message,
        "Deleted column at index 1 in sheet 'Summary' of spreadsheet 'Budget'."
    );
    assert!(response.table.ends_with("| Index |  |\n| 1 | Cost |\n| 2 | 300 |\n"));
    assert_eq!(
        backend.rows("sheet-1", "Summary"),
        grid(&[&["Cost"], &["300"]])
    );
}

#[tokio::test(flavor = "current_thread")]
async fn update_cell_writes_value_and_reports_it() {
    let backend = support::budget_backend();
    let server = support::server(backend.clone());

    let response = server
        .update_cell(Parameters(UpdateCellParams {
            spreadsheet: SpreadsheetRef::by_id("sheet-1"),
            sheet_name: "Summary".to_string(),
            row_index: 4,
            col_index: 1,
            new_value: "Misc".to_string(),
        }))
        .await
        .expect("update cell")
        .0;

    assert_eq!(
        response.message,
        "Updated cell at (4, 1) in sheet 'Summary' of spreadsheet 'Budget' to 'Misc'."
    );
    assert!(response.table.ends_with("| 4 | Misc |  |\n"));
    assert!(backend.calls().contains(&Call::UpdateCell {
        sheet: "Summary".to_string(),
        row: 4,
        col: 1,
        value: "Misc".to_string(),
    }));
}

#[tokio::test(flavor = "current_thread")]
async fn disabled_tool_is_refused() {
    let backend = support::budget_backend();
    let config = support::config_with(|config| {
        config.enabled_tools = support::enabled_only(&["read_spreadsheet"]);
    });
    let server = GsheetServer::from_state(support::app_state(config, backend.clone()));

    let error = match server
        .del_col(Parameters(DeleteColumnParams {
            spreadsheet: SpreadsheetRef::by_id("sheet-1"),
            sheet_name: "Summary".to_string(),
            col_index: 1,
        }))
        .await
    {
        Ok(_) => panic!("disabled tool should error"),
        Err(error) => error,
    };
    assert_eq!(error.code, ErrorCode::INVALID_REQUEST);
    assert!(error.message.contains("del_col"));
    assert!(backend.calls().is_empty());

    server
        .read_spreadsheet(Parameters(read_params(
            SpreadsheetRef::by_id("sheet-1"),
            "Summary",
        )))
        .await
        .expect("enabled tool still works");
}

#[tokio::test(flavor = "current_thread")]
async fn remote_failures_surface_their_message() {
    let backend = support::budget_backend();
    backend.fail_with(|| SheetsError::PermissionDenied("The caller does not have permission".into()));
    let server = support::server(backend);

    let error = match server
        .get_sheet(Parameters(GetSheetParams {
            spreadsheet: SpreadsheetRef::by_id("sheet-1"),
        }))
        .await
    {
        Ok(_) => panic!("backend failure should error"),
        Err(error) => error,
    };

    assert_eq!(error.code, ErrorCode::INTERNAL_ERROR);
    assert!(error.message.contains("The caller does not have permission"));
}
