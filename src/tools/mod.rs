use crate::error::SheetsError;
use crate::model::*;
use crate::render::render_table;
use crate::sheets::SpreadsheetBackend;
use crate::state::AppState;
use anyhow::Result;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

pub const TOOL_NAMES: &[&str] = &[
    "list_spreadsheets",
    "get_sheet",
    "read_spreadsheet",
    "insert_row",
    "del_row",
    "del_col",
    "update_cell",
];

/// Identifies a spreadsheet by id or by title. The id wins when both are set.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct SpreadsheetRef {
    /// Spreadsheet id, as found in the URL `https://docs.google.com/spreadsheets/d/<id>/...`
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    /// Exact spreadsheet title, used when no id is given
    #[serde(default)]
    pub title: Option<String>,
}

impl SpreadsheetRef {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: Some(id.into()),
            title: None,
        }
    }

    pub fn by_title(title: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: None,
            title: Some(title.into()),
        }
    }

    pub fn target(&self) -> Result<SpreadsheetTarget, SheetsError> {
        SpreadsheetTarget::from_parts(self.spreadsheet_id.as_deref(), self.title.as_deref())
    }
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListSpreadsheetsParams {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetSheetParams {
    #[serde(flatten)]
    pub spreadsheet: SpreadsheetRef,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadSpreadsheetParams {
    #[serde(flatten)]
    pub spreadsheet: SpreadsheetRef,
    /// Name of the sheet (tab) to read
    pub sheet_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct InsertRowParams {
    #[serde(flatten)]
    pub spreadsheet: SpreadsheetRef,
    pub sheet_name: String,
    /// 1-based index the new blank row will occupy
    pub insert_index: u32,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteRowParams {
    #[serde(flatten)]
    pub spreadsheet: SpreadsheetRef,
    pub sheet_name: String,
    /// 1-based index of the row to delete
    pub row_index: u32,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteColumnParams {
    #[serde(flatten)]
    pub spreadsheet: SpreadsheetRef,
    pub sheet_name: String,
    /// 1-based index of the column to delete
    pub col_index: u32,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateCellParams {
    #[serde(flatten)]
    pub spreadsheet: SpreadsheetRef,
    pub sheet_name: String,
    /// 1-based row of the cell
    pub row_index: u32,
    /// 1-based column of the cell
    pub col_index: u32,
    /// New value, interpreted as if typed into the sheet
    pub new_value: String,
}

fn require_index(name: &str, value: u32) -> Result<u32, SheetsError> {
    if value == 0 {
        Err(SheetsError::invalid_argument(format!(
            "{name} must be 1 or greater (indices are 1-based)"
        )))
    } else {
        Ok(value)
    }
}

/// Re-reads a worksheet and renders it as Markdown.
async fn render_worksheet(
    backend: &dyn SpreadsheetBackend,
    spreadsheet: &Spreadsheet,
    worksheet: &Worksheet,
) -> Result<String, SheetsError> {
    let grid = backend.get_values(&spreadsheet.id, worksheet).await?;
    tracing::debug!(
        spreadsheet_id = %spreadsheet.id,
        sheet = %worksheet.title,
        rows = grid.len(),
        "fetched worksheet snapshot"
    );
    Ok(render_table(&grid))
}

pub async fn list_spreadsheets(
    state: Arc<AppState>,
    _params: ListSpreadsheetsParams,
) -> Result<SpreadsheetListResponse> {
    let spreadsheets = state.backend().list_spreadsheet_files().await?;
    Ok(SpreadsheetListResponse { spreadsheets })
}

pub async fn get_sheet(
    state: Arc<AppState>,
    params: GetSheetParams,
) -> Result<SpreadsheetInfoResponse> {
    let target = params.spreadsheet.target()?;
    let spreadsheet = state.backend().open(&target).await?;
    Ok(SpreadsheetInfoResponse::from(&spreadsheet))
}

pub async fn read_spreadsheet(
    state: Arc<AppState>,
    params: ReadSpreadsheetParams,
) -> Result<SheetTableResponse> {
    let target = params.spreadsheet.target()?;
    let backend = state.backend();
    let spreadsheet = backend.open(&target).await?;
    let worksheet = spreadsheet.worksheet(&params.sheet_name)?;
    let table = render_worksheet(backend, &spreadsheet, worksheet).await?;
    Ok(SheetTableResponse::success(
        format!(
            "Read sheet '{}' from spreadsheet '{}' successfully.",
            params.sheet_name, spreadsheet.title
        ),
        table,
    ))
}

pub async fn insert_row(
    state: Arc<AppState>,
    params: InsertRowParams,
) -> Result<SheetTableResponse> {
    let target = params.spreadsheet.target()?;
    let index = require_index("insert_index", params.insert_index)?;
    let backend = state.backend();
    let spreadsheet = backend.open(&target).await?;
    let worksheet = spreadsheet.worksheet(&params.sheet_name)?;
    backend.insert_row(&spreadsheet.id, worksheet, index).await?;
    let table = render_worksheet(backend, &spreadsheet, worksheet).await?;
    Ok(SheetTableResponse::success(
        format!(
            "Inserted row at index {} in sheet '{}' of spreadsheet '{}'.",
            index, params.sheet_name, spreadsheet.title
        ),
        table,
    ))
}

pub async fn del_row(state: Arc<AppState>, params: DeleteRowParams) -> Result<SheetTableResponse> {
    let target = params.spreadsheet.target()?;
    let index = require_index("row_index", params.row_index)?;
    let backend = state.backend();
    let spreadsheet = backend.open(&target).await?;
    let worksheet = spreadsheet.worksheet(&params.sheet_name)?;
    backend.delete_row(&spreadsheet.id, worksheet, index).await?;
    let table = render_worksheet(backend, &spreadsheet, worksheet).await?;
    Ok(SheetTableResponse::success(
        format!(
            "Deleted row at index {} in sheet '{}' of spreadsheet '{}'.",
            index, params.sheet_name, spreadsheet.title
        ),
        table,
    ))
}

pub async fn del_col(
    state: Arc<AppState>,
    params: DeleteColumnParams,
) -> Result<SheetTableResponse> {
    let target = params.spreadsheet.target()?;
    let index = require_index("col_index", params.col_index)?;
    let backend = state.backend();
    let spreadsheet = backend.open(&target).await?;
    let worksheet = spreadsheet.worksheet(&params.sheet_name)?;
    backend.delete_column(&spreadsheet.id, worksheet, index).await?;
    let table = render_worksheet(backend, &spreadsheet, worksheet).await?;
    Ok(SheetTableResponse::success(
        format!(
            "Deleted column at index {} in sheet '{}' of spreadsheet '{}'.",
            index, params.sheet_name, spreadsheet.title
        ),
        table,
    ))
}

pub async fn update_cell(
    state: Arc<AppState>,
    params: UpdateCellParams,
) -> Result<SheetTableResponse> {
    let target = params.spreadsheet.target()?;
    let row = require_index("row_index", params.row_index)?;
    let col = require_index("col_index", params.col_index)?;
    let backend = state.backend();
    let spreadsheet = backend.open(&target).await?;
    let worksheet = spreadsheet.worksheet(&params.sheet_name)?;
    backend
        .update_cell(&spreadsheet.id, worksheet, row, col, &params.new_value)
        .await?;
    let table = render_worksheet(backend, &spreadsheet, worksheet).await?;
    Ok(SheetTableResponse::success(
        format!(
            "Updated cell at ({}, {}) in sheet '{}' of spreadsheet '{}' to '{}'.",
            row, col, params.sheet_name, spreadsheet.title, params.new_value
        ),
        table,
    ))
}
