#![allow(dead_code)]
pub mod mcp;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use gsheet_mcp::error::SheetsError;
use gsheet_mcp::model::{Spreadsheet, SpreadsheetFile, SpreadsheetTarget, Worksheet};
use gsheet_mcp::sheets::{SpreadsheetBackend, fill_gaps};
use gsheet_mcp::{AppState, GsheetServer, ServerConfig, TransportKind};
use parking_lot::Mutex;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

/// A remote call the fake backend received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListFiles,
    Open(SpreadsheetTarget),
    GetValues { sheet: String },
    InsertRow { sheet: String, index: u32 },
    DeleteRow { sheet: String, index: u32 },
    DeleteColumn { sheet: String, index: u32 },
    UpdateCell { sheet: String, row: u32, col: u32, value: String },
}

struct FakeSheet {
    title: String,
    rows: Vec<Vec<String>>,
}

struct FakeSpreadsheet {
    id: String,
    title: String,
    sheets: Vec<FakeSheet>,
}

/// In-memory stand-in for Google Sheets that applies edits to its grids and
/// records every call.
#[derive(Default)]
pub struct FakeBackend {
    spreadsheets: Mutex<Vec<FakeSpreadsheet>>,
    calls: Mutex<Vec<Call>>,
    fail_with: Mutex<Option<fn() -> SheetsError>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spreadsheet(
        self,
        id: &str,
        title: &str,
        sheets: Vec<(&str, Vec<Vec<String>>)>,
    ) -> Self {
        self.spreadsheets.lock().push(FakeSpreadsheet {
            id: id.to_string(),
            title: title.to_string(),
            sheets: sheets
                .into_iter()
                .map(|(title, rows)| FakeSheet {
                    title: title.to_string(),
                    rows,
                })
                .collect(),
        });
        self
    }

    /// Makes every subsequent call fail with the produced error.
    pub fn fail_with(&self, error: fn() -> SheetsError) {
        *self.fail_with.lock() = Some(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn rows(&self, spreadsheet_id: &str, sheet: &str) -> Vec<Vec<String>> {
        let spreadsheets = self.spreadsheets.lock();
        spreadsheets
            .iter()
            .find(|s| s.id == spreadsheet_id)
            .and_then(|s| s.sheets.iter().find(|ws| ws.title == sheet))
            .map(|ws| ws.rows.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: Call) -> Result<(), SheetsError> {
        self.calls.lock().push(call);
        match *self.fail_with.lock() {
            Some(error) => Err(error()),
            None => Ok(()),
        }
    }

    fn with_rows<T>(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
        f: impl FnOnce(&mut Vec<Vec<String>>) -> T,
    ) -> Result<T, SheetsError> {
        let mut spreadsheets = self.spreadsheets.lock();
        let sheet = spreadsheets
            .iter_mut()
            .find(|s| s.id == spreadsheet_id)
            .ok_or_else(|| SheetsError::SpreadsheetNotFound(spreadsheet_id.to_string()))?
            .sheets
            .iter_mut()
            .find(|ws| ws.title == worksheet.title)
            .ok_or_else(|| SheetsError::WorksheetNotFound(worksheet.title.clone()))?;
        Ok(f(&mut sheet.rows))
    }
}

#[async_trait]
impl SpreadsheetBackend for FakeBackend {
    async fn list_spreadsheet_files(&self) -> Result<Vec<SpreadsheetFile>, SheetsError> {
        self.record(Call::ListFiles)?;
        Ok(self
            .spreadsheets
            .lock()
            .iter()
            .map(|s| SpreadsheetFile {
                id: s.id.clone(),
                name: s.title.clone(),
                created_time: None,
                modified_time: None,
            })
            .collect())
    }

    async fn open(&self, target: &SpreadsheetTarget) -> Result<Spreadsheet, SheetsError> {
        self.record(Call::Open(target.clone()))?;
        let spreadsheets = self.spreadsheets.lock();
        let found = spreadsheets.iter().find(|s| match target {
            SpreadsheetTarget::ById(id) => &s.id == id,
            SpreadsheetTarget::ByTitle(title) => &s.title == title,
        });
        let found = found.ok_or_else(|| SheetsError::SpreadsheetNotFound(target.to_string()))?;
        Ok(Spreadsheet {
            id: found.id.clone(),
            title: found.title.clone(),
            worksheets: found
                .sheets
                .iter()
                .enumerate()
                .map(|(index, ws)| Worksheet {
                    sheet_id: index as i64 * 100,
                    title: ws.title.clone(),
                    index: index as u32,
                })
                .collect(),
        })
    }

    async fn get_values(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
    ) -> Result<Vec<Vec<String>>, SheetsError> {
        self.record(Call::GetValues {
            sheet: worksheet.title.clone(),
        })?;
        let rows = self.with_rows(spreadsheet_id, worksheet, |rows| rows.clone())?;
        Ok(fill_gaps(rows))
    }

    async fn insert_row(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
        index: u32,
    ) -> Result<(), SheetsError> {
        self.record(Call::InsertRow {
            sheet: worksheet.title.clone(),
            index,
        })?;
        self.with_rows(spreadsheet_id, worksheet, |rows| {
            let at = (index as usize - 1).min(rows.len());
            rows.insert(at, Vec::new());
        })
    }

    async fn delete_row(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
        index: u32,
    ) -> Result<(), SheetsError> {
        self.record(Call::DeleteRow {
            sheet: worksheet.title.clone(),
            index,
        })?;
        self.with_rows(spreadsheet_id, worksheet, |rows| {
            if (index as usize) <= rows.len() {
                rows.remove(index as usize - 1);
            }
        })
    }

    async fn delete_column(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
        index: u32,
    ) -> Result<(), SheetsError> {
        self.record(Call::DeleteColumn {
            sheet: worksheet.title.clone(),
            index,
        })?;
        self.with_rows(spreadsheet_id, worksheet, |rows| {
            for row in rows.iter_mut() {
                if (index as usize) <= row.len() {
                    row.remove(index as usize - 1);
                }
            }
        })
    }

    async fn update_cell(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
        row: u32,
        col: u32,
        value: &str,
    ) -> Result<(), SheetsError> {
        self.record(Call::UpdateCell {
            sheet: worksheet.title.clone(),
            row,
            col,
            value: value.to_string(),
        })?;
        self.with_rows(spreadsheet_id, worksheet, |rows| {
            let (r, c) = (row as usize - 1, col as usize - 1);
            if rows.len() <= r {
                rows.resize(r + 1, Vec::new());
            }
            if rows[r].len() <= c {
                rows[r].resize(c + 1, String::new());
            }
            rows[r][c] = value.to_string();
        })
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        service_account_path: fixture_path("service_account.json"),
        transport: TransportKind::Stdio,
        host: "127.0.0.1".to_string(),
        port: 0,
        enabled_tools: None,
        sheets_api_base: "http://127.0.0.1:9/v4".to_string(),
        drive_api_base: "http://127.0.0.1:9/drive/v3".to_string(),
    }
}

pub fn config_with<F>(configure: F) -> ServerConfig
where
    F: FnOnce(&mut ServerConfig),
{
    let mut config = test_config();
    configure(&mut config);
    config
}

pub fn enabled_only(tools: &[&str]) -> Option<HashSet<String>> {
    Some(tools.iter().map(|tool| tool.to_string()).collect())
}

pub fn app_state(config: ServerConfig, backend: Arc<FakeBackend>) -> Arc<AppState> {
    Arc::new(AppState::new(Arc::new(config), backend))
}

pub fn server(backend: Arc<FakeBackend>) -> GsheetServer {
    GsheetServer::from_state(app_state(test_config(), backend))
}

/// A backend with one spreadsheet "Budget" (id `sheet-1`) holding two tabs.
pub fn budget_backend() -> Arc<FakeBackend> {
    Arc::new(FakeBackend::new().with_spreadsheet(
        "sheet-1",
        "Budget",
        vec![
            (
                "Summary",
                grid(&[&["Item", "Cost"], &["Rent", "1200"], &["Food", "300"]]),
            ),
            ("Notes", Vec::new()),
        ],
    ))
}
