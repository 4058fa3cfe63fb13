//! Access to Google Sheets.
//!
//! Tool handlers talk to a [`SpreadsheetBackend`]; the production
//! implementation is [`GoogleSheetsClient`], which calls the Sheets v4 and
//! Drive v3 REST APIs directly.

pub mod auth;
pub mod client;

pub use auth::{AccessTokenSource, ServiceAccountAuth, ServiceAccountKey, StaticToken};
pub use client::{ApiEndpoints, GoogleSheetsClient};

use crate::error::SheetsError;
use crate::model::{Spreadsheet, SpreadsheetFile, SpreadsheetTarget, Worksheet};
use async_trait::async_trait;

/// Remote spreadsheet operations used by the tools.
///
/// Row and column indices are 1-based. Every call is a single remote request
/// (or a paginated listing) and nothing is cached between calls.
#[async_trait]
pub trait SpreadsheetBackend: Send + Sync {
    async fn list_spreadsheet_files(&self) -> Result<Vec<SpreadsheetFile>, SheetsError>;

    async fn open(&self, target: &SpreadsheetTarget) -> Result<Spreadsheet, SheetsError>;

    /// Fetches the full cell grid of a worksheet as display strings.
    async fn get_values(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
    ) -> Result<Vec<Vec<String>>, SheetsError>;

    /// Inserts one blank row so that it becomes row `index`.
    async fn insert_row(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
        index: u32,
    ) -> Result<(), SheetsError>;

    async fn delete_row(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
        index: u32,
    ) -> Result<(), SheetsError>;

    async fn delete_column(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
        index: u32,
    ) -> Result<(), SheetsError>;

    async fn update_cell(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
        row: u32,
        col: u32,
        value: &str,
    ) -> Result<(), SheetsError>;
}

/// Converts a 1-based row/column pair to an A1 address, e.g. `(1, 28)` -> `AB1`.
pub fn rowcol_to_a1(row: u32, col: u32) -> String {
    let mut letters = Vec::new();
    let mut remaining = col;
    while remaining > 0 {
        let rem = (remaining - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        remaining = (remaining - 1) / 26;
    }
    letters.reverse();
    let column: String = letters.into_iter().collect();
    format!("{column}{row}")
}

/// Quotes a worksheet title for use in an A1 range, doubling inner quotes.
pub fn absolute_range_name(sheet_title: &str, range: Option<&str>) -> String {
    let quoted = format!("'{}'", sheet_title.replace('\'', "''"));
    match range {
        Some(range) => format!("{quoted}!{range}"),
        None => quoted,
    }
}

/// Pads every row with empty strings up to the widest row.
pub fn fill_gaps(mut rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        row.resize(width, String::new());
    }
    rows
}
