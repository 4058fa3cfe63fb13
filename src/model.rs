use crate::error::SheetsError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How a tool call names its spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetTarget {
    ById(String),
    ByTitle(String),
}

impl SpreadsheetTarget {
    /// Builds a target from the optional id/title pair a tool receives.
    ///
    /// The id wins when both are present; blank strings count as absent.
    pub fn from_parts(
        spreadsheet_id: Option<&str>,
        title: Option<&str>,
    ) -> Result<Self, SheetsError> {
        let present = |value: Option<&str>| value.filter(|v| !v.is_empty()).map(str::to_string);
        match (present(spreadsheet_id), present(title)) {
            (Some(id), _) => Ok(SpreadsheetTarget::ById(id)),
            (None, Some(title)) => Ok(SpreadsheetTarget::ByTitle(title)),
            (None, None) => Err(SheetsError::invalid_argument(
                "Either spreadsheet_id or title must be provided.",
            )),
        }
    }
}

impl std::fmt::Display for SpreadsheetTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpreadsheetTarget::ById(id) => write!(f, "id:{id}"),
            SpreadsheetTarget::ByTitle(title) => write!(f, "title:{title}"),
        }
    }
}

/// One tab of a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worksheet {
    pub sheet_id: i64,
    pub title: String,
    pub index: u32,
}

/// Spreadsheet metadata as returned by the Sheets API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spreadsheet {
    pub id: String,
    pub title: String,
    pub worksheets: Vec<Worksheet>,
}

impl Spreadsheet {
    /// Finds a worksheet by exact title.
    pub fn worksheet(&self, name: &str) -> Result<&Worksheet, SheetsError> {
        self.worksheets
            .iter()
            .find(|sheet| sheet.title == name)
            .ok_or_else(|| SheetsError::WorksheetNotFound(name.to_string()))
    }
}

/// A Drive file entry, keyed the way the Drive API names its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetFile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SpreadsheetListResponse {
    pub spreadsheets: Vec<SpreadsheetFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SheetTitle {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SpreadsheetInfoResponse {
    pub id: String,
    pub title: String,
    pub sheets: Vec<SheetTitle>,
}

impl From<&Spreadsheet> for SpreadsheetInfoResponse {
    fn from(spreadsheet: &Spreadsheet) -> Self {
        Self {
            id: spreadsheet.id.clone(),
            title: spreadsheet.title.clone(),
            sheets: spreadsheet
                .worksheets
                .iter()
                .map(|sheet| SheetTitle {
                    title: sheet.title.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Success,
}

/// Result of every tool that re-renders a sheet.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SheetTableResponse {
    pub status: OperationStatus,
    pub message: String,
    pub table: String,
}

impl SheetTableResponse {
    pub fn success(message: String, table: String) -> Self {
        Self {
            status: OperationStatus::Success,
            message,
            table,
        }
    }
}
