use super::auth::AccessTokenSource;
use super::{SpreadsheetBackend, absolute_range_name, fill_gaps, rowcol_to_a1};
use crate::error::SheetsError;
use crate::model::{Spreadsheet, SpreadsheetFile, SpreadsheetTarget, Worksheet};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;

pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";
const DRIVE_PAGE_SIZE: &str = "1000";
const DRIVE_FILE_FIELDS: &str = "nextPageToken,files(id,name,createdTime,modifiedTime)";
const SPREADSHEET_FIELDS: &str = "spreadsheetId,properties.title,sheets.properties(sheetId,title,index)";

/// Base URLs of the Google APIs, overridable to target a fake server.
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    pub sheets: Url,
    pub drive: Url,
}

impl ApiEndpoints {
    pub fn new(sheets: &str, drive: &str) -> Result<Self, SheetsError> {
        let parse = |raw: &str| {
            Url::parse(raw).map_err(|e| SheetsError::invalid_argument(format!("invalid api url {raw:?}: {e}")))
        };
        Ok(Self {
            sheets: parse(sheets)?,
            drive: parse(drive)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Dimension {
    Rows,
    Columns,
}

impl Dimension {
    fn as_str(self) -> &'static str {
        match self {
            Dimension::Rows => "ROWS",
            Dimension::Columns => "COLUMNS",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFileList {
    #[serde(default)]
    files: Vec<SpreadsheetFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetResource {
    spreadsheet_id: String,
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<SheetResource>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetResource {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    title: String,
    #[serde(default)]
    index: u32,
}

impl From<SpreadsheetResource> for Spreadsheet {
    fn from(resource: SpreadsheetResource) -> Self {
        let mut worksheets = resource
            .sheets
            .into_iter()
            .map(|sheet| Worksheet {
                sheet_id: sheet.properties.sheet_id,
                title: sheet.properties.title,
                index: sheet.properties.index,
            })
            .collect::<Vec<_>>();
        worksheets.sort_by_key(|sheet| sheet.index);
        Self {
            id: resource.spreadsheet_id,
            title: resource.properties.title,
            worksheets,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    message: String,
}

/// REST client for the Sheets and Drive APIs.
///
/// One instance is shared by every tool invocation for the lifetime of the
/// process; it holds no per-spreadsheet state.
pub struct GoogleSheetsClient {
    http: reqwest::Client,
    auth: Arc<dyn AccessTokenSource>,
    endpoints: ApiEndpoints,
}

impl GoogleSheetsClient {
    pub fn new(
        http: reqwest::Client,
        auth: Arc<dyn AccessTokenSource>,
        endpoints: ApiEndpoints,
    ) -> Self {
        Self {
            http,
            auth,
            endpoints,
        }
    }

    fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| SheetsError::invalid_argument(format!("api url {base} cannot be a base")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn sheets_url(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        Self::endpoint(&self.endpoints.sheets, segments)
    }

    fn drive_url(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        Self::endpoint(&self.endpoints.drive, segments)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SheetsError> {
        let token = self.auth.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, SheetsError> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| SheetsError::Decode(e.to_string()))
    }

    async fn search_spreadsheets(&self, query: &str) -> Result<Vec<SpreadsheetFile>, SheetsError> {
        let url = self.drive_url(&["files"])?;
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.http.get(url.clone()).query(&[
                ("q", query),
                ("pageSize", DRIVE_PAGE_SIZE),
                ("fields", DRIVE_FILE_FIELDS),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ]);
            if let Some(token) = page_token.as_deref() {
                request = request.query(&[("pageToken", token)]);
            }
            let page: DriveFileList = self.send_json(request).await?;
            files.extend(page.files);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(files)
    }

    async fn open_by_key(&self, spreadsheet_id: &str) -> Result<Spreadsheet, SheetsError> {
        let url = self.sheets_url(&["spreadsheets", spreadsheet_id])?;
        let request = self.http.get(url).query(&[("fields", SPREADSHEET_FIELDS)]);
        let resource: SpreadsheetResource = self.send_json(request).await?;
        Ok(resource.into())
    }

    async fn open_by_title(&self, title: &str) -> Result<Spreadsheet, SheetsError> {
        let query = format!(
            "mimeType='{SPREADSHEET_MIME_TYPE}' and name = '{}'",
            escape_query_literal(title)
        );
        let matches = self.search_spreadsheets(&query).await?;
        let file = matches
            .into_iter()
            .find(|file| file.name == title)
            .ok_or_else(|| SheetsError::SpreadsheetNotFound(title.to_string()))?;
        self.open_by_key(&file.id).await
    }

    async fn batch_update(&self, spreadsheet_id: &str, requests: Vec<Value>) -> Result<(), SheetsError> {
        let method = format!("{spreadsheet_id}:batchUpdate");
        let url = self.sheets_url(&["spreadsheets", &method])?;
        let request = self
            .http
            .request(Method::POST, url)
            .json(&json!({ "requests": requests }));
        self.send(request).await?;
        Ok(())
    }

    async fn delete_dimension(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
        dimension: Dimension,
        index: u32,
    ) -> Result<(), SheetsError> {
        let request = json!({
            "deleteDimension": {
                "range": {
                    "sheetId": worksheet.sheet_id,
                    "dimension": dimension.as_str(),
                    "startIndex": index.saturating_sub(1),
                    "endIndex": index,
                }
            }
        });
        self.batch_update(spreadsheet_id, vec![request]).await
    }
}

#[async_trait]
impl SpreadsheetBackend for GoogleSheetsClient {
    async fn list_spreadsheet_files(&self) -> Result<Vec<SpreadsheetFile>, SheetsError> {
        let query = format!("mimeType='{SPREADSHEET_MIME_TYPE}'");
        self.search_spreadsheets(&query).await
    }

    async fn open(&self, target: &SpreadsheetTarget) -> Result<Spreadsheet, SheetsError> {
        match target {
            SpreadsheetTarget::ById(id) => self.open_by_key(id).await,
            SpreadsheetTarget::ByTitle(title) => self.open_by_title(title).await,
        }
    }

    async fn get_values(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
    ) -> Result<Vec<Vec<String>>, SheetsError> {
        let range = absolute_range_name(&worksheet.title, None);
        let url = self.sheets_url(&["spreadsheets", spreadsheet_id, "values", &range])?;
        let request = self.http.get(url).query(&[
            ("valueRenderOption", "FORMATTED_VALUE"),
            ("majorDimension", "ROWS"),
        ]);
        let value_range: ValueRange = self.send_json(request).await?;
        let rows = value_range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect();
        Ok(fill_gaps(rows))
    }

    async fn insert_row(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
        index: u32,
    ) -> Result<(), SheetsError> {
        let request = json!({
            "insertDimension": {
                "range": {
                    "sheetId": worksheet.sheet_id,
                    "dimension": Dimension::Rows.as_str(),
                    "startIndex": index.saturating_sub(1),
                    "endIndex": index,
                },
                "inheritFromBefore": false,
            }
        });
        self.batch_update(spreadsheet_id, vec![request]).await
    }

    async fn delete_row(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
        index: u32,
    ) -> Result<(), SheetsError> {
        self.delete_dimension(spreadsheet_id, worksheet, Dimension::Rows, index)
            .await
    }

    async fn delete_column(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
        index: u32,
    ) -> Result<(), SheetsError> {
        self.delete_dimension(spreadsheet_id, worksheet, Dimension::Columns, index)
            .await
    }

    async fn update_cell(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
        row: u32,
        col: u32,
        value: &str,
    ) -> Result<(), SheetsError> {
        let address = rowcol_to_a1(row, col);
        let range = absolute_range_name(&worksheet.title, Some(&address));
        let url = self.sheets_url(&["spreadsheets", spreadsheet_id, "values", &range])?;
        let request = self
            .http
            .put(url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({ "values": [[value]] }));
        self.send(request).await?;
        Ok(())
    }
}

fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        Value::Bool(flag) => (if flag { "TRUE" } else { "FALSE" }).to_string(),
        other => other.to_string(),
    }
}

async fn error_from_response(response: Response) -> SheetsError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GoogleErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body);
    match status {
        401 => SheetsError::Auth(message),
        403 => SheetsError::PermissionDenied(message),
        404 => SheetsError::SpreadsheetNotFound(message),
        429 => SheetsError::RateLimited(message),
        _ => SheetsError::Api { status, message },
    }
}
