use crate::error::{ToolDisabledError, classify_error, to_mcp_error};
use crate::logging::mcp_tool_span;
use crate::metrics::RequestMetrics;
use crate::model::{SheetTableResponse, SpreadsheetInfoResponse, SpreadsheetListResponse};
use crate::state::AppState;
use crate::tools;
use anyhow::Result;
use rmcp::{
    ErrorData as McpError, Json, ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    transport::stdio,
};
use std::future::Future;
use std::sync::Arc;
use tracing::Instrument;

const INSTRUCTIONS: &str = "\
Google Sheets MCP: read and edit spreadsheets shared with the server's service account.

IDENTIFYING A SPREADSHEET:
- Pass spreadsheet_id (from https://docs.google.com/spreadsheets/d/<spreadsheet_id>/...) or title.
- If both are given, spreadsheet_id is used. One of them is required.

WORKFLOW:
1) list_spreadsheets to discover files, get_sheet to list sheet (tab) names.
2) read_spreadsheet with sheet_name to view the data as a Markdown table.
3) insert_row, del_row, del_col, update_cell to edit; each returns the refreshed table.

INDICES:
- All row and column indices are 1-based.
- The table's first column and header row are index references, not data.
- Empty rows are omitted from the table, so row numbers may skip.";

#[derive(Clone)]
pub struct GsheetServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<GsheetServer>,
}

impl GsheetServer {
    pub fn from_state(state: Arc<AppState>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }

    pub async fn run_stdio(self) -> Result<()> {
        let service = self
            .serve(stdio())
            .await
            .inspect_err(|error| tracing::error!("serving error: {:?}", error))?;
        service.waiting().await?;
        Ok(())
    }

    fn ensure_tool_enabled(&self, tool: &str) -> Result<()> {
        tracing::info!(tool = tool, "tool invocation requested");
        if self.state.config().is_tool_enabled(tool) {
            Ok(())
        } else {
            Err(ToolDisabledError::new(tool).into())
        }
    }

    /// Runs one tool body with the allowlist check, span, metrics and logging.
    async fn run_tool<T, F>(&self, tool: &'static str, body: F) -> Result<T, McpError>
    where
        F: Future<Output = Result<T>>,
    {
        self.ensure_tool_enabled(tool).map_err(to_mcp_error)?;

        let metrics = RequestMetrics::new(tool);
        let result = body.instrument(mcp_tool_span(tool)).await;
        let elapsed = metrics.elapsed();
        match &result {
            Ok(_) => {
                metrics.success();
                crate::log_mcp_tool!(tool, "success", elapsed, "tool call completed");
            }
            Err(error) => {
                let code = classify_error(error);
                metrics.error(code.as_str());
                crate::log_mcp_tool!(
                    tool,
                    "error",
                    elapsed,
                    error_type = %code,
                    error = %error,
                    "tool call failed"
                );
            }
        }
        result.map_err(to_mcp_error)
    }
}

#[tool_router]
impl GsheetServer {
    #[tool(
        name = "list_spreadsheets",
        description = "List all spreadsheets available in the Google Drive associated with the service account"
    )]
    pub async fn list_spreadsheets(
        &self,
        Parameters(params): Parameters<tools::ListSpreadsheetsParams>,
    ) -> Result<Json<SpreadsheetListResponse>, McpError> {
        self.run_tool(
            "list_spreadsheets",
            tools::list_spreadsheets(self.state.clone(), params),
        )
        .await
        .map(Json)
    }

    #[tool(
        name = "get_sheet",
        description = "Get a spreadsheet's id, title and sheet names. Identify it by spreadsheet_id (preferred) or title"
    )]
    pub async fn get_sheet(
        &self,
        Parameters(params): Parameters<tools::GetSheetParams>,
    ) -> Result<Json<SpreadsheetInfoResponse>, McpError> {
        self.run_tool("get_sheet", tools::get_sheet(self.state.clone(), params))
            .await
            .map(Json)
    }

    #[tool(
        name = "read_spreadsheet",
        description = "Read a sheet as a Markdown table with 1-based row and column indices. sheet_name is required"
    )]
    pub async fn read_spreadsheet(
        &self,
        Parameters(params): Parameters<tools::ReadSpreadsheetParams>,
    ) -> Result<Json<SheetTableResponse>, McpError> {
        self.run_tool(
            "read_spreadsheet",
            tools::read_spreadsheet(self.state.clone(), params),
        )
        .await
        .map(Json)
    }

    #[tool(
        name = "insert_row",
        description = "Insert a blank row at the given 1-based index and return the updated sheet"
    )]
    pub async fn insert_row(
        &self,
        Parameters(params): Parameters<tools::InsertRowParams>,
    ) -> Result<Json<SheetTableResponse>, McpError> {
        self.run_tool("insert_row", tools::insert_row(self.state.clone(), params))
            .await
            .map(Json)
    }

    #[tool(
        name = "del_row",
        description = "Delete the row at the given 1-based index and return the updated sheet"
    )]
    pub async fn del_row(
        &self,
        Parameters(params): Parameters<tools::DeleteRowParams>,
    ) -> Result<Json<SheetTableResponse>, McpError> {
        self.run_tool("del_row", tools::del_row(self.state.clone(), params))
            .await
            .map(Json)
    }

    #[tool(
        name = "del_col",
        description = "Delete the column at the given 1-based index and return the updated sheet"
    )]
    pub async fn del_col(
        &self,
        Parameters(params): Parameters<tools::DeleteColumnParams>,
    ) -> Result<Json<SheetTableResponse>, McpError> {
        self.run_tool("del_col", tools::del_col(self.state.clone(), params))
            .await
            .map(Json)
    }

    #[tool(
        name = "update_cell",
        description = "Write a value into the cell at 1-based (row_index, col_index) and return the updated sheet"
    )]
    pub async fn update_cell(
        &self,
        Parameters(params): Parameters<tools::UpdateCellParams>,
    ) -> Result<Json<SheetTableResponse>, McpError> {
        self.run_tool(
            "update_cell",
            tools::update_cell(self.state.clone(), params),
        )
        .await
        .map(Json)
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for GsheetServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(INSTRUCTIONS.to_string()),
            ..ServerInfo::default()
        }
    }
}
