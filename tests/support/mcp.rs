use anyhow::Result;
use gsheet_mcp::GsheetServer;
use rmcp::{RoleClient, ServiceExt, model::CallToolRequestParam, service::RunningService};
use serde_json::Value;

pub fn call_tool(name: &'static str, args: Value) -> CallToolRequestParam {
    CallToolRequestParam {
        name: name.into(),
        arguments: args.as_object().cloned(),
    }
}

/// Serves `server` over an in-memory pipe and connects a client to it.
pub async fn connect(server: GsheetServer) -> Result<RunningService<RoleClient, ()>> {
    let (server_io, client_io) = tokio::io::duplex(64 * 1024);
    tokio::spawn(async move {
        match server.serve(server_io).await {
            Ok(service) => {
                let _ = service.waiting().await;
            }
            Err(error) => eprintln!("test server failed to start: {error:?}"),
        }
    });
    let client = ().serve(client_io).await?;
    Ok(client)
}

pub fn extract_json(result: &rmcp::model::CallToolResult) -> Result<Value> {
    result
        .structured_content
        .clone()
        .ok_or_else(|| anyhow::anyhow!("no structured content in response"))
}
