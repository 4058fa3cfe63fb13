use crate::sheets::client::{DEFAULT_DRIVE_API_BASE, DEFAULT_SHEETS_API_BASE};
use crate::tools::TOOL_NAMES;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const SERVICE_ACCOUNT_FILENAME: &str = "service_account.json";
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Newline-delimited JSON-RPC over stdin/stdout.
    Stdio,
    /// Streamable HTTP on `/mcp` plus legacy SSE on `/sse`.
    #[value(alias = "sse", alias = "stream-http", alias = "stream_http")]
    #[serde(alias = "sse", alias = "stream-http", alias = "stream_http")]
    Http,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Stdio => write!(f, "stdio"),
            TransportKind::Http => write!(f, "http"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub service_account_path: PathBuf,
    pub transport: TransportKind,
    pub host: String,
    pub port: u16,
    pub enabled_tools: Option<HashSet<String>>,
    pub sheets_api_base: String,
    pub drive_api_base: String,
}

impl ServerConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            service_account: cli_service_account,
            sse: cli_sse,
            transport: cli_transport,
            host: cli_host,
            port: cli_port,
            enabled_tools: cli_enabled_tools,
            sheets_api_base: cli_sheets_api_base,
            drive_api_base: cli_drive_api_base,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            service_account: file_service_account,
            transport: file_transport,
            host: file_host,
            port: file_port,
            enabled_tools: file_enabled_tools,
            sheets_api_base: file_sheets_api_base,
            drive_api_base: file_drive_api_base,
        } = file_config;

        let service_account_path = cli_service_account
            .or(file_service_account)
            .unwrap_or_else(default_service_account_path);

        let transport = if cli_sse {
            TransportKind::Http
        } else {
            cli_transport
                .or(file_transport)
                .unwrap_or(TransportKind::Stdio)
        };

        let host = cli_host
            .or(file_host)
            .map(|host| host.trim().to_string())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = cli_port.or(file_port).unwrap_or(DEFAULT_PORT);

        let enabled_tools = cli_enabled_tools
            .or(file_enabled_tools)
            .map(|tools| {
                tools
                    .into_iter()
                    .map(|tool| tool.trim().to_ascii_lowercase())
                    .filter(|tool| !tool.is_empty())
                    .collect::<HashSet<_>>()
            })
            .filter(|set| !set.is_empty());

        let sheets_api_base = cli_sheets_api_base
            .or(file_sheets_api_base)
            .unwrap_or_else(|| DEFAULT_SHEETS_API_BASE.to_string());
        let drive_api_base = cli_drive_api_base
            .or(file_drive_api_base)
            .unwrap_or_else(|| DEFAULT_DRIVE_API_BASE.to_string());

        Ok(Self {
            service_account_path,
            transport,
            host,
            port,
            enabled_tools,
            sheets_api_base,
            drive_api_base,
        })
    }

    /// Checks the configuration before anything is started.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.host.is_empty(), "host must not be empty");
        if let Some(tools) = self.enabled_tools.as_ref() {
            let unknown = tools
                .iter()
                .filter(|tool| !TOOL_NAMES.contains(&tool.as_str()))
                .cloned()
                .collect::<Vec<_>>();
            anyhow::ensure!(
                unknown.is_empty(),
                "unknown tool names in enabled tools: {}",
                unknown.join(", ")
            );
        }
        for (label, base) in [
            ("sheets api", &self.sheets_api_base),
            ("drive api", &self.drive_api_base),
        ] {
            reqwest::Url::parse(base)
                .with_context(|| format!("invalid {label} base url {base:?}"))?;
        }
        anyhow::ensure!(
            self.service_account_path.is_file(),
            "service account file {:?} does not exist (set GOOGLE_SERVICE_ACCOUNT)",
            self.service_account_path
        );
        Ok(())
    }

    pub fn is_tool_enabled(&self, tool: &str) -> bool {
        match &self.enabled_tools {
            Some(set) => set.contains(&tool.to_ascii_lowercase()),
            None => true,
        }
    }

    pub fn http_base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Default key location, mirroring the gspread config directory.
pub fn default_service_account_path() -> PathBuf {
    let config_dir = if cfg!(windows) {
        env::var_os("APPDATA").map(PathBuf::from)
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };
    match config_dir {
        Some(dir) => dir.join("gspread").join(SERVICE_ACCOUNT_FILENAME),
        None => PathBuf::from(SERVICE_ACCOUNT_FILENAME),
    }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(name = "gsheet-mcp", about = "Google Sheets MCP server", version)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "GOOGLE_SERVICE_ACCOUNT",
        value_name = "FILE",
        help = "Service account key file"
    )]
    pub service_account: Option<PathBuf>,

    #[arg(
        long,
        env = "GSHEET_MCP_SSE",
        help = "Serve SSE and streamable HTTP instead of stdio"
    )]
    pub sse: bool,

    #[arg(
        long,
        env = "GSHEET_MCP_TRANSPORT",
        value_enum,
        value_name = "TRANSPORT",
        help = "Transport to expose (stdio or http)"
    )]
    pub transport: Option<TransportKind>,

    #[arg(
        long,
        env = "GSHEET_MCP_HOST",
        value_name = "HOST",
        help = "Host to bind in HTTP mode [default: localhost]"
    )]
    pub host: Option<String>,

    #[arg(
        long,
        env = "GSHEET_MCP_PORT",
        value_name = "PORT",
        help = "Port to bind in HTTP mode [default: 3000]",
        value_parser = clap::value_parser!(u16)
    )]
    pub port: Option<u16>,

    #[arg(
        long,
        env = "GSHEET_MCP_ENABLED_TOOLS",
        value_name = "TOOL",
        value_delimiter = ',',
        help = "Restrict execution to the provided tool names"
    )]
    pub enabled_tools: Option<Vec<String>>,

    #[arg(long, env = "GSHEET_MCP_SHEETS_API_BASE", value_name = "URL", hide = true)]
    pub sheets_api_base: Option<String>,

    #[arg(long, env = "GSHEET_MCP_DRIVE_API_BASE", value_name = "URL", hide = true)]
    pub drive_api_base: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    service_account: Option<PathBuf>,
    transport: Option<TransportKind>,
    host: Option<String>,
    port: Option<u16>,
    enabled_tools: Option<Vec<String>>,
    sheets_api_base: Option<String>,
    drive_api_base: Option<String>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
