use crate::config::ServerConfig;
use crate::sheets::{
    ApiEndpoints, GoogleSheetsClient, ServiceAccountAuth, ServiceAccountKey, SpreadsheetBackend,
};
use anyhow::Result;
use std::sync::Arc;

/// Process-wide state shared by every MCP session.
///
/// The backend is constructed once at startup and used concurrently without
/// a lock; Google is the only arbiter of ordering between calls.
pub struct AppState {
    config: Arc<ServerConfig>,
    backend: Arc<dyn SpreadsheetBackend>,
}

impl AppState {
    pub fn new(config: Arc<ServerConfig>, backend: Arc<dyn SpreadsheetBackend>) -> Self {
        Self { config, backend }
    }

    /// Loads the service-account key and builds the Google client.
    pub fn connect(config: Arc<ServerConfig>) -> Result<Self> {
        let key = ServiceAccountKey::from_file(&config.service_account_path)?;
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let auth = ServiceAccountAuth::new(key, http.clone());
        tracing::info!(
            client_email = %auth.client_email(),
            key_file = %config.service_account_path.display(),
            "loaded service account"
        );
        let endpoints = ApiEndpoints::new(&config.sheets_api_base, &config.drive_api_base)?;
        let client = GoogleSheetsClient::new(http, Arc::new(auth), endpoints);
        Ok(Self::new(config, Arc::new(client)))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn backend(&self) -> &dyn SpreadsheetBackend {
        self.backend.as_ref()
    }
}
