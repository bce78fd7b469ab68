//! Environment-derived configuration, assembled once at startup.

use std::env;
use std::path::PathBuf;

/// Immutable process configuration. Built once in [`Config::from_env`] and
/// shared by reference through the application context — never re-read.
#[derive(Debug, Clone)]
pub struct Config {
    /// Relational store location. The env var name (`SQLITE_DB_PATH`) is
    /// kept for operational compatibility even though the store itself is
    /// the bundled relational engine, not literal SQLite.
    pub db_path: PathBuf,
    pub mock_api_url: String,
    pub mock_api_key: String,
    pub audit_log_path: PathBuf,
    pub socket_host: String,
    pub socket_port: u16,
    /// Directory scanned for file-backed sources (csv/json/xlsx/xml).
    pub file_sources_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("ccmcp.db"),
            mock_api_url: "http://localhost:8000/mock".to_string(),
            mock_api_key: String::new(),
            audit_log_path: PathBuf::from("audit.log"),
            socket_host: "localhost".to_string(),
            socket_port: 8765,
            file_sources_dir: PathBuf::from("data"),
        }
    }
}

impl Config {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            db_path: env::var("SQLITE_DB_PATH")
                .map_or(default.db_path, PathBuf::from),
            mock_api_url: env::var("MOCK_API_URL").unwrap_or(default.mock_api_url),
            mock_api_key: env::var("MOCK_API_KEY").unwrap_or(default.mock_api_key),
            audit_log_path: env::var("AUDIT_LOG_PATH")
                .map_or(default.audit_log_path, PathBuf::from),
            socket_host: env::var("MCP_SOCKET_HOST").unwrap_or(default.socket_host),
            socket_port: env::var("MCP_SOCKET_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(default.socket_port),
            file_sources_dir: env::var("MCP_FILE_SOURCES_DIR")
                .map_or(default.file_sources_dir, PathBuf::from),
        }
    }
}
