//! Configuration module for the upvote board backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

/// Default target of the `toTheDojo` redirect.
pub const DEFAULT_REDIRECT_URL: &str = "https://www.google.com";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key shared with the identity gateway (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
    /// Location sent by the `toTheDojo` redirect
    pub redirect_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AddrParseError> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("BOARD_API_PSK").ok().filter(|k| !k.is_empty());

        let db_path = env::var("BOARD_DB_PATH")
            .unwrap_or_else(|_| "./data/board.sqlite".to_string())
            .into();

        let bind_addr = env::var("BOARD_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()?;

        let log_level = env::var("BOARD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = env::var("BOARD_LOG_JSON")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let redirect_url =
            env::var("BOARD_REDIRECT_URL").unwrap_or_else(|_| DEFAULT_REDIRECT_URL.to_string());

        Ok(Self {
            api_psk,
            db_path,
            bind_addr,
            log_level,
            log_json,
            redirect_url,
        })
    }
}
