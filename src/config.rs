use std::env;
use std::path::PathBuf;

use crate::error::{Result, ScraperError};

/// Deployment environment, selected via the ENVIRONMENT variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn from_env_value(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "production" | "prod" | "coolify" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// Runtime settings loaded from the process environment (.env honored).
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory the acquisition stage downloads report exports into
    pub downloads_dir: PathBuf,
    pub server_host: String,
    pub server_port: u16,
    pub environment: Environment,
    /// Command line for the external acquisition stage, if configured.
    /// The report tag is appended as the last argument when run.
    pub fetch_command: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        // Best effort: a missing .env file is fine, the variables may come
        // from the real environment.
        dotenv::dotenv().ok();

        let downloads_dir = env::var("DOWNLOADS_DIR")
            .unwrap_or_else(|_| "./downloads".to_string())
            .into();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let server_port = match env::var("SERVER_PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| {
                ScraperError::Config(format!("invalid SERVER_PORT '{}': expected a port number", raw))
            })?,
            Err(_) => 3000,
        };

        let environment = env::var("ENVIRONMENT")
            .map(|v| Environment::from_env_value(&v))
            .unwrap_or(Environment::Development);

        let fetch_command = env::var("FETCH_COMMAND")
            .ok()
            .filter(|cmd| !cmd.trim().is_empty());

        Ok(Settings {
            downloads_dir,
            server_host,
            server_port,
            environment,
            fetch_command,
        })
    }
}
