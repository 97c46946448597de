use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("report file not found: {0}")]
    NotFound(String),

    #[error("failed to parse spreadsheet: {0}")]
    Parse(#[from] calamine::XlsxError),

    #[error("unexpected spreadsheet structure: {0}")]
    Structure(String),

    #[error("failed to persist records to {path}: {cause}")]
    Persist { path: String, cause: String },

    #[error("report acquisition failed: {0}")]
    Acquisition(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ScraperError>;
