use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::{Result, ScraperError};
use crate::locator::find_latest_report_file;
use crate::reports::ReportKind;

/// Boundary to the external browser-automation stage that logs in to the
/// portal and downloads a report export into the downloads directory.
///
/// On success a fresh export for the kind exists on disk and its path is
/// returned. No retries here: retry policy belongs to the stage itself.
#[async_trait]
pub trait ReportFetcher: Send + Sync {
    async fn fetch(&self, kind: ReportKind) -> Result<PathBuf>;
}

/// Runs the acquisition stage as an external command (FETCH_COMMAND), with
/// the report tag appended as the last argument, then locates the download.
pub struct CommandFetcher {
    command: Option<String>,
    downloads_dir: PathBuf,
}

impl CommandFetcher {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            command: settings.fetch_command.clone(),
            downloads_dir: settings.downloads_dir.clone(),
        }
    }
}

#[async_trait]
impl ReportFetcher for CommandFetcher {
    async fn fetch(&self, kind: ReportKind) -> Result<PathBuf> {
        let command = self.command.as_deref().ok_or_else(|| {
            ScraperError::Acquisition(
                "FETCH_COMMAND is not configured; no acquisition stage available".to_string(),
            )
        })?;

        // Whitespace-split command line; arguments with spaces are not
        // supported for the stage invocation.
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| ScraperError::Acquisition("FETCH_COMMAND is empty".to_string()))?;

        info!("Running acquisition stage for {}: {}", kind.tag(), command);
        let status = Command::new(program)
            .args(parts)
            .arg(kind.tag())
            .status()
            .await
            .map_err(|e| {
                ScraperError::Acquisition(format!("failed to spawn '{}': {}", program, e))
            })?;

        if !status.success() {
            warn!("Acquisition stage for {} exited with {}", kind.tag(), status);
            return Err(ScraperError::Acquisition(format!(
                "acquisition command exited with {}",
                status
            )));
        }

        find_latest_report_file(&self.downloads_dir, kind).map_err(|_| {
            ScraperError::Acquisition(format!(
                "acquisition finished but no {} export appeared in {}",
                kind.tag(),
                self.downloads_dir.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(command: Option<&str>, downloads_dir: PathBuf) -> CommandFetcher {
        CommandFetcher {
            command: command.map(|c| c.to_string()),
            downloads_dir,
        }
    }

    #[tokio::test]
    async fn test_unconfigured_command_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let result = fetcher(None, dir.path().to_path_buf())
            .fetch(ReportKind::Catalog)
            .await;
        assert!(matches!(result, Err(ScraperError::Acquisition(_))));
    }

    #[tokio::test]
    async fn test_failing_command_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let result = fetcher(Some("false"), dir.path().to_path_buf())
            .fetch(ReportKind::Catalog)
            .await;
        assert!(matches!(result, Err(ScraperError::Acquisition(_))));
    }

    #[tokio::test]
    async fn test_successful_command_without_download_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = fetcher(Some("true"), dir.path().to_path_buf())
            .fetch(ReportKind::Catalog)
            .await;
        // Command succeeded but produced no export
        assert!(matches!(result, Err(ScraperError::Acquisition(_))));
    }

    #[tokio::test]
    async fn test_successful_command_returns_new_download() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("catalogados.xlsx"), b"stub").unwrap();

        let path = fetcher(Some("true"), dir.path().to_path_buf())
            .fetch(ReportKind::Catalog)
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("catalogados.xlsx"));
    }
}
