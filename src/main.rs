use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, warn};

use datashare_scraper::acquire::CommandFetcher;
use datashare_scraper::config::Settings;
use datashare_scraper::locator::find_latest_report_file;
use datashare_scraper::logging;
use datashare_scraper::normalize::{normalize_file, persist_records};
use datashare_scraper::reports::ReportKind;
use datashare_scraper::server::{start_server, AppState};

#[derive(Parser)]
#[command(name = "datashare_scraper")]
#[command(about = "Data-sharing portal report scraper and normalization API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port override (defaults to SERVER_PORT, then 3000)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Convert the newest downloaded export for a report kind to JSON
    Convert {
        /// Report kind: catalogados, stockdetalle or mermasventas
        #[arg(long)]
        report: ReportKind,
        /// Skip writing <kind>_data.json next to the downloads
        #[arg(long)]
        no_save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    logging::init_logging();

    let cli = Cli::parse();
    let mut settings = Settings::load()?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                settings.server_port = port;
            }
            info!(
                "Starting API server on {}:{} ({:?})",
                settings.server_host, settings.server_port, settings.environment
            );
            let state = Arc::new(AppState {
                fetcher: Box::new(CommandFetcher::from_settings(&settings)),
                settings,
            });
            start_server(state).await?;
        }
        Commands::Convert { report, no_save } => {
            run_convert(&settings, report, no_save)?;
        }
    }

    Ok(())
}

/// Script mode: locate, normalize and (optionally) persist one report kind.
fn run_convert(
    settings: &Settings,
    kind: ReportKind,
    no_save: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔄 Converting newest {} export...", kind.display_name());

    let file = find_latest_report_file(&settings.downloads_dir, kind)?;
    println!("📄 Using export: {}", file.display());

    let records = normalize_file(&file, Some(kind))?;
    println!("📊 Normalized {} records", records.len());

    if !no_save {
        let output = settings.downloads_dir.join(kind.output_file_name());
        // Persistence is best effort; the conversion already succeeded
        match persist_records(&records, &output) {
            Ok(()) => println!("💾 Saved {}", output.display()),
            Err(err) => {
                warn!("Persist failed after successful conversion: {}", err);
                println!("⚠️  Could not save output: {err}");
            }
        }
    }

    Ok(())
}
