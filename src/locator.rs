use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info};

use crate::error::{Result, ScraperError};
use crate::reports::ReportKind;

/// Finds the most recently modified export for the given report kind.
///
/// Only the downloads directory itself is scanned; a matching file carries one
/// of the kind's filename markers (case-insensitive) and the `.xlsx` extension.
pub fn find_latest_report_file(downloads_dir: &Path, kind: ReportKind) -> Result<PathBuf> {
    if !downloads_dir.is_dir() {
        return Err(ScraperError::NotFound(format!(
            "downloads directory {} does not exist",
            downloads_dir.display()
        )));
    }

    let mut newest: Option<(PathBuf, SystemTime)> = None;

    for entry in fs::read_dir(downloads_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !matches_kind(name, kind) {
            continue;
        }

        let modified = entry.metadata()?.modified()?;
        debug!("Candidate {} export: {}", kind.tag(), name);

        match &newest {
            Some((_, best)) if *best >= modified => {}
            _ => newest = Some((path, modified)),
        }
    }

    match newest {
        Some((path, _)) => {
            info!("Using {} export: {}", kind.tag(), path.display());
            Ok(path)
        }
        None => Err(ScraperError::NotFound(format!(
            "no {} export found in {}",
            kind.tag(),
            downloads_dir.display()
        ))),
    }
}

fn matches_kind(file_name: &str, kind: ReportKind) -> bool {
    let lower = file_name.to_lowercase();
    lower.ends_with(".xlsx")
        && kind
            .filename_markers()
            .iter()
            .any(|marker| lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_kind_is_case_insensitive() {
        assert!(matches_kind("Catalogados (3).xlsx", ReportKind::Catalog));
        assert!(matches_kind("CATALOGADOS_2025.XLSX", ReportKind::Catalog));
        assert!(!matches_kind("catalogados.csv", ReportKind::Catalog));
        assert!(!matches_kind("stockdetalle.xlsx", ReportKind::Catalog));
    }

    #[test]
    fn test_matches_kind_alternate_markers() {
        assert!(matches_kind("stock_detalle-export.xlsx", ReportKind::StockDetail));
        assert!(matches_kind("stockdetalle.xlsx", ReportKind::StockDetail));
        assert!(matches_kind("mermas_ventas.xlsx", ReportKind::ShrinkageSales));
        assert!(matches_kind("MermasVentas_final.xlsx", ReportKind::ShrinkageSales));
        assert!(!matches_kind("mermas.xlsx", ReportKind::ShrinkageSales));
    }
}
