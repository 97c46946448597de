use std::fmt;
use std::str::FromStr;

/// The three report exports the portal can produce.
///
/// The wire tag (`catalogados`, `stockdetalle`, `mermasventas`) is what shows
/// up in routes, download filenames and persisted JSON names; the display name
/// is how the portal labels the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Catalog,
    StockDetail,
    ShrinkageSales,
}

impl ReportKind {
    /// Tag used in routes, filenames and persisted JSON names
    pub fn tag(&self) -> &'static str {
        match self {
            ReportKind::Catalog => "catalogados",
            ReportKind::StockDetail => "stockdetalle",
            ReportKind::ShrinkageSales => "mermasventas",
        }
    }

    /// Report name as the portal displays it
    pub fn display_name(&self) -> &'static str {
        match self {
            ReportKind::Catalog => "Catalogados",
            ReportKind::StockDetail => "Stock Detalle",
            ReportKind::ShrinkageSales => "Mermas y Ventas por Artículo",
        }
    }

    /// Substrings that identify a downloaded export for this kind.
    /// Matched case-insensitively against the file name.
    pub fn filename_markers(&self) -> &'static [&'static str] {
        match self {
            ReportKind::Catalog => &["catalogados"],
            ReportKind::StockDetail => &["stockdetalle", "stock_detalle"],
            ReportKind::ShrinkageSales => &["mermasventas", "mermas_ventas"],
        }
    }

    /// Name of the JSON document written next to the downloads
    pub fn output_file_name(&self) -> String {
        format!("{}_data.json", self.tag())
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "catalogados" => Some(ReportKind::Catalog),
            "stockdetalle" => Some(ReportKind::StockDetail),
            "mermasventas" => Some(ReportKind::ShrinkageSales),
            _ => None,
        }
    }

    /// All supported report kinds
    pub fn all() -> [ReportKind; 3] {
        [
            ReportKind::Catalog,
            ReportKind::StockDetail,
            ReportKind::ShrinkageSales,
        ]
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ReportKind::from_tag(s).ok_or_else(|| {
            format!(
                "unknown report kind '{}' (expected one of: catalogados, stockdetalle, mermasventas)",
                s
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        for kind in ReportKind::all() {
            assert_eq!(ReportKind::from_tag(kind.tag()), Some(kind));
            assert_eq!(kind.tag().parse::<ReportKind>().ok(), Some(kind));
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        assert_eq!(ReportKind::from_tag("ventas"), None);
        assert!("".parse::<ReportKind>().is_err());
    }

    #[test]
    fn test_output_file_names() {
        assert_eq!(
            ReportKind::Catalog.output_file_name(),
            "catalogados_data.json"
        );
        assert_eq!(
            ReportKind::ShrinkageSales.output_file_name(),
            "mermasventas_data.json"
        );
    }
}
