use std::fs;
use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use serde_json::Value;
use tracing::info;

use crate::error::{Result, ScraperError};
use crate::reports::ReportKind;

/// One normalized row: stripped column names mapped to null/number/string
/// values, in source column order, with the 1-based sequence field `n` first.
/// Key order survives serialization (serde_json `preserve_order`).
pub type Record = serde_json::Map<String, Value>;

/// Zero-based row index holding the column names; everything above is
/// preamble the portal prepends to every export.
pub const HEADER_ROW: u32 = 2;

/// Column that must stay a string to preserve leading zeros
pub const ARTICLE_CODE_COLUMN: &str = "Artículo";

/// Column zero-padded to the fixed article-identifier width, shrinkage-sales only
pub const ARTICLE_ID_COLUMN: &str = "Cod. Artículo";

const ARTICLE_ID_WIDTH: usize = 18;

/// Per-column formatting behavior, selected by report kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRule {
    /// Emit as trimmed string, never as a number
    ForceString,
    /// Integer-coerce and left-pad with zeros to the identifier width
    ZeroPad18,
    /// Universal rules only
    Default,
}

/// Formatting rule for a column under the given report kind.
pub fn column_rule(kind: Option<ReportKind>, column: &str) -> ColumnRule {
    if column == ARTICLE_CODE_COLUMN {
        return ColumnRule::ForceString;
    }
    if kind == Some(ReportKind::ShrinkageSales) && column == ARTICLE_ID_COLUMN {
        return ColumnRule::ZeroPad18;
    }
    ColumnRule::Default
}

/// Normalizes the newest-downloaded spreadsheet at `path` into records.
///
/// The first worksheet is read; rows above [`HEADER_ROW`] are discarded, a
/// leading "Total" summary row is dropped, and every remaining row becomes one
/// record numbered from 1. Missing file and unreadable workbook are the only
/// failure modes; individual cells never fail (see [`normalize_cell`]).
pub fn normalize_file(path: &Path, kind: Option<ReportKind>) -> Result<Vec<Record>> {
    if !path.exists() {
        return Err(ScraperError::NotFound(path.display().to_string()));
    }

    info!("Parsing spreadsheet {}", path.display());
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ScraperError::Structure("workbook has no sheets".to_string()))?;
    let range = workbook.worksheet_range(&sheet)?;

    let records = normalize_range(&range, kind)?;
    info!("Normalized {} records from sheet '{}'", records.len(), sheet);
    Ok(records)
}

/// Grid-level normalization. Pure: no filesystem access, deterministic for a
/// given range and kind.
pub fn normalize_range(range: &Range<Data>, kind: Option<ReportKind>) -> Result<Vec<Record>> {
    let Some(end) = range.end() else {
        return Err(ScraperError::Structure(
            "spreadsheet has no data".to_string(),
        ));
    };
    if end.0 < HEADER_ROW {
        return Err(ScraperError::Structure(format!(
            "header row {} is missing (last row is {})",
            HEADER_ROW, end.0
        )));
    }

    let start_col = range.start().map(|s| s.1).unwrap_or(0);

    // Column names come from the header row, stripped of surrounding
    // whitespace but otherwise verbatim. Unnamed columns are dropped.
    let mut columns: Vec<(u32, String)> = Vec::new();
    for col in start_col..=end.1 {
        let name = match range.get_value((HEADER_ROW, col)) {
            Some(Data::String(s)) => s.trim().to_string(),
            Some(Data::Empty) | None => String::new(),
            Some(other) => plain_string(other),
        };
        if !name.is_empty() {
            columns.push((col, name));
        }
    }
    if columns.is_empty() {
        return Err(ScraperError::Structure(
            "header row has no column names".to_string(),
        ));
    }

    let first_col = columns[0].0;
    let mut first_data_row = HEADER_ROW + 1;

    // Some exports prepend a grand-total summary row; it is excluded before
    // numbering. At most one row, and only at the very start.
    if first_data_row <= end.0 && is_total_marker(range.get_value((first_data_row, first_col))) {
        first_data_row += 1;
    }

    let mut records = Vec::with_capacity((end.0 + 1 - first_data_row) as usize);
    for (position, row) in (first_data_row..=end.0).enumerate() {
        let mut record = Record::new();
        record.insert("n".to_string(), Value::from(position as u64 + 1));
        for (col, name) in &columns {
            let value = match range.get_value((row, *col)) {
                Some(cell) => normalize_cell(cell, column_rule(kind, name)),
                None => Value::Null,
            };
            record.insert(name.clone(), value);
        }
        records.push(record);
    }
    Ok(records)
}

/// Serializes records as a pretty-printed UTF-8 JSON array, overwriting any
/// existing file. Non-ASCII characters are written as-is, not escaped.
pub fn persist_records(records: &[Record], path: &Path) -> Result<()> {
    let persist_err = |cause: String| ScraperError::Persist {
        path: path.display().to_string(),
        cause,
    };

    let json = serde_json::to_string_pretty(records).map_err(|e| persist_err(e.to_string()))?;
    fs::write(path, json).map_err(|e| persist_err(e.to_string()))?;
    info!("Saved {} records to {}", records.len(), path.display());
    Ok(())
}

fn is_total_marker(cell: Option<&Data>) -> bool {
    matches!(cell, Some(Data::String(s)) if s.trim().eq_ignore_ascii_case("total"))
}

/// Pure per-cell transform: always produces null, a number or a string,
/// never a failure. Tolerance lives here; strictness lives at the file level.
pub fn normalize_cell(cell: &Data, rule: ColumnRule) -> Value {
    // Sentinel empties win over every per-column rule
    if is_empty_sentinel(cell) {
        return Value::Null;
    }
    match rule {
        ColumnRule::ForceString => Value::String(plain_string(cell)),
        ColumnRule::ZeroPad18 => zero_padded(cell),
        ColumnRule::Default => default_value(cell),
    }
}

fn is_empty_sentinel(cell: &Data) -> bool {
    match cell {
        Data::Empty | Data::Error(_) => true,
        Data::Float(f) => f.is_nan(),
        Data::String(s) => s.trim() == "nan",
        _ => false,
    }
}

fn default_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => Value::from(*f),
        Data::Bool(b) => Value::Bool(*b),
        _ => Value::String(plain_string(cell)),
    }
}

/// String form of a cell, trimmed, with whole floats rendered without a
/// fractional part so spreadsheet-inflated "12.0" codes read back as "12".
fn plain_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{:.0}", f),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => naive.to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Empty | Data::Error(_) => String::new(),
    }
}

/// Article-identifier formatting: integer coercion (fractional part dropped),
/// left-padded with zeros to the fixed width. Non-numeric values fall back to
/// the trimmed string form.
fn zero_padded(cell: &Data) -> Value {
    let coerced = match cell {
        Data::Int(i) => Some(*i),
        Data::Float(f) => Some(f.trunc() as i64),
        Data::String(s) => parse_int_like(s.trim()),
        _ => None,
    };
    match coerced {
        Some(id) => Value::String(format!("{:0width$}", id, width = ARTICLE_ID_WIDTH)),
        None => Value::String(plain_string(cell)),
    }
}

fn parse_int_like(text: &str) -> Option<i64> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(i);
    }
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() => Some(f.trunc() as i64),
        _ => None,
    }
}
