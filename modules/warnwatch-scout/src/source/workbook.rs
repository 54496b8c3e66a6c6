use std::io::Cursor;

use anyhow::Result;
use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, warn};
use warnwatch_common::{CellValue, SourceConfig, Table, WatchError};

use crate::traits::WorkbookParser;

/// Reads one sheet of an XLSX workbook. The first row is the header.
pub struct XlsxParser {
    sheet_name: Option<String>,
    sheet_index: usize,
}

impl XlsxParser {
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            sheet_name: config.sheet_name.clone(),
            sheet_index: config.sheet_index,
        }
    }
}

impl WorkbookParser for XlsxParser {
    fn parse(&self, bytes: &[u8]) -> Result<Table> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
            .map_err(|e| WatchError::Workbook(format!("failed to open workbook: {e}")))?;

        let names = workbook.sheet_names();
        let sheet = select_sheet(&names, self.sheet_name.as_deref(), self.sheet_index)
            .ok_or_else(|| WatchError::Workbook("workbook has no sheets".into()))?;

        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| WatchError::Workbook(format!("failed to read sheet {sheet:?}: {e}")))?;

        let table = range_to_table(&range);
        info!(sheet = sheet.as_str(), rows = table.len(), "Parsed workbook");
        Ok(table)
    }
}

/// Pick the sheet to read: the named sheet when present (case-insensitive),
/// else the sheet at `index`, else the first sheet.
pub fn select_sheet(names: &[String], preferred: Option<&str>, index: usize) -> Option<String> {
    if let Some(wanted) = preferred {
        let wanted = wanted.trim().to_lowercase();
        if let Some(found) = names.iter().find(|n| n.trim().to_lowercase() == wanted) {
            return Some(found.clone());
        }
        warn!(sheet = wanted.as_str(), available = ?names, "Sheet not found, falling back by position");
    }
    names.get(index).or_else(|| names.first()).cloned()
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::String(s) => CellValue::text(s.trim()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::text(b.to_string()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::Date)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => parse_iso(s)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::text(s.trim())),
        _ => CellValue::Empty,
    }
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    s.parse::<NaiveDateTime>().ok().or_else(|| {
        s.parse::<NaiveDate>()
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}

fn header_name(cell: &Data, position: usize) -> String {
    let name = cell.to_string().trim().to_string();
    if name.is_empty() {
        format!("Unnamed: {position}")
    } else {
        name
    }
}

/// Header from the first row, data from the rest. Fully blank rows are dropped.
pub(crate) fn range_to_table(range: &Range<Data>) -> Table {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Table::default();
    };

    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| header_name(cell, i))
        .collect();

    let data: Vec<Vec<CellValue>> = rows
        .map(|row| row.iter().map(cell_value).collect::<Vec<_>>())
        .filter(|cells| !cells.iter().all(CellValue::is_blank))
        .collect();

    Table::new(columns, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn named_sheet_selected_case_insensitively() {
        let sheets = names(&["Summary", "Detailed WARN Report"]);
        assert_eq!(
            select_sheet(&sheets, Some("detailed warn report"), 0).as_deref(),
            Some("Detailed WARN Report")
        );
    }

    #[test]
    fn missing_name_falls_back_to_index() {
        let sheets = names(&["Summary", "Data"]);
        assert_eq!(select_sheet(&sheets, Some("Nope"), 1).as_deref(), Some("Data"));
    }

    #[test]
    fn out_of_range_index_falls_back_to_first() {
        let sheets = names(&["Only"]);
        assert_eq!(select_sheet(&sheets, None, 5).as_deref(), Some("Only"));
    }

    #[test]
    fn no_sheets() {
        assert_eq!(select_sheet(&[], Some("x"), 0), None);
    }

    #[test]
    fn range_converts_to_table() {
        let mut range: Range<Data> = Range::new((0, 0), (3, 2));
        range.set_value((0, 0), Data::String("Company".into()));
        range.set_value((0, 1), Data::String("Notice Date".into()));
        range.set_value((0, 2), Data::String("Employees".into()));
        range.set_value((1, 0), Data::String("  Acme Corp ".into()));
        range.set_value((1, 1), Data::DateTimeIso("2024-01-01".into()));
        range.set_value((1, 2), Data::Float(120.0));
        // row 2 left blank
        range.set_value((3, 0), Data::String("Bolt".into()));
        range.set_value((3, 2), Data::Int(7));

        let table = range_to_table(&range);
        assert_eq!(table.columns(), ["Company", "Notice Date", "Employees"]);
        assert_eq!(table.len(), 2);

        let first = &table.records()[0];
        assert_eq!(first.get("Company"), Some(&CellValue::text("Acme Corp")));
        assert_eq!(first.get("Notice Date").unwrap().to_string(), "2024-01-01");
        assert_eq!(first.get("Employees"), Some(&CellValue::Number(120.0)));

        let second = &table.records()[1];
        assert_eq!(second.get("Notice Date"), Some(&CellValue::Empty));
        assert_eq!(second.get("Employees").unwrap().to_string(), "7");
    }

    #[test]
    fn empty_range_gives_empty_table() {
        let range: Range<Data> = Range::empty();
        assert!(range_to_table(&range).columns().is_empty());
    }

    #[test]
    fn garbage_bytes_are_a_workbook_error() {
        let parser = XlsxParser {
            sheet_name: None,
            sheet_index: 0,
        };
        assert!(parser.parse(b"definitely not a zip archive").is_err());
    }
}
