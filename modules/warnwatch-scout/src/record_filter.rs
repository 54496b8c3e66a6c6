//! Select the rows of a table that name a tracked entity.

use tracing::{info, warn};
use warnwatch_common::{Record, Table};

use crate::matcher;

/// Header synonyms for the entity-name column, highest priority first.
/// Matched as case-insensitive substrings of the header.
pub const ENTITY_HEADER_SYNONYMS: &[&str] =
    &["Company", "Employer", "Company Name", "Business Name", "Name"];

/// Which column holds the entity name, and how it was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnResolution {
    /// A header matched one of the synonyms.
    Matched { index: usize, header: String },
    /// Nothing matched; the first column is used instead.
    Fallback { index: usize, header: String },
}

impl ColumnResolution {
    pub fn index(&self) -> usize {
        match self {
            ColumnResolution::Matched { index, .. } | ColumnResolution::Fallback { index, .. } => {
                *index
            }
        }
    }

    pub fn header(&self) -> &str {
        match self {
            ColumnResolution::Matched { header, .. }
            | ColumnResolution::Fallback { header, .. } => header,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ColumnResolution::Fallback { .. })
    }
}

/// Resolve the entity-name column. `None` only for a table with no columns.
pub fn resolve_entity_column(columns: &[String]) -> Option<ColumnResolution> {
    for synonym in ENTITY_HEADER_SYNONYMS {
        let needle = synonym.to_lowercase();
        if let Some((index, header)) = columns
            .iter()
            .enumerate()
            .find(|(_, header)| header.to_lowercase().contains(&needle))
        {
            return Some(ColumnResolution::Matched {
                index,
                header: header.clone(),
            });
        }
    }

    let header = columns.first()?;
    warn!(
        columns = ?columns,
        fallback = header.as_str(),
        "Could not identify entity name column, using first column"
    );
    Some(ColumnResolution::Fallback {
        index: 0,
        header: header.clone(),
    })
}

/// Rows whose entity-name cell matches `target` at `threshold`, in table order.
/// The table is left untouched.
pub fn filter_records(table: &Table, target: &str, threshold: u8) -> Vec<Record> {
    let Some(column) = resolve_entity_column(table.columns()) else {
        warn!(target, "Table has no columns, nothing to filter");
        return Vec::new();
    };

    let matched: Vec<Record> = table
        .records()
        .iter()
        .filter(|record| {
            let name = record.value_at(column.index()).and_then(|v| v.as_name());
            matcher::matches(name.as_deref(), target, threshold)
        })
        .cloned()
        .collect();

    info!(
        target,
        column = column.header(),
        matched = matched.len(),
        total = table.len(),
        "Filtered records"
    );
    matched
}
