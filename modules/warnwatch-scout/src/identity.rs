//! Identity keys: a stable string per notice, used to recognise it on later runs.
//!
//! Keys are built from the record's date-like columns followed by its
//! name-like columns, each group in column order, joined with `|`. Records
//! with no usable identity columns get a SHA-256 fingerprint of every
//! (column, value) pair instead.

use sha2::{Digest, Sha256};
use tracing::debug;
use warnwatch_common::{CellValue, Record};

pub const KEY_DELIMITER: &str = "|";
pub const FINGERPRINT_PREFIX: &str = "sha256:";

const DATE_MARKERS: &[&str] = &["date"];
const NAME_MARKERS: &[&str] = &["company", "employer", "business"];

fn header_has(header: &str, markers: &[&str]) -> bool {
    let lower = header.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

/// Cells that make up the identity key, dates first then names.
/// A header matching both groups counts as a date.
pub fn identity_fields(record: &Record) -> Vec<(&str, &CellValue)> {
    let dates = record.iter().filter(|(h, _)| header_has(h, DATE_MARKERS));
    let names = record
        .iter()
        .filter(|(h, _)| !header_has(h, DATE_MARKERS) && header_has(h, NAME_MARKERS));
    dates.chain(names).collect()
}

/// Deterministic fingerprint over all fields in column order.
pub fn fingerprint(record: &Record) -> String {
    let mut hasher = Sha256::new();
    for (header, value) in record.iter() {
        hasher.update(header.as_bytes());
        hasher.update([0x1f]);
        hasher.update(value.to_string().as_bytes());
        hasher.update([0x1e]);
    }
    format!("{FINGERPRINT_PREFIX}{}", hex::encode(hasher.finalize()))
}

/// Derive the identity key for one record. Pure: equal column values always
/// give an equal key, across processes and runs.
pub fn derive_key(record: &Record) -> String {
    let fields = identity_fields(record);

    if fields.is_empty() || fields.iter().all(|(_, v)| v.is_blank()) {
        debug!(columns = record.len(), "No identity columns, using fingerprint key");
        return fingerprint(record);
    }

    fields
        .iter()
        .map(|(_, v)| v.to_string())
        .collect::<Vec<_>>()
        .join(KEY_DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn midnight(y: i32, m: u32, d: u32) -> CellValue {
        CellValue::Date(
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn dates_then_names() {
        let record = Record::from_pairs([
            ("Employer Name", "ACME CORPORATION"),
            ("Notice Date", "2024-01-01"),
            ("Effective Date", "2024-03-01"),
        ]);
        assert_eq!(derive_key(&record), "2024-01-01|2024-03-01|ACME CORPORATION");
    }

    #[test]
    fn date_cells_render_canonically() {
        let record = Record::new(vec![
            ("Company".into(), CellValue::text("Acme")),
            ("Received Date".into(), midnight(2024, 5, 6)),
            ("No. Of Employees".into(), CellValue::Number(120.0)),
        ]);
        assert_eq!(derive_key(&record), "2024-05-06|Acme");
    }

    #[test]
    fn unrelated_columns_do_not_affect_key() {
        let a = Record::from_pairs([("Company", "Acme"), ("Notice Date", "2024-01-01"), ("City", "Oakland")]);
        let b = Record::from_pairs([("Company", "Acme"), ("Notice Date", "2024-01-01"), ("City", "Fresno")]);
        assert_eq!(derive_key(&a), derive_key(&b));
    }

    #[test]
    fn different_dates_do_not_collide() {
        let a = Record::from_pairs([("Company", "Acme"), ("Notice Date", "2024-01-01")]);
        let b = Record::from_pairs([("Company", "Acme"), ("Notice Date", "2024-01-02")]);
        assert_ne!(derive_key(&a), derive_key(&b));
    }

    #[test]
    fn no_identity_columns_uses_fingerprint() {
        let record = Record::from_pairs([("Org", "Acme"), ("City", "Oakland")]);
        let key = derive_key(&record);
        assert!(key.starts_with(FINGERPRINT_PREFIX));
        assert_eq!(key.len(), FINGERPRINT_PREFIX.len() + 64);
    }

    #[test]
    fn fingerprint_is_stable_across_calls_and_clones() {
        let record = Record::from_pairs([("Org", "Acme"), ("City", "Oakland")]);
        assert_eq!(derive_key(&record), derive_key(&record.clone()));
    }

    #[test]
    fn fingerprint_distinguishes_content() {
        let a = Record::from_pairs([("Org", "Acme"), ("City", "Oakland")]);
        let b = Record::from_pairs([("Org", "Acme"), ("City", "Fresno")]);
        assert_ne!(derive_key(&a), derive_key(&b));
    }

    #[test]
    fn fingerprint_separates_fields() {
        let a = Record::from_pairs([("A", "xy"), ("B", "z")]);
        let b = Record::from_pairs([("A", "x"), ("B", "yz")]);
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn all_blank_identity_fields_use_fingerprint() {
        let a = Record::from_pairs([("Company", ""), ("Notice Date", ""), ("City", "Oakland")]);
        let b = Record::from_pairs([("Company", ""), ("Notice Date", ""), ("City", "Fresno")]);
        assert!(derive_key(&a).starts_with(FINGERPRINT_PREFIX));
        assert_ne!(derive_key(&a), derive_key(&b));
    }
}
