// Test doubles for the monitor's collaborator traits.
//
// - MockSource (DocumentSource): URL→HTML and URL→bytes maps
// - StaticParser (WorkbookParser): hands back a fixed Table, counts calls
// - RecordingNotifier (Notifier): keeps every batch it receives, can be told to fail
//
// Plus small builders for WARN-shaped tables.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use warnwatch_common::{CellValue, Table};

use crate::notify::AlertBatch;
use crate::traits::{DocumentSource, Notifier, WorkbookParser};

pub const TEST_PAGE_URL: &str = "https://warn.example.gov/layoffs/";
pub const TEST_REPORT_URL: &str = "https://warn.example.gov/files/warn_report.xlsx";

// ---------------------------------------------------------------------------
// MockSource
// ---------------------------------------------------------------------------

/// Returns `Err` for unregistered URLs.
#[derive(Default)]
pub struct MockSource {
    pages: HashMap<String, String>,
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn on_download(self, url: &str, bytes: &[u8]) -> Self {
        self.set_download(url, bytes);
        self
    }

    /// Swap the bytes served for `url`, e.g. to publish a new report between runs.
    pub fn set_download(&self, url: &str, bytes: &[u8]) {
        self.files
            .lock()
            .expect("mock lock poisoned")
            .insert(url.to_string(), bytes.to_vec());
    }

    /// Page linking to `TEST_REPORT_URL`, serving `bytes` for it.
    pub fn with_report(bytes: &[u8]) -> Self {
        Self::new()
            .on_page(
                TEST_PAGE_URL,
                r#"<html><body><a href="/files/warn_report.xlsx">Latest WARN Report</a></body></html>"#,
            )
            .on_download(TEST_REPORT_URL, bytes)
    }
}

#[async_trait]
impl DocumentSource for MockSource {
    async fn page(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("MockSource: no page registered for {url}"))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        self.files
            .lock()
            .expect("mock lock poisoned")
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("MockSource: no file registered for {url}"))
    }
}

// ---------------------------------------------------------------------------
// StaticParser
// ---------------------------------------------------------------------------

pub struct StaticParser {
    table: Mutex<Table>,
    calls: AtomicUsize,
}

impl StaticParser {
    pub fn new(table: Table) -> Self {
        Self {
            table: Mutex::new(table),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_table(&self, table: Table) {
        *self.table.lock().expect("mock lock poisoned") = table;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl WorkbookParser for StaticParser {
    fn parse(&self, _bytes: &[u8]) -> Result<Table> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.table.lock().expect("mock lock poisoned").clone())
    }
}

// ---------------------------------------------------------------------------
// RecordingNotifier
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    batches: Mutex<Vec<AlertBatch>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn batches(&self) -> Vec<AlertBatch> {
        self.batches.lock().expect("mock lock poisoned").clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, batch: &AlertBatch) -> Result<()> {
        self.batches
            .lock()
            .expect("mock lock poisoned")
            .push(batch.clone());
        if self.fail {
            bail!("RecordingNotifier: configured to fail");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Table builders
// ---------------------------------------------------------------------------

/// Table with the given headers; every cell is text.
pub fn text_table(columns: &[&str], rows: &[&[&str]]) -> Table {
    Table::new(
        columns.iter().map(|c| c.to_string()).collect(),
        rows.iter()
            .map(|row| row.iter().map(|c| CellValue::text(*c)).collect())
            .collect(),
    )
}

/// `Employer Name | Notice Date | Effective Date` table.
pub fn warn_table(rows: &[[&str; 3]]) -> Table {
    let rows: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
    text_table(&["Employer Name", "Notice Date", "Effective Date"], &rows)
}
