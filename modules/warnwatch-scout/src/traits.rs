// Trait seams for the monitor's collaborators.
//
// DocumentSource: page HTML and spreadsheet bytes (HTTP in production).
// WorkbookParser: spreadsheet bytes to a Table.
// Notifier: delivers an AlertBatch somewhere a human will see it.
//
// The novelty core never touches these; `Monitor::run_once` wires them up.
// Test doubles live in `crate::testing`.

use anyhow::Result;
use async_trait::async_trait;
use warnwatch_common::Table;

use crate::notify::AlertBatch;

#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch the filings page as HTML text.
    async fn page(&self, url: &str) -> Result<String>;

    /// Download the spreadsheet at a resolved URL.
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

pub trait WorkbookParser: Send + Sync {
    /// Parse raw spreadsheet bytes into a table.
    fn parse(&self, bytes: &[u8]) -> Result<Table>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short name for log lines.
    fn name(&self) -> &str;

    /// Deliver the batch. Callers treat failure as non-fatal.
    async fn notify(&self, batch: &AlertBatch) -> Result<()>;
}
