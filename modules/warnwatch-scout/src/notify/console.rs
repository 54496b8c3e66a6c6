use anyhow::Result;
use async_trait::async_trait;

use super::{render_plain, AlertBatch};
use crate::traits::Notifier;

/// Prints the plain-text report to stdout.
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn name(&self) -> &str {
        "console"
    }

    async fn notify(&self, batch: &AlertBatch) -> Result<()> {
        print!("{}", render_plain(batch));
        Ok(())
    }
}
