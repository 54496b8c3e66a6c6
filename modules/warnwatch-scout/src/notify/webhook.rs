use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use warnwatch_common::Record;

use super::{AlertBatch, EntityAlert};
use crate::traits::Notifier;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WebhookPayload<'a> {
    entity: &'a str,
    count: usize,
    checked_at: DateTime<Utc>,
    notices: &'a [Record],
}

impl<'a> WebhookPayload<'a> {
    pub(crate) fn new(alert: &'a EntityAlert, checked_at: DateTime<Utc>) -> Self {
        Self {
            entity: &alert.entity,
            count: alert.notices.len(),
            checked_at,
            notices: &alert.notices,
        }
    }
}

/// POSTs one JSON payload per entity with new notices.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, batch: &AlertBatch) -> Result<()> {
        for alert in batch.alerts.iter().filter(|a| !a.notices.is_empty()) {
            let resp = self
                .client
                .post(&self.url)
                .timeout(WEBHOOK_TIMEOUT)
                .json(&WebhookPayload::new(alert, batch.checked_at))
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                bail!("webhook returned {status} for {}: {body}", alert.entity);
            }
            info!(entity = alert.entity.as_str(), count = alert.notices.len(), "Webhook alert sent");
        }
        Ok(())
    }
}
