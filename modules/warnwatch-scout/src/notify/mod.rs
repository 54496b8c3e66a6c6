//! Alert batches and the notifiers that deliver them.

mod console;
mod email;
mod render;
mod webhook;

pub use console::ConsoleNotifier;
pub use email::EmailNotifier;
pub use render::{alert_subject, render_entity_plain, render_html, render_plain};
pub use webhook::WebhookNotifier;

use chrono::{DateTime, Utc};
use warnwatch_common::Record;

/// New notices for one tracked entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityAlert {
    pub entity: String,
    pub notices: Vec<Record>,
}

/// Everything one run found, entity by entity in configured order. A row
/// matching two entities appears under both.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertBatch {
    pub checked_at: DateTime<Utc>,
    pub alerts: Vec<EntityAlert>,
}

impl AlertBatch {
    pub fn new(checked_at: DateTime<Utc>) -> Self {
        Self {
            checked_at,
            alerts: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.iter().all(|a| a.notices.is_empty())
    }

    pub fn total(&self) -> usize {
        self.alerts.iter().map(|a| a.notices.len()).sum()
    }

    pub fn for_entity(&self, entity: &str) -> Option<&EntityAlert> {
        self.alerts.iter().find(|a| a.entity == entity)
    }
}
