//! One monitor run, end to end.
//!
//! lock → load state → fetch page → find report → download → gate on hash →
//! parse → per-entity filter + novelty → notify → save state.
//!
//! `process_snapshot` is the synchronous core and never does I/O itself;
//! `Monitor::run_once` wraps it with the collaborators.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use warnwatch_common::{DocumentSnapshot, Table, WatchConfig, WatchError};

use crate::gate::should_process;
use crate::notify::{AlertBatch, EntityAlert};
use crate::novelty::{detect_new, entity_state_key};
use crate::record_filter::filter_records;
use crate::source::find_spreadsheet_link;
use crate::store::{NoveltyState, StateStore};
use crate::traits::{DocumentSource, Notifier, WorkbookParser};

/// What a run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// True when the document hash matched the last processed one.
    pub skipped: bool,
    pub file_hash: String,
    pub batch: AlertBatch,
}

impl RunReport {
    pub fn new_count(&self, entity: &str) -> usize {
        self.batch
            .for_entity(entity)
            .map(|a| a.notices.len())
            .unwrap_or(0)
    }
}

/// Run every tracked entity against an already-parsed table. Each entity's
/// seen set in `state` is replaced with its updated set.
pub fn evaluate_table(
    targets: &[String],
    threshold: u8,
    table: &Table,
    state: &mut NoveltyState,
    checked_at: DateTime<Utc>,
) -> AlertBatch {
    let mut batch = AlertBatch::new(checked_at);

    for target in targets {
        let matches = filter_records(table, target, threshold);
        let detection = detect_new(&matches, &state.seen_for(target));

        info!(
            target = target.as_str(),
            matched = matches.len(),
            new = detection.new_records.len(),
            "Novelty check complete"
        );

        state.set_seen(target, detection.seen);
        if !detection.new_records.is_empty() {
            batch.alerts.push(EntityAlert {
                entity: target.clone(),
                notices: detection.new_records,
            });
        }
    }

    batch
}

/// Gate, parse, and evaluate one downloaded document. `parse` is only called
/// when the document changed. On an unchanged document only `last_check`
/// moves; on a parse failure `state` is left untouched.
pub fn process_snapshot<F>(
    config: &WatchConfig,
    state: &mut NoveltyState,
    snapshot: &DocumentSnapshot,
    now: DateTime<Utc>,
    parse: F,
) -> Result<RunReport>
where
    F: FnOnce(&[u8]) -> Result<Table>,
{
    if !should_process(&snapshot.hash, state.last_file_hash.as_deref()) {
        info!(hash = snapshot.short_hash(), "Report unchanged since last check");
        state.last_check = Some(now);
        return Ok(RunReport {
            skipped: true,
            file_hash: snapshot.hash.clone(),
            batch: AlertBatch::new(now),
        });
    }

    info!(hash = snapshot.short_hash(), "Report changed, processing");
    let table = parse(&snapshot.bytes).context("Failed to parse report")?;
    info!(rows = table.len(), "Report parsed");

    let batch = evaluate_table(
        &config.watch.targets,
        config.watch.threshold,
        &table,
        state,
        now,
    );

    state.last_file_hash = Some(snapshot.hash.clone());
    state.last_check = Some(now);

    Ok(RunReport {
        skipped: false,
        file_hash: snapshot.hash.clone(),
        batch,
    })
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

pub struct Monitor {
    config: WatchConfig,
    source: Arc<dyn DocumentSource>,
    parser: Arc<dyn WorkbookParser>,
    notifiers: Vec<Arc<dyn Notifier>>,
    store: StateStore,
    dry_run: bool,
}

impl Monitor {
    pub fn new(
        config: WatchConfig,
        source: Arc<dyn DocumentSource>,
        parser: Arc<dyn WorkbookParser>,
        notifiers: Vec<Arc<dyn Notifier>>,
    ) -> Result<Self, WatchError> {
        config.validate()?;

        let mut keys: HashMap<String, &str> = HashMap::new();
        for target in &config.watch.targets {
            if let Some(other) = keys.insert(entity_state_key(target), target) {
                return Err(WatchError::Config(format!(
                    "targets {other:?} and {target:?} share the state key {}",
                    entity_state_key(target)
                )));
            }
        }

        let store = StateStore::new(&config.watch.state_file);
        Ok(Self {
            config,
            source,
            parser,
            notifiers,
            store,
            dry_run: false,
        })
    }

    /// Run the pipeline and log alerts, but neither notify nor save state.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub async fn run_once(&self) -> Result<RunReport> {
        let _lock = self.store.lock()?;
        let mut state = self.store.load()?;
        info!(
            last_check = ?state.last_check,
            targets = ?self.config.watch.targets,
            "Starting monitor run"
        );

        let page_url = &self.config.source.page_url;
        let html = self.source.page(page_url).await?;
        let report_url = find_spreadsheet_link(&html, page_url).ok_or_else(|| {
            WatchError::LinkNotFound {
                page_url: page_url.clone(),
            }
        })?;
        info!(url = report_url.as_str(), "Found report link");

        let bytes = self.source.download(&report_url).await?;
        let snapshot = DocumentSnapshot::new(report_url, bytes);

        let parser = Arc::clone(&self.parser);
        let report = process_snapshot(&self.config, &mut state, &snapshot, Utc::now(), |b| {
            parser.parse(b)
        })?;

        if report.batch.is_empty() {
            if !report.skipped {
                info!("No new notices for any tracked entity");
            }
        } else {
            warn!(total = report.batch.total(), "New notices found");
            if self.dry_run {
                info!("Dry run, skipping notifications");
            } else {
                self.dispatch(&report.batch).await;
            }
        }

        if self.dry_run {
            info!("Dry run, state not saved");
        } else {
            self.store.save(&state)?;
        }

        info!(skipped = report.skipped, "Monitor run completed");
        Ok(report)
    }

    /// Best-effort delivery: a failing notifier is logged and the rest still run.
    async fn dispatch(&self, batch: &AlertBatch) {
        for notifier in &self.notifiers {
            match notifier.notify(batch).await {
                Ok(()) => info!(notifier = notifier.name(), "Alerts delivered"),
                Err(e) => error!(notifier = notifier.name(), error = %e, "Notification failed"),
            }
        }
    }
}
