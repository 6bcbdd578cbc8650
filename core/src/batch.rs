/// Translate-and-append pipeline over one batch of entries
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::key::LocalizationEntry;
use crate::table::{is_storable_field, load_existing_keys, TableAppender, TableError, TableRow};
use crate::translate::{translate_all, TranslationProvider};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("localization table not found: {}", .0.display())]
    TargetMissing(PathBuf),
    #[error("no entries to translate")]
    Empty,
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Progress reported from the batch task to whoever started it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BatchEvent {
    Started { total: u32 },
    Log { message: String },
    Progress { done: u32, total: u32 },
    Skipped { key: String },
    Rejected { key: String, reason: String },
    Appended { key: String },
    Finished { summary: BatchSummary },
    Failed { message: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: u32,
    pub appended: u32,
    pub skipped: u32,
    pub rejected: u32,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub call_delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            call_delay: Duration::from_millis(400),
        }
    }
}

/// Sends events, ignoring a receiver that has gone away.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<UnboundedSender<BatchEvent>>,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<BatchEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn discard() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: BatchEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn log(&self, message: impl Into<String>) {
        self.emit(BatchEvent::Log {
            message: message.into(),
        });
    }
}

/// Loads the existing keys of `table_path` and runs the batch against it.
pub async fn process_batch<P: TranslationProvider>(
    provider: &P,
    entries: &[LocalizationEntry],
    table_path: &Path,
    options: &BatchOptions,
    events: &EventSink,
) -> Result<BatchSummary, BatchError> {
    if !table_path.is_file() {
        return Err(BatchError::TargetMissing(table_path.to_path_buf()));
    }
    if entries.is_empty() {
        return Err(BatchError::Empty);
    }

    let mut known_keys = load_existing_keys(table_path)?;
    events.log(format!(
        "Loaded {} existing keys from {}",
        known_keys.len(),
        table_path.display()
    ));
    run_batch(provider, entries, table_path, &mut known_keys, options, events).await
}

/// Translates and appends every entry whose key is not in `known_keys`.
///
/// Rows already written stay in place when a later write fails.
pub async fn run_batch<P: TranslationProvider>(
    provider: &P,
    entries: &[LocalizationEntry],
    table_path: &Path,
    known_keys: &mut HashSet<String>,
    options: &BatchOptions,
    events: &EventSink,
) -> Result<BatchSummary, BatchError> {
    let mut appender = match TableAppender::open(table_path) {
        Ok(appender) => appender,
        Err(TableError::NotFound(path)) => return Err(BatchError::TargetMissing(path)),
        Err(err) => return Err(err.into()),
    };
    info!(
        "batch of {} entries against {} via {}",
        entries.len(),
        table_path.display(),
        provider.name()
    );
    append_entries(provider, entries, &mut appender, known_keys, options, events).await
}

/// The per-entry loop of [`run_batch`], writing through `appender`.
pub async fn append_entries<P: TranslationProvider, W: Write>(
    provider: &P,
    entries: &[LocalizationEntry],
    appender: &mut TableAppender<W>,
    known_keys: &mut HashSet<String>,
    options: &BatchOptions,
    events: &EventSink,
) -> Result<BatchSummary, BatchError> {
    let total = entries.len() as u32;
    let mut summary = BatchSummary {
        total,
        ..BatchSummary::default()
    };
    events.emit(BatchEvent::Started { total });

    for (index, entry) in entries.iter().enumerate() {
        if known_keys.contains(&entry.key) {
            summary.skipped += 1;
            events.log(format!("Skipping {}: already in table", entry.key));
            events.emit(BatchEvent::Skipped {
                key: entry.key.clone(),
            });
        } else if let Some(reason) = unstorable_reason(entry) {
            summary.rejected += 1;
            warn!("rejected {}: {reason}", entry.key);
            events.log(format!("Rejected {}: {reason}", entry.key));
            events.emit(BatchEvent::Rejected {
                key: entry.key.clone(),
                reason: reason.to_string(),
            });
        } else {
            events.log(format!("Translating: {}...", entry.english));
            let translations = translate_all(provider, &entry.english, options.call_delay).await;
            let row = TableRow::new(entry, translations);
            appender.append(&row)?;

            known_keys.insert(entry.key.clone());
            summary.appended += 1;
            events.emit(BatchEvent::Appended {
                key: entry.key.clone(),
            });
        }

        events.emit(BatchEvent::Progress {
            done: index as u32 + 1,
            total,
        });
    }

    events.log(format!(
        "--- BATCH COMPLETE --- added {}, skipped {}, rejected {}",
        summary.appended, summary.skipped, summary.rejected
    ));
    Ok(summary)
}

fn unstorable_reason(entry: &LocalizationEntry) -> Option<&'static str> {
    if entry.english.is_empty() {
        Some("English text is empty")
    } else if !is_storable_field(&entry.key) {
        Some("key contains '~' or a line break")
    } else if !is_storable_field(&entry.english) {
        Some("English text contains '~' or a line break")
    } else {
        None
    }
}
