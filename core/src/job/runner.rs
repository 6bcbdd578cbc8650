use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::batch::{process_batch, BatchError, BatchEvent, BatchOptions, BatchSummary, EventSink};
use crate::key::LocalizationEntry;
use crate::translate::TranslationProvider;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("a batch is already running")]
    Busy,
    #[error(transparent)]
    Batch(#[from] BatchError),
}

#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub entries: Vec<LocalizationEntry>,
    pub table_path: PathBuf,
    pub options: BatchOptions,
}

/// A started batch: its id, event stream and completion handle.
#[derive(Debug)]
pub struct BatchHandle {
    pub batch_id: Uuid,
    pub events: mpsc::UnboundedReceiver<BatchEvent>,
    pub task: JoinHandle<Result<BatchSummary, BatchError>>,
}

/// Runs at most one batch at a time in the background.
#[derive(Debug, Default)]
pub struct BatchRunner {
    running: Arc<AtomicBool>,
}

struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl BatchRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawns the batch on the current tokio runtime.
    ///
    /// Fails without starting when a batch is in progress, the table is
    /// missing, or there is nothing to translate.
    pub fn start<P>(&self, provider: Arc<P>, request: BatchRequest) -> Result<BatchHandle, RunnerError>
    where
        P: TranslationProvider + 'static,
    {
        if !request.table_path.is_file() {
            return Err(BatchError::TargetMissing(request.table_path).into());
        }
        if request.entries.is_empty() {
            return Err(BatchError::Empty.into());
        }

        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| RunnerError::Busy)?;
        let guard = RunningGuard(self.running.clone());

        let batch_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel::<BatchEvent>();
        let task = tokio::spawn(async move {
            let _guard = guard;
            let sink = EventSink::new(tx);
            let result = process_batch(
                provider.as_ref(),
                &request.entries,
                &request.table_path,
                &request.options,
                &sink,
            )
            .await;

            match &result {
                Ok(summary) => {
                    info!("batch {batch_id} finished: {summary:?}");
                    sink.emit(BatchEvent::Finished { summary: *summary });
                }
                Err(err) => {
                    warn!("batch {batch_id} failed: {err}");
                    sink.emit(BatchEvent::Failed {
                        message: err.to_string(),
                    });
                }
            }
            result
        });

        Ok(BatchHandle {
            batch_id,
            events: rx,
            task,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::testing::StubTranslator;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn request(path: PathBuf, delay: Duration) -> BatchRequest {
        BatchRequest {
            entries: vec![
                LocalizationEntry::new("names:scout", "Scout"),
                LocalizationEntry::new("names:turret", "Turret"),
            ],
            table_path: path,
            options: BatchOptions { call_delay: delay },
        }
    }

    #[tokio::test]
    async fn streams_events_until_finished() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.csv");
        fs::write(&path, "").unwrap();

        let runner = BatchRunner::new();
        let mut handle = runner
            .start(Arc::new(StubTranslator::default()), request(path.clone(), Duration::ZERO))
            .unwrap();

        let mut last = None;
        while let Some(event) = handle.events.recv().await {
            last = Some(event);
        }
        let summary = handle.task.await.unwrap().unwrap();

        assert_eq!(summary.appended, 2);
        assert_eq!(last, Some(BatchEvent::Finished { summary }));
        assert!(!runner.is_running());
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn second_batch_is_refused_while_running() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.csv");
        fs::write(&path, "").unwrap();

        let runner = BatchRunner::new();
        let stub = Arc::new(StubTranslator::default());
        let handle = runner
            .start(stub.clone(), request(path.clone(), Duration::from_millis(400)))
            .unwrap();
        assert!(runner.is_running());

        let second = runner.start(stub.clone(), request(path.clone(), Duration::ZERO));
        assert!(matches!(second, Err(RunnerError::Busy)));

        handle.task.await.unwrap().unwrap();
        assert!(!runner.is_running());
        assert!(runner
            .start(stub, request(path, Duration::ZERO))
            .is_ok());
    }

    #[tokio::test]
    async fn missing_table_never_starts() {
        let dir = TempDir::new().unwrap();
        let runner = BatchRunner::new();
        let result = runner.start(
            Arc::new(StubTranslator::default()),
            request(dir.path().join("absent.csv"), Duration::ZERO),
        );

        assert!(matches!(
            result,
            Err(RunnerError::Batch(BatchError::TargetMissing(_)))
        ));
        assert!(!runner.is_running());
    }

    #[tokio::test]
    async fn table_vanishing_before_the_task_runs_reports_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.csv");
        fs::write(&path, "").unwrap();

        let runner = BatchRunner::new();
        let mut handle = runner
            .start(Arc::new(StubTranslator::default()), request(path.clone(), Duration::ZERO))
            .unwrap();
        fs::remove_file(&path).unwrap();

        let mut last = None;
        while let Some(event) = handle.events.recv().await {
            last = Some(event);
        }
        let err = handle.task.await.unwrap().unwrap_err();

        assert!(matches!(err, BatchError::TargetMissing(_)));
        assert_eq!(
            last,
            Some(BatchEvent::Failed {
                message: format!("localization table not found: {}", path.display())
            })
        );
        assert!(!runner.is_running());
        assert!(!path.exists());
    }
}
