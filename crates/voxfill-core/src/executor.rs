//! Sequential batch worker with pause, resume and cancel control.
//!
//! The worker runs on its own tokio task and talks to its controller through
//! three primitives:
//! - a [`CancellationToken`] that only ever goes from false to true
//! - a `watch` channel of [`BatchRunState`], which doubles as the pause
//!   condition
//! - an unbounded channel of [`BatchEvent`]s for progress and log lines
//!
//! The worker only suspends at the top of a record (while paused) and during
//! the throttle pause after a record. A record that has started always
//! finishes, so after a cancel at most one more record completes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{
    BatchConfig, ConfigScope, ScopedConfigStore, APPEND_AUDIO, AUDIO_FIELD, LANGUAGE, SEARCH_FIELD,
    SKIP_EXISTING,
};
use crate::error::AppError;
use crate::models::{AudioArtifact, FailedItem, Record, RecordId, RecordOutcome};
use crate::ports::{FailureLog, PronunciationSource, RecordStore};
use crate::selection::select_best;

/// Lifecycle of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchRunState {
    Idle,
    Running,
    Paused,
    Cancelling,
    Done,
}

/// Worker-to-controller notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// `current` grows by one per processed or skipped record.
    Progress { current: usize, total: usize },
    Log(String),
}

/// Per-run switches.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub skip_existing: bool,
    pub append: bool,
    pub throttle: Duration,
}

impl BatchOptions {
    /// Reads `skipExistingBulkAdd` and `appendAudio` from the global scope.
    pub fn from_config(config: &ScopedConfigStore, batch: &BatchConfig) -> Self {
        Self {
            skip_existing: config
                .get_bool(SKIP_EXISTING, ConfigScope::Global)
                .unwrap_or(true),
            append: config
                .get_bool(APPEND_AUDIO, ConfigScope::Global)
                .unwrap_or(false),
            throttle: batch.throttle,
        }
    }
}

/// Everything the worker produced, returned when it reaches `Done`.
#[derive(Debug)]
pub struct BatchRun {
    pub run_id: Uuid,
    /// One entry per record the worker got to, in processing order.
    pub outcomes: Vec<(RecordId, RecordOutcome)>,
    pub failed: Vec<FailedItem>,
    pub skipped: usize,
    pub cancelled: bool,
}

impl BatchRun {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == RecordOutcome::Succeeded)
            .count()
    }

    #[cfg(test)]
    pub(crate) fn outcome_of(&self, id: RecordId) -> Option<RecordOutcome> {
        self.outcomes
            .iter()
            .find(|(rid, _)| *rid == id)
            .map(|(_, o)| *o)
    }
}

/// Controller-side switches. Cheap to clone.
#[derive(Clone)]
pub struct BatchControl {
    cancel: CancellationToken,
    state: Arc<watch::Sender<BatchRunState>>,
}

impl BatchControl {
    /// Running → Paused. Takes effect before the next record.
    pub fn pause(&self) -> bool {
        self.state.send_if_modified(|s| {
            if *s == BatchRunState::Running {
                *s = BatchRunState::Paused;
                true
            } else {
                false
            }
        })
    }

    /// Paused → Running.
    pub fn resume(&self) -> bool {
        self.state.send_if_modified(|s| {
            if *s == BatchRunState::Paused {
                *s = BatchRunState::Running;
                true
            } else {
                false
            }
        })
    }

    pub fn toggle_pause(&self) -> BatchRunState {
        if !self.pause() {
            self.resume();
        }
        self.state()
    }

    /// Requests a stop. Also lifts a pause so the worker can see the request.
    pub fn cancel(&self) {
        self.cancel.cancel();
        self.state.send_if_modified(|s| match s {
            BatchRunState::Running | BatchRunState::Paused => {
                *s = BatchRunState::Cancelling;
                true
            }
            _ => false,
        });
    }

    pub fn state(&self) -> BatchRunState {
        *self.state.borrow()
    }
}

/// A started batch: control switches, the event stream and the worker task.
pub struct BatchHandle {
    control: BatchControl,
    events: mpsc::UnboundedReceiver<BatchEvent>,
    task: JoinHandle<BatchRun>,
}

impl BatchHandle {
    pub fn control(&self) -> BatchControl {
        self.control.clone()
    }

    /// Next progress or log event; `None` once the worker has exited and
    /// every event has been delivered.
    pub async fn next_event(&mut self) -> Option<BatchEvent> {
        self.events.recv().await
    }

    /// Waits for the worker to reach `Done`.
    pub async fn finish(self) -> Result<BatchRun, AppError> {
        self.task
            .await
            .map_err(|e| AppError::Generic(format!("batch worker failed: {}", e)))
    }
}

/// Orchestrates one batch over a resolved record set.
pub struct BatchExecutor<S, P, L> {
    store: Arc<S>,
    source: Arc<P>,
    failure_log: Arc<L>,
    config: Arc<ScopedConfigStore>,
    options: BatchOptions,
    cancel: CancellationToken,
    state: Arc<watch::Sender<BatchRunState>>,
}

impl<S, P, L> BatchExecutor<S, P, L>
where
    S: RecordStore,
    P: PronunciationSource,
    L: FailureLog,
{
    pub fn new(
        store: Arc<S>,
        source: Arc<P>,
        failure_log: Arc<L>,
        config: Arc<ScopedConfigStore>,
        options: BatchOptions,
    ) -> Self {
        let (state, _) = watch::channel(BatchRunState::Idle);
        Self {
            store,
            source,
            failure_log,
            config,
            options,
            cancel: CancellationToken::new(),
            state: Arc::new(state),
        }
    }

    pub fn control(&self) -> BatchControl {
        BatchControl {
            cancel: self.cancel.clone(),
            state: self.state.clone(),
        }
    }

    /// Idle → Running: spawns the worker on the current tokio runtime.
    ///
    /// `records` must already have their mappings resolved (see
    /// [`ConfigResolutionFlow`](crate::resolution::ConfigResolutionFlow));
    /// records that still lack one fail individually.
    pub fn start(self, records: Vec<Record>) -> BatchHandle {
        let control = self.control();
        let (tx, events) = mpsc::unbounded_channel();
        let run_id = Uuid::new_v4();

        self.state.send_replace(BatchRunState::Running);
        let span = tracing::info_span!("batch", run_id = %run_id);
        let task = tokio::spawn(self.run(run_id, records, tx).instrument(span));

        BatchHandle {
            control,
            events,
            task,
        }
    }

    async fn run(
        self,
        run_id: Uuid,
        records: Vec<Record>,
        tx: mpsc::UnboundedSender<BatchEvent>,
    ) -> BatchRun {
        let total = records.len();
        let mut run = BatchRun {
            run_id,
            outcomes: Vec::with_capacity(total),
            failed: Vec::new(),
            skipped: 0,
            cancelled: false,
        };
        let mut state_rx = self.state.subscribe();

        tracing::info!(total, "Batch started");

        for mut record in records {
            if self.cancel.is_cancelled() {
                break;
            }
            let paused = *state_rx.borrow_and_update() == BatchRunState::Paused;
            if paused {
                tracing::info!("Batch paused");
                let released = state_rx
                    .wait_for(|s| *s != BatchRunState::Paused)
                    .await
                    .is_ok();
                if !released || self.cancel.is_cancelled() {
                    break;
                }
                tracing::info!("Batch resumed");
            }

            let record_ref = record.to_ref();
            let outcome = match self.process(&mut record, &tx).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    emit_log(
                        &tx,
                        format!(
                            "[Error] Card with 1. Field {} failed due to Exception: {}",
                            record_ref.label, e
                        ),
                    );
                    tracing::error!(record_id = %record_ref.id, error = %e, "Record failed");
                    if let Err(log_err) = self.failure_log.record(&record_ref, &e) {
                        tracing::warn!(error = %log_err, "Could not write failure log");
                    }
                    run.failed.push(FailedItem::new(record_ref.clone(), e));
                    RecordOutcome::Failed
                }
            };

            if outcome == RecordOutcome::Skipped {
                run.skipped += 1;
            }
            run.outcomes.push((record_ref.id, outcome));
            let _ = tx.send(BatchEvent::Progress {
                current: run.outcomes.len(),
                total,
            });

            // skipped records made no request, so they are not throttled
            if outcome != RecordOutcome::Skipped && !self.options.throttle.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.options.throttle) => {}
                    _ = self.cancel.cancelled() => {}
                }
            }
        }

        run.cancelled = self.cancel.is_cancelled();
        self.source.cleanup();
        self.state.send_replace(BatchRunState::Done);

        tracing::info!(
            processed = run.outcomes.len(),
            failed = run.failed.len(),
            skipped = run.skipped,
            cancelled = run.cancelled,
            "Batch finished"
        );
        run
    }

    /// Steps 3 to 6 for one record. Any error here fails only this record.
    async fn process(
        &self,
        record: &mut Record,
        tx: &mpsc::UnboundedSender<BatchEvent>,
    ) -> Result<RecordOutcome, AppError> {
        let template = ConfigScope::Template(record.template_id);
        let search_field = self
            .config
            .get_text(SEARCH_FIELD, template)
            .ok_or_else(|| AppError::FieldNotFound(SEARCH_FIELD.to_string()))?;
        let audio_field = self
            .config
            .get_text(AUDIO_FIELD, template)
            .ok_or_else(|| AppError::FieldNotFound(AUDIO_FIELD.to_string()))?;

        let query = record
            .field(&search_field)
            .ok_or_else(|| AppError::FieldNotFound(search_field.clone()))?
            .trim()
            .to_string();
        let existing = record
            .field(&audio_field)
            .ok_or_else(|| AppError::FieldNotFound(audio_field.clone()))?
            .to_string();

        let language = self
            .config
            .get_text(LANGUAGE, ConfigScope::Group(record.group_id))
            .ok_or_else(|| {
                AppError::ConfigError(format!("no language set for deck {}", record.group_id))
            })?;

        emit_log(
            tx,
            format!("[Next Card] Query: {}; Language: {}", query, language),
        );

        if self.options.skip_existing && !existing.is_empty() {
            tracing::debug!(record_id = %record.id, "Audio field not empty, skipping");
            return Ok(RecordOutcome::Skipped);
        }

        if query.is_empty() {
            return Err(AppError::NoResults(format!(
                "field '{}' is empty",
                search_field
            )));
        }

        let artifact = self.acquire(&query, &language, tx).await?;

        if self.options.append {
            record.set_field(&audio_field, format!("{}{}", existing, artifact.reference()))?;
            emit_log(tx, "Appended sound string to field content".to_string());
        } else {
            record.set_field(&audio_field, artifact.reference())?;
            emit_log(tx, "Placed sound string in field".to_string());
        }

        self.store.persist(record).await?;
        emit_log(tx, "Saved note".to_string());
        tracing::info!(record_id = %record.id, file = %artifact.file_name, "Record updated");

        Ok(RecordOutcome::Succeeded)
    }

    /// Fallback provider first for its locale, primary provider otherwise or
    /// whenever the fallback fails for any reason.
    async fn acquire(
        &self,
        query: &str,
        language: &str,
        tx: &mpsc::UnboundedSender<BatchEvent>,
    ) -> Result<AudioArtifact, AppError> {
        if self.source.fallback_locale() == Some(language) {
            emit_log(tx, "Trying to download from JapanesePod101".to_string());
            let fallback = match self.source.fetch_fallback(query, language).await {
                Ok(p) => self.source.materialize(&p).await,
                Err(e) => Err(e),
            };
            match fallback {
                Ok(artifact) => return Ok(artifact),
                Err(e) => {
                    tracing::debug!(query, error = %e, "Fallback provider failed, using primary");
                }
            }
        }

        let candidates = self.source.fetch_primary(query, language).await?;
        if candidates.is_empty() {
            return Err(AppError::NoResults(query.to_string()));
        }
        let top = select_best(&candidates);
        emit_log(
            tx,
            format!(
                "Selected pronunciation by {} with {} votes",
                top.user, top.votes
            ),
        );

        let artifact = self.source.materialize(top).await?;
        emit_log(tx, "Downloaded pronunciation".to_string());
        Ok(artifact)
    }
}

fn emit_log(tx: &mpsc::UnboundedSender<BatchEvent>, line: String) {
    tracing::debug!("{}", line);
    let _ = tx.send(BatchEvent::Log(line));
}
