//! The processing engine. Owns the run state and drives one pass over the
//! item sequence.

use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::Instrument;

use crate::engine::checkpoint::{CheckpointController, InterruptSource, Termination};
use crate::error::{Error, Result};
use crate::event::{EventKind, EventSink};
use crate::job::{ItemSource, Worker};
use crate::model::{Item, ProcessedResult, ProcessingState, RunOutcome, RunSummary};
use crate::store::SnapshotStore;
use crate::telemetry::metrics;
use crate::telemetry::run::{record_outcome, start_run_span};

/// Construction options for [`ProcessingEngine`].
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Load the existing snapshot instead of starting empty.
    pub resume: bool,
    /// Where progress events go besides the log.
    pub events: EventSink,
    /// Where interrupts come from while a run is armed.
    pub interrupt: InterruptSource,
    /// Exit the process after an interrupt checkpoint, or return.
    pub termination: Termination,
}

/// Result of awaiting one worker call against the interrupt guard.
enum Step {
    Done(anyhow::Result<ProcessedResult>),
    Interrupted(i32),
}

/// Resumable item-by-item processor.
///
/// State is written only here, one item at a time, after the worker returns.
/// It is saved when a run completes and when an interrupt arrives; nowhere
/// else.
pub struct ProcessingEngine<S: SnapshotStore> {
    store: S,
    state: ProcessingState,
    controller: CheckpointController,
    events: EventSink,
}

impl<S: SnapshotStore> ProcessingEngine<S> {
    /// Create an engine over `store`, loading its snapshot when resuming.
    pub async fn new(store: S, options: EngineOptions) -> Result<Self> {
        let state = if options.resume {
            let snapshot = store.load().await?;
            options.events.emit(EventKind::StateLoaded {
                store: store.describe(),
                len: snapshot.len(),
            });
            ProcessingState::from(snapshot)
        } else {
            ProcessingState::new()
        };

        let controller = CheckpointController::new(
            options.interrupt,
            options.termination,
            options.events.clone(),
        );

        Ok(Self {
            store,
            state,
            controller,
            events: options.events,
        })
    }

    pub fn state(&self) -> &ProcessingState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process every item from `source` that is not yet recorded.
    ///
    /// Returns without arming anything when all items are already recorded.
    /// A worker error aborts the run; nothing from this run is persisted in
    /// that case. An interrupt saves the current state and, unless the engine
    /// was built with [`Termination::Return`], exits the process.
    pub async fn run<I, W>(&mut self, source: &I, worker: &W) -> Result<RunSummary>
    where
        I: ItemSource,
        W: Worker,
    {
        let items = source.items().await.map_err(Error::Source)?;
        let span = start_run_span(&self.store.describe(), items.len());

        let summary = self.iterate(items, worker).instrument(span.clone()).await?;
        record_outcome(&span, summary.outcome);
        Ok(summary)
    }

    async fn iterate<W: Worker>(&mut self, items: Vec<Item>, worker: &W) -> Result<RunSummary> {
        let total = items.len();

        if self.state.covers(&items) {
            self.events.emit(EventKind::AllProcessed);
            return Ok(RunSummary {
                outcome: RunOutcome::AllDone,
                processed: 0,
                skipped: total,
                total,
                signal: None,
            });
        }

        let armed = self.controller.arm()?;

        let processed_counter = metrics::items_processed();
        let skipped_counter = metrics::items_skipped();
        let duration = metrics::item_duration_ms();

        let mut summary = RunSummary {
            outcome: RunOutcome::Completed,
            processed: 0,
            skipped: 0,
            total,
            signal: None,
        };

        for (position, item) in items.into_iter().enumerate() {
            if let Some(signo) = armed.pending() {
                return self.interrupted(signo, summary).await;
            }

            if self.state.contains(&item) {
                self.events.emit(EventKind::ItemSkipped { item });
                summary.skipped += 1;
                skipped_counter.add(1, &[]);
                continue;
            }

            let started = Instant::now();
            let step = tokio::select! {
                biased;
                signo = armed.interrupted() => Step::Interrupted(signo),
                result = worker.process_one(&item) => Step::Done(result),
            };

            let result = match step {
                Step::Interrupted(signo) => return self.interrupted(signo, summary).await,
                Step::Done(result) => result.map_err(|source| Error::Worker {
                    item: item.clone(),
                    source,
                })?,
            };

            duration.record(started.elapsed().as_secs_f64() * 1000.0, &[]);
            self.state.record(item.clone(), result);
            summary.processed += 1;
            processed_counter.add(1, &[]);

            self.events.emit(EventKind::ItemProcessed {
                item,
                index: position + 1,
                total,
            });
        }

        self.events.emit(EventKind::RunFinished);
        self.store.save(self.state.as_snapshot()).await?;
        metrics::snapshots_saved().add(1, &[KeyValue::new("trigger", "completion")]);

        // Still armed: a signal that landed after the last item must not be lost.
        if let Some(signo) = armed.pending() {
            return self.interrupted(signo, summary).await;
        }
        drop(armed);

        Ok(summary)
    }

    async fn interrupted(&self, signo: i32, mut summary: RunSummary) -> Result<RunSummary> {
        self.controller
            .checkpoint(&self.store, &self.state, signo)
            .await?;
        summary.outcome = RunOutcome::Interrupted;
        summary.signal = Some(signo);
        Ok(summary)
    }
}
