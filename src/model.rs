//! Core data model.
//!
//! An item is a string key naming one unit of work. Processing an item yields
//! an opaque JSON value. The processing state maps keys to results and is the
//! only thing a snapshot ever contains.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key identifying one unit of work.
pub type Item = String;

/// Value produced by a worker for one item. Opaque to the engine.
pub type ProcessedResult = serde_json::Value;

/// Durable form of [`ProcessingState`]: a JSON object of key to result.
pub type Snapshot = BTreeMap<Item, ProcessedResult>;

// ---------------------------------------------------------------------------
// Processing State
// ---------------------------------------------------------------------------

/// In-memory record of every item processed so far.
///
/// Written only by the engine's iteration loop, one item at a time and only
/// after the worker returned successfully.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessingState {
    entries: Snapshot,
}

impl ProcessingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, item: &str) -> bool {
        self.entries.contains_key(item)
    }

    pub fn get(&self, item: &str) -> Option<&ProcessedResult> {
        self.entries.get(item)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every item in `items` already has a recorded result.
    ///
    /// Vacuously true for an empty sequence.
    pub fn covers(&self, items: &[Item]) -> bool {
        items.iter().all(|item| self.contains(item))
    }

    /// Borrow as a snapshot for persistence.
    pub fn as_snapshot(&self) -> &Snapshot {
        &self.entries
    }

    pub(crate) fn record(&mut self, item: Item, result: ProcessedResult) {
        self.entries.insert(item, result);
    }
}

impl From<Snapshot> for ProcessingState {
    fn from(entries: Snapshot) -> Self {
        Self { entries }
    }
}

// ---------------------------------------------------------------------------
// Run Outcome
// ---------------------------------------------------------------------------

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every item was already recorded. Nothing was armed or iterated.
    AllDone,
    /// The loop finished and the snapshot was saved.
    Completed,
    /// An interrupt arrived and the snapshot was saved. Only observable when
    /// the controller is configured not to exit the process.
    Interrupted,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunOutcome::AllDone => "all_done",
            RunOutcome::Completed => "completed",
            RunOutcome::Interrupted => "interrupted",
        };
        write!(f, "{s}")
    }
}

/// Counters describing a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    /// Worker invocations that succeeded in this run.
    pub processed: usize,
    /// Items skipped because they were already recorded.
    pub skipped: usize,
    /// Length of the item sequence.
    pub total: usize,
    /// Signal number that interrupted the run.
    pub signal: Option<i32>,
}

impl RunSummary {
    /// Conventional process exit status for an interrupted run, `128 + signo`.
    pub fn exit_code(&self) -> Option<i32> {
        self.signal.map(|signo| 128 + signo)
    }
}
