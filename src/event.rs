//! Progress events emitted by the engine and the checkpoint controller.
//!
//! Every event is logged through `tracing` at info level using its display
//! form, which is the stable log message. Embedders that want the events as
//! data can attach a channel with [`EventSink::channel`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// When this event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    StateLoaded { store: String, len: usize },
    AllProcessed,
    ItemSkipped { item: String },
    ItemProcessed { item: String, index: usize, total: usize },
    RunFinished,
    InterruptReceived,
    InterruptSaved,
}

impl EventKind {
    /// Short machine name, used as the `event` field on log records.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::StateLoaded { .. } => "state_loaded",
            EventKind::AllProcessed => "all_processed",
            EventKind::ItemSkipped { .. } => "item_skipped",
            EventKind::ItemProcessed { .. } => "item_processed",
            EventKind::RunFinished => "run_finished",
            EventKind::InterruptReceived => "interrupt_received",
            EventKind::InterruptSaved => "interrupt_saved",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::StateLoaded { store, len } => {
                write!(f, "Read from store: {store} data of len {len}")
            }
            EventKind::AllProcessed => write!(f, "All items already processed, skipping..."),
            EventKind::ItemSkipped { item } => {
                write!(f, "Item {item} already processed, skipping...")
            }
            EventKind::ItemProcessed { item, index, total } => {
                write!(f, "Processed item {item} {index} / {total}")
            }
            EventKind::RunFinished => write!(f, "Finished processing all items."),
            EventKind::InterruptReceived => write!(f, "Interrupt signal received, saving data..."),
            EventKind::InterruptSaved => write!(f, "Data saved, exiting."),
        }
    }
}

/// Where events go: always the tracing subscriber, optionally a channel.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<Event>>,
}

impl EventSink {
    /// Log-only sink.
    pub fn tracing() -> Self {
        Self::default()
    }

    /// Sink that also forwards every event to the returned receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, kind: EventKind) {
        tracing::info!(event = kind.name(), "{kind}");

        if let Some(ref tx) = self.tx {
            // A dropped receiver just means nobody is listening any more.
            let _ = tx.send(Event {
                timestamp: Utc::now(),
                kind,
            });
        }
    }
}
