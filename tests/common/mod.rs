//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use serde_json::json;
use stateful_processor::engine::{InterruptSource, InterruptTrigger, Termination};
use stateful_processor::event::{Event, EventSink};
use stateful_processor::error::StorageFailure;
use stateful_processor::model::{Item, ProcessedResult, Snapshot};
use stateful_processor::{EngineOptions, Error, MemoryStore, SnapshotStore, Worker};
use tokio::sync::mpsc::UnboundedReceiver;

/// `x -> x + "!"`, remembering every item it was called with.
#[derive(Default)]
pub struct BangWorker {
    calls: Mutex<Vec<Item>>,
}

impl BangWorker {
    pub fn calls(&self) -> Vec<Item> {
        self.calls.lock().unwrap().clone()
    }
}

impl Worker for BangWorker {
    async fn process_one(&self, item: &Item) -> anyhow::Result<ProcessedResult> {
        self.calls.lock().unwrap().push(item.clone());
        Ok(json!(format!("{item}!")))
    }
}

/// Like [`BangWorker`] but fails on one item.
pub struct FailingWorker {
    pub fail_on: &'static str,
    calls: Mutex<Vec<Item>>,
}

impl FailingWorker {
    pub fn new(fail_on: &'static str) -> Self {
        Self {
            fail_on,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Item> {
        self.calls.lock().unwrap().clone()
    }
}

impl Worker for FailingWorker {
    async fn process_one(&self, item: &Item) -> anyhow::Result<ProcessedResult> {
        self.calls.lock().unwrap().push(item.clone());
        if item == self.fail_on {
            anyhow::bail!("upstream rejected {item}");
        }
        Ok(json!(format!("{item}!")))
    }
}

/// Fires the trigger while processing `interrupt_on`, then never returns.
pub struct InterruptingWorker {
    pub trigger: InterruptTrigger,
    pub interrupt_on: &'static str,
    calls: Mutex<Vec<Item>>,
}

impl InterruptingWorker {
    pub fn new(trigger: InterruptTrigger, interrupt_on: &'static str) -> Self {
        Self {
            trigger,
            interrupt_on,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Item> {
        self.calls.lock().unwrap().clone()
    }
}

impl Worker for InterruptingWorker {
    async fn process_one(&self, item: &Item) -> anyhow::Result<ProcessedResult> {
        self.calls.lock().unwrap().push(item.clone());
        if item == self.interrupt_on {
            self.trigger.fire();
            std::future::pending::<()>().await;
        }
        Ok(json!(format!("{item}!")))
    }
}

/// In-memory store that fires `trigger` right after every successful save.
pub struct FiringStore {
    pub inner: MemoryStore,
    pub trigger: InterruptTrigger,
}

impl SnapshotStore for FiringStore {
    async fn load(&self) -> stateful_processor::Result<Snapshot> {
        self.inner.load().await
    }

    async fn save(&self, snapshot: &Snapshot) -> stateful_processor::Result<()> {
        self.inner.save(snapshot).await?;
        self.trigger.fire();
        Ok(())
    }

    fn describe(&self) -> String {
        "firing".to_string()
    }
}

/// Store whose saves always fail.
pub struct ReadOnlyStore;

impl SnapshotStore for ReadOnlyStore {
    async fn load(&self) -> stateful_processor::Result<Snapshot> {
        Ok(Snapshot::new())
    }

    async fn save(&self, _snapshot: &Snapshot) -> stateful_processor::Result<()> {
        Err(Error::Storage {
            resource: self.describe(),
            source: StorageFailure::Io(std::io::Error::other("read-only filesystem")),
        })
    }

    fn describe(&self) -> String {
        "read-only".to_string()
    }
}

/// Options wired to a manual trigger that returns instead of exiting.
pub fn manual_options(resume: bool) -> (EngineOptions, InterruptTrigger, UnboundedReceiver<Event>) {
    let trigger = InterruptTrigger::new();
    let (events, rx) = EventSink::channel();
    let options = EngineOptions {
        resume,
        events,
        interrupt: InterruptSource::Manual(trigger.clone()),
        termination: Termination::Return,
    };
    (options, trigger, rx)
}

/// Drain every event received so far as log messages.
pub fn messages(rx: &mut UnboundedReceiver<Event>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event.kind.to_string());
    }
    out
}
