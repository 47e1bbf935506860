//! # stateful-processor
//!
//! Resumable, checkpointed execution of item-by-item batch jobs.
//!
//! A [`ProcessingEngine`] walks an item sequence, calls a [`Worker`] for each
//! item not yet recorded, and keeps the results in a [`ProcessingState`]. The
//! state is saved to a [`SnapshotStore`] when the run completes, or when
//! SIGINT/SIGTERM arrives mid-run, so a later run with `resume` picks up
//! where the last one stopped.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod job;
pub mod model;
pub mod store;
pub mod telemetry;

pub use engine::{EngineOptions, ProcessingEngine};
pub use error::{Error, Result};
pub use job::{ItemSource, Worker};
pub use model::{ProcessingState, RunOutcome, RunSummary, Snapshot};
pub use store::{JsonFileStore, MemoryStore, SnapshotStore};
