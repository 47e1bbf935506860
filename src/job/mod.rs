//! Job collaborators: where items come from and how one item is processed.
//!
//! The engine depends only on these two capabilities. Anything the worker
//! needs per call (clients, pacing, parameters) lives in the worker value.

pub mod source;
pub mod worker;

use std::future::Future;

use crate::model::{Item, ProcessedResult};

pub use source::{ManifestItemSource, StaticItemSource};
pub use worker::{CommandWorker, SuffixWorker};

/// Supplies the ordered item sequence for a run.
pub trait ItemSource: Send + Sync {
    fn items(&self) -> impl Future<Output = anyhow::Result<Vec<Item>>> + Send;
}

/// Turns one item into its processed result.
pub trait Worker: Send + Sync {
    fn process_one(&self, item: &Item) -> impl Future<Output = anyhow::Result<ProcessedResult>> + Send;
}
