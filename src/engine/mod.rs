//! Processing engine and its run-scoped checkpoint controller.

pub mod checkpoint;
pub mod processor;

pub use checkpoint::{
    ArmedCheckpoint, CheckpointController, InterruptSource, InterruptTrigger, SIGINT, Termination,
};
pub use processor::{EngineOptions, ProcessingEngine};
