//! Ready-made workers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use tokio::process::Command;
use tracing::debug;

use super::Worker;
use crate::model::{Item, ProcessedResult};

/// Appends a fixed suffix to the item key, optionally after a pause.
///
/// The pause stands in for rate limiting or slow I/O.
#[derive(Debug, Clone)]
pub struct SuffixWorker {
    suffix: String,
    delay: Duration,
}

impl SuffixWorker {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Worker for SuffixWorker {
    async fn process_one(&self, item: &Item) -> anyhow::Result<ProcessedResult> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(ProcessedResult::String(format!("{item}{}", self.suffix)))
    }
}

/// Runs an executable once per item.
///
/// The item key is passed as `ITEM` in the environment. Stdout is parsed as
/// JSON when possible, otherwise kept as a trimmed string. A non-zero exit
/// status fails the item.
#[derive(Debug, Clone)]
pub struct CommandWorker {
    command: PathBuf,
    args: Vec<String>,
}

impl CommandWorker {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn resolved(&self) -> anyhow::Result<PathBuf> {
        // Bare names go through PATH; relative paths resolve against the CWD.
        let command: &Path = &self.command;
        if command.is_relative() && command.components().count() > 1 {
            Ok(std::env::current_dir()?.join(command))
        } else {
            Ok(command.to_path_buf())
        }
    }
}

impl Worker for CommandWorker {
    async fn process_one(&self, item: &Item) -> anyhow::Result<ProcessedResult> {
        let command = self.resolved()?;

        debug!(command = %command.display(), item = %item, "running worker command");

        let output = Command::new(&command)
            .args(&self.args)
            .env("ITEM", item)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("cannot spawn {}", command.display()))?;

        if !output.status.success() {
            bail!(
                "{} exited with status {}: {}",
                command.display(),
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let stdout = String::from_utf8(output.stdout).context("worker output is not UTF-8")?;
        let stdout = stdout.trim();
        Ok(serde_json::from_str(stdout)
            .unwrap_or_else(|_| ProcessedResult::String(stdout.to_string())))
    }
}
