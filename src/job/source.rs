//! Ready-made item sources.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use super::ItemSource;
use crate::model::Item;

/// A fixed list of items.
#[derive(Debug, Clone, Default)]
pub struct StaticItemSource {
    items: Vec<Item>,
}

impl StaticItemSource {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Item>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

impl ItemSource for StaticItemSource {
    async fn items(&self) -> anyhow::Result<Vec<Item>> {
        Ok(self.items.clone())
    }
}

/// Top-level TOML manifest.
#[derive(Debug, Deserialize)]
struct Manifest {
    items: Vec<Item>,
}

/// Items listed in a TOML manifest: `items = ["a", "b", "c"]`.
///
/// The file is read on every call to `items()`, so edits between runs are
/// picked up on resume.
#[derive(Debug, Clone)]
pub struct ManifestItemSource {
    path: PathBuf,
}

impl ManifestItemSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ItemSource for ManifestItemSource {
    async fn items(&self) -> anyhow::Result<Vec<Item>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("cannot read manifest {}", self.path.display()))?;
        let manifest: Manifest = toml::from_str(&content)
            .with_context(|| format!("bad manifest {}", self.path.display()))?;
        Ok(manifest.items)
    }
}
