
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// Persisted ledger of which source files each index already holds.
///
/// Loaded at indexer start and rewritten once at indexer end; a crash mid-run
/// simply re-processes files that were not yet recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTracker {
    path: PathBuf,
    data: BTreeMap<String, Vec<String>>,
}

impl IndexTracker {
    /// Load the tracking file, or start empty if it does not exist yet
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No tracking file at {}, starting empty", path.display());
            return Ok(Self {
                path: path.to_path_buf(),
                data: BTreeMap::new(),
            });
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read tracking file: {}", path.display()))?;

        let data = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse tracking file: {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    #[inline]
    pub fn indexed_files(&self, index_name: &str) -> &[String] {
        self.data.get(index_name).map_or(&[], Vec::as_slice)
    }

    #[inline]
    pub fn is_indexed(&self, index_name: &str, file_name: &str) -> bool {
        self.indexed_files(index_name)
            .iter()
            .any(|f| f == file_name)
    }

    #[inline]
    pub fn mark_indexed(&mut self, index_name: &str, file_name: &str) {
        let files = self.data.entry(index_name.to_string()).or_default();
        if !files.iter().any(|f| f == file_name) {
            files.push(file_name.to_string());
        }
    }

    /// Rewrite the tracking file with the current state
    #[inline]
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create tracking directory: {}", parent.display())
            })?;
        }

        let content =
            serde_json::to_string_pretty(&self.data).context("Failed to serialize tracking data")?;

        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write tracking file: {}", self.path.display()))?;

        debug!("Saved tracking file to {}", self.path.display());
        Ok(())
    }
}
