// Document indexer
// Walks a folder of source documents and upserts their embedded chunks into
// the vector index, tracking completed files to avoid duplicate work.

pub mod tracking;


use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::chunking::chunk_text;
use crate::config::Config;
use crate::elastic::{ElasticClient, VectorStore};
use crate::extract;
use crate::openai::OpenAiClient;

pub use tracking::IndexTracker;

/// Indexes a folder of documents into an Elasticsearch vector index
pub struct Indexer {
    elastic: ElasticClient,
    openai: OpenAiClient,
    tracking_path: PathBuf,
    chunk_size: usize,
    chunk_overlap: usize,
}

/// Outcome of one indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Files embedded and upserted during this run
    pub indexed: Vec<String>,
    /// Files skipped because the tracking record already lists them
    pub skipped: Vec<String>,
    /// Files that failed extraction or embedding during this run
    pub failed: Vec<String>,
    /// Files in the folder that remain unindexed after this run
    pub remaining: Vec<String>,
}

impl Indexer {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let elastic =
            ElasticClient::new(config).context("Failed to create Elasticsearch client")?;
        let openai = OpenAiClient::new(config).context("Failed to create OpenAI client")?;

        Ok(Self {
            elastic,
            openai,
            tracking_path: config.tracking_file_path(),
            chunk_size: config.chat.chunk_size,
            chunk_overlap: config.chat.chunk_overlap,
        })
    }

    /// Index every recognized document in `folder` that the tracking record
    /// does not already list for `index_name`.
    ///
    /// A single bad file is logged and skipped, never aborting the run. The
    /// tracking record is rewritten once after the whole folder is processed.
    #[inline]
    pub fn index_folder(&self, folder: &Path, index_name: &str) -> Result<IndexReport> {
        let mut tracker = IndexTracker::load(&self.tracking_path)?;
        let files = Self::list_documents(folder)?;

        info!(
            "Found {} candidate documents in {}",
            files.len(),
            folder.display()
        );

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(files.len() as u64).with_style(
                ProgressStyle::with_template("{bar:30} [{pos}/{len}] Indexing {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut report = IndexReport::default();

        for file_name in &files {
            bar.set_message(file_name.clone());

            if tracker.is_indexed(index_name, file_name) {
                info!("Skipping {}, already indexed", file_name);
                report.skipped.push(file_name.clone());
                bar.inc(1);
                continue;
            }

            let path = folder.join(file_name);
            info!("Processing {}...", path.display());

            match self.index_file(&path, file_name, index_name) {
                Ok(chunk_count) => {
                    info!(
                        "Successfully indexed {} ({} chunks)",
                        file_name, chunk_count
                    );
                    tracker.mark_indexed(index_name, file_name);
                    report.indexed.push(file_name.clone());
                }
                Err(e) => {
                    error!("Failed to index {} due to {:#}", file_name, e);
                    report.failed.push(file_name.clone());
                }
            }

            bar.inc(1);
        }

        bar.finish_and_clear();

        report.remaining = files
            .iter()
            .filter(|file| !tracker.is_indexed(index_name, file))
            .cloned()
            .collect();

        if report.remaining.is_empty() {
            info!(
                "All {} files in {} are indexed",
                files.len(),
                folder.display()
            );
        } else {
            info!("The following files have not been indexed:");
            for file in &report.remaining {
                info!("  {}", file);
            }
        }

        tracker.save()?;
        Ok(report)
    }

    fn index_file(&self, path: &Path, file_name: &str, index_name: &str) -> Result<usize> {
        let text = extract::extract_text(path)?;
        let chunks = chunk_text(file_name, &text, self.chunk_size, self.chunk_overlap);

        if chunks.is_empty() {
            anyhow::bail!("No chunks produced for {}", file_name);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self
            .openai
            .embed_batch(&texts)
            .context("Failed to embed chunks")?;

        let dimensions = embeddings
            .first()
            .map(Vec::len)
            .context("Embeddings response was empty")?;

        let store = VectorStore::new(self.elastic.clone(), index_name);
        store.ensure_index(dimensions)?;
        store.upsert_chunks(&chunks, &embeddings)?;

        Ok(chunks.len())
    }

    fn list_documents(folder: &Path) -> Result<Vec<String>> {
        let entries = fs::read_dir(folder)
            .with_context(|| format!("Failed to read folder: {}", folder.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && extract::is_supported(&path) {
                if let Some(name) = path.file_name().and_then(OsStr::to_str) {
                    files.push(name.to_string());
                }
            }
        }

        files.sort();
        Ok(files)
    }
}
