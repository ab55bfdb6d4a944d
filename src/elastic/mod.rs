// Elasticsearch access layer
// A thin REST client plus the two stores built on top of it: the document
// vector index and the per-session chat history index.

pub mod history;
pub mod vector_store;


use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::{ChatError, Result};

pub use history::{ChatHistory, ChatMessage, Role};
pub use vector_store::{RetrievedChunk, VectorStore};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Basic-auth REST client for a single Elasticsearch cluster.
///
/// External calls are never retried; a failed call fails the whole operation.
#[derive(Debug, Clone)]
pub struct ElasticClient {
    base_url: Url,
    auth_header: String,
    agent: ureq::Agent,
}

impl ElasticClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .elastic_url()
            .map_err(|e| ChatError::Config(e.to_string()))?;

        let credentials = format!(
            "{}:{}",
            config.elasticsearch.username, config.elastic_cloud_password
        );
        let auth_header = format!("Basic {}", STANDARD.encode(credentials));

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            auth_header,
            agent,
        })
    }

    /// Whether the named index exists
    #[inline]
    pub fn index_exists(&self, index: &str) -> Result<bool> {
        let url = self.url(index)?;

        match self.agent.head(url.as_str()).header("Authorization", &self.auth_header).call() {
            Ok(_) => Ok(true),
            Err(ureq::Error::StatusCode(404)) => Ok(false),
            Err(e) => Err(ChatError::SearchEngine(format!(
                "Failed to check index {}: {}",
                index, e
            ))),
        }
    }

    /// Delete the named index. Returns `false` (not an error) when the index
    /// was already absent.
    #[inline]
    pub fn delete_index(&self, index: &str) -> Result<bool> {
        let url = self.url(index)?;

        match self
            .agent
            .delete(url.as_str())
            .header("Authorization", &self.auth_header)
            .call()
        {
            Ok(_) => {
                debug!("Deleted index {}", index);
                Ok(true)
            }
            Err(ureq::Error::StatusCode(404)) => Ok(false),
            Err(e) => Err(ChatError::SearchEngine(format!(
                "Failed to delete index {}: {}",
                index, e
            ))),
        }
    }

    pub(crate) fn get(&self, path: &str) -> Result<String> {
        let url = self.url(path)?;

        self.agent
            .get(url.as_str())
            .header("Authorization", &self.auth_header)
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| request_error("GET", path, &e))
    }

    pub(crate) fn put_json(&self, path: &str, body: &serde_json::Value) -> Result<String> {
        let url = self.url(path)?;

        self.agent
            .put(url.as_str())
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .send(&body.to_string())
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| request_error("PUT", path, &e))
    }

    pub(crate) fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<String> {
        let url = self.url(path)?;

        self.agent
            .post(url.as_str())
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .send(&body.to_string())
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| request_error("POST", path, &e))
    }

    /// Bulk API requires newline-delimited JSON rather than a single document
    pub(crate) fn post_ndjson(&self, path: &str, body: &str) -> Result<String> {
        let url = self.url(path)?;

        self.agent
            .post(url.as_str())
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/x-ndjson")
            .send(body)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| request_error("POST", path, &e))
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ChatError::SearchEngine(format!("Failed to build URL for {}: {}", path, e)))
    }
}

fn request_error(method: &str, path: &str, error: &ureq::Error) -> ChatError {
    match error {
        ureq::Error::StatusCode(status) => ChatError::SearchEngine(format!(
            "Elasticsearch returned HTTP {} for {} {}",
            status, method, path
        )),
        other => ChatError::SearchEngine(format!("{} {} failed: {}", method, path, other)),
    }
}
