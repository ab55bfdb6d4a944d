
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::ElasticClient;
use crate::{ChatError, Result};

/// Index name prefix for per-session history stores
pub const HISTORY_INDEX_PREFIX: &str = "chat-history-";

const HISTORY_FETCH_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of a conversation, as seen by the retrieval chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredMessage {
    session_id: String,
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    hits: HistoryHits,
}

#[derive(Debug, Deserialize)]
struct HistoryHits {
    hits: Vec<HistoryHit>,
}

#[derive(Debug, Deserialize)]
struct HistoryHit {
    #[serde(rename = "_source")]
    source: StoredMessage,
}

/// Append-only, per-session message log persisted in its own Elasticsearch
/// index, deletable as a unit.
#[derive(Debug, Clone)]
pub struct ChatHistory {
    client: ElasticClient,
    index_name: String,
    session_id: String,
}

impl ChatHistory {
    #[inline]
    pub fn new(client: ElasticClient, session_id: Uuid) -> Self {
        Self {
            client,
            index_name: format!("{}{}", HISTORY_INDEX_PREFIX, session_id),
            session_id: session_id.to_string(),
        }
    }

    #[inline]
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Append one message. The index is created implicitly on first write.
    #[inline]
    pub fn append(&self, role: Role, content: &str) -> Result<()> {
        let message = StoredMessage {
            session_id: self.session_id.clone(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };

        let document = serde_json::to_value(&message)
            .map_err(|e| ChatError::SearchEngine(format!("Failed to serialize message: {}", e)))?;

        // refresh=true so the turn is visible to the next load
        let path = format!("{}/_doc?refresh=true", self.index_name);
        self.client.post_json(&path, &document)?;

        debug!("Appended {:?} message to {}", role, self.index_name);
        Ok(())
    }

    /// Load the full message log in insertion order. An absent index is an
    /// empty history, not an error.
    #[inline]
    pub fn load(&self) -> Result<Vec<ChatMessage>> {
        if !self.client.index_exists(&self.index_name)? {
            return Ok(Vec::new());
        }

        let body = json!({
            "size": HISTORY_FETCH_LIMIT,
            "sort": [{ "created_at": { "order": "asc" } }],
            "query": { "match_all": {} }
        });

        let path = format!("{}/_search", self.index_name);
        let response_text = self.client.post_json(&path, &body)?;

        let response: HistoryResponse = serde_json::from_str(&response_text)
            .map_err(|e| ChatError::SearchEngine(format!("Malformed history response: {}", e)))?;

        Ok(response
            .hits
            .hits
            .into_iter()
            .map(|hit| ChatMessage {
                role: hit.source.role,
                content: hit.source.content,
            })
            .collect())
    }

    /// Delete the history store. Idempotent: an already-absent store is a
    /// benign no-op.
    #[inline]
    pub fn delete(&self) -> Result<()> {
        if self.client.delete_index(&self.index_name)? {
            info!(
                "Chat history for session {} has been deleted",
                self.session_id
            );
        } else {
            warn!(
                "Chat history not found or already deleted for session {}",
                self.session_id
            );
        }
        Ok(())
    }
}
