
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::ElasticClient;
use crate::chunking::DocumentChunk;
use crate::{ChatError, Result};

/// Document vector index backed by Elasticsearch kNN search
#[derive(Debug, Clone)]
pub struct VectorStore {
    client: ElasticClient,
    index_name: String,
}

/// A chunk returned by nearest-neighbor retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub source: String,
    pub content: String,
    pub score: f32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_score")]
    score: Option<f32>,
    #[serde(rename = "_source")]
    source: ChunkDocument,
}

#[derive(Debug, Deserialize)]
struct ChunkDocument {
    source: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    errors: bool,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

impl VectorStore {
    #[inline]
    pub fn new(client: ElasticClient, index_name: &str) -> Self {
        Self {
            client,
            index_name: index_name.to_string(),
        }
    }

    #[inline]
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Create the index with a dense_vector mapping if it does not exist yet
    #[inline]
    pub fn ensure_index(&self, dimensions: usize) -> Result<()> {
        if self.client.index_exists(&self.index_name)? {
            debug!("Index {} already exists", self.index_name);
            return Ok(());
        }

        info!(
            "Index {} does not exist. Creating with {} dimensions...",
            self.index_name, dimensions
        );

        let mapping = json!({
            "mappings": {
                "properties": {
                    "source": { "type": "keyword" },
                    "content": { "type": "text" },
                    "chunk_index": { "type": "integer" },
                    "embedding": {
                        "type": "dense_vector",
                        "dims": dimensions,
                        "index": true,
                        "similarity": "cosine"
                    }
                }
            }
        });

        self.client.put_json(&self.index_name, &mapping)?;
        Ok(())
    }

    /// Upsert one document's chunks with their embeddings in a single bulk
    /// request. Chunk ids are derived from source and position, so
    /// re-indexing a file overwrites its previous chunks.
    #[inline]
    pub fn upsert_chunks(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(ChatError::SearchEngine(format!(
                "Mismatch between chunks and embeddings: {} vs {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        if chunks.is_empty() {
            debug!("No chunks to upsert");
            return Ok(());
        }

        let mut body = String::new();
        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            let action = json!({
                "index": {
                    "_index": self.index_name,
                    "_id": format!("{}-{}", chunk.source, chunk.chunk_index)
                }
            });
            let document = json!({
                "source": chunk.source,
                "content": chunk.content,
                "chunk_index": chunk.chunk_index,
                "embedding": embedding
            });
            body.push_str(&action.to_string());
            body.push('\n');
            body.push_str(&document.to_string());
            body.push('\n');
        }

        let response_text = self.client.post_ndjson("_bulk?refresh=true", &body)?;

        let response: BulkResponse = serde_json::from_str(&response_text)
            .map_err(|e| ChatError::SearchEngine(format!("Malformed bulk response: {}", e)))?;

        if response.errors {
            return Err(ChatError::SearchEngine(format!(
                "Bulk upsert into {} reported item failures",
                self.index_name
            )));
        }

        info!(
            "Upserted {} chunks into index {}",
            chunks.len(),
            self.index_name
        );
        Ok(())
    }

    /// Fetch the `k` nearest chunks to the query vector.
    ///
    /// Similarity is whatever the index provides; no ranking happens here.
    #[inline]
    pub fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        debug!("kNN search on {} with k={}", self.index_name, k);

        let body = json!({
            "knn": {
                "field": "embedding",
                "query_vector": query_vector,
                "k": k,
                "num_candidates": k * 10
            },
            "size": k,
            "_source": ["source", "content"]
        });

        let path = format!("{}/_search", self.index_name);
        let response_text = self.client.post_json(&path, &body)?;

        let response: SearchResponse = serde_json::from_str(&response_text)
            .map_err(|e| ChatError::SearchEngine(format!("Malformed search response: {}", e)))?;

        Ok(response
            .hits
            .hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                source: hit.source.source,
                content: hit.source.content,
                score: hit.score.unwrap_or(0.0),
            })
            .collect())
    }

    /// Total number of chunks currently in the index
    #[inline]
    pub fn count(&self) -> Result<u64> {
        let path = format!("{}/_count", self.index_name);
        let response_text = self.client.get(&path)?;

        let response: CountResponse = serde_json::from_str(&response_text)
            .map_err(|e| ChatError::SearchEngine(format!("Malformed count response: {}", e)))?;

        Ok(response.count)
    }
}
