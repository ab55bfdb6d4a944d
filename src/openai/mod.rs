
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::{ChatError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Client for the OpenAI embeddings and chat completions APIs.
///
/// External calls are never retried; a failed call fails the whole operation.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: Url,
    api_key: String,
    model: String,
    embedding_model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingObject>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingObject {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<CompletionMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct CompletionMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

impl OpenAiClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .openai_url()
            .map_err(|e| ChatError::Config(e.to_string()))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            api_key: config.openai_api_key.clone(),
            model: config.llm_model.clone(),
            embedding_model: config.openai.embedding_model.clone(),
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    /// Compute the embedding vector for a single text
    #[inline]
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()])?;
        embeddings
            .pop()
            .ok_or_else(|| ChatError::Embedding("Embeddings response was empty".to_string()))
    }

    /// Compute embedding vectors for a batch of texts, in input order
    #[inline]
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Requesting embeddings for {} texts", texts.len());

        let request = EmbeddingsRequest {
            model: self.embedding_model.clone(),
            input: texts.to_vec(),
        };

        let response_text = self.post_json("/v1/embeddings", &request, ChatError::Embedding)?;

        let response: EmbeddingsResponse = serde_json::from_str(&response_text)
            .map_err(|e| ChatError::Embedding(format!("Malformed embeddings response: {}", e)))?;

        if response.data.len() != texts.len() {
            return Err(ChatError::Embedding(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            )));
        }

        let mut data = response.data;
        data.sort_by_key(|item| item.index);

        Ok(data.into_iter().map(|item| item.embedding).collect())
    }

    /// Run a single-turn chat completion and return the model's text
    #[inline]
    pub fn complete(&self, prompt: &str) -> Result<String> {
        debug!("Requesting completion ({} prompt chars)", prompt.len());

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![CompletionMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: 0.0,
        };

        let response_text =
            self.post_json("/v1/chat/completions", &request, ChatError::Completion)?;

        let response: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| ChatError::Completion(format!("Malformed completion response: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::Completion("Completion had no choices".to_string()))?;

        Ok(choice.message.content.trim().to_string())
    }

    fn post_json<T: Serialize>(
        &self,
        path: &str,
        request: &T,
        to_error: fn(String) -> ChatError,
    ) -> Result<String> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| to_error(format!("Failed to build URL for {}: {}", path, e)))?;

        let request_json = serde_json::to_string(request)
            .map_err(|e| to_error(format!("Failed to serialize request: {}", e)))?;

        self.agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| match e {
                ureq::Error::StatusCode(status) => {
                    to_error(format!("OpenAI returned HTTP {} for {}", status, path))
                }
                other => to_error(format!("Request to {} failed: {}", path, other)),
            })
    }
}
