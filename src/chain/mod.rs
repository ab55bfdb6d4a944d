// Retrieval chain
// Condenses a follow-up question against the chat history, retrieves the
// nearest document chunks, and generates a grounded answer with source
// attribution.

mod prompts;

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;

use itertools::Itertools;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::elastic::{ChatMessage, ElasticClient, RetrievedChunk, Role, VectorStore};
use crate::openai::OpenAiClient;
use crate::Result;

pub use prompts::FALLBACK_ANSWER;

/// A generated answer together with the distinct documents it drew from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatAnswer {
    pub answer: String,
    /// Distinct source file names, lexicographically sorted
    pub sources: Vec<String>,
}

impl ChatAnswer {
    /// The answer as shown to the user, with an attribution line when any
    /// sources contributed
    #[inline]
    pub fn display_text(&self) -> String {
        if self.sources.is_empty() {
            self.answer.clone()
        } else {
            format!(
                "{}\n\nSources: {}",
                self.answer,
                self.sources.iter().join("; ")
            )
        }
    }
}

/// Condense, retrieve, generate, attribute
pub struct RetrievalChain {
    openai: OpenAiClient,
    store: VectorStore,
    top_k: usize,
}

impl RetrievalChain {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let openai = OpenAiClient::new(config)?;
        let elastic = ElasticClient::new(config)?;
        let store = VectorStore::new(elastic, &config.index_name);

        Ok(Self {
            openai,
            store,
            top_k: config.chat.top_k,
        })
    }

    /// Answer `query` against the vector index, using `history` to resolve
    /// follow-up phrasing.
    ///
    /// When retrieval yields no chunks the fallback answer is returned
    /// directly, without calling the model.
    #[inline]
    pub fn answer(
        &self,
        query: &str,
        history: &[ChatMessage],
        query_id: Uuid,
    ) -> Result<ChatAnswer> {
        let history_text = format_chat_history(history);

        let condensed = if history.is_empty() {
            query.to_string()
        } else {
            let prompt = prompts::render_rephrase_prompt(&history_text, query);
            let standalone = self.openai.complete(&prompt)?;
            info!("Condensed question for query {}: {}", query_id, standalone);
            standalone
        };

        let embedding = self.openai.embed(&condensed)?;
        let chunks = self.store.search(&embedding, self.top_k)?;
        debug!("Retrieved {} chunks for query {}", chunks.len(), query_id);

        if chunks.is_empty() {
            return Ok(ChatAnswer {
                answer: FALLBACK_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let context = format_docs(&chunks);
        let prompt = prompts::render_answer_prompt(&context, &history_text, query);
        let answer = self.openai.complete(&prompt)?;

        Ok(ChatAnswer {
            answer,
            sources: collect_sources(&chunks),
        })
    }
}

/// Wrap each chunk in a `<doc id='N'>` block so the model can cite positions
fn format_docs(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("<doc id='{}'>{}</doc>", i, chunk.content))
        .join("\n")
}

fn format_chat_history(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|message| match message.role {
            Role::User => format!("Human: {}", message.content),
            Role::Assistant => format!("Assistant: {}", message.content),
        })
        .join("\n")
}

fn collect_sources(chunks: &[RetrievedChunk]) -> Vec<String> {
    chunks
        .iter()
        .map(|chunk| chunk.source.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
