// Session manager
// Owns the single live conversation: its id, its history store, and its
// retrieval chain. Resets tear the conversation down and start a fresh one.


use tracing::{error, info};
use uuid::Uuid;

use crate::chain::{FALLBACK_ANSWER, RetrievalChain};
use crate::config::Config;
use crate::elastic::{ChatHistory, ElasticClient, Role};
use crate::Result;

/// Reserved input that resets the conversation instead of being answered
pub const RESET_COMMAND: &str = "new conversation";
/// Reply returned after a successful reset
pub const RESET_CONFIRMATION: &str = "Conversation reset successfully.";

/// One live conversation, from start to terminate
pub struct Session {
    config: Config,
    session_id: Uuid,
    history: ChatHistory,
    chain: RetrievalChain,
}

impl Session {
    /// Start a fresh session with a new id, history store, and chain
    #[inline]
    pub fn start(config: &Config) -> Result<Self> {
        let session_id = Uuid::new_v4();
        let elastic = ElasticClient::new(config)?;
        let history = ChatHistory::new(elastic, session_id);
        let chain = RetrievalChain::new(config)?;

        info!("Starting session {}", session_id);

        Ok(Self {
            config: config.clone(),
            session_id,
            history,
            chain,
        })
    }

    #[inline]
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Whether `text` is the reserved reset phrase, ignoring case and
    /// surrounding whitespace
    #[inline]
    #[must_use]
    pub fn is_reset_command(text: &str) -> bool {
        text.trim().eq_ignore_ascii_case(RESET_COMMAND)
    }

    /// Handle one user input: either a reset or a question for the chain
    #[inline]
    pub fn handle(&mut self, text: &str) -> Result<String> {
        if Self::is_reset_command(text) {
            self.reset()?;
            Ok(RESET_CONFIRMATION.to_string())
        } else {
            Ok(self.process(text))
        }
    }

    /// Terminate the current conversation and start a new one in place
    #[inline]
    pub fn reset(&mut self) -> Result<()> {
        self.terminate()?;
        let config = self.config.clone();
        *self = Self::start(&config)?;
        Ok(())
    }

    /// Delete the session's history store. Safe to call more than once.
    #[inline]
    pub fn terminate(&self) -> Result<()> {
        self.history.delete()
    }

    /// Run a query through the chain. Any failure is logged with the query's
    /// correlation id and surfaces to the user as the fallback answer.
    fn process(&self, query: &str) -> String {
        let query_id = Uuid::new_v4();
        info!(
            "Received query {} in session {}: {}",
            query_id, self.session_id, query
        );

        match self.try_process(query, query_id) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to process query {}: {:#}", query_id, e);
                FALLBACK_ANSWER.to_string()
            }
        }
    }

    fn try_process(&self, query: &str, query_id: Uuid) -> Result<String> {
        let history = self.history.load()?;
        let answer = self.chain.answer(query, &history, query_id)?;

        // The attribution line is display-only; the stored history keeps the
        // bare answer so it can be fed back into later prompts.
        self.history.append(Role::User, query)?;
        self.history.append(Role::Assistant, &answer.answer)?;

        Ok(answer.display_text())
    }
}
