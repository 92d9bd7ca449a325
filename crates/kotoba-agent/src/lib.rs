// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation orchestration for the Kotoba assistant.
//!
//! The [`Orchestrator`] is the central coordinator for one turn: it loads
//! prior thread state, optionally classifies the utterance's emotion,
//! optionally retrieves knowledge base context, composes the full prompt,
//! invokes the language model, and appends the exchange using the state
//! store's compare-and-append primitive. It is constructed once at process
//! start with injected dependencies and shared by reference with every
//! transport; it holds no per-thread state of its own.

pub mod emotion;
pub mod prompt;
pub mod runner;

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use kotoba_core::KotobaError;
use kotoba_core::traits::ProviderAdapter;
use kotoba_core::types::{ChatMessage, EmotionRecord, ProviderMessage, ProviderRequest, Role};
use kotoba_knowledge::{Passage, Retriever};
use kotoba_storage::Database;
use kotoba_storage::queries::{messages, threads};

pub use emotion::EmotionAnalyzer;
pub use runner::ChannelRunner;

/// Reply text used when the language model is unavailable. The transport
/// still receives a well-formed reply object.
pub const DEGRADED_REPLY: &str = "I encountered an error processing your request.";

/// Bounded retries for compare-and-append before surfacing the conflict.
const MAX_APPEND_RETRIES: usize = 3;

/// Keywords that opt a query into retrieval even without the explicit flag.
const RECENCY_KEYWORDS: &[&str] = &["latest", "today", "current", "recent", "right now"];

/// One inbound conversation turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Thread to continue.
    pub thread_id: String,
    /// Channel the turn arrived on ("api", "ws", "discord", "cli").
    pub channel: String,
    /// The user's new utterance.
    pub utterance: String,
    /// Attach an emotion classification to the reply.
    pub want_emotion: bool,
    /// Include knowledge base context regardless of the recency heuristic.
    pub want_retrieval: bool,
}

/// The reply object returned to every transport.
///
/// Always well formed: a failed completion or persistence problem shows up
/// in `error` alongside a usable `message`, never as a missing reply.
#[derive(Debug, Clone)]
pub struct TurnReply {
    /// Assistant reply text.
    pub message: String,
    /// Emotion classification, when requested.
    pub emotion: Option<EmotionRecord>,
    /// Error detail when the primary path degraded.
    pub error: Option<String>,
    /// Number of context passages used for this reply.
    pub context_passages: usize,
}

/// Central coordinator for conversation turns.
pub struct Orchestrator {
    db: Database,
    provider: Arc<dyn ProviderAdapter>,
    retriever: Option<Arc<Retriever>>,
    emotion: Option<Arc<EmotionAnalyzer>>,
    persona: String,
    model: String,
    max_tokens: u32,
}

impl Orchestrator {
    /// Creates an orchestrator with injected dependencies.
    ///
    /// `retriever` and `emotion` are optional capabilities: turns degrade
    /// gracefully when they are absent or failing.
    pub fn new(
        db: Database,
        provider: Arc<dyn ProviderAdapter>,
        retriever: Option<Arc<Retriever>>,
        emotion: Option<Arc<EmotionAnalyzer>>,
        persona: Option<String>,
        model: String,
        max_tokens: u32,
    ) -> Self {
        Self {
            db,
            provider,
            retriever,
            emotion,
            persona: persona.unwrap_or_else(|| prompt::DEFAULT_PERSONA.to_string()),
            model,
            max_tokens,
        }
    }

    /// Handle one conversation turn. Never returns an error: every failure
    /// mode produces a well-formed [`TurnReply`].
    pub async fn handle_turn(&self, request: TurnRequest) -> TurnReply {
        let thread_id = request.thread_id.as_str();

        if let Err(e) = threads::ensure_thread(&self.db, thread_id, &request.channel).await {
            warn!(thread_id, error = %e, "state store unavailable");
            return TurnReply {
                message: DEGRADED_REPLY.to_string(),
                emotion: None,
                error: Some(e.to_string()),
                context_passages: 0,
            };
        }

        let history = match messages::get_messages_for_thread(&self.db, thread_id).await {
            Ok(history) => history,
            Err(e) => {
                warn!(thread_id, error = %e, "failed to load history");
                return TurnReply {
                    message: DEGRADED_REPLY.to_string(),
                    emotion: None,
                    error: Some(e.to_string()),
                    context_passages: 0,
                };
            }
        };
        let observed_len = history.len();

        // Optional enrichment: emotion. Never blocks the primary answer.
        let emotion = if request.want_emotion {
            match &self.emotion {
                Some(analyzer) => Some(analyzer.analyze(&request.utterance).await),
                None => Some(EmotionRecord::default()),
            }
        } else {
            None
        };

        // Optional enrichment: retrieval. Empty on failure, never blocks.
        let passages = self.maybe_retrieve(&request).await;

        let system_prompt =
            prompt::compose_system_prompt(&self.persona, &passages, emotion.as_ref());

        let mut provider_messages: Vec<ProviderMessage> = history
            .iter()
            .map(|m| ProviderMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect();
        provider_messages.push(ProviderMessage::user(request.utterance.clone()));

        let completion = self
            .provider
            .complete(ProviderRequest {
                model: self.model.clone(),
                system_prompt: Some(system_prompt),
                messages: provider_messages,
                max_tokens: self.max_tokens,
            })
            .await;

        let (reply_text, mut error) = match completion {
            Ok(response) => {
                debug!(
                    thread_id,
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "completion received"
                );
                (response.content, None)
            }
            Err(e) => {
                warn!(thread_id, error = %e, "completion failed, sending degraded reply");
                (DEGRADED_REPLY.to_string(), Some(e.to_string()))
            }
        };

        // Persist the exchange. The completion is never recomputed here;
        // only the bookkeeping retries on a lost compare-and-append race.
        let user_msg = make_message(thread_id, Role::User, &request.utterance);
        let reply_msg = make_message(thread_id, Role::Assistant, &reply_text);

        match self.append_with_retry(user_msg, observed_len).await {
            Ok(len_after_user) => {
                if let Err(e) = self.append_with_retry(reply_msg, len_after_user).await {
                    warn!(thread_id, error = %e, "failed to persist assistant reply");
                    error.get_or_insert_with(|| e.to_string());
                }
            }
            Err(e) => {
                warn!(thread_id, error = %e, "failed to persist user message");
                error.get_or_insert_with(|| e.to_string());
            }
        }

        info!(
            thread_id,
            context_passages = passages.len(),
            degraded = error.is_some(),
            "turn complete"
        );

        TurnReply {
            message: reply_text,
            emotion,
            error,
            context_passages: passages.len(),
        }
    }

    /// Load a thread's history.
    pub async fn history(&self, thread_id: &str) -> Result<Vec<ChatMessage>, KotobaError> {
        messages::get_messages_for_thread(&self.db, thread_id).await
    }

    /// Clear a thread's history. Explicit, user/operator triggered only.
    pub async fn reset_thread(&self, thread_id: &str) -> Result<(), KotobaError> {
        info!(thread_id, "resetting thread history");
        messages::reset_thread(&self.db, thread_id).await
    }

    /// Run retrieval when requested explicitly or triggered by the recency
    /// heuristic. Degrades to no context on any failure.
    async fn maybe_retrieve(&self, request: &TurnRequest) -> Vec<Passage> {
        let wanted = request.want_retrieval || wants_recent_context(&request.utterance);
        if !wanted {
            return vec![];
        }
        match &self.retriever {
            Some(retriever) => retriever.retrieve(&request.utterance).await,
            None => vec![],
        }
    }

    /// Compare-and-append with a bounded retry loop.
    ///
    /// On a conflict the history length is re-observed from the error and
    /// the append retried, up to [`MAX_APPEND_RETRIES`] times. Returns the
    /// history length after the successful append.
    async fn append_with_retry(
        &self,
        msg: ChatMessage,
        mut expected_len: usize,
    ) -> Result<usize, KotobaError> {
        let mut last_err = None;
        for attempt in 0..MAX_APPEND_RETRIES {
            match messages::append_message_atomic(&self.db, expected_len, &msg).await {
                Ok(()) => return Ok(expected_len + 1),
                Err(KotobaError::ConcurrentModification {
                    thread_id,
                    expected,
                    actual,
                }) => {
                    debug!(
                        thread_id = thread_id.as_str(),
                        attempt, expected, actual, "append lost race, retrying"
                    );
                    expected_len = actual;
                    last_err = Some(KotobaError::ConcurrentModification {
                        thread_id,
                        expected,
                        actual,
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            KotobaError::Internal("append retry loop exited without error".to_string())
        }))
    }
}

/// Returns true when the utterance asks about something time-sensitive.
fn wants_recent_context(utterance: &str) -> bool {
    let lowered = utterance.to_lowercase();
    RECENCY_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

fn make_message(thread_id: &str, role: Role, content: &str) -> ChatMessage {
    ChatMessage {
        id: Uuid::new_v4().to_string(),
        thread_id: thread_id.to_string(),
        role,
        content: content.to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}
