use crate::{
    ask::Ask,
    errors::{ChatError, ChatResult},
    types::{Message, Role},
};
use chrono::Utc;
use futures::FutureExt;
use std::{any::Any, collections::HashSet, panic::AssertUnwindSafe, sync::Arc};
use synapse_sdk::{QueryResult, Source};
use tracing::info_span;
use tracing_futures::Instrument;

/// Content of the assistant bubble shown when a question could not be
/// answered.
pub const RETRY_INSTRUCTION: &str =
    "Sorry, I couldn't answer that right now. Please try again in a moment.";

/// An ordered list of messages driven by a query backend.
///
/// `submit` takes `&mut self`, so a conversation cannot have two questions in
/// flight at once.
pub struct Conversation {
    asker: Arc<dyn Ask>,
    messages: Vec<Message>,
    expanded: HashSet<String>,
    next_sequence: u64,
}

impl Conversation {
    pub fn new(asker: Arc<dyn Ask>) -> Self {
        Self {
            asker,
            messages: Vec::new(),
            expanded: HashSet::new(),
            next_sequence: 0,
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Ask `question` and append the exchange.
    ///
    /// Blank questions are ignored and return `None`. Otherwise the user
    /// message is appended, followed by either the answer (with its sources)
    /// or an error bubble; the appended reply is returned.
    pub async fn submit(&mut self, question: &str) -> Option<&Message> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }

        self.push(Role::User, question.to_string(), Vec::new(), false);

        let span = info_span!("synapse_chat.submit", messages = self.messages.len());
        let outcome = ask_guarded(self.asker.as_ref(), question)
            .instrument(span)
            .await;

        match outcome {
            Ok(Some(QueryResult {
                answer, sources, ..
            })) => {
                self.push(Role::Assistant, answer, sources, false);
            }
            Ok(None) => {
                if let Some(error) = self.asker.last_error() {
                    tracing::debug!(code = %error.code, "answer unavailable: {}", error.message);
                }
                self.push(Role::Assistant, RETRY_INSTRUCTION.to_string(), Vec::new(), true);
            }
            Err(error) => {
                tracing::error!("{error}");
                self.push(Role::Assistant, RETRY_INSTRUCTION.to_string(), Vec::new(), true);
            }
        }
        self.messages.last()
    }

    #[must_use]
    pub fn find(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == message_id)
    }

    /// Sources attached to a message, in the order they were received.
    pub fn sources_of(&self, message_id: &str) -> ChatResult<&[Source]> {
        self.find(message_id)
            .map(|message| message.sources.as_slice())
            .ok_or_else(|| ChatError::MessageNotFound(message_id.to_string()))
    }

    /// Flip whether the sources of a message are shown. Returns the new
    /// state.
    pub fn toggle_sources(&mut self, message_id: &str) -> ChatResult<bool> {
        if self.find(message_id).is_none() {
            return Err(ChatError::MessageNotFound(message_id.to_string()));
        }
        if self.expanded.remove(message_id) {
            Ok(false)
        } else {
            self.expanded.insert(message_id.to_string());
            Ok(true)
        }
    }

    #[must_use]
    pub fn is_expanded(&self, message_id: &str) -> bool {
        self.expanded.contains(message_id)
    }

    /// Drop all messages and view state.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.expanded.clear();
    }

    fn push(&mut self, role: Role, content: String, sources: Vec<Source>, is_error: bool) {
        let created_at = Utc::now();
        self.next_sequence += 1;
        let id = format!(
            "msg-{}-{}",
            created_at.timestamp_millis(),
            self.next_sequence
        );
        self.messages.push(Message {
            id,
            role,
            content,
            sources,
            created_at,
            is_error,
        });
    }
}

/// Run the backend call, turning a panic into an error. The backend is
/// expected to report failures as `None`, but a panic must not take the
/// conversation down with it.
async fn ask_guarded(asker: &dyn Ask, question: &str) -> ChatResult<Option<QueryResult>> {
    AssertUnwindSafe(asker.ask(question))
        .catch_unwind()
        .await
        .map_err(|payload| ChatError::BackendPanicked(panic_message(payload.as_ref())))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
