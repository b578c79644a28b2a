//! Session-scoped conversation memory.
//!
//! A [`ConversationStore`] is an append-only message log keyed by an
//! opaque, client-chosen session id. A session exists exactly when at least
//! one message carries its id.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::ChatMessage;
use crate::models::{ConversationMessage, MessageRole, SessionSummary};

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Record a message and bump the session's last-activity marker.
    async fn append(
        &self,
        session_id: &str,
        role: MessageRole,
        message: &str,
    ) -> Result<ConversationMessage>;

    /// The most recent `limit` messages, oldest first. Unknown sessions
    /// yield an empty list.
    async fn history(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationMessage>>;

    /// Remove every message and the activity marker. Returns the number of
    /// messages removed.
    async fn clear(&self, session_id: &str) -> Result<usize>;

    /// Every session that currently has messages, most recently active first.
    async fn sessions(&self) -> Result<Vec<SessionSummary>>;

    async fn session_exists(&self, session_id: &str) -> Result<bool> {
        Ok(self.message_count(session_id).await? > 0)
    }

    async fn message_count(&self, session_id: &str) -> Result<usize>;
}

/// Keep only role and text, in the original order.
pub fn format_history_for_llm(messages: &[ConversationMessage]) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|m| ChatMessage::new(m.role, m.message.clone()))
        .collect()
}

/// The last `max` items, order preserved.
pub fn trim_history<T>(messages: &[T], max: usize) -> &[T] {
    let start = messages.len().saturating_sub(max);
    &messages[start..]
}

/// Render messages as `User: …` / `Assistant: …` paragraphs.
pub fn render_transcript(messages: &[ConversationMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let speaker = match m.role {
                MessageRole::User => "User",
                MessageRole::Assistant => "Assistant",
                MessageRole::System => "System",
            };
            format!("{}: {}", speaker, m.message)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The last `limit` messages of a session rendered with
/// [`render_transcript`].
pub async fn recent_context(
    store: &dyn ConversationStore,
    session_id: &str,
    limit: usize,
) -> Result<String> {
    let messages = store.history(session_id, limit).await?;
    Ok(render_transcript(&messages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(id: i64, role: MessageRole, text: &str) -> ConversationMessage {
        ConversationMessage {
            id,
            session_id: "s".into(),
            role,
            message: text.into(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn trim_keeps_the_tail() {
        let items = [1, 2, 3, 4, 5, 6, 7];
        assert_eq!(trim_history(&items, 5), &[3, 4, 5, 6, 7]);
        assert_eq!(trim_history(&items, 10), &items[..]);
        assert!(trim_history(&items, 0).is_empty());
    }

    #[test]
    fn llm_history_keeps_role_and_text_in_order() {
        let messages = vec![
            message(1, MessageRole::User, "hi"),
            message(2, MessageRole::Assistant, "hello"),
        ];
        let formatted = format_history_for_llm(&messages);
        assert_eq!(formatted.len(), 2);
        assert_eq!(formatted[0].role, MessageRole::User);
        assert_eq!(formatted[1].content, "hello");
    }

    #[test]
    fn transcript_labels_speakers() {
        let messages = vec![
            message(1, MessageRole::User, "What is Rust?"),
            message(2, MessageRole::Assistant, "A language."),
        ];
        assert_eq!(
            render_transcript(&messages),
            "User: What is Rust?\n\nAssistant: A language."
        );
    }
}
