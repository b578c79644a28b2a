//! In-memory [`ConversationStore`].

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{ConversationMessage, MessageRole, SessionSummary};

use super::{trim_history, ConversationStore};

struct SessionLog {
    messages: Vec<ConversationMessage>,
    last_activity: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    next_id: i64,
    sessions: HashMap<String, SessionLog>,
}

#[derive(Default)]
pub struct InMemoryConversationStore {
    state: Mutex<State>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(
        &self,
        session_id: &str,
        role: MessageRole,
        message: &str,
    ) -> Result<ConversationMessage> {
        let mut state = self.state.lock()?;
        state.next_id += 1;
        let id = state.next_id;

        let log = state
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionLog {
                messages: Vec::new(),
                last_activity: Utc::now(),
            });

        // Timestamps never go backwards within a session.
        let now = Utc::now().max(log.last_activity);
        let record = ConversationMessage {
            id,
            session_id: session_id.to_string(),
            role,
            message: message.to_string(),
            timestamp: now,
        };
        log.messages.push(record.clone());
        log.last_activity = now;
        Ok(record)
    }

    async fn history(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationMessage>> {
        let state = self.state.lock()?;
        Ok(state
            .sessions
            .get(session_id)
            .map(|log| trim_history(&log.messages, limit).to_vec())
            .unwrap_or_default())
    }

    async fn clear(&self, session_id: &str) -> Result<usize> {
        let mut state = self.state.lock()?;
        Ok(state
            .sessions
            .remove(session_id)
            .map(|log| log.messages.len())
            .unwrap_or(0))
    }

    async fn sessions(&self) -> Result<Vec<SessionSummary>> {
        let state = self.state.lock()?;
        let mut out: Vec<SessionSummary> = state
            .sessions
            .iter()
            .map(|(id, log)| SessionSummary {
                session_id: id.clone(),
                message_count: log.messages.len(),
                last_activity: log.last_activity,
            })
            .collect();
        out.sort_by(|a, b| {
            b.last_activity
                .cmp(&a.last_activity)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        Ok(out)
    }

    async fn message_count(&self, session_id: &str) -> Result<usize> {
        let state = self.state.lock()?;
        Ok(state
            .sessions
            .get(session_id)
            .map(|log| log.messages.len())
            .unwrap_or(0))
    }
}
