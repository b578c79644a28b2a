use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use docqa_core::conversation::ConversationStore;
use docqa_core::models::{ConversationMessage, MessageRole, SessionSummary};
use docqa_core::{RagError, Result};

use super::{format_ts, parse_ts};

/// Conversation log in `conversations`, with one activity row per session in
/// `conversation_sessions`.
#[derive(Clone)]
pub struct SqliteConversationStore {
    pool: SqlitePool,
}

impl SqliteConversationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn message_from_row(row: &SqliteRow) -> Result<ConversationMessage> {
    let role: String = row.get("role");
    let timestamp: String = row.get("timestamp");
    Ok(ConversationMessage {
        id: row.get("id"),
        session_id: row.get("session_id"),
        role: role.parse::<MessageRole>()?,
        message: row.get("message"),
        timestamp: parse_ts(&timestamp)?,
    })
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn append(
        &self,
        session_id: &str,
        role: MessageRole,
        message: &str,
    ) -> Result<ConversationMessage> {
        let db_err = |e: sqlx::Error| RagError::database("add_message", e);
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // The upsert must be the first statement: the transaction holds the
        // write lock before it reads anything. Timestamps never go backwards
        // within a session.
        let stamp: String = sqlx::query_scalar(
            r#"
            INSERT INTO conversation_sessions (session_id, last_activity) VALUES (?, ?)
            ON CONFLICT(session_id) DO UPDATE
                SET last_activity = MAX(last_activity, excluded.last_activity)
            RETURNING last_activity
            "#,
        )
        .bind(session_id)
        .bind(format_ts(&Utc::now()))
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        let now = parse_ts(&stamp)?;

        let result = sqlx::query(
            "INSERT INTO conversations (session_id, role, message, timestamp) VALUES (?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(role.as_str())
        .bind(message)
        .bind(&stamp)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        Ok(ConversationMessage {
            id: result.last_insert_rowid(),
            session_id: session_id.to_string(),
            role,
            message: message.to_string(),
            timestamp: now,
        })
    }

    async fn history(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, role, message, timestamp
            FROM conversations
            WHERE session_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(session_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RagError::database("get_history", e))?;

        let mut messages = rows
            .iter()
            .map(message_from_row)
            .collect::<Result<Vec<_>>>()?;
        messages.reverse();
        Ok(messages)
    }

    async fn clear(&self, session_id: &str) -> Result<usize> {
        let db_err = |e: sqlx::Error| RagError::database("clear_session", e);
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let removed = sqlx::query("DELETE FROM conversations WHERE session_id = ?")
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?
            .rows_affected();

        sqlx::query("DELETE FROM conversation_sessions WHERE session_id = ?")
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(removed as usize)
    }

    async fn sessions(&self) -> Result<Vec<SessionSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT s.session_id AS session_id,
                   s.last_activity AS last_activity,
                   COUNT(c.id) AS message_count
            FROM conversation_sessions s
            JOIN conversations c ON c.session_id = s.session_id
            GROUP BY s.session_id, s.last_activity
            ORDER BY s.last_activity DESC, s.session_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RagError::database("get_all_sessions", e))?;

        rows.iter()
            .map(|row| {
                let last_activity: String = row.get("last_activity");
                let count: i64 = row.get("message_count");
                Ok(SessionSummary {
                    session_id: row.get("session_id"),
                    message_count: count as usize,
                    last_activity: parse_ts(&last_activity)?,
                })
            })
            .collect()
    }

    async fn message_count(&self, session_id: &str) -> Result<usize> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM conversations WHERE session_id = ?")
                .bind(session_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| RagError::database("message_count", e))?;
        Ok(count as usize)
    }
}
