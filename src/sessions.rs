//! `docqa history`, `docqa sessions`, and `docqa clear`.

use anyhow::{bail, Result};

use crate::app::AppContext;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const MAX_HISTORY_LIMIT: usize = 500;

pub async fn run_history(app: &AppContext, session: &str, limit: usize) -> Result<()> {
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        bail!("--limit must be between 1 and {}", MAX_HISTORY_LIMIT);
    }

    let messages = app.pipeline.history(session, limit).await?;
    if messages.is_empty() {
        println!("No messages in session {}.", session);
        return Ok(());
    }

    for message in &messages {
        println!(
            "[{}] {}: {}",
            message.timestamp.format("%Y-%m-%d %H:%M:%S"),
            message.role,
            message.message
        );
    }
    Ok(())
}

/// All sessions, or one session's summary when `session` is given.
pub async fn run_sessions(app: &AppContext, session: Option<&str>) -> Result<()> {
    let sessions = match session {
        Some(id) => vec![app.pipeline.session(id).await?],
        None => app.pipeline.sessions().await?,
    };

    if sessions.is_empty() {
        println!("No sessions.");
        return Ok(());
    }

    for s in &sessions {
        println!(
            "{}  {} messages  last active {}",
            s.session_id,
            s.message_count,
            s.last_activity.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

pub async fn run_clear(app: &AppContext, session: &str) -> Result<()> {
    let removed = app.pipeline.clear_session(session).await?;
    println!("Deleted {} messages from session {}", removed, session);
    Ok(())
}
