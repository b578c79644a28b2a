//! Prompt assembly.
//!
//! The message list sent to the model is always: one system instruction,
//! then the most recent prior turns (oldest first), then one user turn that
//! carries the rendered context block and the question.

use crate::conversation::trim_history;
use crate::llm::ChatMessage;
use crate::models::SearchResult;

pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant that answers questions based on provided context.
Rules:
- Answer based on the provided context
- If the context doesn't contain relevant information, say so
- Be concise and accurate
- Cite sources when appropriate
- If you're unsure, acknowledge it";

/// Rendered in place of an empty context block.
pub const NO_CONTEXT: &str = "No relevant context found.";

/// Render retrieved chunks as numbered sources, in the order given.
pub fn format_context(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_CONTEXT.to_string();
    }

    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let name = if r.document_name.is_empty() {
                "Unknown"
            } else {
                r.document_name.as_str()
            };
            format!(
                "[Source {} - {} (relevance: {:.2})]: {}",
                i + 1,
                name,
                r.score,
                r.chunk_text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn user_prompt(question: &str, context: &str) -> String {
    format!(
        "Context:\n{}\n\nQuestion: {}\n\nPlease answer the question based on the context provided above.",
        context, question
    )
}

/// Assemble the full message list. Only the last `max_history` entries of
/// `history` are kept.
pub fn build_messages(
    question: &str,
    context: &str,
    history: &[ChatMessage],
    max_history: usize,
) -> Vec<ChatMessage> {
    let history = trim_history(history, max_history);
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(user_prompt(question, context)));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageRole;

    fn hit(name: &str, score: f32, text: &str) -> SearchResult {
        SearchResult {
            id: "v".into(),
            score,
            document_id: "d".into(),
            document_name: name.into(),
            chunk_index: 0,
            chunk_text: text.into(),
        }
    }

    #[test]
    fn context_lists_numbered_sources() {
        let rendered = format_context(&[
            hit("alpha.txt", 0.8734, "Alpha is a project."),
            hit("", 0.5, "Orphan chunk."),
        ]);
        assert_eq!(
            rendered,
            "[Source 1 - alpha.txt (relevance: 0.87)]: Alpha is a project.\n\n\
             [Source 2 - Unknown (relevance: 0.50)]: Orphan chunk."
        );
    }

    #[test]
    fn empty_context_renders_sentinel() {
        assert_eq!(format_context(&[]), NO_CONTEXT);
    }

    #[test]
    fn messages_are_system_history_user() {
        let history: Vec<ChatMessage> = (0..7)
            .map(|i| ChatMessage::new(MessageRole::User, format!("turn {}", i)))
            .collect();
        let messages = build_messages("Why?", "ctx", &history, 5);

        assert_eq!(messages.len(), 7);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[1].content, "turn 2");
        assert_eq!(messages[5].content, "turn 6");
        let last = &messages[6];
        assert_eq!(last.role, MessageRole::User);
        assert!(last.content.starts_with("Context:\nctx\n\nQuestion: Why?"));
    }

    #[test]
    fn no_history_yields_two_turns() {
        let messages = build_messages("q", NO_CONTEXT, &[], 5);
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains(NO_CONTEXT));
    }
}
