//! `docqa ask`: answer a question against the indexed documents.

use anyhow::Result;

use docqa_core::pipeline::{AskRequest, AskResponse, RetrievalStatus};

use crate::app::AppContext;

pub async fn run_ask(
    app: &AppContext,
    question: &str,
    session: &str,
    document_ids: Vec<String>,
    top_k: Option<usize>,
    json: bool,
) -> Result<()> {
    let request = AskRequest {
        question: question.to_string(),
        session_id: session.to_string(),
        document_ids: if document_ids.is_empty() {
            None
        } else {
            Some(document_ids)
        },
        top_k,
    };

    let response = app.pipeline.ask(request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }
    Ok(())
}

fn print_response(response: &AskResponse) {
    println!("{}", response.answer.trim());
    println!();

    match response.retrieval {
        RetrievalStatus::Degraded => println!("(retrieval failed; answered without context)"),
        RetrievalStatus::Empty => println!("(no relevant context found)"),
        RetrievalStatus::Found => {
            println!("Sources:");
            for (i, source) in response.sources.iter().enumerate() {
                println!(
                    "  {}. {} [chunk {}] (relevance: {:.2})",
                    i + 1,
                    source.document_name,
                    source.chunk_index,
                    source.similarity_score
                );
            }
        }
    }

    if response.low_quality {
        println!("(answer flagged as low quality)");
    }
    println!("session: {}", response.session_id);
}
