//! `docqa ingest`: extract a file, then chunk, embed, and index it.

use anyhow::{Context, Result};
use std::path::Path;

use docqa_core::models::ChunkingStrategy;
use docqa_core::pipeline::IngestReport;

use crate::app::AppContext;
use crate::extract::extract_file;

/// Ingest one file. `name` overrides the stored filename; `strategy`
/// overrides `[chunking].default_strategy`.
pub async fn ingest_path(
    app: &AppContext,
    path: &Path,
    name: Option<&str>,
    strategy: Option<&str>,
) -> Result<IngestReport> {
    let strategy = strategy
        .map(str::parse::<ChunkingStrategy>)
        .transpose()?;

    let filename = match name {
        Some(name) => name.to_string(),
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
    };

    let owned = path.to_path_buf();
    let extracted = tokio::task::spawn_blocking(move || extract_file(&owned, None))
        .await
        .context("extraction task failed")??;

    let report = app
        .pipeline
        .ingest_text(&filename, extracted.file_size, &extracted.text, strategy)
        .await?;
    Ok(report)
}

pub async fn run_ingest(
    app: &AppContext,
    path: &Path,
    name: Option<&str>,
    strategy: Option<&str>,
) -> Result<()> {
    let report = ingest_path(app, path, name, strategy).await?;

    println!("Ingested {}", report.filename);
    println!("  document id:  {}", report.document_id);
    println!("  chunks:       {}", report.chunks_created);
    println!("  strategy:     {}", report.chunking_strategy);
    println!("  characters:   {}", report.total_characters);
    Ok(())
}
