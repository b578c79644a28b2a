//! `docqa documents`: list, inspect, and delete ingested documents.

use anyhow::Result;

use crate::app::AppContext;

pub async fn run_list(app: &AppContext, offset: usize, limit: usize) -> Result<()> {
    let page = app.pipeline.list_documents(offset, limit).await?;

    if page.documents.is_empty() {
        println!("No documents.");
        return Ok(());
    }

    for doc in &page.documents {
        println!(
            "{}  {}  ({} chunks, {}, {} bytes)  {}",
            doc.id,
            doc.filename,
            doc.chunk_count,
            doc.chunking_strategy,
            doc.file_size,
            doc.uploaded_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!();
    println!(
        "Showing {}-{} of {}",
        offset + 1,
        offset + page.documents.len(),
        page.total
    );
    Ok(())
}

pub async fn run_show(app: &AppContext, id: &str) -> Result<()> {
    let doc = app.pipeline.get_document(id).await?;

    println!("--- Document ---");
    println!("id:           {}", doc.id);
    println!("filename:     {}", doc.filename);
    println!("file_size:    {}", doc.file_size);
    println!("strategy:     {}", doc.chunking_strategy);
    println!("chunks:       {}", doc.chunk_count);
    println!("uploaded_at:  {}", doc.uploaded_at.to_rfc3339());
    Ok(())
}

pub async fn run_chunks(app: &AppContext, id: &str) -> Result<()> {
    let chunks = app.pipeline.document_chunks(id).await?;

    for chunk in &chunks {
        println!("--- chunk {} ---", chunk.chunk_index);
        println!("{}", chunk.text);
    }
    println!();
    println!("{} chunks", chunks.len());
    Ok(())
}

pub async fn run_delete(app: &AppContext, id: &str) -> Result<()> {
    let report = app.pipeline.delete_document(id).await?;
    println!(
        "Deleted {} ({}); removed {} vectors",
        report.filename, report.document_id, report.vectors_removed
    );
    Ok(())
}
