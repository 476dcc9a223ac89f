//! One-shot offline ingestion batch: documents + URLs → vector index.

use std::sync::Arc;
use std::time::Instant;

use liveops_assist::config::Settings;
use liveops_assist::embeddings::RigEmbeddingProvider;
use liveops_assist::indexer::IndexWriter;
use liveops_assist::ingestion::{TextSplitter, chunk_pages, ingest};
use liveops_assist::stores::SqliteChunkStore;
use liveops_assist::types::AssistError;
use reqwest::Client;
use rig::prelude::*;
use rig::providers::openai;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AssistError> {
    init_tracing();
    let settings = Settings::from_env();

    if settings.openai_api_key.is_none() {
        return Err(AssistError::Config(
            "OPENAI_API_KEY must be set to embed documents".to_string(),
        ));
    }

    let client = Client::builder()
        .user_agent("liveops-assist-ingestor/0.1")
        .use_rustls_tls()
        .build()?;

    let start = Instant::now();
    println!(
        "Ingesting {} (+ {} URLs)",
        settings.docs_dir.display(),
        settings.source_urls.len()
    );

    let report = ingest(
        &settings.docs_dir,
        &settings.source_urls,
        &settings.accepted_extensions,
        &client,
    )
    .await?;

    for error in &report.errors {
        println!("  ! {error}");
    }
    println!(
        "  loaded {} pages ({} sources failed, {} files skipped)",
        report.pages.len(),
        report.errors.len(),
        report.skipped.len()
    );

    let splitter = TextSplitter::new(settings.chunk_size, settings.chunk_overlap);
    let chunks = chunk_pages(&report.pages, &splitter);
    println!("  split into {} chunks", chunks.len());

    let openai_client = openai::Client::from_env();
    let embedding_model = openai_client.embedding_model(openai::TEXT_EMBEDDING_3_SMALL);
    let store = Arc::new(SqliteChunkStore::open(&settings.vector_db_path, &embedding_model).await?);
    let provider = Arc::new(RigEmbeddingProvider::new(embedding_model));

    let writer = IndexWriter::new(provider, store);
    let summary = writer.write(&chunks).await?;

    println!("\nIngestion complete");
    println!("  chunks written  : {}", summary.chunks_written);
    println!("  sources replaced: {}", summary.sources_replaced);
    println!("  vector database : {}", settings.vector_db_path.display());
    println!("  duration        : {:.1}s", start.elapsed().as_secs_f64());

    if !report.is_clean() {
        println!(
            "\n{} source(s) failed; rerun after fixing them to pick up the rest.",
            report.errors.len()
        );
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
