//! Interactive query loop over the ingested index and the daily report.
//!
//! Commands: `:clear` resets conversation memory, `:quit` exits. Every
//! error is caught at this level and reported alongside a generic failure
//! line; the session itself never dies on a failed query.

use std::sync::Arc;

use liveops_assist::chains::{ConversationalChain, MetricsAgent};
use liveops_assist::config::Settings;
use liveops_assist::embeddings::RigEmbeddingProvider;
use liveops_assist::llm::RigChatModel;
use liveops_assist::metrics::MetricsDb;
use liveops_assist::retrieval::Retriever;
use liveops_assist::session::{AssistantReply, SessionContext};
use liveops_assist::stores::SqliteChunkStore;
use liveops_assist::types::AssistError;
use rig::prelude::*;
use rig::providers::openai;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AssistError> {
    init_tracing();
    let settings = Settings::from_env();

    let mut session = build_session(&settings).await?;
    println!("liveops-assist ready (session {})", session.id());
    println!("ask about the documentation or the daily report; :clear resets, :quit exits");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        match input {
            ":quit" | ":q" => break,
            ":clear" => {
                session.clear_memory();
                println!("memory cleared");
                continue;
            }
            _ => {}
        }

        match session.handle_query(input).await {
            Ok(AssistantReply::Grounded { answer, sources }) => {
                println!("{answer}");
                for chunk in &sources {
                    match chunk.page_number {
                        Some(page) => println!("  — {} p.{}", chunk.source, page),
                        None => println!("  — {}", chunk.source),
                    }
                }
            }
            Ok(AssistantReply::Metrics { answer }) => println!("{answer}"),
            Err(err) => {
                // The session survives; show what actually went wrong.
                println!("Something went wrong handling that query.");
                println!("  {err}");
            }
        }
    }

    Ok(())
}

async fn build_session(settings: &Settings) -> Result<SessionContext, AssistError> {
    if settings.openai_api_key.is_none() {
        return Err(AssistError::Config(
            "OPENAI_API_KEY must be set to answer queries".to_string(),
        ));
    }

    let openai_client = openai::Client::from_env();
    let embedding_model = openai_client.embedding_model(openai::TEXT_EMBEDDING_3_SMALL);
    let store = Arc::new(SqliteChunkStore::open(&settings.vector_db_path, &embedding_model).await?);
    let provider = Arc::new(RigEmbeddingProvider::new(embedding_model));
    let retriever = Retriever::new(provider, store, settings.retrieval_top_k);

    let chat_model = Arc::new(RigChatModel::from_settings(settings)?);
    let chain = ConversationalChain::new(chat_model.clone(), retriever);

    let metrics_db = MetricsDb::open(&settings.metrics_db_path).await?;
    if let Some(seed) = &settings.metrics_seed_csv {
        metrics_db.import_csv(seed).await?;
    }
    let metrics = MetricsAgent::new(chat_model.clone(), metrics_db);

    Ok(SessionContext::new(
        settings.memory_window,
        chat_model,
        chain,
        metrics,
    ))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
