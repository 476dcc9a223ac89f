//! Query-time behavior with a scripted model: routing, the rewrite no-op,
//! memory discipline and the structured-data path.

use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use liveops_assist::chains::{ConversationalChain, MetricsAgent, NOT_SUPPORTED};
use liveops_assist::embeddings::{MockEmbeddingModel, MockEmbeddingProvider};
use liveops_assist::indexer::IndexWriter;
use liveops_assist::ingestion::{TextSplitter, chunk_pages};
use liveops_assist::llm::MockChatModel;
use liveops_assist::metrics::MetricsDb;
use liveops_assist::retrieval::Retriever;
use liveops_assist::session::{AssistantReply, SessionContext};
use liveops_assist::stores::SqliteChunkStore;
use liveops_assist::types::PageRecord;

async fn seeded_metrics(dir: &Path) -> MetricsDb {
    let db = MetricsDb::open(dir.join("metrics.sqlite")).await.unwrap();
    let csv_path = dir.join("seed.csv");
    let mut seed = std::fs::File::create(&csv_path).unwrap();
    writeln!(
        seed,
        "calendar_date,tier,region_s,platform_s,daily_active_users,revenue,coda_revenue,payers,conversions,installs,register_installs,registers,reactivation,session_hours,session_count"
    )
    .unwrap();
    writeln!(seed, "2025-03-01,T1,North America,iOS,120000,54000.50,1200.00,3100,140,9000,7000,6800,410,81000.25,240000").unwrap();
    writeln!(seed, "2025-03-02,T1,North America,iOS,121500,55900.00,1250.00,3150,150,8800,6900,6700,395,82100.00,242000").unwrap();
    drop(seed);
    db.import_csv(&csv_path).await.unwrap();
    db
}

async fn build_session(dir: &Path, model: Arc<MockChatModel>) -> SessionContext {
    let embedding_model = MockEmbeddingModel::default();
    let store = Arc::new(
        SqliteChunkStore::open(dir.join("chunks.sqlite"), &embedding_model)
            .await
            .unwrap(),
    );
    let provider = Arc::new(MockEmbeddingProvider::new());

    let pages = vec![PageRecord::new(
        "kpi_guide.docx",
        Some(0),
        "Churn rate is the share of players who stop playing over a period. DAU counts users active on a given day.",
    )];
    let splitter = TextSplitter::new(200, 20);
    let chunks = chunk_pages(&pages, &splitter);
    IndexWriter::new(provider.clone(), store.clone())
        .write(&chunks)
        .await
        .unwrap();

    let retriever = Retriever::new(provider, store, 3);
    let chain = ConversationalChain::new(model.clone(), retriever);
    let metrics = MetricsAgent::new(model.clone(), seeded_metrics(dir).await);
    SessionContext::new(5, model, chain, metrics)
}

#[tokio::test]
async fn first_question_skips_the_rewrite_call() {
    let dir = tempfile::tempdir().unwrap();
    let model = Arc::new(MockChatModel::new([
        "RAG",
        "Churn rate is the share of players lost over a period.",
    ]));
    let mut session = build_session(dir.path(), model.clone()).await;

    let reply = session.handle_query("What does churn rate mean?").await.unwrap();
    match reply {
        AssistantReply::Grounded { answer, sources } => {
            assert_eq!(answer, "Churn rate is the share of players lost over a period.");
            assert!(!sources.is_empty());
        }
        other => panic!("expected grounded reply, got {other:?}"),
    }

    // Exactly two model calls: classify, then generate. With no prior
    // turns the rewrite is a no-op that never reaches the model.
    let calls = model.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].preamble.contains("Churn rate is the share of players"));
    assert_eq!(session.memory().load().len(), 1);
}

#[tokio::test]
async fn follow_up_questions_are_rewritten_against_history() {
    let dir = tempfile::tempdir().unwrap();
    let model = Arc::new(MockChatModel::new([
        "RAG",
        "DAU counts users active on a given day.",
        "RAG",
        "How is DAU different from churn rate?",
        "They measure activity and loss respectively.",
    ]));
    let mut session = build_session(dir.path(), model.clone()).await;

    session.handle_query("What is DAU?").await.unwrap();
    session.handle_query("How is it different from churn?").await.unwrap();

    let calls = model.calls();
    assert_eq!(calls.len(), 5);
    // Third call is the rewrite: history present, original follow-up input.
    assert!(calls[3].preamble.contains("standalone question"));
    assert_eq!(calls[3].input, "How is it different from churn?");
    assert_eq!(calls[3].history_len, 1);
    assert_eq!(session.memory().load().len(), 2);
}

#[tokio::test]
async fn metrics_questions_run_sql_and_leave_memory_alone() {
    let dir = tempfile::tempdir().unwrap();
    let model = Arc::new(MockChatModel::new([
        "SQL Query",
        "SELECT COUNT(*) FROM daily_report",
    ]));
    let mut session = build_session(dir.path(), model.clone()).await;

    let reply = session.handle_query("How many daily report rows are loaded?").await.unwrap();
    match reply {
        AssistantReply::Metrics { answer } => assert_eq!(answer, "2"),
        other => panic!("expected metrics reply, got {other:?}"),
    }
    assert!(session.memory().load().is_empty());

    // The SQL prompt carries the live schema and the column glossary.
    let calls = model.calls();
    assert!(calls[1].preamble.contains("daily_report"));
    assert!(calls[1].preamble.contains("daily_active_users"));
    assert!(calls[1].preamble.contains("Bookings"));
}

#[tokio::test]
async fn mutating_sql_is_refused_with_the_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let model = Arc::new(MockChatModel::new(["SQL Query", "DELETE FROM daily_report"]));
    let mut session = build_session(dir.path(), model.clone()).await;

    let reply = session.handle_query("Drop everything").await.unwrap();
    match reply {
        AssistantReply::Metrics { answer } => assert_eq!(answer, NOT_SUPPORTED),
        other => panic!("expected metrics reply, got {other:?}"),
    }

    // The table was never touched.
    let db = MetricsDb::open(dir.path().join("metrics.sqlite")).await.unwrap();
    let result = db.run_query("SELECT COUNT(*) FROM daily_report").await.unwrap();
    assert_eq!(result.render(), "2");
}

#[tokio::test]
async fn a_failed_repair_settles_on_the_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let model = Arc::new(MockChatModel::new([
        "SQL Query",
        "SELECT missing_column FROM daily_report",
        "SELECT still_missing FROM daily_report",
    ]));
    let mut session = build_session(dir.path(), model.clone()).await;

    let reply = session.handle_query("Average of a column that does not exist").await.unwrap();
    match reply {
        AssistantReply::Metrics { answer } => assert_eq!(answer, NOT_SUPPORTED),
        other => panic!("expected metrics reply, got {other:?}"),
    }

    // Second generation call received the engine error for the repair.
    let calls = model.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[2].input.contains("failed with"));
}

#[tokio::test]
async fn a_failed_query_leaves_memory_unmodified() {
    let dir = tempfile::tempdir().unwrap();
    // Only the classifier response is queued; the generation step hits an
    // exhausted mock and errors out.
    let model = Arc::new(MockChatModel::new(["RAG"]));
    let mut session = build_session(dir.path(), model).await;

    let result = session.handle_query("What does churn rate mean?").await;
    assert!(result.is_err());
    assert!(session.memory().load().is_empty());
}

#[tokio::test]
async fn clearing_memory_resets_the_window() {
    let dir = tempfile::tempdir().unwrap();
    let model = Arc::new(MockChatModel::new(["RAG", "An answer."]));
    let mut session = build_session(dir.path(), model).await;

    session.handle_query("What is DAU?").await.unwrap();
    assert_eq!(session.memory().load().len(), 1);
    session.clear_memory();
    assert!(session.memory().load().is_empty());
}
