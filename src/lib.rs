//! ```text
//! docs dir + URL list ──► ingestion::loaders ──► normalize ──► PageRecord
//!                                                     │
//!                          ingestion::splitter ◄──────┘
//!                                  │
//!                                  ▼
//!                             ChunkRecord ──► indexer ──► stores::sqlite
//!                                                              │
//! user query ──► chains::classify ─┬─► chains::answer ◄── retrieval ◄──┘
//!                                  │        (rewrite → retrieve → generate)
//!                                  └─► chains::sql_agent ──► metrics::MetricsDb
//!
//! session::SessionContext threads memory through the answer path.
//! ```
//!
pub mod chains;
pub mod config;
pub mod embeddings;
pub mod indexer;
pub mod ingestion;
pub mod llm;
pub mod memory;
pub mod metrics;
pub mod retrieval;
pub mod session;
pub mod stores;
pub mod types;

pub use chains::{ConversationalChain, MetricsAgent, NO_ANSWER, NOT_SUPPORTED, QueryRoute};
pub use config::Settings;
pub use ingestion::{IngestionReport, TextSplitter, chunk_pages, ingest, normalize_text};
pub use memory::{ConversationMemory, Turn};
pub use session::{AssistantReply, SessionContext};
pub use types::{AssistError, ChunkRecord, PageRecord};
