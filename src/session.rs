//! Per-session request handling.
//!
//! All mutable state for one user lives in a [`SessionContext`] passed into
//! each request; nothing is process-wide. One query runs start-to-finish
//! before the next; memory is appended only after a grounded answer
//! succeeds, so a failed query leaves the window exactly as it was.

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::chains::{ConversationalChain, MetricsAgent, QueryRoute, classify_query};
use crate::llm::ChatModel;
use crate::memory::ConversationMemory;
use crate::retrieval::RetrievedChunk;
use crate::types::AssistError;

/// What a handled query produced, by path.
#[derive(Debug, Clone)]
pub enum AssistantReply {
    /// Answer grounded in retrieved documentation.
    Grounded {
        answer: String,
        sources: Vec<RetrievedChunk>,
    },
    /// Result of the structured-data path.
    Metrics { answer: String },
}

impl AssistantReply {
    pub fn answer(&self) -> &str {
        match self {
            AssistantReply::Grounded { answer, .. } => answer,
            AssistantReply::Metrics { answer } => answer,
        }
    }
}

pub struct SessionContext {
    id: Uuid,
    memory: ConversationMemory,
    router: Arc<dyn ChatModel>,
    chain: ConversationalChain,
    metrics: MetricsAgent,
}

impl SessionContext {
    pub fn new(
        memory_window: usize,
        router: Arc<dyn ChatModel>,
        chain: ConversationalChain,
        metrics: MetricsAgent,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            memory: ConversationMemory::new(memory_window),
            router,
            chain,
            metrics,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Routes and answers one query.
    #[instrument(skip(self, input), fields(session = %self.id))]
    pub async fn handle_query(&mut self, input: &str) -> Result<AssistantReply, AssistError> {
        match classify_query(self.router.as_ref(), input).await? {
            QueryRoute::Rag => {
                let outcome = self.chain.ask(self.memory.load(), input).await?;
                self.memory.save(input, &outcome.answer);
                info!(sources = outcome.sources.len(), "answered from documentation");
                Ok(AssistantReply::Grounded {
                    answer: outcome.answer,
                    sources: outcome.sources,
                })
            }
            QueryRoute::SqlQuery => {
                let answer = self.metrics.answer(input).await?;
                info!("answered from daily report");
                Ok(AssistantReply::Metrics { answer })
            }
        }
    }

    pub fn clear_memory(&mut self) {
        self.memory.clear();
    }
}
