//! Retrieval-augmented answering with history-aware question rewriting.

use std::sync::Arc;

use tracing::debug;

use crate::llm::ChatModel;
use crate::memory::Turn;
use crate::retrieval::{RetrievedChunk, Retriever};
use crate::types::AssistError;

/// Fixed disengagement string the model is pinned to when the retrieved
/// context cannot support an answer.
pub const NO_ANSWER: &str = "The required information is not available.";

const REWRITE_PREAMBLE: &str = "Given a chat history and the latest user question, \
which might reference context in the chat history, formulate a standalone question \
which can be understood without the chat history. Do NOT answer the question, \
just reformulate it if needed and otherwise return it as is.";

const ANSWER_GUIDELINES: &str = r#"You are an assistant answering questions about a mobile game's business and product documentation.

Guidelines:
- Always use the retrieved documents below to answer.
- If the required information is not available, respond with exactly: "The required information is not available."
- Engage in normal conversation, but do not answer beyond the retrieved information.
- Keep answers concise unless the user asks for a detailed response.

The documentation distinguishes game types (Multiplayer, Battle Royale, Zombies), the game modes inside each type, the maps they run on, and the KPIs used to measure them (DAU, Bookings, Spenders, Conversion Rate and the rest of the daily report)."#;

/// Everything produced for one answered query.
#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub answer: String,
    /// The question actually used for retrieval, post-rewrite.
    pub standalone_question: String,
    pub sources: Vec<RetrievedChunk>,
}

/// Composes rewrite, retrieval and grounded generation over external calls.
pub struct ConversationalChain {
    model: Arc<dyn ChatModel>,
    retriever: Retriever,
}

impl ConversationalChain {
    pub fn new(model: Arc<dyn ChatModel>, retriever: Retriever) -> Self {
        Self { model, retriever }
    }

    /// Answers one query against the index, threading the history through
    /// both the rewrite and the generation step. Memory is not touched
    /// here; the caller saves the exchange once this returns Ok.
    pub async fn ask(&self, history: &[Turn], input: &str) -> Result<AnswerOutcome, AssistError> {
        let standalone_question = self.rewrite(history, input).await?;
        let sources = self.retriever.retrieve(&standalone_question).await?;
        debug!(
            standalone = %standalone_question,
            retrieved = sources.len(),
            "context assembled"
        );

        let preamble = format!(
            "{ANSWER_GUIDELINES}\n\nContext:\n{}",
            format_context(&sources)
        );
        let answer = self.model.chat(&preamble, history, input).await?;

        Ok(AnswerOutcome {
            answer,
            standalone_question,
            sources,
        })
    }

    /// A question asked with no history is already standalone; the model is
    /// only consulted when there are prior turns to resolve against.
    async fn rewrite(&self, history: &[Turn], input: &str) -> Result<String, AssistError> {
        if history.is_empty() {
            return Ok(input.to_string());
        }
        self.model.chat(REWRITE_PREAMBLE, history, input).await
    }
}

fn format_context(sources: &[RetrievedChunk]) -> String {
    if sources.is_empty() {
        return "(no matching documentation was retrieved)".to_string();
    }
    sources
        .iter()
        .map(|chunk| match chunk.page_number {
            Some(page) => format!("[{} p.{}] {}", chunk.source, page, chunk.content),
            None => format!("[{}] {}", chunk.source, chunk.content),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_lines_carry_provenance() {
        let sources = vec![RetrievedChunk {
            content: "Bookings track gross revenue.".to_string(),
            source: "kpi_guide.pdf".to_string(),
            page_number: Some(4),
            score: 0.91,
        }];
        let context = format_context(&sources);
        assert!(context.contains("[kpi_guide.pdf p.4]"));
        assert!(context.contains("Bookings track gross revenue."));
    }

    #[test]
    fn empty_retrieval_is_stated_not_omitted() {
        assert!(format_context(&[]).contains("no matching documentation"));
    }
}
