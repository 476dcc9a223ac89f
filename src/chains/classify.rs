//! Few-shot routing between the document path and the metrics path.

use tracing::debug;

use crate::llm::ChatModel;
use crate::types::AssistError;

/// The two labels the routing model is allowed to produce.
pub const LABEL_RAG: &str = "RAG";
pub const LABEL_SQL: &str = "SQL Query";

const CLASSIFY_PREAMBLE: &str = r#"You are an expert agent that classifies user queries into one of two categories:
- "RAG" if the query is about business documentation, KPIs, definitions or any general information about the game.
- "SQL Query" if the query requires fetching structured data from a database.

Examples:
1. "What is our revenue trend over the last quarter?" -> "SQL Query"
2. "Explain the revenue calculation methodology." -> "RAG"
3. "How many users signed up last week?" -> "SQL Query"
4. "What does churn rate mean?" -> "RAG"
5. "What is DAU?" -> "RAG"
6. "Tell me all the filters in the FTUE dashboard" -> "RAG"

Classify the query you are given. Strictly respond with only "RAG" or "SQL Query", nothing else."#;

/// Where a query should be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryRoute {
    /// Document retrieval path.
    Rag,
    /// Structured-data agent over the daily report table.
    SqlQuery,
}

/// Asks the model for a route. Anything other than the two expected labels
/// is a typed classification error carrying the raw output; the caller
/// decides what to do with an undecidable query, never this function.
pub async fn classify_query(
    model: &dyn ChatModel,
    query: &str,
) -> Result<QueryRoute, AssistError> {
    let raw = model.chat(CLASSIFY_PREAMBLE, &[], query).await?;
    let label = raw.trim().trim_matches('"').trim();
    let route = match label {
        LABEL_RAG => QueryRoute::Rag,
        LABEL_SQL => QueryRoute::SqlQuery,
        _ => return Err(AssistError::Classification(raw)),
    };
    debug!(query, ?route, "query classified");
    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockChatModel;

    #[tokio::test]
    async fn metrics_questions_route_to_sql() {
        let model = MockChatModel::new(["SQL Query"]);
        let route = classify_query(&model, "How many users signed up last week?")
            .await
            .unwrap();
        assert_eq!(route, QueryRoute::SqlQuery);
    }

    #[tokio::test]
    async fn definition_questions_route_to_rag() {
        let model = MockChatModel::new(["RAG"]);
        let route = classify_query(&model, "What does churn rate mean?").await.unwrap();
        assert_eq!(route, QueryRoute::Rag);
    }

    #[tokio::test]
    async fn prompt_carries_the_fixed_few_shot_contract() {
        let model = MockChatModel::new(["RAG"]);
        classify_query(&model, "What is DAU?").await.unwrap();

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        let preamble = &calls[0].preamble;
        assert!(preamble.contains("\"SQL Query\" if the query requires fetching structured data"));
        assert!(preamble.contains("How many users signed up last week?"));
        assert!(preamble.contains("What does churn rate mean?"));
        assert!(preamble.contains("Strictly respond with only \"RAG\" or \"SQL Query\""));
        assert_eq!(calls[0].input, "What is DAU?");
        assert_eq!(calls[0].history_len, 0);
    }

    #[tokio::test]
    async fn quoted_labels_are_accepted() {
        let model = MockChatModel::new(["\"SQL Query\"\n"]);
        let route = classify_query(&model, "DAU by region yesterday").await.unwrap();
        assert_eq!(route, QueryRoute::SqlQuery);
    }

    #[tokio::test]
    async fn unexpected_labels_fail_loudly() {
        let model = MockChatModel::new(["Maybe SQL?"]);
        let err = classify_query(&model, "ambiguous").await.unwrap_err();
        match err {
            AssistError::Classification(raw) => assert_eq!(raw, "Maybe SQL?"),
            other => panic!("expected classification error, got {other:?}"),
        }
    }
}
