//! Query-time orchestration.
//!
//! * [`classify`] — routes a raw query to the document or metrics path.
//! * [`answer`] — history-aware rewrite → retrieve → grounded generation.
//! * [`sql_agent`] — natural language → validated read-only SQL → result.

pub mod answer;
pub mod classify;
pub mod sql_agent;

pub use answer::{AnswerOutcome, ConversationalChain, NO_ANSWER};
pub use classify::{QueryRoute, classify_query};
pub use sql_agent::{MetricsAgent, NOT_SUPPORTED};
