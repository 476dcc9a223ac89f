//! Natural-language queries over the daily report table.
//!
//! The model is prompted with the live schema plus column definitions and
//! must return a bare SQL statement. Before anything touches the database
//! the statement passes a read-only allow-list; generated SQL is never
//! trusted as-is. One repair round feeds an engine error back to the model;
//! after that the agent settles on the fixed "not supported" result.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::llm::ChatModel;
use crate::metrics::MetricsDb;
use crate::types::AssistError;

/// Fixed sentinel returned when no viable query exists.
pub const NOT_SUPPORTED: &str = "Query not supported";

static FORBIDDEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(insert|update|delete|drop|alter|create|replace|truncate|attach|detach|pragma|vacuum|reindex)\b",
    )
    .expect("forbidden keyword regex")
});

const SQL_PREAMBLE_HEADER: &str = r#"You are an expert SQL agent that only generates valid SQLite queries. Return a single well-formed SQL query with no extra text, explanations or comments.

Column definitions:
- calendar_date: the date of the record.
- tier: country tier, one of T1, T2, T3.
- region_s: one of seven regions (European Economic Area & other European countries; North America; Asia & Oceania excluding China; Russia & CIS; LATAM & the Caribbean; Middle East & Africa; China).
- platform_s: the platform the game is played on (iOS, Android).
- daily_active_users: DAU, users active on a given day.
- revenue: Bookings, total revenue generated.
- coda_revenue: revenue specifically from the CODA shop.
- payers: Spenders, users who spend money in the game.
- conversions: users converted from non-spender to spender.
- installs: unique devices the game was installed on.
- register_installs: users who installed and registered.
- registers: users who logged in for the first time.
- reactivation: users returning after 14+ days of inactivity.
- session_hours: total time spent in game across all sessions.
- session_count: number of unique sessions.

Database schema:"#;

const SQL_PREAMBLE_FOOTER: &str = r#"Instructions:
- Generate one valid read-only SQL query for the schema above.
- Do not add explanations, comments or markdown.
- If the question cannot be answered with this table, return exactly:
SELECT 'Query not supported' AS result"#;

/// Plans and executes read-only queries against [`MetricsDb`].
pub struct MetricsAgent {
    model: Arc<dyn ChatModel>,
    db: MetricsDb,
}

impl MetricsAgent {
    pub fn new(model: Arc<dyn ChatModel>, db: MetricsDb) -> Self {
        Self { model, db }
    }

    /// Answers a metrics question, or the [`NOT_SUPPORTED`] sentinel when
    /// no satisfiable query exists. Only infrastructure failures (model or
    /// connection down) surface as errors.
    pub async fn answer(&self, question: &str) -> Result<String, AssistError> {
        let schema = self.db.table_info().await?;
        let preamble = format!("{SQL_PREAMBLE_HEADER}\n{schema}\n\n{SQL_PREAMBLE_FOOTER}");

        let mut prompt = question.to_string();
        for attempt in 0..2 {
            let raw = self.model.chat(&preamble, &[], &prompt).await?;
            let sql = strip_code_fences(&raw);
            debug!(attempt, sql = %sql, "generated sql");

            if sql.contains(NOT_SUPPORTED) {
                return Ok(NOT_SUPPORTED.to_string());
            }
            if let Err(reason) = validate_read_only(&sql) {
                warn!(sql = %sql, reason, "rejected generated sql");
                return Ok(NOT_SUPPORTED.to_string());
            }

            match self.db.run_query(&sql).await {
                Ok(result) if result.is_empty() => {
                    return Ok("No rows matched the query.".to_string());
                }
                Ok(result) => return Ok(result.render()),
                Err(err) if attempt == 0 => {
                    warn!(error = %err, "generated sql failed, asking for a repair");
                    prompt = format!(
                        "{question}\n\nThe previous query failed with this error:\n{err}\n\
                         Return a corrected SQL query."
                    );
                }
                Err(err) => {
                    warn!(error = %err, "repair attempt failed, settling on sentinel");
                    return Ok(NOT_SUPPORTED.to_string());
                }
            }
        }
        Ok(NOT_SUPPORTED.to_string())
    }
}

/// Accepts exactly one `SELECT`/`WITH` statement with no mutating or
/// session-level keywords anywhere in it.
pub fn validate_read_only(sql: &str) -> Result<(), String> {
    let trimmed = sql.trim().trim_end_matches(';').trim();
    if trimmed.is_empty() {
        return Err("empty statement".to_string());
    }
    if trimmed.contains(';') {
        return Err("multiple statements".to_string());
    }
    let head = trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if head != "select" && head != "with" {
        return Err(format!("statement must start with SELECT or WITH, got {head:?}"));
    }
    if let Some(found) = FORBIDDEN.find(trimmed) {
        return Err(format!("forbidden keyword {:?}", found.as_str()));
    }
    Ok(())
}

fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop a language tag like `sql` on the opening fence.
    let inner = match inner.split_once('\n') {
        Some((first_line, rest)) if first_line.trim().eq_ignore_ascii_case("sql") => rest,
        Some((first_line, rest)) if first_line.trim().is_empty() => rest,
        _ => inner,
    };
    inner.trim().to_string()
}
