//! Environment-driven configuration.
//!
//! Every knob has a code default so the crate runs out of the box against
//! local paths; `.env` files are honored via `dotenvy`.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Runtime settings collected once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Required for the live OpenAI providers; tests run on mocks without it.
    pub openai_api_key: Option<String>,
    pub chat_model: String,
    pub temperature: f64,
    pub max_output_tokens: u64,
    /// Chunk ceiling in characters.
    pub chunk_size: usize,
    /// Characters repeated between consecutive chunks of the same page.
    pub chunk_overlap: usize,
    pub retrieval_top_k: usize,
    /// Most recent exchanges kept in conversation memory.
    pub memory_window: usize,
    /// File extensions the ingestion scan accepts; everything else is skipped.
    pub accepted_extensions: Vec<String>,
    pub docs_dir: PathBuf,
    pub source_urls: Vec<String>,
    pub vector_db_path: PathBuf,
    pub metrics_db_path: PathBuf,
    /// Optional CSV used to seed the daily_report table.
    pub metrics_seed_csv: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            chat_model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_output_tokens: 500,
            chunk_size: 500,
            chunk_overlap: 50,
            retrieval_top_k: 3,
            memory_window: 5,
            accepted_extensions: vec!["docx".to_string(), "pdf".to_string()],
            docs_dir: PathBuf::from("./docs"),
            source_urls: Vec::new(),
            vector_db_path: PathBuf::from("./liveops_chunks.sqlite"),
            metrics_db_path: PathBuf::from("./daily_summary.sqlite"),
            metrics_seed_csv: None,
        }
    }
}

impl Settings {
    /// Loads settings from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Settings::default();

        Self {
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|v| !v.is_empty()),
            chat_model: env_or("LIVEOPS_CHAT_MODEL", defaults.chat_model),
            temperature: env_parse("LIVEOPS_TEMPERATURE", defaults.temperature),
            max_output_tokens: env_parse("LIVEOPS_MAX_TOKENS", defaults.max_output_tokens),
            chunk_size: env_parse("LIVEOPS_CHUNK_SIZE", defaults.chunk_size),
            chunk_overlap: env_parse("LIVEOPS_CHUNK_OVERLAP", defaults.chunk_overlap),
            retrieval_top_k: env_parse("LIVEOPS_TOP_K", defaults.retrieval_top_k),
            memory_window: env_parse("LIVEOPS_MEMORY_WINDOW", defaults.memory_window),
            accepted_extensions: env_list("LIVEOPS_EXTENSIONS")
                .unwrap_or(defaults.accepted_extensions),
            docs_dir: env::var("LIVEOPS_DOCS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.docs_dir),
            source_urls: env_list("LIVEOPS_SOURCE_URLS").unwrap_or_default(),
            vector_db_path: env::var("LIVEOPS_VECTOR_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.vector_db_path),
            metrics_db_path: env::var("LIVEOPS_METRICS_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.metrics_db_path),
            metrics_seed_csv: env::var("LIVEOPS_METRICS_SEED").ok().map(PathBuf::from),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_list(key: &str) -> Option<Vec<String>> {
    let raw = env::var(key).ok()?;
    let items: Vec<String> = raw
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();
    if items.is_empty() { None } else { Some(items) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_knobs() {
        let settings = Settings::default();
        assert_eq!(settings.chunk_size, 500);
        assert_eq!(settings.chunk_overlap, 50);
        assert_eq!(settings.retrieval_top_k, 3);
        assert_eq!(settings.memory_window, 5);
        assert_eq!(settings.accepted_extensions, vec!["docx", "pdf"]);
    }
}
