//! SQLite-backed chunk store with vector search via `sqlite-vec`.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::Once;

use async_trait::async_trait;
use rig::OneOrMany;
use rig::embeddings::{Embedding, EmbeddingModel};
use rig_sqlite::{Column, ColumnValue, SqliteVectorStore, SqliteVectorStoreTable};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{Connection, ffi};

use super::VectorBackend;
use crate::types::{AssistError, ChunkRecord};

/// One persisted chunk row. `page_number` is stored as text so the absent
/// case survives the round trip; `chunk_index` preserves split order within
/// a source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredChunk {
    pub id: String,
    pub source: String,
    #[serde(deserialize_with = "deserialize_page_number")]
    pub page_number: Option<u32>,
    #[serde(deserialize_with = "deserialize_chunk_index")]
    pub chunk_index: usize,
    pub content: String,
}

impl StoredChunk {
    /// Derives the stable row id: `source#p<page>#c<index>`. Re-ingesting a
    /// source therefore lands on the same ids instead of accumulating
    /// duplicates.
    pub fn derive_id(source: &str, page_number: Option<u32>, chunk_index: usize) -> String {
        match page_number {
            Some(page) => format!("{source}#p{page}#c{chunk_index}"),
            None => format!("{source}#p-#c{chunk_index}"),
        }
    }

    pub fn from_record(record: &ChunkRecord, chunk_index: usize) -> Self {
        Self {
            id: Self::derive_id(&record.source, record.page_number, chunk_index),
            source: record.source.clone(),
            page_number: record.page_number,
            chunk_index,
            content: record.chunk_text.clone(),
        }
    }
}

impl SqliteVectorStoreTable for StoredChunk {
    fn name() -> &'static str {
        "chunks"
    }

    fn schema() -> Vec<Column> {
        vec![
            Column::new("id", "TEXT PRIMARY KEY"),
            Column::new("source", "TEXT").indexed(),
            Column::new("page_number", "TEXT"),
            Column::new("chunk_index", "TEXT"),
            Column::new("content", "TEXT"),
        ]
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn column_values(&self) -> Vec<(&'static str, Box<dyn ColumnValue>)> {
        vec![
            ("id", Box::new(self.id.clone())),
            ("source", Box::new(self.source.clone())),
            ("page_number", Box::new(page_number_text(self.page_number))),
            ("chunk_index", Box::new(self.chunk_index.to_string())),
            ("content", Box::new(self.content.clone())),
        ]
    }
}

fn page_number_text(page_number: Option<u32>) -> String {
    page_number.map(|page| page.to_string()).unwrap_or_default()
}

fn parse_page_number(text: &str) -> Option<u32> {
    text.parse::<u32>().ok()
}

fn deserialize_page_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(number) => Ok(number.as_u64().map(|n| n as u32)),
        serde_json::Value::String(text) => Ok(parse_page_number(&text)),
        other => Err(de::Error::custom(format!(
            "unexpected page_number representation: {other}"
        ))),
    }
}

fn deserialize_chunk_index<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(u64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Num(value) => usize::try_from(value)
            .map_err(|_| de::Error::custom(format!("chunk_index {value} does not fit in usize"))),
        Repr::Text(text) => text.parse::<usize>().map_err(|err| {
            de::Error::custom(format!("unable to parse chunk_index '{text}': {err}"))
        }),
    }
}

#[derive(Clone)]
pub struct SqliteChunkStore<E>
where
    E: EmbeddingModel + 'static,
{
    inner: SqliteVectorStore<E, StoredChunk>,
    /// Separate handle for direct SQL not covered by rig-sqlite; a clone of
    /// the connection the inner store uses.
    conn: Connection,
}

impl<E> SqliteChunkStore<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    pub async fn open(path: impl AsRef<Path>, model: &E) -> Result<Self, AssistError> {
        Self::register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| AssistError::Storage(err.to_string()))?;
        conn.call(|conn| {
            let result = conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0));
            match result {
                Ok(_) => Ok(()),
                Err(err) => Err(tokio_rusqlite::Error::Rusqlite(err)),
            }
        })
        .await
        .map_err(|err| AssistError::Storage(err.to_string()))?;
        let conn_for_queries = conn.clone();
        let store = SqliteVectorStore::new(conn, model)
            .await
            .map_err(|err| AssistError::Storage(err.to_string()))?;
        Ok(Self {
            inner: store,
            conn: conn_for_queries,
        })
    }

    fn register_sqlite_vec() -> Result<(), AssistError> {
        use std::sync::Mutex;

        static INIT: Once = Once::new();
        static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

        INIT.call_once(|| {
            let result = unsafe {
                type SqliteExtensionInit = unsafe extern "C" fn(
                    *mut ffi::sqlite3,
                    *mut *mut c_char,
                    *const ffi::sqlite3_api_routines,
                ) -> i32;

                let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
                let init_fn: SqliteExtensionInit =
                    transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
                let rc = ffi::sqlite3_auto_extension(Some(init_fn));
                if rc != 0 {
                    Err(format!(
                        "failed to register sqlite-vec extension (code {rc})"
                    ))
                } else {
                    Ok(())
                }
            };
            *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
        });

        INIT_RESULT
            .lock()
            .expect("init result mutex poisoned")
            .clone()
            .expect("init was called but result not set")
            .map_err(AssistError::Storage)
    }

    /// Direct connection for queries rig-sqlite does not cover.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl<E> VectorBackend for SqliteChunkStore<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    async fn add_chunks(&self, documents: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), AssistError> {
        if documents.is_empty() {
            return Ok(());
        }
        let mut rows = Vec::with_capacity(documents.len());
        for (chunk, embedding) in documents {
            let converted: Vec<f64> = embedding.into_iter().map(|value| value as f64).collect();
            let embed = Embedding {
                document: chunk.content.clone(),
                vec: converted,
            };
            rows.push((chunk, OneOrMany::one(embed)));
        }
        self.inner
            .add_rows(rows)
            .await
            .map_err(|err| AssistError::Storage(err.to_string()))?;
        Ok(())
    }

    async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<(StoredChunk, f32)>, AssistError> {
        let embedding_json = serde_json::to_string(query_embedding)
            .map_err(|err| AssistError::Storage(err.to_string()))?;
        let conn = self.connection();

        conn.call(move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT c.id, c.source, c.page_number, c.chunk_index, c.content, \
                     vec_distance_cosine(e.embedding, vec_f32(?)) as distance \
                     FROM chunks c \
                     JOIN chunks_embeddings e ON e.rowid = c.rowid \
                     ORDER BY distance ASC \
                     LIMIT {top_k}"
                ))
                .map_err(tokio_rusqlite::Error::Rusqlite)?;

            let rows = stmt
                .query_map([&embedding_json], |row| {
                    let chunk = StoredChunk {
                        id: row.get(0)?,
                        source: row.get(1)?,
                        page_number: parse_page_number(&row.get::<_, String>(2)?),
                        chunk_index: row.get::<_, String>(3)?.parse().unwrap_or(0),
                        content: row.get(4)?,
                    };
                    let distance: f32 = row.get(5)?;
                    // Cosine distance to similarity.
                    Ok((chunk, 1.0 - distance))
                })
                .map_err(tokio_rusqlite::Error::Rusqlite)?;

            let mut results = Vec::new();
            for row in rows {
                results.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
            }
            Ok(results)
        })
        .await
        .map_err(|err| AssistError::Storage(err.to_string()))
    }

    async fn delete_chunks_by_source(&self, source: &str) -> Result<usize, AssistError> {
        let source = source.to_string();
        let conn = self.connection();

        conn.call(move |conn| {
            // Embeddings first while the chunk rowids still exist.
            conn.execute(
                "DELETE FROM chunks_embeddings WHERE rowid IN \
                 (SELECT rowid FROM chunks WHERE source = ?)",
                [&source],
            )
            .map_err(tokio_rusqlite::Error::Rusqlite)?;
            let deleted = conn
                .execute("DELETE FROM chunks WHERE source = ?", [&source])
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
            Ok(deleted)
        })
        .await
        .map_err(|err| AssistError::Storage(err.to_string()))
    }

    async fn count(&self) -> Result<usize, AssistError> {
        let conn = self.connection();

        conn.call(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
            Ok(count as usize)
        })
        .await
        .map_err(|err| AssistError::Storage(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_ids_are_stable_and_distinct() {
        assert_eq!(
            StoredChunk::derive_id("guide.pdf", Some(2), 0),
            "guide.pdf#p2#c0"
        );
        assert_eq!(StoredChunk::derive_id("notes.docx", None, 3), "notes.docx#p-#c3");
        assert_ne!(
            StoredChunk::derive_id("guide.pdf", Some(2), 0),
            StoredChunk::derive_id("guide.pdf", Some(2), 1)
        );
    }

    #[test]
    fn page_number_round_trips_through_text() {
        assert_eq!(parse_page_number(&page_number_text(Some(7))), Some(7));
        assert_eq!(parse_page_number(&page_number_text(None)), None);
    }
}
