//! Read-mostly store for the `daily_report` metrics table.

use std::path::Path;

use serde::Deserialize;
use tokio_rusqlite::types::Value;
use tokio_rusqlite::{Connection, ToSql};
use tracing::info;

use crate::types::AssistError;

const DAILY_REPORT_DDL: &str = "CREATE TABLE IF NOT EXISTS daily_report (
    calendar_date DATE NOT NULL,
    tier TEXT,
    region_s TEXT,
    platform_s TEXT,
    daily_active_users INTEGER,
    revenue REAL,
    coda_revenue REAL,
    payers INTEGER,
    conversions INTEGER,
    installs INTEGER,
    register_installs INTEGER,
    registers INTEGER,
    reactivation INTEGER,
    session_hours REAL,
    session_count INTEGER
)";

/// One row of the seed CSV; headers match the column names.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyRow {
    pub calendar_date: String,
    pub tier: Option<String>,
    pub region_s: Option<String>,
    pub platform_s: Option<String>,
    pub daily_active_users: Option<i64>,
    pub revenue: Option<f64>,
    pub coda_revenue: Option<f64>,
    pub payers: Option<i64>,
    pub conversions: Option<i64>,
    pub installs: Option<i64>,
    pub register_installs: Option<i64>,
    pub registers: Option<i64>,
    pub reactivation: Option<i64>,
    pub session_hours: Option<f64>,
    pub session_count: Option<i64>,
}

/// Columnar result of an ad-hoc read query.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Plain-text rendering: header line, then one pipe-joined line per row.
    /// A single-cell result collapses to just the value.
    pub fn render(&self) -> String {
        if self.rows.len() == 1 && self.rows[0].len() == 1 {
            return self.rows[0][0].clone();
        }
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(self.columns.join(" | "));
        for row in &self.rows {
            lines.push(row.join(" | "));
        }
        lines.join("\n")
    }
}

/// Connection owner for the metrics database.
#[derive(Clone)]
pub struct MetricsDb {
    conn: Connection,
}

impl MetricsDb {
    /// Opens (creating if needed) the database and ensures the schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AssistError> {
        let conn = Connection::open(path)
            .await
            .map_err(|err| AssistError::Metrics(err.to_string()))?;
        conn.call(|conn| {
            conn.execute(DAILY_REPORT_DDL, [])
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
            Ok(())
        })
        .await
        .map_err(|err| AssistError::Metrics(err.to_string()))?;
        Ok(Self { conn })
    }

    /// Loads the seed CSV into `daily_report`. Returns rows inserted.
    pub async fn import_csv(&self, path: &Path) -> Result<usize, AssistError> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|err| AssistError::Metrics(format!("{}: {err}", path.display())))?;
        let mut rows = Vec::new();
        for record in reader.deserialize::<DailyRow>() {
            rows.push(record.map_err(|err| AssistError::Metrics(err.to_string()))?);
        }

        let inserted = rows.len();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(tokio_rusqlite::Error::Rusqlite)?;
                {
                    let mut stmt = tx
                        .prepare(
                            "INSERT INTO daily_report (calendar_date, tier, region_s, platform_s, \
                             daily_active_users, revenue, coda_revenue, payers, conversions, \
                             installs, register_installs, registers, reactivation, session_hours, \
                             session_count) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                        )
                        .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    for row in &rows {
                        stmt.execute(
                            [
                                &row.calendar_date as &dyn ToSql,
                                &row.tier,
                                &row.region_s,
                                &row.platform_s,
                                &row.daily_active_users,
                                &row.revenue,
                                &row.coda_revenue,
                                &row.payers,
                                &row.conversions,
                                &row.installs,
                                &row.register_installs,
                                &row.registers,
                                &row.reactivation,
                                &row.session_hours,
                                &row.session_count,
                            ]
                            .as_slice(),
                        )
                        .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    }
                }
                tx.commit().map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(())
            })
            .await
            .map_err(|err| AssistError::Metrics(err.to_string()))?;

        info!(inserted, path = %path.display(), "metrics seed loaded");
        Ok(inserted)
    }

    /// The live DDL of `daily_report`, for schema-aware prompting.
    pub async fn table_info(&self) -> Result<String, AssistError> {
        self.conn
            .call(|conn| {
                conn.query_row(
                    "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = 'daily_report'",
                    [],
                    |row| row.get::<_, String>(0),
                )
                .map_err(tokio_rusqlite::Error::Rusqlite)
            })
            .await
            .map_err(|err| AssistError::Metrics(err.to_string()))
    }

    /// Executes an already-validated read query and stringifies the result.
    pub async fn run_query(&self, sql: &str) -> Result<QueryResult, AssistError> {
        let sql = sql.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(tokio_rusqlite::Error::Rusqlite)?;
                let columns: Vec<String> =
                    stmt.column_names().iter().map(|name| name.to_string()).collect();
                let column_count = columns.len();

                let mut rows = stmt.query([]).map_err(tokio_rusqlite::Error::Rusqlite)?;
                let mut collected = Vec::new();
                while let Some(row) = rows.next().map_err(tokio_rusqlite::Error::Rusqlite)? {
                    let mut rendered = Vec::with_capacity(column_count);
                    for index in 0..column_count {
                        let value: Value =
                            row.get(index).map_err(tokio_rusqlite::Error::Rusqlite)?;
                        rendered.push(render_value(value));
                    }
                    collected.push(rendered);
                }
                Ok(QueryResult {
                    columns,
                    rows: collected,
                })
            })
            .await
            .map_err(|err| AssistError::Metrics(err.to_string()))
    }
}

fn render_value(value: Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(number) => number.to_string(),
        Value::Real(number) => number.to_string(),
        Value::Text(text) => text,
        Value::Blob(bytes) => format!("<{} bytes>", bytes.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn schema_and_seed_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("metrics.sqlite");
        let csv_path = dir.path().join("seed.csv");

        let mut seed = std::fs::File::create(&csv_path).unwrap();
        writeln!(
            seed,
            "calendar_date,tier,region_s,platform_s,daily_active_users,revenue,coda_revenue,payers,conversions,installs,register_installs,registers,reactivation,session_hours,session_count"
        )
        .unwrap();
        writeln!(
            seed,
            "2025-03-01,T1,North America,iOS,120000,54000.50,1200.00,3100,140,9000,7000,6800,410,81000.25,240000"
        )
        .unwrap();
        writeln!(
            seed,
            "2025-03-01,T2,LATAM & the Caribbean,Android,98000,21000.00,,2100,90,12000,9100,8800,380,64000.00,198000"
        )
        .unwrap();
        drop(seed);

        let db = MetricsDb::open(&db_path).await.unwrap();
        let inserted = db.import_csv(&csv_path).await.unwrap();
        assert_eq!(inserted, 2);

        let result = db
            .run_query("SELECT COUNT(*) FROM daily_report")
            .await
            .unwrap();
        assert_eq!(result.render(), "2");

        let result = db
            .run_query(
                "SELECT tier, daily_active_users FROM daily_report ORDER BY daily_active_users DESC",
            )
            .await
            .unwrap();
        assert_eq!(result.columns, vec!["tier", "daily_active_users"]);
        assert_eq!(result.rows[0], vec!["T1", "120000"]);

        let info = db.table_info().await.unwrap();
        assert!(info.contains("daily_report"));
        assert!(info.contains("reactivation"));
    }
}
