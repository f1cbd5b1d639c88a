//! Data source records.
//!
//! A data source is a configured warehouse connection: a backend kind plus a
//! JSON credentials blob whose shape each executor deserializes for itself.

use crate::error::{AskdbError, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;

/// Supported warehouse backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    #[default]
    Postgres,
    Snowflake,
    /// Deterministic in-process backend for tests and demos.
    Mock,
}

impl DataSourceKind {
    /// Returns the kind as a string for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Snowflake => "snowflake",
            Self::Mock => "mock",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "snowflake" => Some(Self::Snowflake),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A configured warehouse connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub id: i64,
    pub name: String,
    pub kind: DataSourceKind,
    /// Backend-specific connection credentials.
    pub credentials: serde_json::Value,
    pub created_at: String,
}

#[derive(Debug, Clone, FromRow)]
struct DataSourceRow {
    id: i64,
    name: String,
    kind: String,
    credentials: String,
    created_at: String,
}

impl DataSourceRow {
    fn into_record(self) -> Result<DataSource> {
        let kind = DataSourceKind::parse(&self.kind).ok_or_else(|| {
            AskdbError::persistence(format!("Unknown data source kind: {}", self.kind))
        })?;
        let credentials = serde_json::from_str(&self.credentials).map_err(|e| {
            AskdbError::persistence(format!(
                "Corrupt credentials for data source {}: {e}",
                self.id
            ))
        })?;
        Ok(DataSource {
            id: self.id,
            name: self.name,
            kind,
            credentials,
            created_at: self.created_at,
        })
    }
}

/// Creates a data source and returns the stored record.
pub async fn create_data_source(
    pool: &SqlitePool,
    name: &str,
    kind: DataSourceKind,
    credentials: &serde_json::Value,
) -> Result<DataSource> {
    let result = sqlx::query("INSERT INTO data_sources (name, kind, credentials) VALUES (?, ?, ?)")
        .bind(name)
        .bind(kind.as_str())
        .bind(credentials.to_string())
        .execute(pool)
        .await
        .map_err(|e| AskdbError::persistence(format!("Failed to create data source: {e}")))?;

    get_data_source(pool, result.last_insert_rowid()).await
}

/// Fetches a data source by id.
pub async fn get_data_source(pool: &SqlitePool, id: i64) -> Result<DataSource> {
    let row = sqlx::query_as::<_, DataSourceRow>(
        "SELECT id, name, kind, credentials, created_at FROM data_sources WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AskdbError::persistence(format!("Failed to fetch data source: {e}")))?
    .ok_or_else(|| AskdbError::not_found(format!("data source {id}")))?;

    row.into_record()
}

/// Lists all data sources.
pub async fn list_data_sources(pool: &SqlitePool) -> Result<Vec<DataSource>> {
    let rows = sqlx::query_as::<_, DataSourceRow>(
        "SELECT id, name, kind, credentials, created_at FROM data_sources ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| AskdbError::persistence(format!("Failed to list data sources: {e}")))?;

    rows.into_iter().map(DataSourceRow::into_record).collect()
}
