//! PostgreSQL executor.
//!
//! Runs SQL against a Postgres warehouse using sqlx, one connection per
//! query. Credentials come from the data source record.

use super::{ColumnInfo, QueryExecutor, QueryOptions, QueryResult, Row, Value, MAX_ROWS};
use crate::error::{AskdbError, Result};
use crate::store::DataSource;
use async_trait::async_trait;
use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column as SqlxColumn, Connection, Row as SqlxRow, TypeInfo};
use std::time::{Duration, Instant};
use tracing::warn;

/// Connection establishment timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Query execution timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

/// Postgres connection credentials, as stored on a data source record.
#[derive(Debug, Clone, Deserialize)]
pub struct PostgresCredentials {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

/// PostgreSQL warehouse executor.
#[derive(Debug, Clone)]
pub struct PostgresExecutor {
    credentials: PostgresCredentials,
}

impl PostgresExecutor {
    /// Builds an executor from a data source's credentials.
    pub fn from_data_source(data_source: &DataSource) -> Result<Self> {
        let credentials: PostgresCredentials =
            serde_json::from_value(data_source.credentials.clone()).map_err(|e| {
                AskdbError::config(format!(
                    "Invalid postgres credentials on data source {}: {e}",
                    data_source.id
                ))
            })?;
        Ok(Self { credentials })
    }

    fn connect_options(&self) -> PgConnectOptions {
        let mut options = PgConnectOptions::new()
            .host(&self.credentials.host)
            .port(self.credentials.port)
            .database(&self.credentials.database);
        if let Some(user) = &self.credentials.user {
            options = options.username(user);
        }
        if let Some(password) = &self.credentials.password {
            options = options.password(password);
        }
        options
    }

    // TODO retry transient connection failures (refused / reset) with backoff
    async fn connect(&self) -> Result<PgConnection> {
        tokio::time::timeout(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            PgConnection::connect_with(&self.connect_options()),
        )
        .await
        .map_err(|_| {
            AskdbError::warehouse(format!(
                "Connection to {}:{} timed out",
                self.credentials.host, self.credentials.port
            ))
        })?
        .map_err(|e| AskdbError::warehouse(map_connection_error(e, &self.credentials)))
    }
}

#[async_trait]
impl QueryExecutor for PostgresExecutor {
    async fn run(&self, sql: &str, _options: &QueryOptions) -> Result<QueryResult> {
        let mut conn = self.connect().await?;
        let start = Instant::now();

        let fetched = tokio::time::timeout(
            Duration::from_secs(QUERY_TIMEOUT_SECS),
            sqlx::query(sql).fetch_all(&mut conn),
        )
        .await
        .map_err(|_| {
            AskdbError::warehouse(format!("Query timed out after {QUERY_TIMEOUT_SECS} seconds"))
        })?
        .map_err(|e| AskdbError::warehouse(format_query_error(e)))?;

        let execution_time = start.elapsed();
        conn.close().await.ok();

        let columns: Vec<ColumnInfo> = fetched
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect()
            })
            .unwrap_or_default();

        let total_rows = fetched.len();
        let was_truncated = total_rows > MAX_ROWS;
        if was_truncated {
            warn!(
                "Query returned {} rows, truncating to {}",
                total_rows, MAX_ROWS
            );
        }

        let rows: Vec<Row> = fetched.iter().take(MAX_ROWS).map(convert_row).collect();
        let row_count = rows.len();

        Ok(QueryResult {
            columns,
            rows,
            execution_time,
            row_count,
            was_truncated,
        })
    }
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Decodes a single column value based on its Postgres type name.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => decode(row.try_get::<Option<bool>, _>(index), Value::Bool),
        "INT2" | "SMALLINT" => decode(row.try_get::<Option<i16>, _>(index), |v| {
            Value::Int(v as i64)
        }),
        "INT4" | "INT" | "INTEGER" => decode(row.try_get::<Option<i32>, _>(index), |v| {
            Value::Int(v as i64)
        }),
        "INT8" | "BIGINT" => decode(row.try_get::<Option<i64>, _>(index), Value::Int),
        "FLOAT4" | "REAL" => decode(row.try_get::<Option<f32>, _>(index), |v| {
            Value::Float(v as f64)
        }),
        "FLOAT8" | "DOUBLE PRECISION" => decode(row.try_get::<Option<f64>, _>(index), Value::Float),
        // Everything else (text, dates, numerics, json) decodes as a string.
        _ => decode(row.try_get::<Option<String>, _>(index), Value::String),
    }
}

fn decode<T>(value: std::result::Result<Option<T>, sqlx::Error>, into: impl Fn(T) -> Value) -> Value {
    value.ok().flatten().map(into).unwrap_or(Value::Null)
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, credentials: &PostgresCredentials) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        format!(
            "Cannot connect to {}:{}. Check that the server is running.",
            credentials.host, credentials.port
        )
    } else if error_str.contains("authentication failed") {
        format!(
            "Authentication failed for user '{}'. Check the data source credentials.",
            credentials.user.as_deref().unwrap_or("unknown")
        )
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        format!("Database '{}' does not exist.", credentials.database)
    } else {
        error.to_string()
    }
}

/// Formats a query error with Postgres detail and hint when available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = format!("ERROR: {}", db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }

    result
}
