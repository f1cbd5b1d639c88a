//! Mock execution backends for testing.
//!
//! The mock executor returns one fixed row so result caches have
//! deterministic contents in tests without a live warehouse. The recording
//! and failing runners let tests observe the SQL handed to the adapter and
//! exercise the error paths.

use super::{ColumnInfo, QueryExecutor, QueryOptions, QueryResult, QueryRunner, Value};
use crate::error::{AskdbError, Result};
use crate::store::DataSource;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// A mock warehouse backend.
///
/// Always returns a single `{"count": 100}` row, regardless of the SQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockExecutor;

impl MockExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl QueryExecutor for MockExecutor {
    async fn run(&self, _sql: &str, _options: &QueryOptions) -> Result<QueryResult> {
        Ok(QueryResult::with_data(
            vec![ColumnInfo::new("count", "int8")],
            vec![vec![Value::Int(100)]],
        )
        .with_execution_time(Duration::from_millis(1)))
    }
}

/// One call observed by a [`RecordingRunner`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub data_source_id: i64,
    pub sql: String,
    pub allow_cached: bool,
}

/// A runner that records every call and answers with fixed rows.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    rows: Vec<serde_json::Value>,
    calls: Mutex<Vec<RecordedQuery>>,
}

impl RecordingRunner {
    /// Creates a recording runner answering with the standard mock row.
    pub fn new() -> Self {
        Self {
            rows: vec![serde_json::json!({"count": 100})],
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Overrides the rows returned from every call.
    pub fn with_rows(mut self, rows: Vec<serde_json::Value>) -> Self {
        self.rows = rows;
        self
    }

    /// Returns all recorded calls.
    pub fn calls(&self) -> Vec<RecordedQuery> {
        self.calls.lock().expect("recording lock poisoned").clone()
    }

    /// Returns the SQL of the most recent call, if any.
    pub fn last_sql(&self) -> Option<String> {
        self.calls
            .lock()
            .expect("recording lock poisoned")
            .last()
            .map(|call| call.sql.clone())
    }
}

#[async_trait]
impl QueryRunner for RecordingRunner {
    async fn run(
        &self,
        data_source: &DataSource,
        sql: &str,
        options: &QueryOptions,
    ) -> Result<Vec<serde_json::Value>> {
        self.calls
            .lock()
            .expect("recording lock poisoned")
            .push(RecordedQuery {
                data_source_id: data_source.id,
                sql: sql.to_string(),
                allow_cached: options.allow_cached,
            });
        Ok(self.rows.clone())
    }
}

/// A runner whose every call fails with a warehouse error.
#[derive(Debug, Clone)]
pub struct FailingRunner {
    message: String,
}

impl FailingRunner {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for FailingRunner {
    fn default() -> Self {
        Self::new("relation \"nowhere\" does not exist")
    }
}

#[async_trait]
impl QueryRunner for FailingRunner {
    async fn run(
        &self,
        _data_source: &DataSource,
        _sql: &str,
        _options: &QueryOptions,
    ) -> Result<Vec<serde_json::Value>> {
        Err(AskdbError::warehouse(self.message.clone()))
    }
}
