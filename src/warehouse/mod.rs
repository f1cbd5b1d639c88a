//! Query execution adapter.
//!
//! Provides a trait-based interface for running SQL against a warehouse,
//! with one executor per backend selected by the data source's kind
//! discriminator. Lifecycle services hold the higher-level [`QueryRunner`]
//! seam so tests can observe or fail executions without a live warehouse.

mod mock;
mod postgres;
mod snowflake;
mod types;

pub use mock::{FailingRunner, MockExecutor, RecordedQuery, RecordingRunner};
pub use postgres::{PostgresCredentials, PostgresExecutor};
pub use snowflake::{SnowflakeCredentials, SnowflakeExecutor};
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::config::{Config, ExecutionMode};
use crate::error::Result;
use crate::store::{DataSource, DataSourceKind};
use crate::translate::NlServiceClient;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Maximum rows returned from a single query.
pub const MAX_ROWS: usize = 1000;

/// Per-query execution options.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    /// Allow the warehouse to serve a cached result for this statement.
    /// Honored by Snowflake (`USE_CACHED_RESULT`); Postgres and the mock
    /// ignore it.
    pub allow_cached: bool,
}

impl QueryOptions {
    /// Options for cache-friendly execution (evaluation workflows).
    pub fn cached() -> Self {
        Self { allow_cached: true }
    }
}

/// Trait defining the interface for warehouse query executors.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Executes a SQL statement and returns the results.
    async fn run(&self, sql: &str, options: &QueryOptions) -> Result<QueryResult>;
}

/// Creates an executor for the given data source.
///
/// This is the central factory keyed on the backend discriminator.
pub fn executor_for(data_source: &DataSource) -> Result<Box<dyn QueryExecutor>> {
    match data_source.kind {
        DataSourceKind::Postgres => Ok(Box::new(PostgresExecutor::from_data_source(data_source)?)),
        DataSourceKind::Snowflake => {
            Ok(Box::new(SnowflakeExecutor::from_data_source(data_source)?))
        }
        DataSourceKind::Mock => Ok(Box::new(MockExecutor::new())),
    }
}

/// The seam the lifecycle services execute SQL through.
///
/// Implementations resolve the data source to a backend and return rows as
/// JSON objects, the shape that gets cached and shipped to the UI.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    async fn run(
        &self,
        data_source: &DataSource,
        sql: &str,
        options: &QueryOptions,
    ) -> Result<Vec<serde_json::Value>>;
}

/// Executes queries in-process via the per-backend executors.
///
/// A fresh connection is made per query; the original query runners did the
/// same and nothing here is hot enough to justify a pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct WarehouseRunner;

impl WarehouseRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl QueryRunner for WarehouseRunner {
    async fn run(
        &self,
        data_source: &DataSource,
        sql: &str,
        options: &QueryOptions,
    ) -> Result<Vec<serde_json::Value>> {
        debug!(
            data_source_id = data_source.id,
            kind = %data_source.kind,
            "executing warehouse query"
        );
        let executor = executor_for(data_source)?;
        let result = executor.run(sql, options).await?;
        Ok(result.into_json_rows())
    }
}

/// Proxies execution through the NL-to-SQL service's `/query` endpoint.
///
/// The service sits next to the warehouse and keeps its own statement cache,
/// which `QueryOptions::allow_cached` opts into.
pub struct ServiceRunner {
    client: Arc<NlServiceClient>,
}

impl ServiceRunner {
    pub fn new(client: Arc<NlServiceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueryRunner for ServiceRunner {
    async fn run(
        &self,
        data_source: &DataSource,
        sql: &str,
        options: &QueryOptions,
    ) -> Result<Vec<serde_json::Value>> {
        self.client
            .run_query(data_source.id, sql, options.allow_cached)
            .await
    }
}

/// Builds the query runner selected by configuration.
pub fn runner_for(config: &Config) -> Result<Arc<dyn QueryRunner>> {
    match config.warehouse.execution {
        ExecutionMode::Direct => Ok(Arc::new(WarehouseRunner::new())),
        ExecutionMode::Service => {
            let base_url = config.translator_base_url()?;
            let client = NlServiceClient::new(base_url, config.translator.timeout_secs)?;
            Ok(Arc::new(ServiceRunner::new(Arc::new(client))))
        }
    }
}
