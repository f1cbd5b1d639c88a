//! Snowflake executor.
//!
//! Runs SQL against a Snowflake warehouse over its REST API: a
//! login-request with the stored credentials yields a session token, then a
//! query-request executes the statement. Session context (warehouse,
//! database, schema) is established at login.

use super::{ColumnInfo, QueryExecutor, QueryOptions, QueryResult, Row, Value, MAX_ROWS};
use crate::error::{AskdbError, Result};
use crate::store::DataSource;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Request timeout in seconds. The hosting platform's proxy cuts
/// connections at 60s, so we give up just under it.
const REQUEST_TIMEOUT_SECS: u64 = 59;

/// Snowflake connection credentials, as stored on a data source record.
#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeCredentials {
    pub account: String,
    pub username: String,
    pub password: String,
    pub database: String,
    pub schema: String,
    pub warehouse: String,
}

/// Snowflake warehouse executor.
#[derive(Debug, Clone)]
pub struct SnowflakeExecutor {
    credentials: SnowflakeCredentials,
    client: Client,
}

impl SnowflakeExecutor {
    /// Builds an executor from a data source's credentials.
    pub fn from_data_source(data_source: &DataSource) -> Result<Self> {
        let credentials: SnowflakeCredentials =
            serde_json::from_value(data_source.credentials.clone()).map_err(|e| {
                AskdbError::config(format!(
                    "Invalid snowflake credentials on data source {}: {e}",
                    data_source.id
                ))
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AskdbError::warehouse(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            credentials,
            client,
        })
    }

    fn base_url(&self) -> String {
        format!(
            "https://{}.snowflakecomputing.com",
            self.credentials.account
        )
    }

    /// Opens a session and returns its token.
    async fn login(&self) -> Result<String> {
        let url = format!(
            "{}/session/v1/login-request?warehouse={}&databaseName={}&schemaName={}",
            self.base_url(),
            self.credentials.warehouse,
            self.credentials.database,
            self.credentials.schema
        );

        let body = json!({
            "data": {
                "ACCOUNT_NAME": self.credentials.account,
                "LOGIN_NAME": self.credentials.username,
                "PASSWORD": self.credentials.password,
                "CLIENT_APP_ID": "askdb",
                "CLIENT_APP_VERSION": env!("CARGO_PKG_VERSION"),
            }
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| AskdbError::warehouse(format!("Malformed login response: {e}")))?;

        if !login.success {
            return Err(AskdbError::warehouse(format!(
                "Snowflake login failed: {}",
                login.message.unwrap_or_else(|| "unknown error".to_string())
            )));
        }

        login
            .data
            .map(|d| d.token)
            .ok_or_else(|| AskdbError::warehouse("Snowflake login returned no session token"))
    }
}

#[async_trait]
impl QueryExecutor for SnowflakeExecutor {
    async fn run(&self, sql: &str, options: &QueryOptions) -> Result<QueryResult> {
        let token = self.login().await?;
        let start = Instant::now();

        let request_id = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let url = format!(
            "{}/queries/v1/query-request?requestId={request_id:x}",
            self.base_url()
        );

        debug!(allow_cached = options.allow_cached, "snowflake query-request");

        let body = json!({
            "sqlText": sql,
            "parameters": {
                "USE_CACHED_RESULT": options.allow_cached,
            },
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Snowflake Token=\"{token}\""))
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let query: QueryResponse = response
            .json()
            .await
            .map_err(|e| AskdbError::warehouse(format!("Malformed query response: {e}")))?;

        if !query.success {
            return Err(AskdbError::warehouse(format!(
                "Snowflake query failed: {}",
                query.message.unwrap_or_else(|| "unknown error".to_string())
            )));
        }

        let data = query
            .data
            .ok_or_else(|| AskdbError::warehouse("Snowflake query returned no result data"))?;

        let execution_time = start.elapsed();
        Ok(build_result(data, execution_time))
    }
}

fn build_result(data: QueryData, execution_time: Duration) -> QueryResult {
    let columns: Vec<ColumnInfo> = data
        .rowtype
        .iter()
        .map(|col| ColumnInfo::new(&col.name, &col.column_type))
        .collect();

    let total_rows = data.rowset.len();
    let was_truncated = total_rows > MAX_ROWS;
    if was_truncated {
        warn!(
            "Query returned {} rows, truncating to {}",
            total_rows, MAX_ROWS
        );
    }

    let rows: Vec<Row> = data
        .rowset
        .iter()
        .take(MAX_ROWS)
        .map(|raw_row| {
            raw_row
                .iter()
                .zip(&data.rowtype)
                .map(|(raw, col)| convert_value(raw.as_deref(), col))
                .collect()
        })
        .collect();

    let row_count = rows.len();

    QueryResult {
        columns,
        rows,
        execution_time,
        row_count,
        was_truncated,
    }
}

/// Converts a raw rowset value using its column's reported type.
///
/// Snowflake ships every value as a string; `fixed` columns with a scale are
/// decimals, without one they are integers.
fn convert_value(raw: Option<&str>, column: &RowType) -> Value {
    let Some(raw) = raw else {
        return Value::Null;
    };

    match column.column_type.as_str() {
        "fixed" => {
            if column.scale.unwrap_or(0) > 0 {
                raw.parse::<f64>()
                    .map(Value::Float)
                    .unwrap_or_else(|_| Value::String(raw.to_string()))
            } else {
                raw.parse::<i64>()
                    .map(Value::Int)
                    .unwrap_or_else(|_| Value::String(raw.to_string()))
            }
        }
        "real" | "float" | "double" => raw
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        "boolean" => match raw {
            "1" | "true" | "TRUE" => Value::Bool(true),
            "0" | "false" | "FALSE" => Value::Bool(false),
            other => Value::String(other.to_string()),
        },
        _ => Value::String(raw.to_string()),
    }
}

fn map_transport_error(error: reqwest::Error) -> AskdbError {
    if error.is_timeout() {
        AskdbError::warehouse("Snowflake request timed out")
    } else if error.is_connect() {
        AskdbError::warehouse("Failed to connect to Snowflake. Check the account identifier.")
    } else {
        AskdbError::warehouse(format!("Snowflake request failed: {error}"))
    }
}

// Snowflake REST API types

#[derive(Debug, Deserialize)]
struct LoginResponse {
    success: bool,
    message: Option<String>,
    data: Option<LoginData>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    success: bool,
    message: Option<String>,
    data: Option<QueryData>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    rowtype: Vec<RowType>,
    #[serde(default)]
    rowset: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Deserialize)]
struct RowType {
    name: String,
    #[serde(rename = "type")]
    column_type: String,
    #[serde(default)]
    scale: Option<i64>,
}
