//! HTTP client for the NL-to-SQL translation service.
//!
//! The service exposes two JSON endpoints: `POST /question` translates a
//! natural-language question into SQL, and `POST /query` executes SQL
//! against the warehouse it fronts (with an opt-in statement cache).

use crate::error::{AskdbError, Result};
use crate::translate::Translator;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Client for the external NL-to-SQL service.
#[derive(Debug, Clone)]
pub struct NlServiceClient {
    base_url: Url,
    client: Client,
}

impl NlServiceClient {
    /// Creates a client for the service at `base_url`.
    pub fn new(base_url: Url, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AskdbError::translation(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { base_url, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AskdbError::translation(format!("Invalid endpoint path {path}: {e}")))
    }

    /// Executes SQL through the service's warehouse proxy.
    pub async fn run_query(
        &self,
        data_source_id: i64,
        sql: &str,
        allow_cached_queries: bool,
    ) -> Result<Vec<serde_json::Value>> {
        let url = self.endpoint("query")?;
        debug!(%url, data_source_id, "sending query to translation service");

        let request = QueryRequest {
            data_source_id,
            sql,
            allow_cached_queries,
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport_error(e, "query"))?;

        let response = check_status(response).await?;
        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| AskdbError::translation(format!("Malformed query response: {e}")))?;

        Ok(body.results)
    }
}

#[async_trait]
impl Translator for NlServiceClient {
    async fn translate(&self, data_source_id: i64, question: &str) -> Result<String> {
        let url = self.endpoint("question")?;
        debug!(%url, data_source_id, "requesting sql generation");

        let request = QuestionRequest {
            data_source_id,
            question,
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport_error(e, "question"))?;

        let response = check_status(response).await?;
        let body: QuestionResponse = response
            .json()
            .await
            .map_err(|e| AskdbError::translation(format!("Malformed question response: {e}")))?;

        Ok(body.sql)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    Err(AskdbError::translation(format!(
        "Translation service error ({status}): {body}"
    )))
}

fn map_transport_error(error: reqwest::Error, endpoint: &str) -> AskdbError {
    if error.is_timeout() {
        AskdbError::translation(format!("Translation service /{endpoint} request timed out"))
    } else if error.is_connect() {
        AskdbError::translation("Failed to connect to the translation service. Is it running?")
    } else {
        AskdbError::translation(format!("Translation service request failed: {error}"))
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct QuestionRequest<'a> {
    data_source_id: i64,
    question: &'a str,
}

#[derive(Debug, Deserialize)]
struct QuestionResponse {
    sql: String,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    data_source_id: i64,
    sql: &'a str,
    allow_cached_queries: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> NlServiceClient {
        NlServiceClient::new(Url::parse("http://localhost:8000").unwrap(), 59).unwrap()
    }

    #[test]
    fn test_endpoint_joins() {
        let client = client();
        assert_eq!(
            client.endpoint("question").unwrap().as_str(),
            "http://localhost:8000/question"
        );
        assert_eq!(
            client.endpoint("query").unwrap().as_str(),
            "http://localhost:8000/query"
        );
    }

    #[test]
    fn test_question_request_wire_shape() {
        let request = QuestionRequest {
            data_source_id: 3,
            question: "how many orders?",
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"data_source_id": 3, "question": "how many orders?"})
        );
    }

    #[test]
    fn test_query_request_wire_shape() {
        let request = QueryRequest {
            data_source_id: 3,
            sql: "SELECT 1",
            allow_cached_queries: true,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"data_source_id": 3, "sql": "SELECT 1", "allow_cached_queries": true})
        );
    }

    #[test]
    fn test_response_parsing() {
        let question: QuestionResponse =
            serde_json::from_value(json!({"sql": "SELECT COUNT(*) FROM orders"})).unwrap();
        assert_eq!(question.sql, "SELECT COUNT(*) FROM orders");

        let query: QueryResponse =
            serde_json::from_value(json!({"results": [{"count": 100}]})).unwrap();
        assert_eq!(query.results, vec![json!({"count": 100})]);
    }
}
