//! Mock translator for testing.
//!
//! Returns a canned statement so tests and local development get
//! deterministic SQL without the external service.

use crate::error::{AskdbError, Result};
use crate::translate::Translator;
use async_trait::async_trait;

/// The statement the mock hands back for every question.
pub const MOCK_GENERATED_SQL: &str = "SELECT * FROM ORDER LIMIT 10";

/// Mock NL-to-SQL client with a configurable canned response.
#[derive(Debug, Clone)]
pub struct MockTranslator {
    sql: String,
    fail_with: Option<String>,
}

impl MockTranslator {
    /// Creates a mock returning [`MOCK_GENERATED_SQL`].
    pub fn new() -> Self {
        Self {
            sql: MOCK_GENERATED_SQL.to_string(),
            fail_with: None,
        }
    }

    /// Overrides the canned SQL.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = sql.into();
        self
    }

    /// Makes every translation fail with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            sql: String::new(),
            fail_with: Some(message.into()),
        }
    }
}

impl Default for MockTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, _data_source_id: i64, _question: &str) -> Result<String> {
        match &self.fail_with {
            Some(message) => Err(AskdbError::translation(message.clone())),
            None => Ok(self.sql.clone()),
        }
    }
}
