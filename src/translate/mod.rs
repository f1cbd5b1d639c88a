//! NL-to-SQL translation client.
//!
//! Provides the trait and implementations for turning a natural-language
//! question into SQL via the external translation service, with a mock for
//! deterministic tests and local development.

mod http;
mod mock;

pub use http::NlServiceClient;
pub use mock::{MockTranslator, MOCK_GENERATED_SQL};

use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for NL-to-SQL translation clients.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translates a natural-language question into SQL for a data source.
    async fn translate(&self, data_source_id: i64, question: &str) -> Result<String>;
}

/// Creates the translator selected by configuration.
///
/// Mock mode is rejected in production.
pub fn translator_for(config: &Config) -> Result<Arc<dyn Translator>> {
    if config.translator.mock {
        config.ensure_mock_allowed()?;
        return Ok(Arc::new(MockTranslator::new()));
    }

    let base_url = config.translator_base_url()?;
    let client = NlServiceClient::new(base_url, config.translator.timeout_secs)?;
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslatorConfig;

    #[tokio::test]
    async fn test_factory_builds_mock_translator() {
        let config = Config {
            translator: TranslatorConfig {
                mock: true,
                ..Default::default()
            },
            ..Default::default()
        };

        let translator = translator_for(&config).unwrap();
        let sql = translator.translate(1, "how many orders?").await.unwrap();
        assert_eq!(sql, MOCK_GENERATED_SQL);
    }

    #[test]
    fn test_factory_requires_base_url_without_mock() {
        let config = Config::default();
        assert!(translator_for(&config).is_err());
    }

    #[test]
    fn test_factory_builds_http_client() {
        let config = Config {
            translator: TranslatorConfig {
                base_url: Some("http://localhost:8000".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(translator_for(&config).is_ok());
    }
}
