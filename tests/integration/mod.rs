//! Integration tests for askdb.

pub mod evaluation_test;
pub mod question_test;

use askdb::store::{data_source_store, user_store, DataSourceKind, Store};
use askdb::translate::MockTranslator;
use askdb::warehouse::WarehouseRunner;
use askdb::lifecycle::{EvaluationService, QuestionService};
use serde_json::json;
use std::sync::Arc;

/// The row every mock warehouse query returns.
pub fn mocked_rows() -> Vec<serde_json::Value> {
    vec![json!({"count": 100})]
}

/// Opens a fresh in-memory store seeded with one user and one mock-backend
/// data source, returning their ids.
pub async fn seeded_store() -> (Store, i64, i64) {
    let store = Store::in_memory().await.unwrap();
    let user = user_store::create_user(store.pool(), "rachel@example.com", "test account")
        .await
        .unwrap();
    let ds = data_source_store::create_data_source(
        store.pool(),
        "Personal warehouse",
        DataSourceKind::Mock,
        &json!({}),
    )
    .await
    .unwrap();
    (store, user.id, ds.id)
}

/// Builds a question service over the mock translator and mock warehouse.
pub fn question_service(store: &Store) -> QuestionService {
    QuestionService::new(
        store.clone(),
        Arc::new(MockTranslator::new()),
        Arc::new(WarehouseRunner::new()),
    )
}

/// Builds an evaluation service over the mock translator and mock warehouse.
pub fn evaluation_service(store: &Store) -> EvaluationService {
    EvaluationService::new(
        store.clone(),
        Arc::new(MockTranslator::new()),
        Arc::new(WarehouseRunner::new()),
    )
}
