//! Question lifecycle integration tests.

use super::{mocked_rows, question_service, seeded_store};
use askdb::lifecycle::ResultStatus;
use askdb::store::{question_store, FeedbackState};
use askdb::translate::MOCK_GENERATED_SQL;
use askdb::warehouse::RecordingRunner;
use askdb::lifecycle::QuestionService;
use askdb::translate::MockTranslator;
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[tokio::test]
async fn processes_a_new_question() {
    let (store, user_id, ds_id) = seeded_store().await;
    let service = question_service(&store);

    let result = service
        .create(user_id, ds_id, "What is the total number of orders?")
        .await
        .unwrap();

    assert_eq!(result.status, ResultStatus::Success);
    assert!(result.data.is_none());
    assert!(result.question.user_sql.is_none());
    assert_eq!(result.question.generated_sql.as_deref(), Some(MOCK_GENERATED_SQL));
}

#[tokio::test]
async fn updates_a_question_sql() {
    let (store, user_id, ds_id) = seeded_store().await;
    let service = question_service(&store);

    let created = service
        .create(user_id, ds_id, "What is the total number of orders?")
        .await
        .unwrap();

    let updated_sql = "SELECT * FROM customers LIMIT 10";
    let updated = service.update_sql(created.question.id, updated_sql).await.unwrap();

    assert_eq!(updated.question.user_sql.as_deref(), Some(updated_sql));
    assert_eq!(updated.status, ResultStatus::Success);
}

#[tokio::test]
async fn gets_results_from_a_question_with_custom_user_sql() {
    let (store, user_id, ds_id) = seeded_store().await;
    let recorder = Arc::new(RecordingRunner::new());
    let service = QuestionService::new(
        store.clone(),
        Arc::new(MockTranslator::new()),
        recorder.clone(),
    );

    let created = service
        .create(user_id, ds_id, "What is the total number of orders?")
        .await
        .unwrap();

    let updated_sql = "SELECT * FROM PLACES LIMIT 10";
    service.update_sql(created.question.id, updated_sql).await.unwrap();

    let results = service.results_for_id(created.question.id).await.unwrap();

    assert_eq!(results.status, ResultStatus::Success);
    assert_eq!(results.data, Some(mocked_rows()));

    // the execution adapter saw the user's sql, not the generated one
    assert_eq!(recorder.last_sql().as_deref(), Some(updated_sql));
}

#[tokio::test]
async fn gets_results_from_a_question() {
    let (store, user_id, ds_id) = seeded_store().await;
    let service = question_service(&store);

    let created = service
        .create(user_id, ds_id, "What is the total number of orders?")
        .await
        .unwrap();

    let results = service.results(created.question).await.unwrap();

    assert_eq!(results.status, ResultStatus::Success);
    assert_eq!(results.data, Some(mocked_rows()));
}

#[tokio::test]
async fn gets_results_from_question_id() {
    let (store, user_id, ds_id) = seeded_store().await;
    let service = question_service(&store);

    let created = service
        .create(user_id, ds_id, "What is the total number of orders?")
        .await
        .unwrap();

    let results = service.results_for_id(created.question.id).await.unwrap();

    assert_eq!(results.status, ResultStatus::Success);
    assert_eq!(results.data, Some(mocked_rows()));
}

#[tokio::test]
async fn failed_generation_leaves_an_auditable_record() {
    let (store, user_id, ds_id) = seeded_store().await;
    let service = QuestionService::new(
        store.clone(),
        Arc::new(MockTranslator::failing("translation service is down")),
        Arc::new(askdb::warehouse::WarehouseRunner::new()),
    );

    let result = service
        .create(user_id, ds_id, "What is the total number of orders?")
        .await
        .unwrap();

    assert_eq!(result.status, ResultStatus::Error);
    assert_eq!(result.question.feedback_state, FeedbackState::Ungenerated);

    let stored = question_store::get_question(store.pool(), result.question.id)
        .await
        .unwrap();
    assert_eq!(stored.question, "What is the total number of orders?");
    assert!(stored.generated_sql.is_none());
}

#[tokio::test]
async fn execution_failure_marks_question_invalid() {
    let (store, user_id, ds_id) = seeded_store().await;
    let creating = question_service(&store);
    let created = creating
        .create(user_id, ds_id, "What is the total number of orders?")
        .await
        .unwrap();

    let failing = QuestionService::new(
        store.clone(),
        Arc::new(MockTranslator::new()),
        Arc::new(askdb::warehouse::FailingRunner::default()),
    );

    let result = failing.results_for_id(created.question.id).await.unwrap();

    assert_eq!(result.status, ResultStatus::Error);
    assert_eq!(result.question.feedback_state, FeedbackState::Invalid);
}
