//! Evaluation group lifecycle integration tests.

use super::{evaluation_service, mocked_rows, seeded_store};
use askdb::store::evaluation_store;
use askdb::translate::MOCK_GENERATED_SQL;
use pretty_assertions::assert_eq;
use serde_json::Value;

#[tokio::test]
async fn cascades_evaluation_question_group_deletion() {
    let (store, _user_id, ds_id) = seeded_store().await;
    let service = evaluation_service(&store);

    let group = service.create_group(ds_id).await.unwrap();
    service
        .add_question(group.id, "how many people are there?")
        .await
        .unwrap();

    assert_eq!(evaluation_store::question_count(store.pool()).await.unwrap(), 1);
    assert_eq!(evaluation_store::group_count(store.pool()).await.unwrap(), 1);

    service.delete_group(group.id).await.unwrap();

    assert_eq!(evaluation_store::question_count(store.pool()).await.unwrap(), 0);
    assert_eq!(evaluation_store::group_count(store.pool()).await.unwrap(), 0);
}

#[tokio::test]
async fn does_not_clear_cache_when_an_earlier_question_is_deleted() {
    let (store, _user_id, ds_id) = seeded_store().await;
    let service = evaluation_service(&store);

    let group = service.create_group(ds_id).await.unwrap();
    let first = service
        .add_question(group.id, "how many people are there?")
        .await
        .unwrap();
    service
        .add_question(group.id, "how many families are there?")
        .await
        .unwrap();

    let loaded = service.load(group.id).await.unwrap();
    assert_eq!(loaded.group.results, Some(Value::Array(mocked_rows())));

    service.remove_question(first.id, group.id).await.unwrap();

    let group = evaluation_store::get_group(store.pool(), group.id).await.unwrap();
    assert_eq!(group.results, Some(Value::Array(mocked_rows())));
    assert!(group.correct_sql.is_some());
}

#[tokio::test]
async fn clears_cache_when_the_last_question_is_deleted() {
    let (store, _user_id, ds_id) = seeded_store().await;
    let service = evaluation_service(&store);

    let group = service.create_group(ds_id).await.unwrap();
    service
        .add_question(group.id, "how many people are there?")
        .await
        .unwrap();
    let last = service
        .add_question(group.id, "how many families are there?")
        .await
        .unwrap();

    assert_eq!(evaluation_store::question_count(store.pool()).await.unwrap(), 2);
    assert_eq!(evaluation_store::group_count(store.pool()).await.unwrap(), 1);

    let reloaded = service.load(group.id).await.unwrap();
    assert_eq!(reloaded.group.results, Some(Value::Array(mocked_rows())));

    // this deletes the question and clears the results cache
    service.remove_question(last.id, group.id).await.unwrap();

    let group = evaluation_store::get_group(store.pool(), group.id).await.unwrap();

    assert_eq!(evaluation_store::question_count(store.pool()).await.unwrap(), 1);
    assert_eq!(evaluation_store::group_count(store.pool()).await.unwrap(), 1);

    assert!(group.results.is_none());
    assert!(group.correct_sql.is_none());
}

#[tokio::test]
async fn load_populates_caches_lazily_and_once() {
    let (store, _user_id, ds_id) = seeded_store().await;
    let service = evaluation_service(&store);

    let group = service.create_group(ds_id).await.unwrap();
    service
        .add_question(group.id, "how many people are there?")
        .await
        .unwrap();

    // before the first load the caches are empty
    let bare = evaluation_store::get_group(store.pool(), group.id).await.unwrap();
    assert!(bare.correct_sql.is_none());
    assert!(bare.results.is_none());

    let loaded = service.load(group.id).await.unwrap();
    assert_eq!(loaded.group.correct_sql.as_deref(), Some(MOCK_GENERATED_SQL));
    assert_eq!(loaded.group.results, Some(Value::Array(mocked_rows())));

    // a second load returns the cached values unchanged
    let again = service.load(group.id).await.unwrap();
    assert_eq!(again.group.correct_sql, loaded.group.correct_sql);
    assert_eq!(again.group.results, loaded.group.results);
}

#[tokio::test]
async fn adding_a_question_always_clears_the_cache() {
    let (store, _user_id, ds_id) = seeded_store().await;
    let service = evaluation_service(&store);

    let group = service.create_group(ds_id).await.unwrap();
    service
        .add_question(group.id, "how many people are there?")
        .await
        .unwrap();
    service.load(group.id).await.unwrap();

    service
        .add_question(group.id, "how many families are there?")
        .await
        .unwrap();

    let group = evaluation_store::get_group(store.pool(), group.id).await.unwrap();
    assert!(group.correct_sql.is_none());
    assert!(group.results.is_none());
}

/// The full scenario: grow a group, shrink it, delete it.
#[tokio::test]
async fn group_membership_scenario() {
    let (store, _user_id, ds_id) = seeded_store().await;
    let service = evaluation_service(&store);

    // one member
    let group = service.create_group(ds_id).await.unwrap();
    service
        .add_question(group.id, "how many people are there?")
        .await
        .unwrap();
    assert_eq!(evaluation_store::question_count(store.pool()).await.unwrap(), 1);

    service.load(group.id).await.unwrap();

    // a second member invalidates the caches
    let second = service
        .add_question(group.id, "how many families are there?")
        .await
        .unwrap();
    assert_eq!(evaluation_store::question_count(store.pool()).await.unwrap(), 2);

    let cleared = evaluation_store::get_group(store.pool(), group.id).await.unwrap();
    assert!(cleared.correct_sql.is_none());
    assert!(cleared.results.is_none());

    // deleting the second (last) member leaves the caches cleared; they
    // regenerate on the next load
    service.remove_question(second.id, group.id).await.unwrap();
    assert_eq!(evaluation_store::question_count(store.pool()).await.unwrap(), 1);

    let still_cleared = evaluation_store::get_group(store.pool(), group.id).await.unwrap();
    assert!(still_cleared.correct_sql.is_none());
    assert!(still_cleared.results.is_none());

    let reloaded = service.load(group.id).await.unwrap();
    assert_eq!(reloaded.group.correct_sql.as_deref(), Some(MOCK_GENERATED_SQL));
    assert_eq!(reloaded.group.results, Some(Value::Array(mocked_rows())));

    // deleting the group cascades to its members
    service.delete_group(group.id).await.unwrap();
    assert_eq!(evaluation_store::question_count(store.pool()).await.unwrap(), 0);
}

#[tokio::test]
async fn manual_sql_override_is_not_invalidated_by_last_delete() {
    let (store, _user_id, ds_id) = seeded_store().await;
    let service = evaluation_service(&store);

    let group = service.create_group(ds_id).await.unwrap();
    service
        .add_question(group.id, "how many people are there?")
        .await
        .unwrap();
    let last = service
        .add_question(group.id, "how many families are there?")
        .await
        .unwrap();

    service.load(group.id).await.unwrap();
    service
        .set_correct_sql(group.id, "SELECT COUNT(*) FROM families")
        .await
        .unwrap();

    service.remove_question(last.id, group.id).await.unwrap();

    let group = evaluation_store::get_group(store.pool(), group.id).await.unwrap();
    assert_eq!(group.correct_sql.as_deref(), Some("SELECT COUNT(*) FROM families"));
    assert_eq!(group.results, Some(Value::Array(mocked_rows())));
}
