//! Evaluation group records.
//!
//! An evaluation group is a curated set of related natural-language
//! questions used to benchmark SQL generation. The group carries a verified
//! SQL statement and a cached result snapshot; both are derived from the
//! group's last member question and are cleared together whenever the member
//! set changes in a way that invalidates them.

use crate::error::{AskdbError, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;

/// Review status of an evaluation group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EvaluationStatus {
    /// Not yet reviewed.
    Unread,
    /// Verified correct. Currently a one-way transition.
    Correct,
}

impl EvaluationStatus {
    /// Returns the status as a string for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unread => "UNREAD",
            Self::Correct => "CORRECT",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "UNREAD" => Some(Self::Unread),
            "CORRECT" => Some(Self::Correct),
            _ => None,
        }
    }
}

/// A curated group of evaluation questions with its cached verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationGroup {
    pub id: i64,
    pub data_source_id: i64,
    /// SQL considered correct for the group's last member question.
    pub correct_sql: Option<String>,
    /// Cached result rows for `correct_sql`.
    pub results: Option<serde_json::Value>,
    pub notes: Option<String>,
    /// Columns a benchmark run asserts on, chosen at review time.
    pub assertion_columns: Option<Vec<String>>,
    pub status: EvaluationStatus,
    pub created_at: String,
}

impl EvaluationGroup {
    /// Whether the cached result snapshot is absent or empty.
    pub fn results_empty(&self) -> bool {
        match &self.results {
            None => true,
            Some(serde_json::Value::Null) => true,
            Some(serde_json::Value::Array(rows)) => rows.is_empty(),
            Some(_) => false,
        }
    }

    /// Whether no usable verified SQL is present.
    pub fn correct_sql_blank(&self) -> bool {
        self.correct_sql
            .as_deref()
            .map_or(true, |s| s.trim().is_empty())
    }
}

/// A member question of an evaluation group.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EvaluationQuestion {
    pub id: i64,
    pub evaluation_question_group_id: i64,
    pub question: String,
    /// SQL the translation service produced for this question, cached so a
    /// reload does not re-translate.
    pub generated_sql: Option<String>,
    /// Back-reference to the user question this member was copied from.
    pub from_question_id: Option<i64>,
    pub created_at: String,
}

#[derive(Debug, Clone, FromRow)]
struct EvaluationGroupRow {
    id: i64,
    data_source_id: i64,
    correct_sql: Option<String>,
    results: Option<String>,
    notes: Option<String>,
    assertion_columns: Option<String>,
    status: String,
    created_at: String,
}

impl EvaluationGroupRow {
    fn into_record(self) -> Result<EvaluationGroup> {
        let status = EvaluationStatus::parse(&self.status).ok_or_else(|| {
            AskdbError::persistence(format!("Unknown evaluation status: {}", self.status))
        })?;
        let results = self
            .results
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| {
                AskdbError::persistence(format!("Corrupt results cache on group {}: {e}", self.id))
            })?;
        let assertion_columns = self
            .assertion_columns
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| {
                AskdbError::persistence(format!(
                    "Corrupt assertion columns on group {}: {e}",
                    self.id
                ))
            })?;
        Ok(EvaluationGroup {
            id: self.id,
            data_source_id: self.data_source_id,
            correct_sql: self.correct_sql,
            results,
            notes: self.notes,
            assertion_columns,
            status,
            created_at: self.created_at,
        })
    }
}

const GROUP_COLUMNS: &str =
    "id, data_source_id, correct_sql, results, notes, assertion_columns, status, created_at";

/// Creates a blank evaluation group.
pub async fn create_group(pool: &SqlitePool, data_source_id: i64) -> Result<EvaluationGroup> {
    let result = sqlx::query("INSERT INTO evaluation_question_groups (data_source_id) VALUES (?)")
        .bind(data_source_id)
        .execute(pool)
        .await
        .map_err(|e| AskdbError::persistence(format!("Failed to create evaluation group: {e}")))?;

    get_group(pool, result.last_insert_rowid()).await
}

/// Fetches an evaluation group by id.
pub async fn get_group(pool: &SqlitePool, id: i64) -> Result<EvaluationGroup> {
    let row = sqlx::query_as::<_, EvaluationGroupRow>(&format!(
        "SELECT {GROUP_COLUMNS} FROM evaluation_question_groups WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AskdbError::persistence(format!("Failed to fetch evaluation group: {e}")))?
    .ok_or_else(|| AskdbError::not_found(format!("evaluation group {id}")))?;

    row.into_record()
}

/// Lists evaluation groups, newest first.
pub async fn list_groups(pool: &SqlitePool) -> Result<Vec<EvaluationGroup>> {
    let rows = sqlx::query_as::<_, EvaluationGroupRow>(&format!(
        "SELECT {GROUP_COLUMNS} FROM evaluation_question_groups ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| AskdbError::persistence(format!("Failed to list evaluation groups: {e}")))?;

    rows.into_iter().map(EvaluationGroupRow::into_record).collect()
}

/// Deletes a group. Member questions cascade.
pub async fn delete_group(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM evaluation_question_groups WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| AskdbError::persistence(format!("Failed to delete evaluation group: {e}")))?;

    if result.rows_affected() == 0 {
        return Err(AskdbError::not_found(format!("evaluation group {id}")));
    }
    Ok(())
}

/// Appends a member question to a group.
pub async fn add_question(
    pool: &SqlitePool,
    group_id: i64,
    question: &str,
    from_question_id: Option<i64>,
) -> Result<EvaluationQuestion> {
    let result = sqlx::query(
        "INSERT INTO evaluation_questions \
         (evaluation_question_group_id, question, from_question_id) VALUES (?, ?, ?)",
    )
    .bind(group_id)
    .bind(question)
    .bind(from_question_id)
    .execute(pool)
    .await
    .map_err(|e| AskdbError::persistence(format!("Failed to create evaluation question: {e}")))?;

    get_question(pool, result.last_insert_rowid()).await
}

/// Fetches a member question by id.
pub async fn get_question(pool: &SqlitePool, id: i64) -> Result<EvaluationQuestion> {
    sqlx::query_as::<_, EvaluationQuestion>(
        "SELECT id, evaluation_question_group_id, question, generated_sql, from_question_id, \
         created_at FROM evaluation_questions WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AskdbError::persistence(format!("Failed to fetch evaluation question: {e}")))?
    .ok_or_else(|| AskdbError::not_found(format!("evaluation question {id}")))
}

/// Lists a group's member questions in insertion order.
///
/// Ordering matters: the last member is the one the group's cached SQL was
/// generated from, which drives cache invalidation on delete.
pub async fn list_questions(pool: &SqlitePool, group_id: i64) -> Result<Vec<EvaluationQuestion>> {
    sqlx::query_as::<_, EvaluationQuestion>(
        "SELECT id, evaluation_question_group_id, question, generated_sql, from_question_id, \
         created_at FROM evaluation_questions \
         WHERE evaluation_question_group_id = ? ORDER BY id",
    )
    .bind(group_id)
    .fetch_all(pool)
    .await
    .map_err(|e| AskdbError::persistence(format!("Failed to list evaluation questions: {e}")))
}

/// Deletes a member question.
pub async fn delete_question(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM evaluation_questions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| {
            AskdbError::persistence(format!("Failed to delete evaluation question: {e}"))
        })?;

    if result.rows_affected() == 0 {
        return Err(AskdbError::not_found(format!("evaluation question {id}")));
    }
    Ok(())
}

/// Caches the generated SQL on a member question.
pub async fn set_question_generated_sql(pool: &SqlitePool, id: i64, sql: &str) -> Result<()> {
    sqlx::query("UPDATE evaluation_questions SET generated_sql = ? WHERE id = ?")
        .bind(sql)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| {
            AskdbError::persistence(format!("Failed to cache generated sql on question: {e}"))
        })?;
    Ok(())
}

/// Stores the verified SQL for a group. The result cache fills in lazily on
/// the next load.
pub async fn set_correct_sql(pool: &SqlitePool, group_id: i64, sql: &str) -> Result<()> {
    sqlx::query("UPDATE evaluation_question_groups SET correct_sql = ? WHERE id = ?")
        .bind(sql)
        .bind(group_id)
        .execute(pool)
        .await
        .map_err(|e| AskdbError::persistence(format!("Failed to set correct sql: {e}")))?;
    Ok(())
}

/// Stores the cached result rows for a group.
pub async fn set_results(
    pool: &SqlitePool,
    group_id: i64,
    results: &serde_json::Value,
) -> Result<()> {
    sqlx::query("UPDATE evaluation_question_groups SET results = ? WHERE id = ?")
        .bind(results.to_string())
        .bind(group_id)
        .execute(pool)
        .await
        .map_err(|e| AskdbError::persistence(format!("Failed to set cached results: {e}")))?;
    Ok(())
}

/// Stores a manually-verified SQL override and its results in one update.
pub async fn set_verified_sql(
    pool: &SqlitePool,
    group_id: i64,
    sql: &str,
    results: &serde_json::Value,
) -> Result<()> {
    sqlx::query("UPDATE evaluation_question_groups SET correct_sql = ?, results = ? WHERE id = ?")
        .bind(sql)
        .bind(results.to_string())
        .bind(group_id)
        .execute(pool)
        .await
        .map_err(|e| AskdbError::persistence(format!("Failed to set verified sql: {e}")))?;
    Ok(())
}

/// Clears the cached SQL and results together.
///
/// There is no case where you would want to clear one and not the other.
pub async fn clear_group_cache(pool: &SqlitePool, group_id: i64) -> Result<()> {
    sqlx::query(
        "UPDATE evaluation_question_groups SET correct_sql = NULL, results = NULL WHERE id = ?",
    )
    .bind(group_id)
    .execute(pool)
    .await
    .map_err(|e| AskdbError::persistence(format!("Failed to clear group cache: {e}")))?;
    Ok(())
}

/// Updates the reviewer notes on a group.
pub async fn set_notes(pool: &SqlitePool, group_id: i64, notes: &str) -> Result<()> {
    sqlx::query("UPDATE evaluation_question_groups SET notes = ? WHERE id = ?")
        .bind(notes)
        .bind(group_id)
        .execute(pool)
        .await
        .map_err(|e| AskdbError::persistence(format!("Failed to update notes: {e}")))?;
    Ok(())
}

/// Marks a group as verified correct.
pub async fn mark_correct(
    pool: &SqlitePool,
    group_id: i64,
    notes: Option<&str>,
    assertion_columns: Option<&[String]>,
) -> Result<()> {
    let assertion_json = assertion_columns
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| AskdbError::internal(format!("Failed to encode assertion columns: {e}")))?;

    sqlx::query(
        "UPDATE evaluation_question_groups \
         SET status = ?, notes = COALESCE(?, notes), assertion_columns = COALESCE(?, assertion_columns) \
         WHERE id = ?",
    )
    .bind(EvaluationStatus::Correct.as_str())
    .bind(notes)
    .bind(assertion_json)
    .bind(group_id)
    .execute(pool)
    .await
    .map_err(|e| AskdbError::persistence(format!("Failed to mark group correct: {e}")))?;
    Ok(())
}

/// Counts all evaluation groups.
pub async fn group_count(pool: &SqlitePool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM evaluation_question_groups")
        .fetch_one(pool)
        .await
        .map_err(|e| AskdbError::persistence(format!("Failed to count groups: {e}")))?;
    Ok(count)
}

/// Counts all evaluation questions across groups.
pub async fn question_count(pool: &SqlitePool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM evaluation_questions")
        .fetch_one(pool)
        .await
        .map_err(|e| AskdbError::persistence(format!("Failed to count questions: {e}")))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{data_source_store, DataSourceKind, Store};
    use serde_json::json;

    async fn seed_group(store: &Store) -> EvaluationGroup {
        let ds = data_source_store::create_data_source(
            store.pool(),
            "warehouse",
            DataSourceKind::Mock,
            &json!({}),
        )
        .await
        .unwrap();
        create_group(store.pool(), ds.id).await.unwrap()
    }

    #[test]
    fn test_status_round_trip() {
        assert_eq!(EvaluationStatus::parse("UNREAD"), Some(EvaluationStatus::Unread));
        assert_eq!(EvaluationStatus::parse("correct"), Some(EvaluationStatus::Correct));
        assert_eq!(EvaluationStatus::parse("stale"), None);
    }

    #[tokio::test]
    async fn test_new_group_is_unread_and_uncached() {
        let store = Store::in_memory().await.unwrap();
        let group = seed_group(&store).await;

        assert_eq!(group.status, EvaluationStatus::Unread);
        assert!(group.correct_sql_blank());
        assert!(group.results_empty());
    }

    #[tokio::test]
    async fn test_questions_listed_in_insertion_order() {
        let store = Store::in_memory().await.unwrap();
        let group = seed_group(&store).await;

        add_question(store.pool(), group.id, "first", None).await.unwrap();
        add_question(store.pool(), group.id, "second", None).await.unwrap();

        let questions = list_questions(store.pool(), group.id).await.unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].question, "first");
        assert_eq!(questions[1].question, "second");
    }

    #[tokio::test]
    async fn test_cache_cleared_together() {
        let store = Store::in_memory().await.unwrap();
        let group = seed_group(&store).await;

        set_verified_sql(store.pool(), group.id, "SELECT 1", &json!([{"count": 100}]))
            .await
            .unwrap();

        let group = get_group(store.pool(), group.id).await.unwrap();
        assert!(!group.correct_sql_blank());
        assert!(!group.results_empty());

        clear_group_cache(store.pool(), group.id).await.unwrap();

        let group = get_group(store.pool(), group.id).await.unwrap();
        assert!(group.correct_sql.is_none());
        assert!(group.results.is_none());
    }

    #[tokio::test]
    async fn test_delete_group_cascades_to_questions() {
        let store = Store::in_memory().await.unwrap();
        let group = seed_group(&store).await;

        add_question(store.pool(), group.id, "how many people are there?", None)
            .await
            .unwrap();
        assert_eq!(question_count(store.pool()).await.unwrap(), 1);

        delete_group(store.pool(), group.id).await.unwrap();

        assert_eq!(group_count(store.pool()).await.unwrap(), 0);
        assert_eq!(question_count(store.pool()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_correct_preserves_existing_notes() {
        let store = Store::in_memory().await.unwrap();
        let group = seed_group(&store).await;

        set_notes(store.pool(), group.id, "looks plausible").await.unwrap();
        mark_correct(store.pool(), group.id, None, None).await.unwrap();

        let group = get_group(store.pool(), group.id).await.unwrap();
        assert_eq!(group.status, EvaluationStatus::Correct);
        assert_eq!(group.notes.as_deref(), Some("looks plausible"));
    }

    #[tokio::test]
    async fn test_mark_correct_stores_assertion_columns() {
        let store = Store::in_memory().await.unwrap();
        let group = seed_group(&store).await;

        let columns = vec!["count".to_string(), "total".to_string()];
        mark_correct(store.pool(), group.id, Some("verified"), Some(&columns))
            .await
            .unwrap();

        let group = get_group(store.pool(), group.id).await.unwrap();
        assert_eq!(group.assertion_columns, Some(columns));
        assert_eq!(group.notes.as_deref(), Some("verified"));
    }

    #[tokio::test]
    async fn test_results_empty_on_empty_array() {
        let store = Store::in_memory().await.unwrap();
        let group = seed_group(&store).await;

        set_results(store.pool(), group.id, &json!([])).await.unwrap();

        let group = get_group(store.pool(), group.id).await.unwrap();
        assert!(group.results_empty());
    }
}
