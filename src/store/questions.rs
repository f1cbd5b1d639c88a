//! Question records.
//!
//! A question is a user's natural-language prompt plus the SQL derived from
//! it: the machine-generated translation and an optional user override. The
//! override always wins when resolving which SQL to execute.

use crate::error::{AskdbError, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;

/// User-supplied correctness signal on a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeedbackState {
    /// No feedback given yet.
    Unanswered,
    Correct,
    Incorrect,
    /// The SQL failed to execute against the warehouse.
    Invalid,
    /// SQL generation failed; there is nothing to run.
    Ungenerated,
}

impl FeedbackState {
    /// Returns the state as a string for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unanswered => "UNANSWERED",
            Self::Correct => "CORRECT",
            Self::Incorrect => "INCORRECT",
            Self::Invalid => "INVALID",
            Self::Ungenerated => "UNGENERATED",
        }
    }

    /// Parses a state from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "UNANSWERED" => Some(Self::Unanswered),
            "CORRECT" => Some(Self::Correct),
            "INCORRECT" => Some(Self::Incorrect),
            "INVALID" => Some(Self::Invalid),
            "UNGENERATED" => Some(Self::Ungenerated),
            _ => None,
        }
    }
}

/// A user question and its derived SQL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub user_id: i64,
    pub data_source_id: i64,
    pub question: String,
    /// SQL produced by the NL-to-SQL service.
    pub generated_sql: Option<String>,
    /// SQL the user edited in by hand. Takes precedence over `generated_sql`.
    pub user_sql: Option<String>,
    pub feedback_state: FeedbackState,
    pub created_at: String,
}

impl Question {
    /// The SQL that should actually be executed for this question.
    pub fn effective_sql(&self) -> Option<&str> {
        self.user_sql.as_deref().or(self.generated_sql.as_deref())
    }
}

#[derive(Debug, Clone, FromRow)]
struct QuestionRow {
    id: i64,
    user_id: i64,
    data_source_id: i64,
    question: String,
    generated_sql: Option<String>,
    user_sql: Option<String>,
    feedback_state: String,
    created_at: String,
}

impl QuestionRow {
    fn into_record(self) -> Result<Question> {
        let feedback_state = FeedbackState::parse(&self.feedback_state).ok_or_else(|| {
            AskdbError::persistence(format!("Unknown feedback state: {}", self.feedback_state))
        })?;
        Ok(Question {
            id: self.id,
            user_id: self.user_id,
            data_source_id: self.data_source_id,
            question: self.question,
            generated_sql: self.generated_sql,
            user_sql: self.user_sql,
            feedback_state,
            created_at: self.created_at,
        })
    }
}

const QUESTION_COLUMNS: &str =
    "id, user_id, data_source_id, question, generated_sql, user_sql, feedback_state, created_at";

/// Creates a question row. The SQL fields start empty; generation happens
/// after the row exists so a translation failure still leaves a record.
pub async fn create_question(
    pool: &SqlitePool,
    user_id: i64,
    data_source_id: i64,
    question: &str,
) -> Result<Question> {
    let result =
        sqlx::query("INSERT INTO questions (user_id, data_source_id, question) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(data_source_id)
            .bind(question)
            .execute(pool)
            .await
            .map_err(|e| AskdbError::persistence(format!("Failed to create question: {e}")))?;

    get_question(pool, result.last_insert_rowid()).await
}

/// Fetches a question by id.
pub async fn get_question(pool: &SqlitePool, id: i64) -> Result<Question> {
    let row = sqlx::query_as::<_, QuestionRow>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AskdbError::persistence(format!("Failed to fetch question: {e}")))?
    .ok_or_else(|| AskdbError::not_found(format!("question {id}")))?;

    row.into_record()
}

/// Stores the machine-generated SQL for a question.
pub async fn set_generated_sql(pool: &SqlitePool, id: i64, sql: &str) -> Result<Question> {
    sqlx::query("UPDATE questions SET generated_sql = ? WHERE id = ?")
        .bind(sql)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| AskdbError::persistence(format!("Failed to update question sql: {e}")))?;

    get_question(pool, id).await
}

/// Stores a user-edited SQL override for a question.
pub async fn set_user_sql(pool: &SqlitePool, id: i64, sql: &str) -> Result<Question> {
    sqlx::query("UPDATE questions SET user_sql = ? WHERE id = ?")
        .bind(sql)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| AskdbError::persistence(format!("Failed to update user sql: {e}")))?;

    get_question(pool, id).await
}

/// Updates the feedback state on a question.
pub async fn set_feedback_state(
    pool: &SqlitePool,
    id: i64,
    state: FeedbackState,
) -> Result<Question> {
    sqlx::query("UPDATE questions SET feedback_state = ? WHERE id = ?")
        .bind(state.as_str())
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| AskdbError::persistence(format!("Failed to update feedback state: {e}")))?;

    get_question(pool, id).await
}

/// Lists a user's questions for a data source, newest first.
pub async fn list_questions_for_user(
    pool: &SqlitePool,
    user_id: i64,
    data_source_id: i64,
) -> Result<Vec<Question>> {
    let rows = sqlx::query_as::<_, QuestionRow>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions \
         WHERE user_id = ? AND data_source_id = ? \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(user_id)
    .bind(data_source_id)
    .fetch_all(pool)
    .await
    .map_err(|e| AskdbError::persistence(format!("Failed to list questions: {e}")))?;

    rows.into_iter().map(QuestionRow::into_record).collect()
}
