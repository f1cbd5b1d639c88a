//! Question lifecycle manager.
//!
//! Creates questions, resolves and runs their SQL, and records feedback.
//! Expected failure modes (translation unavailable, warehouse rejecting the
//! SQL) come back as an error-status [`QuestionResult`] instead of an `Err`,
//! so the UI layer can always render something friendly; `Err` is reserved
//! for not-found, persistence faults, and invariant violations.

use crate::error::{AskdbError, Result};
use crate::store::{
    data_source_store, question_store, FeedbackState, Question, Store,
};
use crate::translate::Translator;
use crate::warehouse::{QueryOptions, QueryRunner};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome tag on a [`QuestionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
}

/// What a question operation hands back to the UI: the (possibly updated)
/// question record, an outcome tag, and result rows when SQL was executed.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionResult {
    pub question: Question,
    pub status: ResultStatus,
    pub data: Option<Vec<serde_json::Value>>,
}

impl QuestionResult {
    fn success(question: Question, data: Option<Vec<serde_json::Value>>) -> Self {
        Self {
            question,
            status: ResultStatus::Success,
            data,
        }
    }

    fn error(question: Question) -> Self {
        Self {
            question,
            status: ResultStatus::Error,
            data: None,
        }
    }
}

/// Question lifecycle manager.
pub struct QuestionService {
    store: Store,
    translator: Arc<dyn Translator>,
    runner: Arc<dyn QueryRunner>,
}

impl QuestionService {
    /// Creates a service over the given store and collaborators.
    pub fn new(store: Store, translator: Arc<dyn Translator>, runner: Arc<dyn QueryRunner>) -> Self {
        Self {
            store,
            translator,
            runner,
        }
    }

    /// Creates a question and generates its SQL. Does not execute it.
    ///
    /// The row is persisted before calling the translation service so a
    /// generation failure still leaves an auditable record; that failure
    /// surfaces as feedback state UNGENERATED on an error-status result.
    pub async fn create(
        &self,
        user_id: i64,
        data_source_id: i64,
        question_text: &str,
    ) -> Result<QuestionResult> {
        let pool = self.store.pool();
        let question =
            question_store::create_question(pool, user_id, data_source_id, question_text).await?;

        match self.translator.translate(data_source_id, question_text).await {
            Ok(sql) => {
                debug!(question_id = question.id, %sql, "generated sql");
                let question = question_store::set_generated_sql(pool, question.id, &sql).await?;
                Ok(QuestionResult::success(question, None))
            }
            Err(AskdbError::Translation(message)) => {
                warn!(question_id = question.id, %message, "sql generation failed");
                let question = question_store::set_feedback_state(
                    pool,
                    question.id,
                    FeedbackState::Ungenerated,
                )
                .await?;
                Ok(QuestionResult::error(question))
            }
            Err(other) => Err(other),
        }
    }

    /// Fetches a question by id and runs its effective SQL.
    pub async fn results_for_id(&self, question_id: i64) -> Result<QuestionResult> {
        let question = question_store::get_question(self.store.pool(), question_id).await?;
        self.results(question).await
    }

    /// Runs a question's effective SQL (`user_sql` over `generated_sql`).
    ///
    /// A warehouse failure marks the question INVALID and returns an
    /// error-status result. A question with no SQL at all is an invariant
    /// violation and propagates.
    pub async fn results(&self, question: Question) -> Result<QuestionResult> {
        let sql = question
            .effective_sql()
            .ok_or_else(|| {
                AskdbError::internal(format!("question {} has no sql to execute", question.id))
            })?
            .to_string();

        let pool = self.store.pool();
        let data_source = data_source_store::get_data_source(pool, question.data_source_id).await?;

        match self
            .runner
            .run(&data_source, &sql, &QueryOptions::default())
            .await
        {
            Ok(rows) => Ok(QuestionResult::success(question, Some(rows))),
            Err(AskdbError::Warehouse(message)) => {
                warn!(question_id = question.id, %message, "query execution failed");
                let question =
                    question_store::set_feedback_state(pool, question.id, FeedbackState::Invalid)
                        .await?;
                Ok(QuestionResult::error(question))
            }
            Err(other) => Err(other),
        }
    }

    /// Overwrites a question's SQL with a user edit and re-executes it.
    ///
    /// Edits never use a cache; the fresh results come straight from the
    /// warehouse.
    pub async fn update_sql(&self, question_id: i64, user_sql: &str) -> Result<QuestionResult> {
        // ensure the question exists before writing
        question_store::get_question(self.store.pool(), question_id).await?;

        let question = question_store::set_user_sql(self.store.pool(), question_id, user_sql).await?;
        debug!(question_id, "re-running edited sql");
        self.results(question).await
    }

    /// Records explicit user feedback on a question.
    pub async fn record_feedback(
        &self,
        question_id: i64,
        state: FeedbackState,
    ) -> Result<Question> {
        // ensure the question exists; an update on a missing row is silent
        question_store::get_question(self.store.pool(), question_id).await?;
        question_store::set_feedback_state(self.store.pool(), question_id, state).await
    }

    /// Returns a user's question history for a data source, newest first.
    pub async fn history(&self, user_id: i64, data_source_id: i64) -> Result<Vec<Question>> {
        question_store::list_questions_for_user(self.store.pool(), user_id, data_source_id).await
    }
}
