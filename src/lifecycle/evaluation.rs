//! Evaluation group lifecycle manager.
//!
//! Evaluation groups collect related questions for benchmarking SQL
//! generation. The group's verified SQL and result snapshot are computed
//! lazily on load and invalidated when the member set changes: adding a
//! question always clears both caches, deleting the last member clears them
//! only when the cached SQL was machine-generated from that member.

use crate::error::{AskdbError, Result};
use crate::store::{
    data_source_store, evaluation_store, question_store, EvaluationGroup, EvaluationQuestion,
    Store,
};
use crate::translate::Translator;
use crate::warehouse::{QueryOptions, QueryRunner};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An evaluation group together with its member questions, in insertion
/// order.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationGroupDetail {
    pub group: EvaluationGroup,
    pub questions: Vec<EvaluationQuestion>,
}

impl EvaluationGroupDetail {
    /// The member question the group's SQL is derived from.
    pub fn last_question(&self) -> Option<&EvaluationQuestion> {
        self.questions.last()
    }
}

/// Evaluation group lifecycle manager.
pub struct EvaluationService {
    store: Store,
    translator: Arc<dyn Translator>,
    runner: Arc<dyn QueryRunner>,
}

impl EvaluationService {
    /// Creates a service over the given store and collaborators.
    pub fn new(store: Store, translator: Arc<dyn Translator>, runner: Arc<dyn QueryRunner>) -> Self {
        Self {
            store,
            translator,
            runner,
        }
    }

    /// Creates a blank group for a data source.
    pub async fn create_group(&self, data_source_id: i64) -> Result<EvaluationGroup> {
        // reject unknown data sources up front
        data_source_store::get_data_source(self.store.pool(), data_source_id).await?;
        evaluation_store::create_group(self.store.pool(), data_source_id).await
    }

    /// Creates a group seeded from existing user questions.
    pub async fn group_from_questions(
        &self,
        data_source_id: i64,
        question_ids: &[i64],
    ) -> Result<EvaluationGroup> {
        info!(?question_ids, "creating evaluation group from questions");

        let group = self.create_group(data_source_id).await?;
        for &question_id in question_ids {
            self.add_question_from_question(question_id, group.id).await?;
        }

        evaluation_store::get_group(self.store.pool(), group.id).await
    }

    /// Loads a group, lazily filling its caches.
    ///
    /// If the verified SQL is missing and the group has members, it is
    /// generated from the last member's question text. If SQL is present
    /// but the result snapshot is empty, the SQL is executed and the rows
    /// cached. Once both are populated, subsequent loads short-circuit.
    pub async fn load(&self, group_id: i64) -> Result<EvaluationGroupDetail> {
        let pool = self.store.pool();
        let mut group = evaluation_store::get_group(pool, group_id).await?;
        let questions = evaluation_store::list_questions(pool, group_id).await?;

        if group.correct_sql_blank() {
            if let Some(last) = questions.last() {
                info!(group_id, "generating sql for evaluation question group");

                let generated = match &last.generated_sql {
                    Some(sql) => Some(sql.clone()),
                    None => match self
                        .translator
                        .translate(group.data_source_id, &last.question)
                        .await
                    {
                        Ok(sql) => {
                            // cache the generated sql on the member question
                            evaluation_store::set_question_generated_sql(pool, last.id, &sql)
                                .await?;
                            Some(sql)
                        }
                        Err(AskdbError::Translation(message)) => {
                            // both caches stay empty; the group still loads
                            warn!(group_id, %message, "sql generation failed for group");
                            None
                        }
                        Err(other) => return Err(other),
                    },
                };

                if let Some(sql) = generated {
                    evaluation_store::set_correct_sql(pool, group_id, &sql).await?;
                    group = evaluation_store::get_group(pool, group_id).await?;
                }
            }
        }

        if !group.correct_sql_blank() && group.results_empty() {
            info!(group_id, "result cache empty, pulling results from data source");

            let data_source =
                data_source_store::get_data_source(pool, group.data_source_id).await?;
            let sql = group.correct_sql.as_deref().unwrap_or_default().to_string();
            // the evaluation side tolerates cached warehouse results
            let rows = self
                .runner
                .run(&data_source, &sql, &QueryOptions::cached())
                .await?;

            evaluation_store::set_results(pool, group_id, &serde_json::Value::Array(rows)).await?;
            group = evaluation_store::get_group(pool, group_id).await?;
        }

        let questions = evaluation_store::list_questions(pool, group_id).await?;
        Ok(EvaluationGroupDetail { group, questions })
    }

    /// Appends a member question and invalidates the group's caches.
    ///
    /// Clearing unconditionally on write is simpler and safer than trying
    /// to repair the cache incrementally.
    pub async fn add_question(
        &self,
        group_id: i64,
        question_text: &str,
    ) -> Result<EvaluationQuestion> {
        let pool = self.store.pool();
        evaluation_store::get_group(pool, group_id).await?;

        let question = evaluation_store::add_question(pool, group_id, question_text, None).await?;
        evaluation_store::clear_group_cache(pool, group_id).await?;

        Ok(question)
    }

    /// Copies an existing user question into a group as a member.
    ///
    /// Only used while assembling a new group, so the caches are not
    /// touched here.
    pub async fn add_question_from_question(
        &self,
        question_id: i64,
        group_id: i64,
    ) -> Result<EvaluationQuestion> {
        let pool = self.store.pool();
        let source = question_store::get_question(pool, question_id).await?;

        evaluation_store::add_question(pool, group_id, &source.question, Some(source.id)).await
    }

    /// Removes a member question, clearing the group's caches when the
    /// cached SQL was machine-generated from that member.
    ///
    /// Deleting a non-last member never clears: the cached SQL was derived
    /// from the last member, and a manual override is assumed intentional.
    /// (A middle deletion does change the example set the SQL was generated
    /// against; invalidating on that is a product call that has not been
    /// made, so it is left alone here.)
    pub async fn remove_question(&self, question_id: i64, group_id: i64) -> Result<()> {
        debug!(question_id, group_id, "deleting evaluation question");

        let pool = self.store.pool();
        let group = evaluation_store::get_group(pool, group_id).await?;
        let questions = evaluation_store::list_questions(pool, group_id).await?;

        let last = questions.last().ok_or_else(|| {
            AskdbError::internal(format!(
                "evaluation group {group_id} has no questions to delete"
            ))
        })?;

        let is_deleting_last = last.id == question_id;
        let is_machine_generated = is_deleting_last && group.correct_sql == last.generated_sql;

        if is_machine_generated {
            debug!(group_id, "sql is machine generated, clearing cache");
            evaluation_store::clear_group_cache(pool, group_id).await?;
        }

        evaluation_store::delete_question(pool, question_id).await
    }

    /// Manually overrides the group's verified SQL: runs it and stores the
    /// SQL and its results together.
    pub async fn set_correct_sql(&self, group_id: i64, sql: &str) -> Result<EvaluationGroup> {
        let pool = self.store.pool();
        let group = evaluation_store::get_group(pool, group_id).await?;
        let data_source = data_source_store::get_data_source(pool, group.data_source_id).await?;

        let rows = self
            .runner
            .run(&data_source, sql, &QueryOptions::cached())
            .await?;

        evaluation_store::set_verified_sql(pool, group_id, sql, &serde_json::Value::Array(rows))
            .await?;
        evaluation_store::get_group(pool, group_id).await
    }

    /// Updates reviewer notes on a group.
    pub async fn update_notes(&self, group_id: i64, notes: &str) -> Result<EvaluationGroup> {
        let pool = self.store.pool();
        evaluation_store::get_group(pool, group_id).await?;
        evaluation_store::set_notes(pool, group_id, notes).await?;
        evaluation_store::get_group(pool, group_id).await
    }

    /// Marks a group as verified correct.
    ///
    /// This is currently a one-way transition; nothing reopens a group.
    pub async fn mark_correct(
        &self,
        group_id: i64,
        notes: Option<&str>,
        assertion_columns: Option<&[String]>,
    ) -> Result<EvaluationGroup> {
        let pool = self.store.pool();
        evaluation_store::get_group(pool, group_id).await?;
        evaluation_store::mark_correct(pool, group_id, notes, assertion_columns).await?;
        evaluation_store::get_group(pool, group_id).await
    }

    /// Deletes a group; member questions cascade.
    pub async fn delete_group(&self, group_id: i64) -> Result<()> {
        debug!(group_id, "deleting evaluation question group");
        evaluation_store::delete_group(self.store.pool(), group_id).await
    }

    /// Lists all groups, newest first.
    pub async fn list_groups(&self) -> Result<Vec<EvaluationGroup>> {
        evaluation_store::list_groups(self.store.pool()).await
    }
}
