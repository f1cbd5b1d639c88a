//! Question and evaluation group lifecycle managers.
//!
//! This is the orchestration core: it coordinates the state store, the
//! NL-to-SQL client, and the query execution adapter, and owns the caching
//! and invalidation rules for generated SQL and result snapshots.

mod evaluation;
mod questions;

pub use evaluation::{EvaluationGroupDetail, EvaluationService};
pub use questions::{QuestionResult, QuestionService, ResultStatus};
