//! Schema versioning and migrations for the state database.
//!
//! Manages database schema evolution with forward-only migrations.

use crate::error::{AskdbError, Result};
use sqlx::sqlite::SqlitePool;
use tracing::info;

const CURRENT_VERSION: i32 = 1;

/// Runs all pending migrations on the database.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    ensure_schema_versions_table(pool).await?;

    let current = get_current_version(pool).await?;

    if current > CURRENT_VERSION {
        return Err(AskdbError::persistence(format!(
            "Database schema version ({}) is newer than supported version ({}). \
             Please upgrade askdb to the latest version.",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        info!(
            "Migrating state database from version {} to {}",
            current, CURRENT_VERSION
        );
        run_pending_migrations(pool, current).await?;
    }

    Ok(())
}

async fn ensure_schema_versions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_versions (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        AskdbError::persistence(format!("Failed to create schema_versions table: {e}"))
    })?;

    Ok(())
}

async fn get_current_version(pool: &SqlitePool) -> Result<i32> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT MAX(version) FROM schema_versions")
        .fetch_optional(pool)
        .await
        .map_err(|e| AskdbError::persistence(format!("Failed to get schema version: {e}")))?;

    Ok(row.map(|(v,)| v).unwrap_or(0))
}

async fn run_pending_migrations(pool: &SqlitePool, from_version: i32) -> Result<()> {
    for version in (from_version + 1)..=CURRENT_VERSION {
        run_migration(pool, version).await?;
        record_version(pool, version).await?;
        info!("Applied migration v{}", version);
    }
    Ok(())
}

async fn record_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_versions (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await
        .map_err(|e| AskdbError::persistence(format!("Failed to record migration: {e}")))?;
    Ok(())
}

async fn run_migration(pool: &SqlitePool, version: i32) -> Result<()> {
    match version {
        1 => migration_v1(pool).await,
        _ => Err(AskdbError::persistence(format!(
            "Unknown migration version: {version}"
        ))),
    }
}

/// Migration v1: Initial schema.
async fn migration_v1(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AskdbError::persistence(format!("Failed to create users table: {e}")))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS data_sources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('postgres', 'snowflake', 'mock')),
            credentials TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AskdbError::persistence(format!("Failed to create data_sources table: {e}")))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id),
            data_source_id INTEGER NOT NULL REFERENCES data_sources(id),
            question TEXT NOT NULL,
            generated_sql TEXT,
            user_sql TEXT,
            feedback_state TEXT NOT NULL DEFAULT 'UNANSWERED'
                CHECK (feedback_state IN
                    ('UNANSWERED', 'CORRECT', 'INCORRECT', 'INVALID', 'UNGENERATED')),
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AskdbError::persistence(format!("Failed to create questions table: {e}")))?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_questions_user
        ON questions(user_id, data_source_id)
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AskdbError::persistence(format!("Failed to create questions index: {e}")))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS evaluation_question_groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            data_source_id INTEGER NOT NULL REFERENCES data_sources(id),
            correct_sql TEXT,
            results TEXT,
            notes TEXT,
            assertion_columns TEXT,
            status TEXT NOT NULL DEFAULT 'UNREAD' CHECK (status IN ('UNREAD', 'CORRECT')),
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        AskdbError::persistence(format!(
            "Failed to create evaluation_question_groups table: {e}"
        ))
    })?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS evaluation_questions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            evaluation_question_group_id INTEGER NOT NULL
                REFERENCES evaluation_question_groups(id) ON DELETE CASCADE,
            question TEXT NOT NULL,
            generated_sql TEXT,
            from_question_id INTEGER REFERENCES questions(id) ON DELETE SET NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        AskdbError::persistence(format!("Failed to create evaluation_questions table: {e}"))
    })?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_evaluation_questions_group
        ON evaluation_questions(evaluation_question_group_id)
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        AskdbError::persistence(format!("Failed to create evaluation_questions index: {e}"))
    })?;

    Ok(())
}
