//! Application state store for askdb.
//!
//! Manages the SQLite database holding users, data sources, questions, and
//! evaluation question groups. All record access goes through the free
//! functions in the submodules; the [`Store`] handle owns the pool and is
//! passed explicitly to the lifecycle services instead of living in a
//! module-level singleton.

pub mod data_sources;
pub mod evaluation;
mod migrations;
pub mod questions;
pub mod users;

pub use data_sources::{DataSource, DataSourceKind};
pub use evaluation::{EvaluationGroup, EvaluationQuestion, EvaluationStatus};
pub use questions::{FeedbackState, Question};
pub use users::User;

pub use data_sources as data_source_store;
pub use evaluation as evaluation_store;
pub use questions as question_store;
pub use users as user_store;

use crate::error::{AskdbError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Handle on the application state database.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    db_path: Option<PathBuf>,
}

impl Store {
    /// Opens or creates the state database at the default platform path.
    pub async fn open_default() -> Result<Self> {
        let path = Self::default_path()?;
        Self::open(&path).await
    }

    /// Opens or creates the state database at the specified path.
    pub async fn open(path: &Path) -> Result<Self> {
        Self::ensure_parent_dirs(path)?;

        let conn_str = format!("sqlite:{}?mode=rwc", path.display());
        let options = SqliteConnectOptions::from_str(&conn_str)
            .map_err(|e| AskdbError::persistence(format!("Invalid database path: {e}")))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| {
                AskdbError::persistence(format!("Failed to open state database: {e}"))
            })?;

        migrations::run_migrations(&pool).await?;
        info!("State database opened at {}", path.display());

        Ok(Self {
            pool,
            db_path: Some(path.to_path_buf()),
        })
    }

    /// Opens an in-memory store. Used by tests and throwaway sessions.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| AskdbError::persistence(format!("Invalid database URI: {e}")))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                AskdbError::persistence(format!("Failed to open in-memory database: {e}"))
            })?;

        migrations::run_migrations(&pool).await?;

        Ok(Self {
            pool,
            db_path: None,
        })
    }

    /// Returns the default state database path for the current platform.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AskdbError::persistence("Could not determine config directory"))?;
        Ok(config_dir.join("askdb").join("state.db"))
    }

    fn ensure_parent_dirs(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AskdbError::persistence(format!(
                    "Failed to create state directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        Ok(())
    }

    /// Returns the path to the state database, if file-backed.
    pub fn path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
