//! User records.
//!
//! Minimal owner records for questions. Authentication and sessions are
//! handled by the surrounding web layer, not here.

use crate::error::{AskdbError, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub created_at: String,
}

/// Creates a user and returns the stored record.
pub async fn create_user(pool: &SqlitePool, email: &str, name: &str) -> Result<User> {
    let result = sqlx::query("INSERT INTO users (email, name) VALUES (?, ?)")
        .bind(email)
        .bind(name)
        .execute(pool)
        .await
        .map_err(|e| AskdbError::persistence(format!("Failed to create user: {e}")))?;

    get_user(pool, result.last_insert_rowid()).await
}

/// Fetches a user by id.
pub async fn get_user(pool: &SqlitePool, id: i64) -> Result<User> {
    sqlx::query_as::<_, User>("SELECT id, email, name, created_at FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| AskdbError::persistence(format!("Failed to fetch user: {e}")))?
        .ok_or_else(|| AskdbError::not_found(format!("user {id}")))
}

/// Fetches a user by email, if one exists.
pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT id, email, name, created_at FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(|e| AskdbError::persistence(format!("Failed to fetch user: {e}")))
}
