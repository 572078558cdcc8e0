//! SQLite-backed credential store.
//!
//! Tables:
//! - `users`: id, email (unique, normalized), password_hash, name, created_at
//!
//! Emails are normalized before every read and write. Uniqueness is enforced
//! by the table constraint, so concurrent registrations of the same address
//! cannot both succeed.

use crate::db::{from_millis, now, to_millis, Database};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;

/// A registered user, including the password digest.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Lowercase and trim; the uniqueness key for users.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct UserStore {
    db: Database,
}

impl UserStore {
    pub fn new(db: Database) -> anyhow::Result<Self> {
        db.lock().execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                name TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );",
        )?;
        Ok(Self { db })
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.db.lock();
        let user = conn
            .query_row(
                "SELECT id, email, password_hash, name, created_at FROM users WHERE email = ?1",
                rusqlite::params![normalize_email(email)],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn find_by_id(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.db.lock();
        let user = conn
            .query_row(
                "SELECT id, email, password_hash, name, created_at FROM users WHERE id = ?1",
                rusqlite::params![user_id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Insert a new user. `password_hash` must already be a digest.
    pub fn create(&self, email: &str, password_hash: &str, name: &str) -> Result<User> {
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: normalize_email(email),
            password_hash: password_hash.to_string(),
            name: name.to_string(),
            created_at: now(),
        };

        let conn = self.db.lock();
        let result = conn.execute(
            "INSERT INTO users (id, email, password_hash, name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                user.id,
                user.email,
                user.password_hash,
                user.name,
                to_millis(user.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(user),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(AppError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn user_count(&self) -> Result<u64> {
        let conn = self.db.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        name: row.get(3)?,
        created_at: from_millis(row.get(4)?),
    })
}
