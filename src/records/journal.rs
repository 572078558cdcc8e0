//! Journal entries for a single session.

use crate::db::{from_millis, now, to_millis, Database};
use crate::error::{AppError, Result};
use crate::validate::Validator;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveJournalRequest {
    pub journal_entry: Option<JournalEntryInput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntryInput {
    pub medicine: Option<String>,
    pub intention: Option<String>,
    pub experience_date: Option<String>,
    pub current_state: Option<String>,
    pub post_experience: Option<String>,
}

/// A validated entry ready to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJournalEntry {
    pub medicine: String,
    pub intention: String,
    pub experience_date: NaiveDate,
    pub current_state: String,
    pub post_experience: String,
}

impl SaveJournalRequest {
    pub fn validate(&self) -> Result<NewJournalEntry> {
        let input = self
            .journal_entry
            .as_ref()
            .ok_or_else(|| AppError::invalid_field("journalEntry", "All fields are required."))?;

        let mut v = Validator::new();
        let medicine = v.required("medicine", input.medicine.as_deref());
        let intention = v.required("intention", input.intention.as_deref());
        let experience_date = v.required("experienceDate", input.experience_date.as_deref());
        let current_state = v.required("currentState", input.current_state.as_deref());
        let post_experience = v.required("postExperience", input.post_experience.as_deref());

        match (medicine, intention, experience_date, current_state, post_experience) {
            (Some(medicine), Some(intention), Some(date), Some(current_state), Some(post_experience)) => {
                let experience_date = parse_experience_date(&date).ok_or_else(|| {
                    AppError::invalid_field("experienceDate", "Invalid experience date.")
                })?;
                Ok(NewJournalEntry {
                    medicine,
                    intention,
                    experience_date,
                    current_state,
                    post_experience,
                })
            }
            _ => Err(v.into_error("All fields are required.")),
        }
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (reduced to its UTC date).
pub fn parse_experience_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalRecord {
    pub id: String,
    pub email: String,
    pub medicine: String,
    pub intention: String,
    /// Always `YYYY-MM-DD`.
    pub experience_date: String,
    pub current_state: String,
    pub post_experience: String,
    pub created_at: DateTime<Utc>,
}

pub struct JournalRepo {
    db: Database,
}

impl JournalRepo {
    pub fn new(db: Database) -> anyhow::Result<Self> {
        db.lock().execute_batch(
            "CREATE TABLE IF NOT EXISTS journal_entries (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                medicine TEXT NOT NULL,
                intention TEXT NOT NULL,
                experience_date TEXT NOT NULL,
                current_state TEXT NOT NULL,
                post_experience TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_journal_email ON journal_entries(email);",
        )?;
        Ok(Self { db })
    }

    pub fn create(&self, email: &str, entry: NewJournalEntry) -> Result<JournalRecord> {
        let record = JournalRecord {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            medicine: entry.medicine,
            intention: entry.intention,
            experience_date: entry.experience_date.format("%Y-%m-%d").to_string(),
            current_state: entry.current_state,
            post_experience: entry.post_experience,
            created_at: now(),
        };
        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO journal_entries
                (id, email, medicine, intention, experience_date, current_state, post_experience, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                record.id,
                record.email,
                record.medicine,
                record.intention,
                record.experience_date,
                record.current_state,
                record.post_experience,
                to_millis(record.created_at),
            ],
        )?;
        Ok(record)
    }

    /// Newest first.
    pub fn list(&self, email: &str) -> Result<Vec<JournalRecord>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(
            "SELECT id, email, medicine, intention, experience_date, current_state, post_experience, created_at
             FROM journal_entries WHERE email = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let entries = stmt
            .query_map(rusqlite::params![email], |row| {
                Ok(JournalRecord {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    medicine: row.get(2)?,
                    intention: row.get(3)?,
                    experience_date: row.get(4)?,
                    current_state: row.get(5)?,
                    post_experience: row.get(6)?,
                    created_at: from_millis(row.get(7)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
