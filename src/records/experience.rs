//! Post-experience outlook notes and audio notes.
//!
//! Both are a single text payload per record, so they share one row shape.

use crate::db::{from_millis, now, to_millis, Database};
use crate::error::Result;
use crate::validate::Validator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePostExperienceRequest {
    pub journal_entry: Option<PostExperienceInput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostExperienceInput {
    pub post_experience: Option<String>,
}

impl SavePostExperienceRequest {
    pub fn validate(&self) -> Result<String> {
        let mut v = Validator::new();
        let text = v.required(
            "postExperience",
            self.journal_entry
                .as_ref()
                .and_then(|e| e.post_experience.as_deref()),
        );
        text.ok_or_else(|| v.into_error("All fields are required."))
    }
}

/// Audio notes arrive as `{postExperience}` holding the clip reference.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAudioRequest {
    pub post_experience: Option<String>,
}

impl SaveAudioRequest {
    pub fn validate(&self) -> Result<String> {
        let mut v = Validator::new();
        let audio = v.required("postExperience", self.post_experience.as_deref());
        audio.ok_or_else(|| v.into_error("All fields are required."))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostExperienceRecord {
    pub id: String,
    pub email: String,
    pub post_experience: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioRecord {
    pub id: String,
    pub email: String,
    pub audio: String,
    pub created_at: DateTime<Utc>,
}

/// Single-text-column table keyed by owner email.
struct NoteTable {
    db: Database,
    table: &'static str,
    column: &'static str,
}

struct NoteRow {
    id: String,
    email: String,
    body: String,
    created_at: DateTime<Utc>,
}

impl NoteTable {
    fn open(db: Database, table: &'static str, column: &'static str) -> anyhow::Result<Self> {
        db.lock().execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                {column} TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_email ON {table}(email);"
        ))?;
        Ok(Self { db, table, column })
    }

    fn insert(&self, email: &str, body: String) -> Result<NoteRow> {
        let row = NoteRow {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            body,
            created_at: now(),
        };
        let conn = self.db.lock();
        conn.execute(
            &format!(
                "INSERT INTO {} (id, email, {}, created_at) VALUES (?1, ?2, ?3, ?4)",
                self.table, self.column
            ),
            rusqlite::params![row.id, row.email, row.body, to_millis(row.created_at)],
        )?;
        Ok(row)
    }

    fn list(&self, email: &str) -> Result<Vec<NoteRow>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, email, {}, created_at FROM {}
             WHERE email = ?1 ORDER BY created_at DESC, rowid DESC",
            self.column, self.table
        ))?;
        let rows = stmt
            .query_map(rusqlite::params![email], |row| {
                Ok(NoteRow {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    body: row.get(2)?,
                    created_at: from_millis(row.get(3)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

pub struct PostExperienceRepo {
    notes: NoteTable,
}

impl PostExperienceRepo {
    pub fn new(db: Database) -> anyhow::Result<Self> {
        Ok(Self {
            notes: NoteTable::open(db, "post_experiences", "post_experience")?,
        })
    }

    pub fn create(&self, email: &str, text: String) -> Result<PostExperienceRecord> {
        self.notes.insert(email, text).map(PostExperienceRecord::from)
    }

    pub fn list(&self, email: &str) -> Result<Vec<PostExperienceRecord>> {
        Ok(self
            .notes
            .list(email)?
            .into_iter()
            .map(PostExperienceRecord::from)
            .collect())
    }
}

pub struct AudioRepo {
    notes: NoteTable,
}

impl AudioRepo {
    pub fn new(db: Database) -> anyhow::Result<Self> {
        Ok(Self {
            notes: NoteTable::open(db, "audio_notes", "audio")?,
        })
    }

    pub fn create(&self, email: &str, audio: String) -> Result<AudioRecord> {
        self.notes.insert(email, audio).map(AudioRecord::from)
    }

    pub fn list(&self, email: &str) -> Result<Vec<AudioRecord>> {
        Ok(self
            .notes
            .list(email)?
            .into_iter()
            .map(AudioRecord::from)
            .collect())
    }
}

impl From<NoteRow> for PostExperienceRecord {
    fn from(row: NoteRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            post_experience: row.body,
            created_at: row.created_at,
        }
    }
}

impl From<NoteRow> for AudioRecord {
    fn from(row: NoteRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            audio: row.body,
            created_at: row.created_at,
        }
    }
}
