//! Journey story progress: levels of answered questions.

use super::{check_pairs, QuestionAnswer, QuestionAnswerInput};
use crate::db::{from_millis, now, to_millis, Database};
use crate::error::Result;
use crate::validate::Validator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct SaveJourneyRequest {
    pub levels: Option<Vec<LevelInput>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelInput {
    pub title: Option<String>,
    #[serde(default)]
    pub question_answers: Vec<QuestionAnswerInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub title: String,
    pub question_answers: Vec<QuestionAnswer>,
}

impl SaveJourneyRequest {
    pub fn validate(&self) -> Result<Vec<Level>> {
        let mut v = Validator::new();
        let Some(levels) = v.required_list("levels", self.levels.as_deref()) else {
            return Err(v.into_error("Levels are required and must be an array."));
        };

        let levels: Vec<Level> = levels
            .iter()
            .enumerate()
            .filter_map(|(i, level)| {
                let title = v.required(&format!("levels[{i}].title"), level.title.as_deref());
                let question_answers = check_pairs(
                    &mut v,
                    &format!("levels[{i}].questionAnswers"),
                    &level.question_answers,
                );
                Some(Level {
                    title: title?,
                    question_answers,
                })
            })
            .collect();

        v.finish("Invalid journey levels.")?;
        Ok(levels)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyRecord {
    pub id: String,
    pub email: String,
    pub levels: Vec<Level>,
    pub created_at: DateTime<Utc>,
}

pub struct JourneyRepo {
    db: Database,
}

impl JourneyRepo {
    pub fn new(db: Database) -> anyhow::Result<Self> {
        db.lock().execute_batch(
            "CREATE TABLE IF NOT EXISTS journeys (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                levels TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_journeys_email ON journeys(email);",
        )?;
        Ok(Self { db })
    }

    pub fn create(&self, email: &str, levels: Vec<Level>) -> Result<JourneyRecord> {
        let record = JourneyRecord {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            levels,
            created_at: now(),
        };
        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO journeys (id, email, levels, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                record.id,
                record.email,
                serde_json::to_string(&record.levels)?,
                to_millis(record.created_at),
            ],
        )?;
        Ok(record)
    }

    /// Newest first.
    pub fn list(&self, email: &str) -> Result<Vec<JourneyRecord>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(
            "SELECT id, email, levels, created_at FROM journeys
             WHERE email = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![email], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, email, levels, created_at)| -> Result<JourneyRecord> {
                Ok(JourneyRecord {
                    id,
                    email,
                    levels: serde_json::from_str(&levels)?,
                    created_at: from_millis(created_at),
                })
            })
            .collect()
    }
}
