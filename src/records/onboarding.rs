//! Onboarding questionnaire answers.

use super::{check_pairs, QuestionAnswer, QuestionAnswerInput};
use crate::db::{from_millis, now, to_millis, Database};
use crate::error::Result;
use crate::validate::Validator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct SaveAnswersRequest {
    pub responses: Option<Vec<QuestionAnswerInput>>,
}

impl SaveAnswersRequest {
    pub fn validate(&self) -> Result<Vec<QuestionAnswer>> {
        let mut v = Validator::new();
        let pairs = v
            .required_list("responses", self.responses.as_deref())
            .map(|items| check_pairs(&mut v, "responses", items))
            .unwrap_or_default();
        v.finish("Responses are required and must be an array.")?;
        Ok(pairs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRecord {
    pub id: String,
    pub email: String,
    pub responses: Vec<QuestionAnswer>,
    pub created_at: DateTime<Utc>,
}

pub struct OnboardingRepo {
    db: Database,
}

impl OnboardingRepo {
    pub fn new(db: Database) -> anyhow::Result<Self> {
        db.lock().execute_batch(
            "CREATE TABLE IF NOT EXISTS onboarding_answers (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                responses TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_onboarding_email ON onboarding_answers(email);",
        )?;
        Ok(Self { db })
    }

    pub fn create(&self, email: &str, responses: Vec<QuestionAnswer>) -> Result<OnboardingRecord> {
        let record = OnboardingRecord {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            responses,
            created_at: now(),
        };
        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO onboarding_answers (id, email, responses, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                record.id,
                record.email,
                serde_json::to_string(&record.responses)?,
                to_millis(record.created_at),
            ],
        )?;
        Ok(record)
    }

    /// Newest first.
    pub fn list(&self, email: &str) -> Result<Vec<OnboardingRecord>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(
            "SELECT id, email, responses, created_at FROM onboarding_answers
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
            .map(|(id, email, responses, created_at)| -> Result<OnboardingRecord> {
                Ok(OnboardingRecord {
                    id,
                    email,
                    responses: serde_json::from_str(&responses)?,
                    created_at: from_millis(created_at),
                })
            })
            .collect()
    }
}
