//! Body-map muscle selection. One selection per user; saving replaces it.

use crate::db::{from_millis, now, to_millis, Database};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Muscle {
    Chest,
    Obliques,
    Abs,
    Biceps,
    Triceps,
    Neck,
    FrontDeltoids,
    Head,
    Abductors,
    Quadriceps,
    Knees,
    Calves,
    Forearm,
    Trapezius,
    BackDeltoids,
    UpperBack,
    LowerBack,
    Gluteal,
    Hamstring,
    LeftSoleus,
    RightSoleus,
}

impl Muscle {
    pub const ALL: [Muscle; 21] = [
        Self::Chest,
        Self::Obliques,
        Self::Abs,
        Self::Biceps,
        Self::Triceps,
        Self::Neck,
        Self::FrontDeltoids,
        Self::Head,
        Self::Abductors,
        Self::Quadriceps,
        Self::Knees,
        Self::Calves,
        Self::Forearm,
        Self::Trapezius,
        Self::BackDeltoids,
        Self::UpperBack,
        Self::LowerBack,
        Self::Gluteal,
        Self::Hamstring,
        Self::LeftSoleus,
        Self::RightSoleus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chest => "CHEST",
            Self::Obliques => "OBLIQUES",
            Self::Abs => "ABS",
            Self::Biceps => "BICEPS",
            Self::Triceps => "TRICEPS",
            Self::Neck => "NECK",
            Self::FrontDeltoids => "FRONT_DELTOIDS",
            Self::Head => "HEAD",
            Self::Abductors => "ABDUCTORS",
            Self::Quadriceps => "QUADRICEPS",
            Self::Knees => "KNEES",
            Self::Calves => "CALVES",
            Self::Forearm => "FOREARM",
            Self::Trapezius => "TRAPEZIUS",
            Self::BackDeltoids => "BACK_DELTOIDS",
            Self::UpperBack => "UPPER_BACK",
            Self::LowerBack => "LOWER_BACK",
            Self::Gluteal => "GLUTEAL",
            Self::Hamstring => "HAMSTRING",
            Self::LeftSoleus => "LEFT_SOLEUS",
            Self::RightSoleus => "RIGHT_SOLEUS",
        }
    }

    /// Trims and upper-cases before matching.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_uppercase();
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMusclesRequest {
    pub selected_muscles: Option<Vec<String>>,
}

impl SaveMusclesRequest {
    /// Duplicates collapse to their first occurrence.
    pub fn validate(&self) -> Result<Vec<Muscle>> {
        let names = self.selected_muscles.as_ref().ok_or_else(|| {
            AppError::invalid_field("selectedMuscles", "Selected muscles must be an array.")
        })?;

        let mut muscles = Vec::with_capacity(names.len());
        let mut invalid = Vec::new();
        for name in names {
            match Muscle::parse(name) {
                Some(m) if !muscles.contains(&m) => muscles.push(m),
                Some(_) => {}
                None => invalid.push(name.trim().to_uppercase()),
            }
        }

        if !invalid.is_empty() {
            return Err(AppError::invalid_field(
                "selectedMuscles",
                format!("Invalid muscles: {}", invalid.join(", ")),
            ));
        }
        Ok(muscles)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MuscleSelection {
    pub id: String,
    pub email: String,
    pub selected_muscles: Vec<Muscle>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct MuscleRepo {
    db: Database,
}

impl MuscleRepo {
    pub fn new(db: Database) -> anyhow::Result<Self> {
        db.lock().execute_batch(
            "CREATE TABLE IF NOT EXISTS muscle_selections (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                selected_muscles TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );",
        )?;
        Ok(Self { db })
    }

    /// Insert or replace the user's selection. The first id and creation
    /// time survive a replace.
    pub fn save(&self, email: &str, muscles: &[Muscle]) -> Result<MuscleSelection> {
        let at = to_millis(now());
        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO muscle_selections (id, email, selected_muscles, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(email) DO UPDATE SET
                selected_muscles = excluded.selected_muscles,
                updated_at = excluded.updated_at",
            rusqlite::params![
                uuid::Uuid::new_v4().to_string(),
                email,
                serde_json::to_string(muscles)?,
                at,
            ],
        )?;
        drop(conn);

        self.get(email)?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("muscle selection vanished after save")))
    }

    pub fn get(&self, email: &str) -> Result<Option<MuscleSelection>> {
        let conn = self.db.lock();
        let row = conn
            .query_row(
                "SELECT id, email, selected_muscles, created_at, updated_at
                 FROM muscle_selections WHERE email = ?1",
                rusqlite::params![email],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, email, muscles, created_at, updated_at)) = row else {
            return Ok(None);
        };
        Ok(Some(MuscleSelection {
            id,
            email,
            selected_muscles: serde_json::from_str(&muscles)?,
            created_at: from_millis(created_at),
            updated_at: from_millis(updated_at),
        }))
    }
}
