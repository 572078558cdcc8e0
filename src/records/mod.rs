//! Per-user journal records: onboarding answers, journal entries, body-map
//! muscle selections, journey story progress, post-experience notes and
//! audio notes.
//!
//! Each entity has its own repository over the shared [`Database`]. Records
//! are always owned by the authenticated user's email, never a client-supplied
//! one. Nested lists are stored as JSON text.

pub mod experience;
pub mod journal;
pub mod journey;
pub mod muscles;
pub mod onboarding;

use crate::db::Database;
use crate::validate::Validator;
use serde::{Deserialize, Serialize};

pub use experience::{AudioRepo, PostExperienceRepo};
pub use journal::JournalRepo;
pub use journey::JourneyRepo;
pub use muscles::{Muscle, MuscleRepo};
pub use onboarding::OnboardingRepo;

/// Response envelope for a created record.
#[derive(Debug, Serialize)]
pub struct Saved<T> {
    pub message: &'static str,
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuestionAnswerInput {
    pub question: Option<String>,
    pub answer: Option<String>,
}

/// Validate a list of question/answer pairs, reporting fields as
/// `{prefix}[i].question`.
pub(crate) fn check_pairs(
    v: &mut Validator,
    prefix: &str,
    items: &[QuestionAnswerInput],
) -> Vec<QuestionAnswer> {
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let question = v.required(&format!("{prefix}[{i}].question"), item.question.as_deref());
            let answer = v.required(&format!("{prefix}[{i}].answer"), item.answer.as_deref());
            Some(QuestionAnswer {
                question: question?,
                answer: answer?,
            })
        })
        .collect()
}

/// Every record repository, built once at startup.
pub struct Repositories {
    pub onboarding: OnboardingRepo,
    pub journal: JournalRepo,
    pub muscles: MuscleRepo,
    pub journeys: JourneyRepo,
    pub post_experiences: PostExperienceRepo,
    pub audio: AudioRepo,
}

impl Repositories {
    pub fn new(db: &Database) -> anyhow::Result<Self> {
        Ok(Self {
            onboarding: OnboardingRepo::new(db.clone())?,
            journal: JournalRepo::new(db.clone())?,
            muscles: MuscleRepo::new(db.clone())?,
            journeys: JourneyRepo::new(db.clone())?,
            post_experiences: PostExperienceRepo::new(db.clone())?,
            audio: AudioRepo::new(db.clone())?,
        })
    }
}
