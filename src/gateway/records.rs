//! `/api/*` record handlers. All run behind the auth middleware and write
//! records owned by the caller's email.

use super::AppState;
use crate::auth::Identity;
use crate::error::{AppError, Result};
use crate::records::experience::{
    AudioRecord, PostExperienceRecord, SaveAudioRequest, SavePostExperienceRequest,
};
use crate::records::journal::{JournalRecord, SaveJournalRequest};
use crate::records::journey::{JourneyRecord, SaveJourneyRequest};
use crate::records::muscles::{MuscleSelection, SaveMusclesRequest};
use crate::records::onboarding::{OnboardingRecord, SaveAnswersRequest};
use crate::records::Saved;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;

type Created<T> = Result<(StatusCode, Json<Saved<T>>)>;

fn created<T>(message: &'static str, data: T) -> Created<T> {
    Ok((StatusCode::CREATED, Json(Saved { message, data })))
}

/// POST /api/save-answers
pub async fn handle_save_answers(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<SaveAnswersRequest>, JsonRejection>,
) -> Created<OnboardingRecord> {
    let Json(body) = body?;
    let responses = body.validate()?;
    let record = state.records.onboarding.create(&identity.email, responses)?;
    tracing::info!(user_id = %identity.user_id, record_id = %record.id, "Onboarding answers saved");
    created("Answers saved successfully!", record)
}

/// GET /api/save-answers
pub async fn handle_list_answers(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<OnboardingRecord>>> {
    Ok(Json(state.records.onboarding.list(&identity.email)?))
}

/// POST /api/journal
pub async fn handle_save_journal(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<SaveJournalRequest>, JsonRejection>,
) -> Created<JournalRecord> {
    let Json(body) = body?;
    let entry = body.validate()?;
    let record = state.records.journal.create(&identity.email, entry)?;
    tracing::info!(user_id = %identity.user_id, record_id = %record.id, "Journal entry saved");
    created("Journal entry saved successfully!", record)
}

/// GET /api/journal
pub async fn handle_list_journal(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<JournalRecord>>> {
    Ok(Json(state.records.journal.list(&identity.email)?))
}

/// POST /api/save-muscles
pub async fn handle_save_muscles(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<SaveMusclesRequest>, JsonRejection>,
) -> Created<MuscleSelection> {
    let Json(body) = body?;
    let muscles = body.validate()?;
    let selection = state.records.muscles.save(&identity.email, &muscles)?;
    tracing::info!(user_id = %identity.user_id, count = muscles.len(), "Muscle selection saved");
    created("Muscles saved successfully!", selection)
}

/// GET /api/save-muscles
pub async fn handle_get_muscles(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<MuscleSelection>> {
    state
        .records
        .muscles
        .get(&identity.email)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No muscle selection saved".into()))
}

/// POST /api/story-answers
pub async fn handle_save_journey(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<SaveJourneyRequest>, JsonRejection>,
) -> Created<JourneyRecord> {
    let Json(body) = body?;
    let levels = body.validate()?;
    let record = state.records.journeys.create(&identity.email, levels)?;
    tracing::info!(user_id = %identity.user_id, record_id = %record.id, "Journey saved");
    created("Journey saved successfully!", record)
}

/// GET /api/story-answers
pub async fn handle_list_journeys(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<JourneyRecord>>> {
    Ok(Json(state.records.journeys.list(&identity.email)?))
}

/// POST /api/savePostExperience
pub async fn handle_save_post_experience(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<SavePostExperienceRequest>, JsonRejection>,
) -> Created<PostExperienceRecord> {
    let Json(body) = body?;
    let text = body.validate()?;
    let record = state.records.post_experiences.create(&identity.email, text)?;
    created("Journal entry saved successfully!", record)
}

/// GET /api/savePostExperience
pub async fn handle_list_post_experiences(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<PostExperienceRecord>>> {
    Ok(Json(state.records.post_experiences.list(&identity.email)?))
}

/// POST /api/saveAudio
pub async fn handle_save_audio(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<SaveAudioRequest>, JsonRejection>,
) -> Created<AudioRecord> {
    let Json(body) = body?;
    let audio = body.validate()?;
    let record = state.records.audio.create(&identity.email, audio)?;
    created("Audio entry saved successfully!", record)
}

/// GET /api/saveAudio
pub async fn handle_list_audio(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<AudioRecord>>> {
    Ok(Json(state.records.audio.list(&identity.email)?))
}
