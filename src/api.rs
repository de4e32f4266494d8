//! HTTP API handlers for Smokefree.
//!
//! Survey submissions are scored once and stored; every read route returns
//! the stored snapshot without recomputing it. Progress summaries are
//! derived from the daily log on read.
//!
//! Logging records user ids, scores and counts. Free-text notes are never
//! logged.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{SubsecRound, Utc};
use tracing::{info, instrument, warn};

use crate::calculator::{build_health_timeline, evaluate_profile, non_negative, to_count};
use crate::error::AppError;
use crate::mapping::LegacySurveyRecord;
use crate::model::{
    CoachMemberView, HealthTimelineQuery, HealthTimelineResponse, ProgressEntry,
    ProgressEntryRequest, ProgressQuery, ProgressSummary, SmokingProfile, SurveyQuestionsResponse,
    SurveyRecord, SurveySubmission,
};
use crate::progress::{CRAVING_RANGE, summarize_progress};
use crate::storage::Storage;
use crate::tables::ScoringTables;

/// Number of log entries included in the coach view.
const COACH_RECENT_ENTRIES: usize = 7;

/// Longest accepted user id.
const MAX_USER_ID_LEN: usize = 128;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub tables: Arc<ScoringTables>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/survey/questions", get(get_survey_questions))
        .route("/survey/:user_id", get(get_survey).post(post_survey))
        .route("/legacy/survey/:user_id", post(post_legacy_survey))
        .route("/progress/:user_id", get(get_progress).post(post_progress))
        .route("/progress/:user_id/summary", get(get_progress_summary))
        .route("/health-timeline", get(get_health_timeline))
        .route("/coach/members/:user_id", get(get_coach_member))
        .with_state(state)
}

fn validate_user_id(user_id: &str) -> Result<(), AppError> {
    if user_id.trim().is_empty() {
        return Err(AppError::Validation("user id must not be empty".to_string()));
    }
    if user_id.len() > MAX_USER_ID_LEN {
        return Err(AppError::Validation(format!(
            "user id must be at most {MAX_USER_ID_LEN} bytes"
        )));
    }
    Ok(())
}

fn whole_craving_level(value: f64) -> Option<u8> {
    // `as` maps NaN to 0 and saturates, so the round trip rejects those too.
    let level = value as u8;
    (f64::from(level) == value && CRAVING_RANGE.contains(&level)).then_some(level)
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// GET /survey/questions - FTND questions and price tiers for the survey form.
pub async fn get_survey_questions(
    State(state): State<AppState>,
) -> Json<SurveyQuestionsResponse> {
    Json(SurveyQuestionsResponse {
        ftnd_questions: state.tables.ftnd_questions.clone(),
        price_tiers: state.tables.price_tiers.clone(),
    })
}

/// Score a submission and store the snapshot, replacing any previous one.
async fn submit_survey(
    state: &AppState,
    user_id: String,
    submission: &SurveySubmission,
) -> Result<SurveyRecord, AppError> {
    validate_user_id(&user_id)?;

    let profile = SmokingProfile::from_submission(submission, &state.tables);
    // Storage keeps millisecond precision.
    let now = Utc::now().trunc_subsecs(3);
    let metrics = evaluate_profile(&state.tables, &profile, now);

    let record = SurveyRecord {
        user_id,
        cigarettes_per_day: profile.cigarettes_per_day,
        years_smoked: profile.years_smoked,
        age: profile.age,
        motivation: profile.motivation,
        package_price_vnd: profile.package_price_vnd,
        price_tier: state
            .tables
            .price_tier_for(profile.package_price_vnd)
            .map(|tier| tier.key.clone()),
        ftnd_answers: profile.ftnd_answers,
        metrics,
    };

    match state.storage.upsert_survey(&record).await {
        Ok(()) => {
            info!(
                user_id = %record.user_id,
                ftnd_score = record.metrics.ftnd_score,
                addiction_level = record.metrics.addiction_level.label(),
                success_probability = record.metrics.success_probability,
                "Survey scored and stored"
            );
            Ok(record)
        }
        Err(e) => {
            warn!(user_id = %record.user_id, error = %e, "Failed to store survey");
            Err(AppError::Storage(e))
        }
    }
}

/// POST /survey/:user_id - Submit survey answers.
///
/// # Request Body
///
/// ```json
/// {
///     "cigarettesPerDay": 15,
///     "yearsSmoked": 5,
///     "age": 30,
///     "motivation": "high",
///     "packagePriceVnd": 25000,
///     "ftndAnswers": { "timeToFirstCigarette": "6To30Minutes", "hardToRefrain": "yes" }
/// }
/// ```
///
/// # Response
///
/// `201 Created` with the stored survey and its metrics snapshot. Values
/// out of range are clamped rather than rejected: negative or non-numeric
/// numbers count as 0, counts are rounded, and an unknown motivation scores
/// neutrally.
#[instrument(skip(state, submission))]
pub async fn post_survey(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(submission): Json<SurveySubmission>,
) -> Result<(StatusCode, Json<SurveyRecord>), AppError> {
    let record = submit_survey(&state, user_id, &submission).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// POST /legacy/survey/:user_id - Import a survey in the legacy PascalCase layout.
#[instrument(skip(state, legacy))]
pub async fn post_legacy_survey(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(legacy): Json<LegacySurveyRecord>,
) -> Result<(StatusCode, Json<SurveyRecord>), AppError> {
    let submission = SurveySubmission::from(legacy);
    let record = submit_survey(&state, user_id, &submission).await?;
    info!(user_id = %record.user_id, "Legacy survey imported");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /survey/:user_id - The stored survey and metrics snapshot.
#[instrument(skip(state))]
pub async fn get_survey(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<SurveyRecord>, AppError> {
    validate_user_id(&user_id)?;

    match state.storage.get_survey(&user_id).await {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err(AppError::NotFound {
            entity: "Survey",
            user_id,
        }),
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Failed to load survey");
            Err(AppError::Storage(e))
        }
    }
}

/// POST /progress/:user_id - Log one day of progress.
///
/// # Request Body
///
/// ```json
/// {
///     "date": "2024-05-01",
///     "cigarettesSmoked": 0,
///     "cravingLevel": 4,
///     "notes": "optional"
/// }
/// ```
///
/// `date` defaults to today (UTC). A negative or fractional
/// `cigarettesSmoked` is clamped and rounded. Returns `409 Conflict` if the
/// day is already logged and `400 Bad Request` unless the craving level is a
/// whole number from 1 to 10.
#[instrument(skip(state, request))]
pub async fn post_progress(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<ProgressEntryRequest>,
) -> Result<(StatusCode, Json<ProgressEntry>), AppError> {
    validate_user_id(&user_id)?;

    let Some(craving_level) = whole_craving_level(request.craving_level) else {
        return Err(AppError::Validation(format!(
            "cravingLevel must be a whole number between {} and {}",
            CRAVING_RANGE.start(),
            CRAVING_RANGE.end()
        )));
    };

    let entry = ProgressEntry {
        date: request.date.unwrap_or_else(|| Utc::now().date_naive()),
        cigarettes_smoked: to_count(request.cigarettes_smoked),
        craving_level,
        notes: request.notes.filter(|n| !n.trim().is_empty()),
    };

    match state.storage.insert_progress_entry(&user_id, &entry).await {
        Ok(true) => {
            info!(
                user_id = %user_id,
                date = %entry.date,
                cigarettes_smoked = entry.cigarettes_smoked,
                craving_level = entry.craving_level,
                "Progress entry recorded"
            );
            Ok((StatusCode::CREATED, Json(entry)))
        }
        Ok(false) => Err(AppError::Conflict(format!(
            "progress for {} is already logged",
            entry.date
        ))),
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Failed to record progress entry");
            Err(AppError::Storage(e))
        }
    }
}

/// GET /progress/:user_id - List logged days.
///
/// # Query Parameters
///
/// - `from` (optional): first date to include
/// - `to` (optional): last date to include
#[instrument(skip(state))]
pub async fn get_progress(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<ProgressQuery>,
) -> Result<Json<Vec<ProgressEntry>>, AppError> {
    validate_user_id(&user_id)?;

    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(AppError::Validation(
                "'from' must not be after 'to'".to_string(),
            ));
        }
    }

    let entries = state
        .storage
        .list_progress_entries(&user_id, query.from, query.to)
        .await
        .inspect_err(|e| warn!(user_id = %user_id, error = %e, "Failed to list progress"))?;

    info!(user_id = %user_id, entry_count = entries.len(), "Progress listed");
    Ok(Json(entries))
}

/// Load a user's log and survey and derive the progress summary.
async fn load_progress(
    state: &AppState,
    user_id: &str,
) -> anyhow::Result<(Option<SurveyRecord>, Vec<ProgressEntry>, ProgressSummary)> {
    let survey = state.storage.get_survey(user_id).await?;
    let entries = state
        .storage
        .list_progress_entries(user_id, None, None)
        .await?;
    let summary = summarize_progress(&state.tables, &entries, survey.as_ref());

    Ok((survey, entries, summary))
}

/// GET /progress/:user_id/summary - Streaks, savings and achievement score.
#[instrument(skip(state))]
pub async fn get_progress_summary(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProgressSummary>, AppError> {
    validate_user_id(&user_id)?;

    match load_progress(&state, &user_id).await {
        Ok((_, _, summary)) => {
            info!(
                user_id = %user_id,
                current_streak = summary.current_streak,
                achievement_score = summary.achievement_score,
                "Progress summary queried"
            );
            Ok(Json(summary))
        }
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Failed to summarize progress");
            Err(AppError::Storage(e))
        }
    }
}

/// GET /health-timeline - Annotate the health milestones for a day count.
///
/// # Query Parameters
///
/// - `days` (optional): smoke-free days, fractional allowed (default: 0).
///   Negative, NaN and infinite values count as 0.
pub async fn get_health_timeline(
    State(state): State<AppState>,
    Query(query): Query<HealthTimelineQuery>,
) -> Json<HealthTimelineResponse> {
    let days = non_negative(query.days);

    Json(HealthTimelineResponse {
        smoke_free_days: days,
        milestones: build_health_timeline(&state.tables, days),
    })
}

/// GET /coach/members/:user_id - Everything a coach sees for one member.
///
/// Returns the stored survey snapshot (if any), the progress summary and
/// the most recent log entries, newest first.
#[instrument(skip(state))]
pub async fn get_coach_member(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<CoachMemberView>, AppError> {
    validate_user_id(&user_id)?;

    let (survey, entries, progress) = load_progress(&state, &user_id)
        .await
        .inspect_err(|e| warn!(user_id = %user_id, error = %e, "Failed to load member"))?;

    let recent_entries: Vec<ProgressEntry> = entries
        .into_iter()
        .rev()
        .take(COACH_RECENT_ENTRIES)
        .collect();

    info!(
        user_id = %user_id,
        has_survey = survey.is_some(),
        recent_entries = recent_entries.len(),
        "Coach member view queried"
    );

    Ok(Json(CoachMemberView {
        user_id,
        survey,
        progress,
        recent_entries,
    }))
}
