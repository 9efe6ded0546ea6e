use axum::Json;
use axum::extract::{Path, State};
use sea_orm::EntityTrait;
use tracing::instrument;

use crate::entity::hackathon;
use crate::error::{AppError, ErrorBody};
use crate::models::hackathon::*;
use crate::phase::refresh_phase;
use crate::state::AppState;

async fn find_hackathon(state: &AppState, id: i32) -> Result<hackathon::Model, AppError> {
    hackathon::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Hackathon {id} not found")))
}

#[utoipa::path(
    get,
    path = "/{id}/phase",
    tag = "Lifecycle",
    operation_id = "getHackathonPhase",
    summary = "Get the current lifecycle phase",
    description = "Derives the phase from the hackathon's windows at the current time and persists it if the stored phase is stale.",
    params(("id" = i32, Path, description = "Hackathon ID")),
    responses(
        (status = 200, description = "Current phase", body = PhaseResponse),
        (status = 404, description = "Hackathon not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_phase(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PhaseResponse>, AppError> {
    let model = find_hackathon(&state, id).await?;
    let refresh = refresh_phase(&state.db, &model, state.clock.now()).await?;

    Ok(Json(PhaseResponse {
        hackathon_id: model.id,
        phase: refresh.phase,
        stored_phase: model.lifecycle_phase,
        status: model.status,
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/phase/refresh",
    tag = "Lifecycle",
    operation_id = "refreshHackathonPhase",
    summary = "Recompute and persist the lifecycle phase",
    params(("id" = i32, Path, description = "Hackathon ID")),
    responses(
        (status = 200, description = "Phase refreshed", body = PhaseRefreshResponse),
        (status = 404, description = "Hackathon not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn refresh_hackathon_phase(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PhaseRefreshResponse>, AppError> {
    let model = find_hackathon(&state, id).await?;
    let refresh = refresh_phase(&state.db, &model, state.clock.now()).await?;
    Ok(Json(refresh.into()))
}

#[utoipa::path(
    post,
    path = "/{id}/finalize",
    tag = "Results",
    operation_id = "finalizeResults",
    summary = "Finalize and publish results",
    description = "Ranks the top three scored submissions, issues certificates to every member of the winning teams, closes the hackathon and announces the winners. Safe to retry: existing certificates are reused.",
    params(("id" = i32, Path, description = "Hackathon ID")),
    responses(
        (status = 200, description = "Results published", body = FinalizeResponse),
        (status = 404, description = "Hackathon not found (NOT_FOUND)", body = ErrorBody),
        (status = 422, description = "No submission has a positive score (NO_SCORED_SUBMISSIONS)", body = ErrorBody),
        (status = 500, description = "Finalization failed, nothing was committed (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn finalize(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<FinalizeResponse>, AppError> {
    let report = state.finalizer.finalize_results(id).await?;
    Ok(Json(report.into()))
}
