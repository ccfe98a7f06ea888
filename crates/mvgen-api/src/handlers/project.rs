//! Project generation handlers.

use axum::extract::{Path, State};
use axum::Json;
use tracing::{info, warn};
use validator::Validate;

use mvgen_models::{
    GenerateLyricsRequest, GenerateResponse, ImagesResponse, LyricsResponse, MusicResponse,
    ProjectId, ProjectResponse, Stage, StageRequest, StageResult, StageSummary, VideoResponse,
};
use mvgen_pipeline::StageError;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Project ID named by a stage request.
fn requested_project(request: &StageRequest) -> ApiResult<ProjectId> {
    request.validate()?;
    match request.project_id() {
        Some(Ok(id)) => Ok(id),
        Some(Err(e)) => Err(ApiError::bad_request(e)),
        None => Err(ApiError::bad_request("lyricsId is required")),
    }
}

/// Provider failures during lyrics generation fail the lyrics stage.
fn lyrics_error(e: StageError) -> ApiError {
    match e {
        StageError::TransientProvider(_) | StageError::InvalidResponse(_) => {
            ApiError::stage_failed(Stage::Lyrics, e.to_string())
        }
        other => other.into(),
    }
}

fn reject_fatal(stage: Stage, result: &StageResult) -> ApiResult<()> {
    match result {
        StageResult::Fatal { reason } => Err(ApiError::stage_failed(stage, reason.clone())),
        _ => Ok(()),
    }
}

/// Run one post-lyrics stage for the requested project.
async fn run_requested(
    state: &AppState,
    request: &StageRequest,
    stage: Stage,
) -> ApiResult<(ProjectId, StageResult)> {
    let id = requested_project(request)?;
    info!(project_id = %id, stage = %stage, force = request.force, "Stage requested");

    let result = state.pipeline.run(&id, stage, request.force).await?;
    if let Some(reason) = result.reason() {
        warn!(project_id = %id, stage = %stage, status = %result.status(), "{}", reason);
    }
    reject_fatal(stage, &result)?;
    Ok((id, result))
}

/// POST /api/generate-lyrics
pub async fn generate_lyrics(
    State(state): State<AppState>,
    Json(request): Json<GenerateLyricsRequest>,
) -> ApiResult<Json<LyricsResponse>> {
    request.validate()?;

    let record = state
        .pipeline
        .generate_lyrics(&request.prompt)
        .await
        .map_err(lyrics_error)?;

    info!(project_id = %record.id, "Created project");
    Ok(Json(LyricsResponse::from(&record)))
}

/// POST /api/generate-music
pub async fn generate_music(
    State(state): State<AppState>,
    Json(request): Json<StageRequest>,
) -> ApiResult<Json<MusicResponse>> {
    let (id, result) = run_requested(&state, &request, Stage::Music).await?;
    Ok(Json(MusicResponse::new(id, &result)))
}

/// POST /api/generate-images
pub async fn generate_images(
    State(state): State<AppState>,
    Json(request): Json<StageRequest>,
) -> ApiResult<Json<ImagesResponse>> {
    let (id, result) = run_requested(&state, &request, Stage::Images).await?;
    Ok(Json(ImagesResponse::new(id, &result)))
}

/// POST /api/assemble-video
pub async fn assemble_video(
    State(state): State<AppState>,
    Json(request): Json<StageRequest>,
) -> ApiResult<Json<VideoResponse>> {
    let (id, result) = run_requested(&state, &request, Stage::Assembly).await?;
    Ok(Json(VideoResponse::new(id, &result)))
}

/// POST /api/generate
///
/// Runs every stage for a new project. A fatal stage fails the request
/// with that stage named in the error body.
pub async fn generate_all(
    State(state): State<AppState>,
    Json(request): Json<GenerateLyricsRequest>,
) -> ApiResult<Json<GenerateResponse>> {
    request.validate()?;

    let run = state
        .pipeline
        .run_all(&request.prompt)
        .await
        .map_err(lyrics_error)?;

    if let Some((stage, result)) = run.fatal_stage() {
        reject_fatal(stage, result)?;
    }

    info!(project_id = %run.project.id, "Pipeline completed");
    Ok(Json(GenerateResponse {
        id: run.project.id.clone(),
        lyrics: run.project.lyrics.clone(),
        stages: run
            .stages
            .iter()
            .map(|(stage, result)| StageSummary::from_result(*stage, result))
            .collect(),
    }))
}

/// GET /api/project/:id
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProjectResponse>> {
    let id = ProjectId::parse(&id).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let status = state.pipeline.project_status(&id).await?;
    Ok(Json(ProjectResponse::new(&status.project, &status.stages)))
}
