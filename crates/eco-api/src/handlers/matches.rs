use axum::{Json, extract::State, extract::rejection::JsonRejection};
use tracing::info;

use eco_common::api::{
    ExplainRequest, ExplainResponse, MatchRequest, MatchResponse, RefineRequest,
};

use super::{json_body, require_id};
use crate::SharedState;
use crate::error::ApiError;

pub async fn run_match(
    State(state): State<SharedState>,
    payload: Result<Json<MatchRequest>, JsonRejection>,
) -> Result<Json<MatchResponse>, ApiError> {
    let request = json_body(payload)?;
    require_id("user_id", &request.user_id)?;

    let outcome = state.pipeline.run(request.into()).await?;
    info!(run_id = %outcome.run_id, matches = outcome.matches.len(), "match request served");

    Ok(Json(outcome.into()))
}

pub async fn refine(
    State(state): State<SharedState>,
    payload: Result<Json<RefineRequest>, JsonRejection>,
) -> Result<Json<MatchResponse>, ApiError> {
    let request = json_body(payload)?;
    require_id("user_id", &request.user_id)?;

    let outcome = state.pipeline.run(request.into()).await?;
    info!(
        run_id = %outcome.run_id,
        matches = outcome.matches.len(),
        iterations = outcome.iterations,
        "refine request served"
    );

    Ok(Json(outcome.into()))
}

pub async fn explain(
    State(state): State<SharedState>,
    payload: Result<Json<ExplainRequest>, JsonRejection>,
) -> Result<Json<ExplainResponse>, ApiError> {
    let request = json_body(payload)?;
    require_id("user_id", &request.user_id)?;
    require_id("project_id", &request.project_id)?;

    let explained = state
        .pipeline
        .explain_project(&request.user_id, &request.project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project {} not found", request.project_id)))?;

    Ok(Json(explained.into()))
}
