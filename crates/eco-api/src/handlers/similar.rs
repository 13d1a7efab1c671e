use axum::{Json, extract::rejection::JsonRejection};

use eco_common::{
    api::{SimilarUser, SimilarUsersRequest, SimilarUsersResponse},
    matching::similarity::similar_users as rank_similar,
};

use super::{json_body, require_id};
use crate::error::ApiError;

const MAX_SIMILAR_USERS: usize = 50;

pub async fn similar_users(
    payload: Result<Json<SimilarUsersRequest>, JsonRejection>,
) -> Result<Json<SimilarUsersResponse>, ApiError> {
    let request = json_body(payload)?;
    require_id("user_id", &request.user_id)?;

    let Some(target) = request.profiles.iter().find(|p| p.id == request.user_id) else {
        return Ok(Json(SimilarUsersResponse::default()));
    };

    let limit = request.limit().min(MAX_SIMILAR_USERS);
    let users = rank_similar(&request.user_id, &request.profiles, limit)
        .into_iter()
        .map(|other| SimilarUser::new(target, other))
        .collect();

    Ok(Json(SimilarUsersResponse { users }))
}
