use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use agora_types::api::{BanResponse, ChangeNameRequest, ChangePasswordRequest};
use agora_types::models::UserId;

use crate::auth::AppState;
use crate::error::{ApiError, JsonBody, PathParam, blocking};
use crate::middleware::AuthUser;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = blocking(move || state.forum.aggregator.profile(user_id)).await?;
    Ok(Json(profile))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(move || {
        state.forum.credentials.change_password(
            user_id,
            &req.current_password,
            &req.new_password,
            &req.confirm_password,
        )
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_name(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<ChangeNameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(move || state.forum.credentials.change_name(user_id, &req.new_name)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_ban(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    WithRejection(Path(target), _): PathParam<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let is_banned = blocking(move || state.forum.credentials.toggle_ban(actor, target)).await?;
    Ok(Json(BanResponse {
        user_id: target,
        is_banned,
    }))
}
