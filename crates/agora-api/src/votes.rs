use axum::{Extension, Json, extract::State, response::IntoResponse};
use axum_extra::extract::WithRejection;

use agora_types::api::{VoteRequest, VoteResponse};
use agora_types::models::SubjectKind;

use crate::auth::AppState;
use crate::error::{ApiError, JsonBody, blocking};
use crate::middleware::AuthUser;

pub async fn vote_post(
    state: State<AppState>,
    user: Extension<AuthUser>,
    req: JsonBody<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    toggle(SubjectKind::Post, state, user, req).await
}

pub async fn vote_comment(
    state: State<AppState>,
    user: Extension<AuthUser>,
    req: JsonBody<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    toggle(SubjectKind::Comment, state, user, req).await
}

async fn toggle(
    kind: SubjectKind,
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<VoteRequest>,
) -> Result<Json<VoteResponse>, ApiError> {
    let stance = req.stance.parse().map_err(ApiError::BadRequest)?;
    let subject_id = req.subject_id;

    let (stance, aggregate) = blocking(move || {
        let votes = &state.forum.votes;
        let stance = votes.toggle(kind, subject_id, user_id, stance)?;
        Ok((stance, votes.aggregate(kind, subject_id)?))
    })
    .await?;

    Ok(Json(VoteResponse {
        subject_id,
        stance,
        aggregate,
    }))
}
