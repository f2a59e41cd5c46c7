use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::info;

use agora_core::Forum;
use agora_types::api::{LoginRequest, LoginResponse, SignupRequest, SignupResponse};

use crate::error::{ApiError, JsonBody, blocking};
use crate::middleware::{SESSION_COOKIE, session_token};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub forum: Forum,
}

pub async fn signup(
    State(state): State<AppState>,
    WithRejection(Json(req), _): JsonBody<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = blocking(move || {
        state.forum.credentials.register(
            &req.username,
            &req.email,
            &req.password,
            &req.confirm_password,
        )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(SignupResponse { user_id })))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = blocking(move || {
        let user_id = state
            .forum
            .credentials
            .verify_credentials(&req.email, &req.password)?;
        state.forum.sessions.issue(user_id)
    })
    .await?;

    info!("User {} logged in", session.user_id);

    let token = session.token.into_inner();
    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            user_id: session.user_id,
            token,
            expires_at: session.expires_at,
        }),
    ))
}

/// Revoke the presented session, if any, and clear the cookie.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = session_token(&headers) {
        blocking(move || state.forum.sessions.revoke(&token)).await?;
    }

    Ok((
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        StatusCode::NO_CONTENT,
    ))
}
