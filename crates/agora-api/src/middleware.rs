use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use agora_core::CoreError;
use agora_types::models::UserId;

use crate::auth::AppState;
use crate::error::{ApiError, blocking};

pub const SESSION_COOKIE: &str = "session_id";

/// The caller of a route behind [`require_auth`].
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

/// The caller of a route behind [`identify`], if signed in.
#[derive(Debug, Clone, Copy)]
pub struct Viewer(pub Option<UserId>);

/// Session token from the `session_id` cookie, else from `Authorization: Bearer`.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = CookieJar::from_headers(headers).get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

/// Reject the request unless it carries a live session.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(req.headers()).ok_or(CoreError::Unauthorized)?;
    let user_id = blocking(move || state.forum.sessions.authorize(Some(&token))).await?;

    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}

/// Attach the viewer, if any. A stale or unknown token browses anonymously.
pub async fn identify(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let viewer = match session_token(req.headers()) {
        Some(token) => blocking(move || state.forum.sessions.authorize(Some(&token)))
            .await
            .ok(),
        None => None,
    };

    req.extensions_mut().insert(Viewer(viewer));
    Ok(next.run(req).await)
}
