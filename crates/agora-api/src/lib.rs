pub mod auth;
pub mod error;
pub mod middleware;
pub mod posts;
pub mod profile;
pub mod votes;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;

/// Every route, grouped by how much of a session it needs.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/categories", get(posts::list_categories));

    let browse_routes = Router::new()
        .route("/posts", get(posts::list_posts))
        .route("/posts/{post_id}", get(posts::get_post))
        .layer(from_fn_with_state(state.clone(), middleware::identify));

    let protected_routes = Router::new()
        .route("/posts", post(posts::create_post))
        .route("/posts/{post_id}/comments", post(posts::create_comment))
        .route("/votes/post", post(votes::vote_post))
        .route("/votes/comment", post(votes::vote_comment))
        .route("/profile", get(profile::get_profile))
        .route("/profile/password", post(profile::change_password))
        .route("/profile/name", post(profile::change_name))
        .route("/admin/users/{user_id}/ban", post(profile::toggle_ban))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(browse_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
