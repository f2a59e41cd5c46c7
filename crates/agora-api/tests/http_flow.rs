use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use agora_api::{AppStateInner, router};
use agora_core::{Forum, ForumConfig, ManualClock};
use agora_db::Database;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

struct TestApp {
    _dir: TempDir,
    clock: Arc<ManualClock>,
    app: Router,
}

fn test_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let db = Arc::new(Database::open(&dir.path().join("api.db")).unwrap());
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let forum = Forum::new(db, clock.clone(), ForumConfig::default());
    TestApp {
        _dir: dir,
        clock,
        app: router(Arc::new(AppStateInner { forum })),
    }
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn signup_and_login(app: &Router, name: &str, email: &str) -> (i64, String) {
    let (status, body) = send(
        app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "username": name,
            "email": email,
            "password": "password1",
            "confirm_password": "password1",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": "password1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (
        body["user_id"].as_i64().unwrap(),
        body["token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn health_is_public() {
    let t = test_app();
    let response = t
        .app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_sets_session_cookie() {
    let t = test_app();
    send(
        &t.app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "username": "ann",
            "email": "ann@example.com",
            "password": "password1",
            "confirm_password": "password1",
        })),
    )
    .await;

    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": "ann@example.com", "password": "password1" }).to_string(),
        ))
        .unwrap();
    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("session_id="));
    assert!(cookie.contains("HttpOnly"));

    // The cookie alone authenticates.
    let pair = cookie.split(';').next().unwrap();
    let request = Request::builder()
        .uri("/profile")
        .header(header::COOKIE, pair)
        .body(Body::empty())
        .unwrap();
    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_errors_follow_check_order() {
    let t = test_app();
    signup_and_login(&t.app, "bo", "bo@example.com").await;

    let (status, _) = send(
        &t.app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "password1" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &t.app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "bo@example.com", "password": "wrong-one" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn duplicate_signup_conflicts() {
    let t = test_app();
    signup_and_login(&t.app, "cy", "cy@example.com").await;

    let (status, _) = send(
        &t.app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "username": "cy2",
            "email": "cy@example.com",
            "password": "password1",
            "confirm_password": "password1",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn protected_routes_need_a_live_session() {
    let t = test_app();
    let (_, token) = signup_and_login(&t.app, "di", "di@example.com").await;

    let (status, _) = send(&t.app, "GET", "/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&t.app, "GET", "/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "di");

    t.clock.advance(DAY_MS);
    let (status, _) = send(&t.app, "GET", "/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let t = test_app();
    let (_, token) = signup_and_login(&t.app, "ed", "ed@example.com").await;

    let (status, _) = send(&t.app, "POST", "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&t.app, "POST", "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&t.app, "GET", "/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn vote_toggle_over_http() {
    let t = test_app();
    let (_, author) = signup_and_login(&t.app, "fi", "fi@example.com").await;
    let (_, voter) = signup_and_login(&t.app, "gu", "gu@example.com").await;

    let (status, body) = send(
        &t.app,
        "POST",
        "/posts",
        Some(&author),
        Some(json!({ "title": "Votes", "content": "Cast one", "category_ids": [1] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let post_id = body["id"].as_i64().unwrap();

    let vote = |stance: Value| json!({ "subject_id": post_id, "stance": stance });

    let (_, body) = send(&t.app, "POST", "/votes/post", Some(&voter), Some(vote(json!("like")))).await;
    assert_eq!((body["likes"].as_u64(), body["dislikes"].as_u64()), (Some(1), Some(0)));
    assert_eq!(body["stance"], "like");

    let (_, body) = send(&t.app, "POST", "/votes/post", Some(&voter), Some(vote(json!(-1)))).await;
    assert_eq!((body["likes"].as_u64(), body["dislikes"].as_u64()), (Some(0), Some(1)));

    let (_, body) =
        send(&t.app, "POST", "/votes/post", Some(&voter), Some(vote(json!("dislike")))).await;
    assert_eq!((body["likes"].as_u64(), body["dislikes"].as_u64()), (Some(0), Some(0)));
    assert!(body["stance"].is_null());

    let (status, _) = send(&t.app, "POST", "/votes/post", Some(&voter), Some(vote(json!(0)))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &t.app,
        "POST",
        "/votes/comment",
        Some(&voter),
        Some(json!({ "subject_id": 999, "stance": "like" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&t.app, "POST", "/votes/post", None, Some(vote(json!("like")))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn browsing_works_with_and_without_a_session() {
    let t = test_app();
    let (_, token) = signup_and_login(&t.app, "hal", "hal@example.com").await;

    let (_, body) = send(
        &t.app,
        "POST",
        "/posts",
        Some(&token),
        Some(json!({ "title": "Hi", "content": "There", "category_ids": [5] })),
    )
    .await;
    let post_id = body["id"].as_i64().unwrap();

    let (status, _) = send(
        &t.app,
        "POST",
        &format!("/posts/{post_id}/comments"),
        Some(&token),
        Some(json!({ "content": "first" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&t.app, "GET", "/posts", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["comment_count"], 1);

    let (status, _) = send(&t.app, "GET", "/posts?filter=mine", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&t.app, "GET", "/posts?filter=commented", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["user_comments"][0]["content"], "first");

    let (status, body) = send(&t.app, "GET", "/posts?category_id=1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, body) = send(&t.app, "GET", &format!("/posts/{post_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["categories"][0], "health");
    assert_eq!(body["comments"].as_array().unwrap().len(), 1);

    let (status, _) = send(&t.app, "GET", "/posts/404", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&t.app, "GET", "/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn only_admin_bans() {
    let t = test_app();
    let (_, admin) = signup_and_login(&t.app, "root", "admin@gmail.com").await;
    let (user_id, user) = signup_and_login(&t.app, "ivy", "ivy@example.com").await;

    let uri = format!("/admin/users/{user_id}/ban");
    let (status, _) = send(&t.app, "POST", &uri, Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&t.app, "POST", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_banned"], true);

    let (status, _) = send(
        &t.app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "ivy@example.com", "password": "password1" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = send(&t.app, "GET", "/profile", Some(&admin), None).await;
    assert_eq!(body["is_admin"], true);
    assert_eq!(body["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn account_changes() {
    let t = test_app();
    let (_, token) = signup_and_login(&t.app, "jo", "jo@example.com").await;

    let (status, _) = send(
        &t.app,
        "POST",
        "/profile/name",
        Some(&token),
        Some(json!({ "new_name": "Jo Ann" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &t.app,
        "POST",
        "/profile/password",
        Some(&token),
        Some(json!({
            "current_password": "wrong-pass",
            "new_password": "password2",
            "confirm_password": "password2",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &t.app,
        "POST",
        "/profile/password",
        Some(&token),
        Some(json!({
            "current_password": "password1",
            "new_password": "password2",
            "confirm_password": "password2",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&t.app, "GET", "/profile", Some(&token), None).await;
    assert_eq!(body["username"], "Jo Ann");
}

#[tokio::test]
async fn malformed_requests_get_json_errors() {
    let t = test_app();
    let (_, token) = signup_and_login(&t.app, "kim", "kim@example.com").await;

    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());

    let (status, body) = send(
        &t.app,
        "POST",
        "/votes/post",
        Some(&token),
        Some(json!({ "subject_id": 1, "stance": "like", "extra": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(&t.app, "GET", "/posts/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(&t.app, "GET", "/posts?filter=everything", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(&t.app, "POST", "/admin/users/x/ban", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
