use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use tower::ServiceExt;
use totp_rs::{Algorithm, Secret, TOTP};

use agora::Config;

const SEED_PASSWORD: &str = "pwd";

/// Must match the secret seeded for "alberto" in the initial migration.
const ADMIN_TOTP_SECRET: &str = "LXBSMDTMSP2I5XFXIYRGFVWSFI";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;

    let state = agora::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    agora::api::router(state).await
}

fn json_request(
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<&serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let body = body.map_or_else(Body::empty, |b| Body::from(serde_json::to_string(b).unwrap()));
    builder.body(body).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response<axum::body::Body> {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response<axum::body::Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn session_cookie(response: &Response<axum::body::Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("expected a session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

async fn login(app: &Router, username: &str) -> String {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            Some(&serde_json::json!({"username": username, "password": SEED_PASSWORD})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "login as {username}");
    session_cookie(&response)
}

fn totp_instance() -> TOTP {
    TOTP::new(
        Algorithm::SHA1,
        6,
        1,
        30,
        Secret::Encoded(ADMIN_TOTP_SECRET.to_string()).to_bytes().unwrap(),
        None,
        String::new(),
    )
    .unwrap()
}

fn current_admin_code() -> String {
    totp_instance().generate_current().unwrap()
}

/// A six-digit code guaranteed not to verify in any accepted window.
fn wrong_admin_code() -> String {
    let totp = totp_instance();
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    // Codes accepted right now: previous, current, and next window.
    let accepted: Vec<String> = [now - 30, now, now + 30]
        .iter()
        .map(|t| totp.generate(*t))
        .collect();

    (0..1_000_000)
        .map(|n| format!("{n:06}"))
        .find(|candidate| !accepted.contains(candidate))
        .unwrap()
}

async fn elevate(app: &Router, cookie: &str) {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/auth/totp",
            Some(cookie),
            Some(&serde_json::json!({"code": current_admin_code()})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "authorized");
}

#[tokio::test]
async fn login_reports_session_shape() {
    let app = spawn_app().await;
    let cookie = login(&app, "alberto").await;

    let response = send(&app, json_request("GET", "/api/auth/me", Some(&cookie), None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], "alberto");
    assert_eq!(body["data"]["isAdmin"], true);
    assert_eq!(body["data"]["secondFactorAvailable"], true);
    assert_eq!(body["data"]["secondFactorCompleted"], false);

    // A regular user has no second factor on offer.
    let cookie = login(&app, "carl").await;
    let response = send(&app, json_request("GET", "/api/auth/me", Some(&cookie), None)).await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["isAdmin"], false);
    assert_eq!(body["data"]["secondFactorAvailable"], false);
}

#[tokio::test]
async fn login_failures_do_not_distinguish_unknown_users() {
    let app = spawn_app().await;

    for payload in [
        serde_json::json!({"username": "alberto", "password": "wrong"}),
        serde_json::json!({"username": "nosuchuser", "password": "pwd"}),
    ] {
        let response = send(&app, json_request("POST", "/api/auth/login", None, Some(&payload))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "payload: {payload}");
    }

    // Malformed input never reaches credential verification.
    for payload in [
        serde_json::json!({"username": "ab", "password": "pwd"}),
        serde_json::json!({"username": "alberto", "password": ""}),
    ] {
        let response = send(&app, json_request("POST", "/api/auth/login", None, Some(&payload))).await;
        assert_eq!(
            response.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "payload: {payload}"
        );
    }
}

#[tokio::test]
async fn me_without_session_is_unauthorized() {
    let app = spawn_app().await;

    let response = send(&app, json_request("GET", "/api/auth/me", None, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_destroys_the_session() {
    let app = spawn_app().await;
    let cookie = login(&app, "carl").await;

    let response = send(&app, json_request("POST", "/api/auth/logout", Some(&cookie), None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, json_request("GET", "/api/auth/me", Some(&cookie), None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn second_factor_elevates_an_admin_session() {
    let app = spawn_app().await;
    let cookie = login(&app, "alberto").await;

    elevate(&app, &cookie).await;

    let response = send(&app, json_request("GET", "/api/auth/me", Some(&cookie), None)).await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["secondFactorCompleted"], true);
}

#[tokio::test]
async fn second_factor_without_session_is_unauthorized() {
    let app = spawn_app().await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/auth/totp",
            None,
            Some(&serde_json::json!({"code": current_admin_code()})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn second_factor_denied_for_non_admin_even_with_valid_code() {
    let app = spawn_app().await;
    let cookie = login(&app, "carl").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/auth/totp",
            Some(&cookie),
            Some(&serde_json::json!({"code": current_admin_code()})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // A malformed code is a validation failure for everyone; the permission
    // question is never reached.
    let response = send(
        &app,
        json_request(
            "POST",
            "/api/auth/totp",
            Some(&cookie),
            Some(&serde_json::json!({"code": "12345"})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn second_factor_rejects_malformed_and_wrong_codes() {
    let app = spawn_app().await;
    let cookie = login(&app, "alberto").await;

    for code in ["12345", "1234567", "12a456", ""] {
        let response = send(
            &app,
            json_request(
                "POST",
                "/api/auth/totp",
                Some(&cookie),
                Some(&serde_json::json!({"code": code})),
            ),
        )
        .await;
        assert_eq!(
            response.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "code: {code:?}"
        );
    }

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/auth/totp",
            Some(&cookie),
            Some(&serde_json::json!({"code": wrong_admin_code()})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // A failed attempt leaves the session at the password stage.
    let response = send(&app, json_request("GET", "/api/auth/me", Some(&cookie), None)).await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["secondFactorCompleted"], false);
}

#[tokio::test]
async fn elevated_admin_moderates_other_users_content() {
    let app = spawn_app().await;

    // carl owns a post with a comment.
    let carl = login(&app, "carl").await;
    let response = send(
        &app,
        json_request(
            "POST",
            "/api/posts",
            Some(&carl),
            Some(&serde_json::json!({"title": "Carl's corner", "text": "mine"})),
        ),
    )
    .await;
    let post_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = send(
        &app,
        json_request(
            "POST",
            &format!("/api/posts/{post_id}/comments"),
            Some(&carl),
            Some(&serde_json::json!({"text": "carl's comment"})),
        ),
    )
    .await;
    let comment_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    // diana, a standard non-owner, is denied.
    let diana = login(&app, "diana").await;
    let response = send(
        &app,
        json_request("DELETE", &format!("/api/comments/{comment_id}"), Some(&diana), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // alberto without the second factor is a standard session too.
    let alberto = login(&app, "alberto").await;
    let response = send(
        &app,
        json_request("DELETE", &format!("/api/comments/{comment_id}"), Some(&alberto), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // After elevation, alberto moderates anything.
    elevate(&app, &alberto).await;
    let response = send(
        &app,
        json_request("DELETE", &format!("/api/comments/{comment_id}"), Some(&alberto), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Including whole posts owned by someone else.
    let response = send(
        &app,
        json_request("DELETE", &format!("/api/posts/{post_id}"), Some(&alberto), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}
