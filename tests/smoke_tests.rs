//! Smoke tests for the core web flows.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use linkarr::config::Config;
use std::sync::Arc;
use tower::ServiceExt;

async fn spawn_app() -> (Arc<linkarr::api::AppState>, Router) {
    let db_path =
        std::env::temp_dir().join(format!("linkarr-smoke-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.auth.token_secret = "smoke-test-secret".to_string();

    let state = linkarr::api::create_app_state(config)
        .await
        .expect("failed to create app state");

    let router = linkarr::api::router(state.clone());
    (state, router)
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response was not JSON")
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", mime::APPLICATION_JSON.as_ref())
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json_as(uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", mime::APPLICATION_JSON.as_ref())
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn signup(app: &Router, name: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/users",
            serde_json::json!({"name": name, "password": password}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    body["data"]["token"]
        .as_str()
        .expect("signup did not return a token")
        .to_string()
}

#[tokio::test]
async fn smoke_signup_link_and_tag_flow() {
    let (_, app) = spawn_app().await;
    let token = signup(&app, "gdritter", "pw1").await;

    // Create a tagged link as the new user.
    let response = app
        .clone()
        .oneshot(post_json_as(
            "/api/u/gdritter/links",
            &token,
            serde_json::json!({
                "url": "http://example.com",
                "name": "Example",
                "tags": ["website"]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The listing shows it, tag included.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/u/gdritter")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let links = body["data"]["links"].as_array().unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["tags"][0]["name"], "website");

    // Browsing by tag finds the same link.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/u/gdritter/t/website")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["data"]["links"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["pages"]["last"], 1);
}

#[tokio::test]
async fn smoke_login_failures_map_to_statuses() {
    let (_, app) = spawn_app().await;
    signup(&app, "gdritter", "pw1").await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            serde_json::json!({"name": "gdritter", "password": "wrong"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            serde_json::json!({"name": "nobody", "password": "pw1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn smoke_anonymous_cannot_mutate() {
    let (_, app) = spawn_app().await;
    signup(&app, "gdritter", "pw1").await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/u/gdritter/links",
            serde_json::json!({"url": "http://example.com", "name": "Example"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn smoke_other_users_cannot_mutate() {
    let (_, app) = spawn_app().await;
    signup(&app, "gdritter", "pw1").await;
    let intruder = signup(&app, "intruder", "pw2").await;

    let response = app
        .clone()
        .oneshot(post_json_as(
            "/api/u/gdritter/links",
            &intruder,
            serde_json::json!({"url": "http://example.com", "name": "Example"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn smoke_private_links_hidden_from_anonymous() {
    let (_, app) = spawn_app().await;
    let token = signup(&app, "gdritter", "pw1").await;

    let response = app
        .clone()
        .oneshot(post_json_as(
            "/api/u/gdritter/links",
            &token,
            serde_json::json!({
                "url": "http://secret.example",
                "name": "Secret",
                "private": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Anonymous listing: empty.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/u/gdritter")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(response).await;
    assert!(body["data"]["links"].as_array().unwrap().is_empty());

    // Owner listing via bearer token: one link.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/u/gdritter")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"]["links"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn smoke_current_user_endpoint() {
    let (_, app) = spawn_app().await;
    let token = signup(&app, "gdritter", "pw1").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["data"]["name"], "gdritter");

    // No credentials at all: unauthorized, not an error page.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A tampered bearer token degrades to anonymous as well.
    let mut broken = token.clone();
    broken.pop();
    broken.push('x');
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header("Authorization", format!("Bearer {broken}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn smoke_import_endpoint() {
    let (_, app) = spawn_app().await;
    let token = signup(&app, "gdritter", "pw1").await;

    let export = serde_json::json!([
        {"href": "http://one.example", "description": "One", "extended": "",
         "tags": "website", "time": "2019-09-02T21:07:25Z", "shared": "yes"}
    ]);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/u/gdritter/import")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::from(export.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["data"]["imported"], 1);

    // A payload missing a key names it and imports nothing.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/u/gdritter/import")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::from(r#"[{"href": "http://two.example"}]"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("missing key description")
    );
}

#[tokio::test]
async fn smoke_invite_flow() {
    let (state, app) = spawn_app().await;
    signup(&app, "admin", "pw1").await;

    // Promotion is an operator action, not an API one.
    state.store.promote_admin("admin").await.unwrap();
    let login = app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            serde_json::json!({"name": "admin", "password": "pw1"}),
        ))
        .await
        .unwrap();
    let admin_token = json_body(login).await["data"]["token"]
        .as_str()
        .unwrap()
        .to_string();

    // Non-admins may not mint invites.
    let outsider = signup(&app, "outsider", "pw2").await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/invites")
                .header("Authorization", format!("Bearer {outsider}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/invites")
                .header("Authorization", format!("Bearer {admin_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let invite_token = json_body(response).await["data"]["token"]
        .as_str()
        .unwrap()
        .to_string();

    // Claim it once; the second attempt is refused.
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/users/invited",
            serde_json::json!({"name": "newbie", "password": "pw3", "token": invite_token.clone()}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/users/invited",
            serde_json::json!({"name": "other", "password": "pw4", "token": invite_token}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
