mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::*;
use login_service::services::TokenIssuer;
use tower::util::ServiceExt;

fn me_request(authorization: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("GET")
        .uri("/api/account/me")
        .header("x-forwarded-for", "10.2.0.1");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_me_returns_claims_for_issued_token() {
    let app = spawn_app().await;
    let token = app.tokens.issue("user-1", ADMIN_EMAIL).unwrap();

    let response = app
        .router
        .clone()
        .oneshot(me_request(Some(format!("Bearer {}", token.as_str()))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["sub"], "user-1");
    assert_eq!(body["email"], ADMIN_EMAIL);
}

#[tokio::test]
async fn test_me_without_token_is_unauthorized() {
    let app = spawn_app().await;

    let response = app.router.clone().oneshot(me_request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_rejects_tampered_token() {
    let app = spawn_app().await;
    let token = app.tokens.issue("user-1", ADMIN_EMAIL).unwrap().into_string();

    // Swap the payload segment for a forged one.
    let mut parts: Vec<&str> = token.split('.').collect();
    parts[1] = "eyJzdWIiOiJhZG1pbiJ9";
    let forged = parts.join(".");

    let response = app
        .router
        .clone()
        .oneshot(me_request(Some(format!("Bearer {}", forged))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
