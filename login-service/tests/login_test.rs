mod common;

use axum::http::{header, StatusCode};
use common::*;
use serde_json::json;
use tower::util::ServiceExt;

#[tokio::test]
async fn test_login_success_returns_token() {
    let app = spawn_app().await;
    mock_risk_pass(&app.risk_server).await;

    let response = app
        .router
        .clone()
        .oneshot(login_request(
            login_body(ADMIN_EMAIL, ADMIN_PASSWORD, "risk-token"),
            "10.1.0.1",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let token = body["token"].as_str().expect("token missing");

    let claims = app.tokens.validate(token).unwrap();
    assert_eq!(claims.email, ADMIN_EMAIL);
    assert_eq!(claims.aud, "login-service-clients");
}

#[tokio::test]
async fn test_login_accepts_camel_case_risk_token() {
    let app = spawn_app().await;
    mock_risk_pass(&app.risk_server).await;

    let body = json!({
        "email": ADMIN_EMAIL,
        "password": ADMIN_PASSWORD,
        "reCaptchaToken": "risk-token",
    });
    let response = app
        .router
        .clone()
        .oneshot(login_request(body, "10.1.0.2"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_wrong_password_is_unauthorized() {
    let app = spawn_app().await;
    mock_risk_pass(&app.risk_server).await;

    let response = app
        .router
        .clone()
        .oneshot(login_request(
            login_body(ADMIN_EMAIL, "not-the-password", "risk-token"),
            "10.1.0.3",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );
    let body = body_json(response).await;
    assert_eq!(body["title"], "Invalid email or password.");
    assert_eq!(body["status"], 401);
}

#[tokio::test]
async fn test_login_unknown_user_is_unauthorized() {
    let app = spawn_app().await;
    mock_risk_pass(&app.risk_server).await;

    let response = app
        .router
        .clone()
        .oneshot(login_request(
            login_body("nobody@example.com", ADMIN_PASSWORD, "risk-token"),
            "10.1.0.4",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["title"], "User not found.");
}

#[tokio::test]
async fn test_unknown_user_and_wrong_password_share_status_and_content_type() {
    let app = spawn_app().await;
    mock_risk_pass(&app.risk_server).await;

    let unknown = app
        .router
        .clone()
        .oneshot(login_request(
            login_body("nobody@example.com", ADMIN_PASSWORD, "risk-token"),
            "10.1.0.10",
        ))
        .await
        .unwrap();
    let wrong_password = app
        .router
        .clone()
        .oneshot(login_request(
            login_body(ADMIN_EMAIL, "not-the-password", "risk-token"),
            "10.1.0.11",
        ))
        .await
        .unwrap();

    assert_eq!(unknown.status(), wrong_password.status());
    assert_eq!(
        unknown.headers().get(header::CONTENT_TYPE),
        wrong_password.headers().get(header::CONTENT_TYPE)
    );

    let unknown = body_json(unknown).await;
    let wrong_password = body_json(wrong_password).await;
    assert_eq!(unknown["status"], wrong_password["status"]);
    assert_ne!(unknown["title"], wrong_password["title"]);
}

#[tokio::test]
async fn test_login_low_risk_score_is_bad_request() {
    let app = spawn_app().await;
    mock_risk_response(
        &app.risk_server,
        json!({ "success": true, "score": 0.1, "action": "login" }),
    )
    .await;

    let response = app
        .router
        .clone()
        .oneshot(login_request(
            login_body(ADMIN_EMAIL, ADMIN_PASSWORD, "risk-token"),
            "10.1.0.5",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_without_risk_token_skips_risk_service() {
    let app = spawn_app().await;
    wiremock::Mock::given(wiremock::matchers::any())
        .respond_with(wiremock::ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.risk_server)
        .await;

    let body = json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD });
    let response = app
        .router
        .clone()
        .oneshot(login_request(body, "10.1.0.6"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    app.risk_server.verify().await;
}

#[tokio::test]
async fn test_login_invalid_email_is_unprocessable() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(login_request(
            login_body("not-an-email", ADMIN_PASSWORD, "risk-token"),
            "10.1.0.7",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_login_malformed_json_is_bad_request() {
    let app = spawn_app().await;

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/account/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "10.1.0.8")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_slow_risk_service_times_out() {
    let app = spawn_app_with(|config| {
        config.login_timeout_seconds = 1;
        config.recaptcha.timeout_seconds = 10;
    })
    .await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .respond_with(
            wiremock::ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true, "score": 0.9, "action": "login" }))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&app.risk_server)
        .await;

    let response = app
        .router
        .clone()
        .oneshot(login_request(
            login_body(ADMIN_EMAIL, ADMIN_PASSWORD, "risk-token"),
            "10.1.0.9",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
}
