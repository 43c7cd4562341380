use axum::{extract::State, Json};
use service_core::error::AppError;
use std::time::Duration;

use crate::dtos::auth::{LoginPayload, TokenResponse};
use crate::dtos::ProblemResponse;
use crate::middleware::AuthUser;
use crate::models::{LoginRequest, LOGIN_ACTION};
use crate::services::{metrics::record_login_attempt, TokenClaims};
use crate::utils::{Password, ValidatedJson};
use crate::AppState;

/// Log in with email, password and a risk token
#[utoipa::path(
    post,
    path = "/api/account/login",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Malformed body or risk validation failed", body = ProblemResponse),
        (status = 401, description = "Unknown user or invalid password", body = ProblemResponse),
        (status = 408, description = "Login did not complete in time", body = ProblemResponse),
        (status = 422, description = "Validation error", body = ProblemResponse),
        (status = 429, description = "Too many login attempts", body = ProblemResponse),
        (status = 503, description = "Dependency unavailable", body = ProblemResponse)
    ),
    tag = "Account"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginPayload>,
) -> Result<Json<TokenResponse>, AppError> {
    let request = LoginRequest::new(
        payload.email,
        Password::new(payload.password),
        payload.recaptcha_token,
        LOGIN_ACTION,
    );

    let deadline = Duration::from_secs(state.config.login_timeout_seconds);
    let outcome = state.login_service.login_within(request, deadline).await;

    match outcome {
        Ok(token) => {
            record_login_attempt("success");
            Ok(Json(TokenResponse {
                token: token.into_string(),
            }))
        }
        Err(e) => {
            record_login_attempt(e.kind.as_str());
            Err(e.into())
        }
    }
}

/// Claims of the current bearer token
#[utoipa::path(
    get,
    path = "/api/account/me",
    responses(
        (status = 200, description = "Token claims", body = TokenClaims),
        (status = 401, description = "Missing, invalid or expired token", body = ProblemResponse)
    ),
    tag = "Account",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me(AuthUser(claims): AuthUser) -> Json<TokenClaims> {
    Json(claims)
}
