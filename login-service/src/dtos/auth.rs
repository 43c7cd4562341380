use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "admin@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "Admin@123")]
    pub password: String,

    /// Token from the client-side risk widget. An empty value is accepted
    /// here and rejected by the risk check.
    #[serde(default, alias = "reCaptchaToken")]
    #[schema(example = "03AFcWeA...")]
    pub recaptcha_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
}
