use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use service_core::error::{AppError, ProblemDetails};
use validator::Validate;

/// JSON body extractor that runs `validator` rules before the handler sees
/// the payload. Malformed JSON is a 400, rule violations a 422.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            ProblemDetails::new(
                StatusCode::BAD_REQUEST,
                "The request body could not be parsed.",
                Some(e.body_text()),
            )
            .into_response()
        })?;

        value
            .validate()
            .map_err(|e| AppError::ValidationError(e).into_response())?;

        Ok(ValidatedJson(value))
    }
}
