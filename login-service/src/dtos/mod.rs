pub mod auth;

use serde::Serialize;
use utoipa::ToSchema;

/// RFC 7807 problem details, as returned for every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProblemResponse {
    #[serde(rename = "type")]
    #[schema(example = "https://httpstatuses.com/401")]
    pub type_url: String,
    #[schema(example = "Invalid email or password.")]
    pub title: String,
    #[schema(example = 401)]
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
