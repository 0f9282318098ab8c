use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub const UPCHECK_RESPONSE: &str = "I'm up!";

#[tracing::instrument]
pub async fn handler() -> Response {
    (StatusCode::OK, UPCHECK_RESPONSE).into_response()
}
