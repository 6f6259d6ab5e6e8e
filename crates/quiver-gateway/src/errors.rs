//! HTTP error envelope (spec §7), same shape as the aggregator's
//! `ApiError`: `{"error": "<message>"}` with status from
//! `quiver_core::Error::http_status`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub struct ApiError(quiver_core::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(json!({ "error": self.0.message() }));
        (status, body).into_response()
    }
}

impl From<quiver_core::Error> for ApiError {
    fn from(err: quiver_core::Error) -> Self {
        ApiError(err)
    }
}
