//! HTTP error envelope (spec §7): `{"error": "<message>"}` with the status
//! code carried by `quiver_core::Error`. Grounded on the teacher's
//! `api::errors::ApiError`/`IntoResponse` shape, generalized to wrap the
//! shared error taxonomy instead of a bespoke enum.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::epoch::EpochError;

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

impl From<EpochError> for ApiError {
    fn from(err: EpochError) -> Self {
        ApiError(quiver_core::Error::PreconditionFailed(err.to_string()))
    }
}
