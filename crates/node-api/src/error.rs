//! HTTP error responses
//!
//! NMOS APIs report errors with a common JSON body carrying the status
//! code, a short error string, and optional debug detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal Error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<rnmos_connection_core::Error> for ApiError {
    fn from(err: rnmos_connection_core::Error) -> Self {
        match err {
            rnmos_connection_core::Error::NotFound(_) => ApiError::NotFound,
            rnmos_connection_core::Error::Validation(message) => ApiError::BadRequest(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "code": status.as_u16(),
            "error": self.to_string(),
            "debug": null,
        });
        (status, Json(body)).into_response()
    }
}
