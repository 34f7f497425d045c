//! Conversion of domain errors into JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::otp::OtpError;
use crate::relay::RelayError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Otp(#[from] OtpError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,
}

/// Body of every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Otp(OtpError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            AppError::Otp(OtpError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Otp(OtpError::Expired) => StatusCode::GONE,
            AppError::Otp(OtpError::Mismatch) => StatusCode::BAD_REQUEST,
            AppError::Otp(OtpError::Delivery(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Relay(_) => StatusCode::BAD_GATEWAY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
