//! Uniform response envelope.
//!
//! Every handler answers `{ isSuccess, code, message, result }`; failures drop
//! `result` and carry the HTTP status in `code`.

use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::constants::MSG_SUCCESS;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub is_success: bool,
    pub code: u16,
    pub message: String,
    pub result: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(result: T) -> Json<Self> {
        Json(Self {
            is_success: true,
            code: StatusCode::OK.as_u16(),
            message: MSG_SUCCESS.to_string(),
            result,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub is_success: bool,
    pub code: u16,
    pub message: String,
}

impl ErrorBody {
    pub fn new(status: StatusCode, message: String) -> Self {
        Self {
            is_success: false,
            code: status.as_u16(),
            message,
        }
    }
}
