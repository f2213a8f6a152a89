//! REST API module.
//!
//! Thin handlers marshalling requests into the repository operations. The
//! transport layer in front of this service is assumed to have authenticated
//! the caller; the acting user's email arrives in a header.

mod catalog;
mod groups;
mod transactions;

pub use catalog::*;
pub use groups::*;
pub use transactions::*;

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;

/// Header carrying the authenticated caller's email.
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Body for responses that return a freshly created id.
#[derive(Debug, Serialize)]
pub struct CreatedId {
    pub id: i64,
}

/// Resolve the acting user's email from the request headers.
pub fn current_user(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(USER_EMAIL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AppError::BadRequest(format!("Missing {} header", USER_EMAIL_HEADER))
        })
}
