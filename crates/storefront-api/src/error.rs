//! API error handling
//!
//! Every failure renders as `{"status": "fail", "message": ...}`.
//!
//! Author: hephaex@gmail.com

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use storefront_core::StoreError;
use utoipa::ToSchema;

use crate::auth::AuthError;

/// Failure response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Always "fail"
    pub status: String,
    /// Human-readable message
    pub message: String,
}

impl ApiError {
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: "fail".to_string(),
            message: message.into(),
        }
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    Auth(AuthError),
    NotFound(String),
    BadRequest(String),
    Forbidden(String),
    Internal(String),
    Database(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Auth(err) => {
                if let AuthError::Internal(detail) = &err {
                    tracing::error!(error = %detail, "authentication failed internally");
                }
                (err.status_code(), err.user_message())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unhandled exception occurred.".to_string(),
                )
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database operation failed".to_string(),
                )
            }
        };

        (status, Json(ApiError::fail(message))).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(what) => AppError::BadRequest(format!("{what} already exists")),
            StoreError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            StoreError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(format!("Input payload validation failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_auth_error_response_shape() {
        let response = AppError::Auth(AuthError::Revoked).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let json = body_json(response).await;
        assert_eq!(json["status"], "fail");
        assert_eq!(json["message"], "Token blacklisted. Please log in again.");
    }

    #[tokio::test]
    async fn test_internal_details_are_not_exposed() {
        let response = AppError::Database("password=secret host=db".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert!(!json["message"].as_str().unwrap().contains("secret"));
    }

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            AppError::from(StoreError::AlreadyExists("Potion".to_string())),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            AppError::from(StoreError::Database("boom".to_string())),
            AppError::Database(_)
        ));
    }
}
