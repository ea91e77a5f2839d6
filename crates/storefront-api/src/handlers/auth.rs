//! Authentication API handlers
//!
//! Register, login, token status and logout. Status and logout sit behind
//! the auth gate and read the resolved identity from request extensions.
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::audit::{audit_log, extract_ip_address, AuditEvent};
use crate::auth::{CurrentUser, UserSummary};
use crate::error::AppError;
use crate::state::AppState;

/// Email and password, used by both register and login
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CredentialsRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "password cannot be left blank"))]
    pub password: String,
}

/// Response carrying a freshly issued token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub status: String,
    pub message: String,
    pub auth_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub data: UserSummary,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub status: String,
    pub message: String,
}

/// Register a new user account
///
/// New users get the `standard` role. An existing email answers 202 with a
/// failure body.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "User registered", body = TokenResponse),
        (status = 202, description = "User already exists", body = crate::error::ApiError),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;
    let ip_address = extract_ip_address(&headers);

    let registration = match state.auth.register(&request.email, &request.password).await {
        Ok(registration) => registration,
        Err(e) => {
            audit_log(&AuditEvent::RegistrationFailure {
                email: request.email,
                reason: e.to_string(),
                ip_address,
            });
            return Err(e.into());
        }
    };

    audit_log(&AuditEvent::RegistrationSuccess {
        user_id: registration.user_id,
        email: request.email,
        ip_address,
    });

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            status: "success".to_string(),
            message: "Successfully registered.".to_string(),
            auth_token: registration.token,
        }),
    ))
}

/// Login with email and password
///
/// Issues a new token; tokens from earlier logins remain valid.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;
    let ip_address = extract_ip_address(&headers);

    let issued = match state.auth.login(&request.email, &request.password).await {
        Ok(issued) => issued,
        Err(e) => {
            audit_log(&AuditEvent::LoginFailure {
                email: request.email,
                reason: e.to_string(),
                ip_address,
            });
            return Err(e.into());
        }
    };

    audit_log(&AuditEvent::LoginSuccess {
        user_id: issued.user_id,
        email: request.email,
        ip_address,
    });

    Ok(Json(TokenResponse {
        status: "success".to_string(),
        message: "Successfully logged in.".to_string(),
        auth_token: issued.token,
    }))
}

/// Describe the user the presented token belongs to
#[utoipa::path(
    get,
    path = "/api/v1/auth/status",
    tag = "auth",
    responses(
        (status = 200, description = "Token is valid", body = StatusResponse),
        (status = 401, description = "Missing, invalid, expired or revoked token", body = crate::error::ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn status_handler(Extension(user): Extension<CurrentUser>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "success".to_string(),
        data: user.summary,
    })
}

/// Revoke the presented token
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Missing, invalid, expired or revoked token", body = crate::error::ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, AppError> {
    state.auth.logout(&user.token).await?;

    audit_log(&AuditEvent::Logout {
        user_id: user.summary.user_id,
        email: user.summary.email,
        ip_address: extract_ip_address(&headers),
    });

    Ok(Json(MessageResponse {
        status: "success".to_string(),
        message: "Successfully logged out.".to_string(),
    }))
}
