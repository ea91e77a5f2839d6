//! Request gating middleware
//!
//! [`auth_gate`] resolves the token header into a [`CurrentUser`] request
//! extension or rejects the request before the handler runs.
//! [`require_admin`] is layered inside it for admin-only routes.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use super::service::{AuthError, UserSummary};
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::error::AppError;
use crate::state::AppState;

/// Identity attached to gated requests
///
/// Extract in handlers with `Extension<CurrentUser>`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub summary: UserSummary,
    /// The raw token the request was authenticated with
    pub token: String,
}

/// Read the token from `header_name`, stripping an optional `Bearer ` prefix
///
/// Returns `Ok(None)` when the header is absent or blank.
pub fn extract_token(headers: &HeaderMap, header_name: &str) -> Result<Option<String>, AuthError> {
    let Some(value) = headers.get(header_name) else {
        return Ok(None);
    };

    let raw = value.to_str().map_err(|_| AuthError::Malformed)?.trim_start();
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();

    if token.is_empty() {
        Ok(None)
    } else {
        Ok(Some(token.to_string()))
    }
}

/// Authentication middleware for every protected route
///
/// ```ignore
/// let protected = Router::new()
///     .route("/auth/status", get(status_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_gate));
/// ```
pub async fn auth_gate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let result = match extract_token(request.headers(), &state.config.auth.token_header) {
        Ok(Some(token)) => state
            .auth
            .status(&token)
            .await
            .map(|summary| CurrentUser { summary, token }),
        Ok(None) => Err(AuthError::MissingCredential),
        Err(e) => Err(e),
    };

    match result {
        Ok(user) => {
            tracing::debug!(user_id = %user.summary.user_id, "request authenticated");
            request.extensions_mut().insert(user);
            Ok(next.run(request).await)
        }
        Err(e) => {
            if !matches!(e, AuthError::Internal(_)) {
                audit_log(&AuditEvent::InvalidToken {
                    ip_address: extract_ip_address(request.headers()),
                    user_agent: extract_user_agent(request.headers()),
                    reason: e.to_string(),
                });
            }
            Err(AppError::Auth(e))
        }
    }
}

/// Reject authenticated users without the admin role
///
/// Must run after [`auth_gate`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let Some(user) = request.extensions().get::<CurrentUser>() else {
        return Err(AppError::Auth(AuthError::MissingCredential));
    };

    if !user.summary.admin {
        audit_log(&AuditEvent::AccessDenied {
            user_id: user.summary.user_id,
            email: user.summary.email.clone(),
            resource: format!("{} {}", request.method(), request.uri().path()),
            ip_address: extract_ip_address(request.headers()),
        });
        return Err(AppError::Forbidden(
            "User has not permission to perform this operation".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-token", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_raw_token() {
        let token = extract_token(&headers("abc.def.ghi"), "X-API-TOKEN").unwrap();
        assert_eq!(token.as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_strips_bearer_prefix() {
        let token = extract_token(&headers("Bearer abc.def.ghi"), "X-API-TOKEN").unwrap();
        assert_eq!(token.as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_missing_or_blank_header() {
        assert_eq!(extract_token(&HeaderMap::new(), "X-API-TOKEN").unwrap(), None);
        assert_eq!(extract_token(&headers("   "), "X-API-TOKEN").unwrap(), None);
        assert_eq!(extract_token(&headers("Bearer "), "X-API-TOKEN").unwrap(), None);
    }

    #[test]
    fn test_non_ascii_header_is_malformed() {
        let mut map = HeaderMap::new();
        map.insert("x-api-token", HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap());
        assert!(matches!(
            extract_token(&map, "X-API-TOKEN"),
            Err(AuthError::Malformed)
        ));
    }
}
