//! Security audit logging for authentication events
//!
//! Registrations, logins, logouts, rejected tokens and admin-gate denials
//! are logged at INFO level with the "audit" target, so they can be
//! filtered and routed separately from application logs
//! (`RUST_LOG=audit=info`).
//!
//! # Example
//!
//! ```ignore
//! use storefront_api::audit::{audit_log, AuditEvent};
//!
//! audit_log(&AuditEvent::LoginSuccess {
//!     user_id: user.id,
//!     email: user.email.clone(),
//!     ip_address: Some("192.168.1.1".to_string()),
//! });
//! ```
//!
//! Author: hephaex@gmail.com

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Security audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Account created
    RegistrationSuccess {
        user_id: Uuid,
        email: String,
        ip_address: Option<String>,
    },

    /// Registration rejected (duplicate email or internal fault)
    RegistrationFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
    },

    LoginSuccess {
        user_id: Uuid,
        email: String,
        ip_address: Option<String>,
    },

    LoginFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
    },

    /// Token revoked through logout
    Logout {
        user_id: Uuid,
        email: String,
        ip_address: Option<String>,
    },

    /// Missing, malformed, expired or revoked token presented to the gate
    InvalidToken {
        ip_address: Option<String>,
        user_agent: Option<String>,
        reason: String,
    },

    /// Authenticated user without the admin role hit an admin route
    AccessDenied {
        user_id: Uuid,
        email: String,
        resource: String,
        ip_address: Option<String>,
    },
}

impl AuditEvent {
    fn summary(&self) -> &'static str {
        match self {
            AuditEvent::RegistrationSuccess { .. } => "Registration successful",
            AuditEvent::RegistrationFailure { .. } => "Registration failed",
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::Logout { .. } => "User logout",
            AuditEvent::InvalidToken { .. } => "Invalid token",
            AuditEvent::AccessDenied { .. } => "Access denied",
        }
    }
}

/// Log a security audit event
///
/// The whole event is attached as a JSON field for log aggregators; the
/// identifying fields are repeated as structured fields for filtering.
pub fn audit_log(event: &AuditEvent) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));
    let summary = event.summary();

    match event {
        AuditEvent::RegistrationSuccess {
            user_id,
            email,
            ip_address,
        }
        | AuditEvent::LoginSuccess {
            user_id,
            email,
            ip_address,
        }
        | AuditEvent::Logout {
            user_id,
            email,
            ip_address,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                ip_address = ?ip_address,
                "{summary}"
            );
        }
        AuditEvent::RegistrationFailure {
            email,
            reason,
            ip_address,
        }
        | AuditEvent::LoginFailure {
            email,
            reason,
            ip_address,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                email = %email,
                reason = %reason,
                ip_address = ?ip_address,
                "{summary}"
            );
        }
        AuditEvent::InvalidToken {
            ip_address,
            user_agent,
            reason,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                ip_address = ?ip_address,
                user_agent = ?user_agent,
                reason = %reason,
                "{summary}"
            );
        }
        AuditEvent::AccessDenied {
            user_id,
            email,
            resource,
            ip_address,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                resource = %resource,
                ip_address = ?ip_address,
                "{summary}"
            );
        }
    }
}

/// Extract the client IP from proxy headers
///
/// Checks X-Forwarded-For, then X-Real-IP.
pub fn extract_ip_address(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            // First IP in the chain is the client
            if let Some(first_ip) = xff_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|ip| ip.to_str().ok())
        .map(|s| s.to_string())
}

pub fn extract_user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::LoginSuccess {
            user_id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            ip_address: Some("192.168.1.1".to_string()),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"login_success\""));
        assert!(json.contains("test@example.com"));
    }

    #[test]
    fn test_audit_log_does_not_panic() {
        audit_log(&AuditEvent::LoginFailure {
            email: "test@example.com".to_string(),
            reason: "Invalid password".to_string(),
            ip_address: None,
        });
        audit_log(&AuditEvent::InvalidToken {
            ip_address: Some("192.168.1.1".to_string()),
            user_agent: Some("Test Agent".to_string()),
            reason: "Token blacklisted".to_string(),
        });
        audit_log(&AuditEvent::AccessDenied {
            user_id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            resource: "POST /api/v1/products".to_string(),
            ip_address: None,
        });
    }

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.1".parse().unwrap());

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_missing_headers() {
        let headers = axum::http::HeaderMap::new();

        assert_eq!(extract_ip_address(&headers), None);
        assert_eq!(extract_user_agent(&headers), None);
    }
}
