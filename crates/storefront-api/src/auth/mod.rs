//! Authentication and authorization module
//!
//! - Token encoding and verification (HS256 JWT)
//! - Password hashing with Argon2id
//! - Authentication service (register, login, status, logout)
//! - Gate middleware attaching the resolved identity to requests

pub mod gate;
pub mod password;
pub mod service;
pub mod token;

pub use gate::{auth_gate, extract_token, require_admin, CurrentUser};
pub use password::{hash_password, verify_password, PasswordError};
#[cfg(any(test, feature = "test-utils"))]
pub use service::ManualClock;
pub use service::{AuthError, AuthService, Clock, IssuedToken, SystemClock, UserSummary};
pub use token::{Claims, TokenCodec, TokenError};
