//! Authentication service layer
//!
//! Registration, login, token status and logout on top of an injected
//! credential store, revocation ledger, token codec and clock.

#[cfg(any(test, feature = "test-utils"))]
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use storefront_core::{
    AuthConfig, CredentialStore, LedgerError, NewUser, PasswordConfig, RevocationLedger,
    StoreError, User, UserRole,
};
use thiserror::Error;
use tokio::sync::OnceCell;
use utoipa::ToSchema;
use uuid::Uuid;

use super::password::{hash_password, verify_password, PasswordError};
use super::token::{TokenCodec, TokenError};

/// Authentication failures, each mapped to one HTTP status
///
/// Display strings are the user-facing messages.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization token required")]
    MissingCredential,

    #[error("Invalid token. Please log in again.")]
    Malformed,

    #[error("Signature expired. Please log in again.")]
    Expired,

    #[error("Token blacklisted. Please log in again.")]
    Revoked,

    #[error("User not found. Please log in again.")]
    UserNotFound,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("User already exists. Please Log in.")]
    AlreadyExists,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredential
            | AuthError::Malformed
            | AuthError::Expired
            | AuthError::Revoked
            | AuthError::UserNotFound
            | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::AlreadyExists => StatusCode::ACCEPTED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to clients; internal details are withheld
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Internal(_) => "Some error occurred. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::Expired,
            TokenError::Malformed => AuthError::Malformed,
            TokenError::Signing(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(_) => AuthError::AlreadyExists,
            other => AuthError::Internal(other.to_string()),
        }
    }
}

impl From<LedgerError> for AuthError {
    fn from(err: LedgerError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

/// Identity resolved from a valid token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub user_id: Uuid,
    pub email: String,
    pub admin: bool,
    pub registered_on: DateTime<Utc>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            admin: user.is_admin(),
            registered_on: user.registered_on,
        }
    }
}

/// A freshly issued token and the user it identifies
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub user_id: Uuid,
    pub token: String,
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock with one-second resolution, for exercising expiry
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug)]
pub struct ManualClock {
    secs: AtomicI64,
}

#[cfg(any(test, feature = "test-utils"))]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            secs: AtomicI64::new(start.timestamp()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.secs.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.secs.load(Ordering::SeqCst), 0).unwrap_or_default()
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    ledger: Arc<dyn RevocationLedger>,
    codec: TokenCodec,
    token_ttl: Duration,
    password: PasswordConfig,
    clock: Arc<dyn Clock>,
    /// Hash verified against for unknown emails, so login timing does not
    /// reveal whether an account exists
    dummy_hash: Arc<OnceCell<String>>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        ledger: Arc<dyn RevocationLedger>,
        config: &AuthConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ttl_secs = i64::try_from(config.token_ttl_secs)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1000);
        let token_ttl = Duration::seconds(ttl_secs);

        Self {
            users,
            ledger,
            codec: TokenCodec::from_config(config),
            token_ttl,
            password: config.password.clone(),
            clock,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Create an account with the `standard` role and issue its first token
    pub async fn register(&self, email: &str, password: &str) -> Result<IssuedToken, AuthError> {
        self.register_with_role(email, password, UserRole::Standard)
            .await
    }

    /// Create an account with an explicit role
    pub async fn register_with_role(
        &self,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<IssuedToken, AuthError> {
        if self.users.find_user_by_email(email).await?.is_some() {
            return Err(AuthError::AlreadyExists);
        }

        let password_hash = self.hash(password).await?;

        // A concurrent registration can still win; the unique index reports it
        let user = self
            .users
            .create_user(NewUser {
                email: email.to_string(),
                password_hash,
                role,
            })
            .await?;

        let token = self.issue(user.id)?;
        tracing::info!(user_id = %user.id, role = %user.role, "user registered");

        Ok(IssuedToken {
            user_id: user.id,
            token,
        })
    }

    /// Verify credentials and issue a fresh token
    ///
    /// Earlier tokens for the same user stay valid.
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let Some(user) = self.users.find_user_by_email(email).await? else {
            let dummy = self.dummy_hash().await?;
            self.verify(password, dummy).await?;
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify(password, &user.password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issue(user.id)?;
        tracing::debug!(user_id = %user.id, "token issued");
        Ok(IssuedToken {
            user_id: user.id,
            token,
        })
    }

    /// Resolve a token to the identity it was issued for
    pub async fn status(&self, token: &str) -> Result<UserSummary, AuthError> {
        let subject = self.codec.decode(token, self.clock.now())?;

        if self.ledger.is_revoked(token).await? {
            return Err(AuthError::Revoked);
        }

        let user = self
            .users
            .find_user_by_id(subject)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(UserSummary::from(&user))
    }

    /// Revoke a currently valid token
    ///
    /// Expired or already revoked tokens fail exactly as [`status`](Self::status)
    /// would. Losing a revoke race to a concurrent logout counts as success.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.status(token).await?;

        match self.ledger.revoke(token, self.clock.now()).await {
            Ok(()) | Err(LedgerError::AlreadyRevoked) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn issue(&self, subject: Uuid) -> Result<String, AuthError> {
        Ok(self
            .codec
            .encode(subject, self.clock.now(), self.token_ttl)?)
    }

    async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_string();
        let config = self.password.clone();
        tokio::task::spawn_blocking(move || hash_password(&password, &config))
            .await
            .map_err(|e| AuthError::Internal(format!("Hashing task failed: {e}")))?
            .map_err(AuthError::from)
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("Verification task failed: {e}")))?
            .map_err(AuthError::from)
    }

    async fn dummy_hash(&self) -> Result<&str, AuthError> {
        self.dummy_hash
            .get_or_try_init(|| self.hash("storefront-dummy-password"))
            .await
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::MemoryStore;

    struct Fixture {
        service: AuthService,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture(ttl_secs: u64) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let config = AuthConfig {
            token_ttl_secs: ttl_secs,
            password: PasswordConfig {
                memory_cost: 1024,
                time_cost: 1,
                parallelism: 1,
            },
            ..Default::default()
        };
        let service = AuthService::new(store.clone(), store.clone(), &config, clock.clone());

        Fixture {
            service,
            store,
            clock,
        }
    }

    #[tokio::test]
    async fn test_register_issues_working_token() {
        let f = fixture(3000);
        let reg = f.service.register("a@x.com", "pw1").await.unwrap();

        let summary = f.service.status(&reg.token).await.unwrap();
        assert_eq!(summary.user_id, reg.user_id);
        assert_eq!(summary.email, "a@x.com");
        assert!(!summary.admin);

        let stored = f.store.find_user_by_email("a@x.com").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "pw1");
        assert_eq!(stored.role, UserRole::Standard);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let f = fixture(3000);
        let first = f.service.register("a@x.com", "pw1").await.unwrap();

        let err = f.service.register("a@x.com", "other").await.unwrap_err();
        assert!(matches!(err, AuthError::AlreadyExists));
        assert_eq!(err.status_code(), StatusCode::ACCEPTED);

        // Original account untouched
        let stored = f.store.find_user_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(stored.id, first.user_id);
    }

    #[tokio::test]
    async fn test_login_success_and_failures() {
        let f = fixture(3000);
        f.service.register("a@x.com", "pw1").await.unwrap();

        let reg = f.service.register("b@x.com", "pw2").await.unwrap();
        let issued = f.service.login("a@x.com", "pw1").await.unwrap();
        assert_ne!(issued.user_id, reg.user_id);
        assert_eq!(f.service.status(&issued.token).await.unwrap().email, "a@x.com");

        assert!(matches!(
            f.service.login("a@x.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            f.service.login("nobody@x.com", "pw1").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_token_expires_after_ttl() {
        let f = fixture(5);
        let reg = f.service.register("a@x.com", "pw1").await.unwrap();

        f.clock.advance(Duration::seconds(5));
        assert!(f.service.status(&reg.token).await.is_ok());

        f.clock.advance(Duration::seconds(1));
        assert!(matches!(
            f.service.status(&reg.token).await,
            Err(AuthError::Expired)
        ));
        assert!(matches!(
            f.service.logout(&reg.token).await,
            Err(AuthError::Expired)
        ));
        assert!(!f.store.is_revoked(&reg.token).await.unwrap());
    }

    #[tokio::test]
    async fn test_logout_revokes_only_that_token() {
        let f = fixture(3000);
        let reg = f.service.register("a@x.com", "pw1").await.unwrap();
        let second = f.service.login("a@x.com", "pw1").await.unwrap().token;
        assert_ne!(reg.token, second);

        f.service.logout(&reg.token).await.unwrap();

        assert!(matches!(
            f.service.status(&reg.token).await,
            Err(AuthError::Revoked)
        ));
        assert!(matches!(
            f.service.logout(&reg.token).await,
            Err(AuthError::Revoked)
        ));
        assert!(f.service.status(&second).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoked_token_stays_revoked_after_expiry_window() {
        let f = fixture(60);
        let reg = f.service.register("a@x.com", "pw1").await.unwrap();
        f.service.logout(&reg.token).await.unwrap();

        f.clock.advance(Duration::seconds(3600));
        assert!(f.store.is_revoked(&reg.token).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_token() {
        let f = fixture(3000);
        let err = f.service.status("garbage").await.unwrap_err();

        assert!(matches!(err, AuthError::Malformed));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.user_message(), "Invalid token. Please log in again.");
    }

    #[tokio::test]
    async fn test_unknown_subject_is_user_not_found() {
        let f = fixture(3000);
        let config = AuthConfig::default();
        let token = TokenCodec::from_config(&config)
            .encode(Uuid::new_v4(), f.clock.now(), Duration::seconds(60))
            .unwrap();

        assert!(matches!(
            f.service.status(&token).await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[test]
    fn test_internal_message_is_generic() {
        let err = AuthError::Internal("connection refused".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Some error occurred. Please try again.");
    }
}
