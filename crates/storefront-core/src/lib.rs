//! Storefront Core - Domain models, store traits, and shared types
//!
//! This crate defines the core abstractions used throughout Storefront:
//! - User accounts and roles
//! - Revoked token records (the logout blacklist)
//! - Products, purchase logs, and product lists
//! - Store traits implemented by the PostgreSQL and in-memory backends
//! - Configuration management

pub mod config;
pub mod memory;
pub mod postgres;

pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, PasswordConfig,
    ServerConfig, StorageBackend,
};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Errors returned by the store implementations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors returned by a [`RevocationLedger`]
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The exact token string is already in the ledger
    #[error("Token already revoked")]
    AlreadyRevoked,

    #[error("Database error: {0}")]
    Database(String),
}

// ============================================================================
// Users
// ============================================================================

/// User role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Standard,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Standard => "standard",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "standard" => Ok(UserRole::Standard),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User account as stored in the credential store
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Argon2id PHC string, never the plaintext password
    pub password_hash: String,
    pub role: UserRole,
    pub registered_on: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// A user about to be inserted
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// Row of the token blacklist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokedToken {
    pub token: String,
    pub revoked_at: DateTime<Utc>,
}

// ============================================================================
// Products
// ============================================================================

/// A product offered by a vendor (`npc`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub item: String,
    pub npc: String,
    pub stock: i32,
    pub price: f64,
    pub likes: i32,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub item: String,
    pub npc: String,
    pub stock: i32,
    pub price: f64,
}

/// Partial product update; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub item: Option<String>,
    pub npc: Option<String>,
    pub stock: Option<i32>,
    pub price: Option<f64>,
}

/// Sort order for product listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductOrder {
    #[default]
    Item,
    LikesDesc,
}

/// Product listing query
#[derive(Debug, Clone)]
pub struct ProductQuery {
    /// Exact item name filter
    pub search: Option<String>,
    pub order: ProductOrder,
    /// 1-based page number
    pub page: u32,
    pub per_page: u32,
}

/// Outcome of a purchase attempt on an existing product
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    Purchased(Product),
    InsufficientStock { current_stock: i32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseLog {
    pub id: i64,
    pub user_id: Uuid,
    pub product_id: i64,
    pub purchase_quantity: i32,
    pub datetime: DateTime<Utc>,
}

// ============================================================================
// Product lists
// ============================================================================

/// A user-owned named list of items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductList {
    pub id: i64,
    pub name: String,
    pub created_by: Uuid,
    pub date_created: DateTime<Utc>,
    pub date_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductListItem {
    pub id: i64,
    pub productlist_id: i64,
    pub item: String,
    pub likes: bool,
    pub date_created: DateTime<Utc>,
    pub date_modified: Option<DateTime<Utc>>,
}

// ============================================================================
// Pagination
// ============================================================================

/// One page of results
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.per_page)) as u32
    }

    /// Zero-based row offset for a 1-based page number
    pub fn offset(page: u32, per_page: u32) -> u64 {
        u64::from(page.saturating_sub(1)) * u64::from(per_page)
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Persistence for user identities and password hashes
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a user; fails with [`StoreError::AlreadyExists`] when the email is taken
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;
}

/// Durable denylist of token strings
#[async_trait]
pub trait RevocationLedger: Send + Sync {
    /// Record `token` as revoked at `now`
    async fn revoke(&self, token: &str, now: DateTime<Utc>) -> std::result::Result<(), LedgerError>;

    async fn is_revoked(&self, token: &str) -> std::result::Result<bool, LedgerError>;
}

/// Product catalogue and purchase log
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert a product; fails with [`StoreError::AlreadyExists`] when the item name is taken
    async fn create_product(&self, product: NewProduct) -> Result<Product>;

    async fn get_product(&self, id: i64) -> Result<Option<Product>>;

    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>>;

    async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<Option<Product>>;

    /// Returns false when no such product exists
    async fn delete_product(&self, id: i64) -> Result<bool>;

    async fn like_product(&self, id: i64) -> Result<Option<Product>>;

    /// Decrement stock and record a purchase log in one transaction.
    /// Returns `None` when the product does not exist.
    async fn buy_product(
        &self,
        id: i64,
        user_id: Uuid,
        quantity: i32,
    ) -> Result<Option<PurchaseOutcome>>;

    async fn purchases_for_user(&self, user_id: Uuid) -> Result<Vec<PurchaseLog>>;
}

/// Owner-scoped product lists and their items
#[async_trait]
pub trait ProductListStore: Send + Sync {
    async fn create_list(&self, owner: Uuid, name: &str) -> Result<ProductList>;

    /// Lists owned by `owner`, optionally filtered by exact name
    async fn list_lists(
        &self,
        owner: Uuid,
        name: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Page<ProductList>>;

    async fn get_list(&self, owner: Uuid, id: i64) -> Result<Option<ProductList>>;

    async fn rename_list(&self, owner: Uuid, id: i64, name: &str) -> Result<Option<ProductList>>;

    /// Deletes the list and its items. Returns false when not found or not owned.
    async fn delete_list(&self, owner: Uuid, id: i64) -> Result<bool>;

    async fn list_items(
        &self,
        list_id: i64,
        page: u32,
        per_page: u32,
    ) -> Result<Page<ProductListItem>>;

    /// Returns `None` when the list is missing or not owned by `owner`
    async fn add_item(
        &self,
        owner: Uuid,
        list_id: i64,
        item: &str,
        likes: bool,
    ) -> Result<Option<ProductListItem>>;

    async fn update_item(
        &self,
        owner: Uuid,
        list_id: i64,
        item_id: i64,
        item: &str,
        likes: bool,
    ) -> Result<Option<ProductListItem>>;

    async fn delete_item(&self, owner: Uuid, list_id: i64, item_id: i64) -> Result<bool>;
}

/// Handles to every store, backed by one implementation
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn CredentialStore>,
    pub ledger: Arc<dyn RevocationLedger>,
    pub products: Arc<dyn ProductStore>,
    pub product_lists: Arc<dyn ProductListStore>,
}

impl Stores {
    /// Wire all four store traits to a single backend
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: CredentialStore + RevocationLedger + ProductStore + ProductListStore + 'static,
    {
        Self {
            users: backend.clone(),
            ledger: backend.clone(),
            products: backend.clone(),
            product_lists: backend,
        }
    }

    /// Fresh in-memory stores
    pub fn in_memory() -> Self {
        Self::from_backend(Arc::new(MemoryStore::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_parse() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("STANDARD".parse::<UserRole>().unwrap(), UserRole::Standard);
        assert!("viewer".parse::<UserRole>().is_err());
        assert_eq!(UserRole::default().to_string(), "standard");
    }

    #[test]
    fn test_page_total_pages() {
        let page: Page<()> = Page {
            items: vec![],
            total: 21,
            page: 1,
            per_page: 10,
        };
        assert_eq!(page.total_pages(), 3);

        let empty: Page<()> = Page {
            items: vec![],
            total: 0,
            page: 1,
            per_page: 10,
        };
        assert_eq!(empty.total_pages(), 0);
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(Page::<()>::offset(1, 10), 0);
        assert_eq!(Page::<()>::offset(3, 25), 50);
        assert_eq!(Page::<()>::offset(0, 10), 0);
    }
}
