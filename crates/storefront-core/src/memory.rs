//! In-memory store
//!
//! Process-local implementation of every store trait. Used by the test
//! suites and by `STORAGE_BACKEND=memory`; nothing survives a restart.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    CredentialStore, LedgerError, NewProduct, NewUser, Page, Product, ProductList,
    ProductListItem, ProductListStore, ProductOrder, ProductQuery, ProductStore, ProductUpdate,
    PurchaseLog, PurchaseOutcome, Result, RevocationLedger, RevokedToken, StoreError, User,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    revoked: HashMap<String, RevokedToken>,
    products: BTreeMap<i64, Product>,
    purchases: Vec<PurchaseLog>,
    lists: BTreeMap<i64, ProductList>,
    items: BTreeMap<i64, ProductListItem>,
    next_product_id: i64,
    next_purchase_id: i64,
    next_list_id: i64,
    next_item_id: i64,
}

impl Tables {
    fn owns_list(&self, owner: Uuid, list_id: i64) -> bool {
        self.lists
            .get(&list_id)
            .is_some_and(|list| list.created_by == owner)
    }
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

fn paginate<T: Clone>(rows: Vec<T>, page: u32, per_page: u32) -> Page<T> {
    let total = rows.len() as u64;
    let offset = usize::try_from(Page::<T>::offset(page, per_page)).unwrap_or(usize::MAX);
    let items = rows
        .into_iter()
        .skip(offset)
        .take(per_page as usize)
        .collect();

    Page {
        items,
        total,
        page,
        per_page,
    }
}

/// Store backed by process memory
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::AlreadyExists(user.email));
        }

        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            registered_on: Utc::now(),
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }
}

#[async_trait]
impl RevocationLedger for MemoryStore {
    async fn revoke(&self, token: &str, now: DateTime<Utc>) -> std::result::Result<(), LedgerError> {
        let mut tables = self.tables.write().await;
        if tables.revoked.contains_key(token) {
            return Err(LedgerError::AlreadyRevoked);
        }
        tables.revoked.insert(
            token.to_string(),
            RevokedToken {
                token: token.to_string(),
                revoked_at: now,
            },
        );
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> std::result::Result<bool, LedgerError> {
        let tables = self.tables.read().await;
        Ok(tables.revoked.contains_key(token))
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        let mut tables = self.tables.write().await;
        if tables.products.values().any(|p| p.item == product.item) {
            return Err(StoreError::AlreadyExists(product.item));
        }

        let id = next_id(&mut tables.next_product_id);
        let created = Product {
            id,
            item: product.item,
            npc: product.npc,
            stock: product.stock,
            price: product.price,
            likes: 0,
            last_update: Utc::now(),
        };
        tables.products.insert(id, created.clone());
        Ok(created)
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.get(&id).cloned())
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Product> = tables
            .products
            .values()
            .filter(|p| query.search.as_deref().map_or(true, |s| p.item == s))
            .cloned()
            .collect();

        match query.order {
            ProductOrder::Item => rows.sort_by(|a, b| a.item.cmp(&b.item).then(a.id.cmp(&b.id))),
            ProductOrder::LikesDesc => {
                rows.sort_by(|a, b| b.likes.cmp(&a.likes).then(a.id.cmp(&b.id)))
            }
        }

        Ok(paginate(rows, query.page, query.per_page))
    }

    async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<Option<Product>> {
        let mut tables = self.tables.write().await;
        if let Some(item) = &update.item {
            if tables.products.values().any(|p| p.id != id && &p.item == item) {
                return Err(StoreError::AlreadyExists(item.clone()));
            }
        }

        let Some(product) = tables.products.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(item) = update.item {
            product.item = item;
        }
        if let Some(npc) = update.npc {
            product.npc = npc;
        }
        if let Some(stock) = update.stock {
            product.stock = stock;
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        product.last_update = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.products.remove(&id).is_some();
        if removed {
            tables.purchases.retain(|log| log.product_id != id);
        }
        Ok(removed)
    }

    async fn like_product(&self, id: i64) -> Result<Option<Product>> {
        let mut tables = self.tables.write().await;
        Ok(tables.products.get_mut(&id).map(|product| {
            product.likes += 1;
            product.last_update = Utc::now();
            product.clone()
        }))
    }

    async fn buy_product(
        &self,
        id: i64,
        user_id: Uuid,
        quantity: i32,
    ) -> Result<Option<PurchaseOutcome>> {
        let mut tables = self.tables.write().await;
        let Some(product) = tables.products.get_mut(&id) else {
            return Ok(None);
        };

        if product.stock < quantity {
            return Ok(Some(PurchaseOutcome::InsufficientStock {
                current_stock: product.stock,
            }));
        }

        let now = Utc::now();
        product.stock -= quantity;
        product.last_update = now;
        let purchased = product.clone();

        let log_id = next_id(&mut tables.next_purchase_id);
        tables.purchases.push(PurchaseLog {
            id: log_id,
            user_id,
            product_id: id,
            purchase_quantity: quantity,
            datetime: now,
        });

        Ok(Some(PurchaseOutcome::Purchased(purchased)))
    }

    async fn purchases_for_user(&self, user_id: Uuid) -> Result<Vec<PurchaseLog>> {
        let tables = self.tables.read().await;
        Ok(tables
            .purchases
            .iter()
            .rev()
            .filter(|log| log.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProductListStore for MemoryStore {
    async fn create_list(&self, owner: Uuid, name: &str) -> Result<ProductList> {
        let mut tables = self.tables.write().await;
        let id = next_id(&mut tables.next_list_id);
        let list = ProductList {
            id,
            name: name.to_string(),
            created_by: owner,
            date_created: Utc::now(),
            date_modified: None,
        };
        tables.lists.insert(id, list.clone());
        Ok(list)
    }

    async fn list_lists(
        &self,
        owner: Uuid,
        name: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Page<ProductList>> {
        let tables = self.tables.read().await;
        let rows = tables
            .lists
            .values()
            .filter(|list| list.created_by == owner)
            .filter(|list| name.map_or(true, |n| list.name == n))
            .cloned()
            .collect();
        Ok(paginate(rows, page, per_page))
    }

    async fn get_list(&self, owner: Uuid, id: i64) -> Result<Option<ProductList>> {
        let tables = self.tables.read().await;
        Ok(tables
            .lists
            .get(&id)
            .filter(|list| list.created_by == owner)
            .cloned())
    }

    async fn rename_list(&self, owner: Uuid, id: i64, name: &str) -> Result<Option<ProductList>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .lists
            .get_mut(&id)
            .filter(|list| list.created_by == owner)
            .map(|list| {
                list.name = name.to_string();
                list.date_modified = Some(Utc::now());
                list.clone()
            }))
    }

    async fn delete_list(&self, owner: Uuid, id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if !tables.owns_list(owner, id) {
            return Ok(false);
        }
        tables.lists.remove(&id);
        tables.items.retain(|_, item| item.productlist_id != id);
        Ok(true)
    }

    async fn list_items(
        &self,
        list_id: i64,
        page: u32,
        per_page: u32,
    ) -> Result<Page<ProductListItem>> {
        let tables = self.tables.read().await;
        let rows = tables
            .items
            .values()
            .filter(|item| item.productlist_id == list_id)
            .cloned()
            .collect();
        Ok(paginate(rows, page, per_page))
    }

    async fn add_item(
        &self,
        owner: Uuid,
        list_id: i64,
        item: &str,
        likes: bool,
    ) -> Result<Option<ProductListItem>> {
        let mut tables = self.tables.write().await;
        if !tables.owns_list(owner, list_id) {
            return Ok(None);
        }

        let id = next_id(&mut tables.next_item_id);
        let created = ProductListItem {
            id,
            productlist_id: list_id,
            item: item.to_string(),
            likes,
            date_created: Utc::now(),
            date_modified: None,
        };
        tables.items.insert(id, created.clone());
        Ok(Some(created))
    }

    async fn update_item(
        &self,
        owner: Uuid,
        list_id: i64,
        item_id: i64,
        item: &str,
        likes: bool,
    ) -> Result<Option<ProductListItem>> {
        let mut tables = self.tables.write().await;
        if !tables.owns_list(owner, list_id) {
            return Ok(None);
        }

        Ok(tables
            .items
            .get_mut(&item_id)
            .filter(|existing| existing.productlist_id == list_id)
            .map(|existing| {
                existing.item = item.to_string();
                existing.likes = likes;
                existing.date_modified = Some(Utc::now());
                existing.clone()
            }))
    }

    async fn delete_item(&self, owner: Uuid, list_id: i64, item_id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if !tables.owns_list(owner, list_id) {
            return Ok(false);
        }

        let belongs = tables
            .items
            .get(&item_id)
            .is_some_and(|item| item.productlist_id == list_id);
        if belongs {
            tables.items.remove(&item_id);
        }
        Ok(belongs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserRole;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: UserRole::Standard,
        }
    }

    fn new_product(item: &str, stock: i32) -> NewProduct {
        NewProduct {
            item: item.to_string(),
            npc: "Vendor".to_string(),
            stock,
            price: 9.5,
        }
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_email() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@x.com")).await.unwrap();

        assert_eq!(user.role, UserRole::Standard);
        assert!(matches!(
            store.create_user(new_user("a@x.com")).await,
            Err(StoreError::AlreadyExists(_))
        ));

        let found = store.find_user_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(store.find_user_by_id(user.id).await.unwrap(), Some(user));
        assert!(store.find_user_by_email("b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_is_exact_match_and_rejects_repeat() {
        let store = MemoryStore::new();
        let now = Utc::now();

        assert!(!store.is_revoked("abc").await.unwrap());
        store.revoke("abc", now).await.unwrap();
        assert!(store.is_revoked("abc").await.unwrap());
        assert!(!store.is_revoked("abcd").await.unwrap());
        assert!(matches!(
            store.revoke("abc", now).await,
            Err(LedgerError::AlreadyRevoked)
        ));
    }

    #[tokio::test]
    async fn test_buy_product_decrements_stock_and_logs() {
        let store = MemoryStore::new();
        let buyer = Uuid::new_v4();
        let product = store.create_product(new_product("Potion", 3)).await.unwrap();

        let outcome = store.buy_product(product.id, buyer, 2).await.unwrap();
        assert!(matches!(
            outcome,
            Some(PurchaseOutcome::Purchased(ref p)) if p.stock == 1
        ));

        let outcome = store.buy_product(product.id, buyer, 2).await.unwrap();
        assert_eq!(
            outcome,
            Some(PurchaseOutcome::InsufficientStock { current_stock: 1 })
        );

        assert!(store.buy_product(999, buyer, 1).await.unwrap().is_none());

        let logs = store.purchases_for_user(buyer).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].purchase_quantity, 2);
    }

    #[tokio::test]
    async fn test_list_products_orders_and_filters() {
        let store = MemoryStore::new();
        let sword = store.create_product(new_product("Sword", 1)).await.unwrap();
        store.create_product(new_product("Axe", 1)).await.unwrap();
        store.like_product(sword.id).await.unwrap();

        let by_item = store
            .list_products(&ProductQuery {
                search: None,
                order: ProductOrder::Item,
                page: 1,
                per_page: 10,
            })
            .await
            .unwrap();
        assert_eq!(by_item.items[0].item, "Axe");

        let by_likes = store
            .list_products(&ProductQuery {
                search: None,
                order: ProductOrder::LikesDesc,
                page: 1,
                per_page: 10,
            })
            .await
            .unwrap();
        assert_eq!(by_likes.items[0].item, "Sword");

        let searched = store
            .list_products(&ProductQuery {
                search: Some("Axe".to_string()),
                order: ProductOrder::Item,
                page: 1,
                per_page: 10,
            })
            .await
            .unwrap();
        assert_eq!(searched.total, 1);
    }

    #[tokio::test]
    async fn test_product_lists_are_owner_scoped() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let list = store.create_list(owner, "Groceries").await.unwrap();
        assert!(store.get_list(stranger, list.id).await.unwrap().is_none());
        assert!(store
            .add_item(stranger, list.id, "Milk", false)
            .await
            .unwrap()
            .is_none());

        let item = store
            .add_item(owner, list.id, "Milk", true)
            .await
            .unwrap()
            .unwrap();
        assert!(!store.delete_item(stranger, list.id, item.id).await.unwrap());

        let items = store.list_items(list.id, 1, 10).await.unwrap();
        assert_eq!(items.total, 1);

        assert!(store.delete_list(owner, list.id).await.unwrap());
        assert_eq!(store.list_items(list.id, 1, 10).await.unwrap().total, 0);
    }
}
