//! Product list handlers
//!
//! Every route is gated and scoped to the calling user's own lists.
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_core::{Page, ProductList, ProductListItem};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_PER_PAGE: u32 = 10;
const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Exact list name to search for
    pub q: Option<String>,
}

impl PageParams {
    fn page(&self) -> u32 {
        self.page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE)
    }

    fn per_page(&self) -> u32 {
        self.per_page
            .filter(|p| *p > 0)
            .unwrap_or(DEFAULT_PER_PAGE)
            .min(MAX_PER_PAGE)
    }
}

/// Name of a list, sent as `item`
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductListInput {
    pub item: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ItemInput {
    pub item: String,
    #[serde(default)]
    pub likes: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemResponse {
    pub id: i64,
    pub item: String,
    pub likes: bool,
    pub date_created: DateTime<Utc>,
    pub date_modified: Option<DateTime<Utc>>,
}

impl From<ProductListItem> for ItemResponse {
    fn from(item: ProductListItem) -> Self {
        Self {
            id: item.id,
            item: item.item,
            likes: item.likes,
            date_created: item.date_created,
            date_modified: item.date_modified,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductListResponse {
    pub id: i64,
    pub item: String,
    pub created_by: Uuid,
    pub date_created: DateTime<Utc>,
    pub date_modified: Option<DateTime<Utc>>,
}

impl From<ProductList> for ProductListResponse {
    fn from(list: ProductList) -> Self {
        Self {
            id: list.id,
            item: list.name,
            created_by: list.created_by,
            date_created: list.date_created,
            date_modified: list.date_modified,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductListWithItems {
    #[serde(flatten)]
    pub list: ProductListResponse,
    pub items: Vec<ItemResponse>,
}

/// Page of the caller's lists, each with its items
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductListPage {
    pub page: u32,
    pub pages: u32,
    pub per_page: u32,
    pub total: u64,
    pub items: Vec<ProductListWithItems>,
}

/// One list with a page of its items
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductListItemsPage {
    #[serde(flatten)]
    pub list: ProductListResponse,
    pub page: u32,
    pub pages: u32,
    pub per_page: u32,
    pub total: u64,
    pub items: Vec<ItemResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductListEnvelope {
    pub status: String,
    pub message: String,
    pub productlist: ProductListResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemEnvelope {
    pub status: String,
    pub message: String,
    pub productlist_item: ItemResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub status: String,
    pub message: String,
}

fn required_name(name: &str) -> Result<&str, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(
            "Input payload validation failed: 'item' is a required property".to_string(),
        ));
    }
    Ok(trimmed)
}

fn list_not_found() -> AppError {
    AppError::NotFound("productlist not found".to_string())
}

fn success(message: &str) -> (String, String) {
    ("success".to_string(), message.to_string())
}

async fn all_items(state: &AppState, list_id: i64) -> Result<Vec<ItemResponse>, AppError> {
    let page: Page<ProductListItem> = state
        .stores
        .product_lists
        .list_items(list_id, 1, u32::MAX)
        .await?;
    Ok(page.items.into_iter().map(ItemResponse::from).collect())
}

/// List the caller's product lists
#[utoipa::path(
    get,
    path = "/api/v1/productlists",
    tag = "productlists",
    params(PageParams),
    responses(
        (status = 200, description = "A page of product lists", body = ProductListPage),
        (status = 404, description = "Search matched nothing", body = crate::error::ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn list_product_lists(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<PageParams>,
) -> Result<Json<ProductListPage>, AppError> {
    let search = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let (page, per_page) = (params.page(), params.per_page());

    let lists = state
        .stores
        .product_lists
        .list_lists(user.summary.user_id, search, page, per_page)
        .await?;

    if search.is_some() && lists.total == 0 {
        return Err(list_not_found());
    }

    let pages = lists.total_pages();
    let total = lists.total;
    let mut items = Vec::with_capacity(lists.items.len());
    for list in lists.items {
        let list_items = all_items(&state, list.id).await?;
        items.push(ProductListWithItems {
            list: list.into(),
            items: list_items,
        });
    }

    Ok(Json(ProductListPage {
        page,
        pages,
        per_page,
        total,
        items,
    }))
}

/// Create a product list owned by the caller
#[utoipa::path(
    post,
    path = "/api/v1/productlists",
    tag = "productlists",
    request_body = ProductListInput,
    responses(
        (status = 201, description = "Product list created", body = ProductListEnvelope),
        (status = 400, description = "Blank name", body = crate::error::ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn create_product_list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<ProductListInput>,
) -> Result<impl IntoResponse, AppError> {
    let name = required_name(&input.item)?;
    let list = state
        .stores
        .product_lists
        .create_list(user.summary.user_id, name)
        .await?;

    let (status, message) = success("Productlist successfully created.");
    Ok((
        StatusCode::CREATED,
        Json(ProductListEnvelope {
            status,
            message,
            productlist: list.into(),
        }),
    ))
}

/// One of the caller's lists with a page of its items
#[utoipa::path(
    get,
    path = "/api/v1/productlists/{id}",
    tag = "productlists",
    params(("id" = i64, Path, description = "Product list ID"), PageParams),
    responses(
        (status = 200, description = "Product list with items", body = ProductListItemsPage),
        (status = 404, description = "Not found or not owned", body = crate::error::ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn get_product_list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Json<ProductListItemsPage>, AppError> {
    let list = state
        .stores
        .product_lists
        .get_list(user.summary.user_id, id)
        .await?
        .ok_or_else(list_not_found)?;

    let (page, per_page) = (params.page(), params.per_page());
    let items = state
        .stores
        .product_lists
        .list_items(list.id, page, per_page)
        .await?;

    Ok(Json(ProductListItemsPage {
        list: list.into(),
        page,
        pages: items.total_pages(),
        per_page,
        total: items.total,
        items: items.items.into_iter().map(ItemResponse::from).collect(),
    }))
}

/// Rename one of the caller's lists
#[utoipa::path(
    put,
    path = "/api/v1/productlists/{id}",
    tag = "productlists",
    params(("id" = i64, Path, description = "Product list ID")),
    request_body = ProductListInput,
    responses(
        (status = 200, description = "Product list renamed", body = ProductListEnvelope),
        (status = 400, description = "Blank name", body = crate::error::ApiError),
        (status = 404, description = "Not found or not owned", body = crate::error::ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn update_product_list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(input): Json<ProductListInput>,
) -> Result<Json<ProductListEnvelope>, AppError> {
    let name = required_name(&input.item)?;
    let list = state
        .stores
        .product_lists
        .rename_list(user.summary.user_id, id, name)
        .await?
        .ok_or_else(list_not_found)?;

    let (status, message) = success("ProductsList successfully updated.");
    Ok(Json(ProductListEnvelope {
        status,
        message,
        productlist: list.into(),
    }))
}

/// Delete one of the caller's lists and its items
#[utoipa::path(
    delete,
    path = "/api/v1/productlists/{id}",
    tag = "productlists",
    params(("id" = i64, Path, description = "Product list ID")),
    responses(
        (status = 200, description = "Product list deleted", body = DeleteResponse),
        (status = 403, description = "Not found or not owned", body = crate::error::ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn delete_product_list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, AppError> {
    if !state
        .stores
        .product_lists
        .delete_list(user.summary.user_id, id)
        .await?
    {
        return Err(AppError::Forbidden(
            "You do not own a product list with this id".to_string(),
        ));
    }

    let (status, message) = success("Product list successfully deleted.");
    Ok(Json(DeleteResponse { status, message }))
}

/// Add an item to one of the caller's lists
#[utoipa::path(
    post,
    path = "/api/v1/productlists/{id}/items",
    tag = "productlists",
    params(("id" = i64, Path, description = "Product list ID")),
    request_body = ItemInput,
    responses(
        (status = 201, description = "Item created", body = ItemEnvelope),
        (status = 400, description = "Blank item", body = crate::error::ApiError),
        (status = 404, description = "List not found or not owned", body = crate::error::ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(input): Json<ItemInput>,
) -> Result<impl IntoResponse, AppError> {
    let name = required_name(&input.item)?;
    let item = state
        .stores
        .product_lists
        .add_item(user.summary.user_id, id, name, input.likes)
        .await?
        .ok_or_else(list_not_found)?;

    let (status, message) = success("Productlist item successfully created.");
    Ok((
        StatusCode::CREATED,
        Json(ItemEnvelope {
            status,
            message,
            productlist_item: item.into(),
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/productlists/{id}/items/{item_id}",
    tag = "productlists",
    params(
        ("id" = i64, Path, description = "Product list ID"),
        ("item_id" = i64, Path, description = "Item ID"),
    ),
    request_body = ItemInput,
    responses(
        (status = 200, description = "Item updated", body = ItemEnvelope),
        (status = 400, description = "Blank item", body = crate::error::ApiError),
        (status = 404, description = "Item not found", body = crate::error::ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path((id, item_id)): Path<(i64, i64)>,
    Json(input): Json<ItemInput>,
) -> Result<Json<ItemEnvelope>, AppError> {
    let name = required_name(&input.item)?;
    let item = state
        .stores
        .product_lists
        .update_item(user.summary.user_id, id, item_id, name, input.likes)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".to_string()))?;

    let (status, message) = success("Productlist item successfully updated.");
    Ok(Json(ItemEnvelope {
        status,
        message,
        productlist_item: item.into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/productlists/{id}/items/{item_id}",
    tag = "productlists",
    params(
        ("id" = i64, Path, description = "Product list ID"),
        ("item_id" = i64, Path, description = "Item ID"),
    ),
    responses(
        (status = 200, description = "Item deleted", body = DeleteResponse),
        (status = 403, description = "Item not found or list not owned", body = crate::error::ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path((id, item_id)): Path<(i64, i64)>,
) -> Result<Json<DeleteResponse>, AppError> {
    if !state
        .stores
        .product_lists
        .delete_item(user.summary.user_id, id, item_id)
        .await?
    {
        return Err(AppError::Forbidden(
            "You do not own an item with this id".to_string(),
        ));
    }

    let (status, message) = success("Item successfully deleted.");
    Ok(Json(DeleteResponse { status, message }))
}
