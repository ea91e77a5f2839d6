//! Product catalogue handlers
//!
//! Listing and lookup are public. Create, update and delete require the
//! admin role; buying, liking and purchase history require a valid token.
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
use storefront_core::{
    NewProduct, Product, ProductOrder, ProductQuery, ProductUpdate, PurchaseLog, PurchaseOutcome,
};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;

/// Product as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: i64,
    pub item: String,
    pub npc: String,
    pub stock: i32,
    pub price: f64,
    pub likes: i32,
    pub last_update: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            item: product.item,
            npc: product.npc,
            stock: product.stock,
            price: product.price,
            likes: product.likes,
            last_update: product.last_update,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListParams {
    /// 1-based page number
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// `likes` sorts by likes, most liked first
    #[serde(rename = "orderBy")]
    pub order_by: Option<String>,
    /// Exact item name
    #[serde(rename = "searchByName")]
    pub search_by_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PageLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    pub first: String,
    pub prev: String,
    pub next: String,
    pub last: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductPageMetadata {
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub total_products: u64,
    pub links: PageLinks,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductPage {
    pub metadata: ProductPageMetadata,
    pub products: Vec<ProductResponse>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 80))]
    pub item: String,
    #[validate(length(min = 1, max = 80))]
    pub npc: String,
    #[validate(range(min = 1))]
    pub stock: i32,
    pub price: f64,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 80))]
    pub item: Option<String>,
    #[validate(length(min = 1, max = 80))]
    pub npc: Option<String>,
    #[validate(range(min = 1))]
    pub stock: Option<i32>,
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BuyRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurchasedProduct {
    pub id: i64,
    pub item: String,
    pub npc: String,
    pub current_stock: i32,
    pub price: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuccessfulPurchase {
    pub product: PurchasedProduct,
    pub purchase_quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StockNotEnough {
    pub current_stock: i32,
}

/// Outcome of a purchase attempt
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BuyResponse {
    SuccessfulPurchase(SuccessfulPurchase),
    StockNotEnough(StockNotEnough),
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurchaseLogResponse {
    pub id: i64,
    pub product_id: i64,
    pub purchase_quantity: i32,
    pub datetime: DateTime<Utc>,
}

impl From<PurchaseLog> for PurchaseLogResponse {
    fn from(log: PurchaseLog) -> Self {
        Self {
            id: log.id,
            product_id: log.product_id,
            purchase_quantity: log.purchase_quantity,
            datetime: log.datetime,
        }
    }
}

fn product_not_found() -> AppError {
    AppError::NotFound("Product not found".to_string())
}

fn positive(value: Option<u32>, field: &str) -> Result<u32, AppError> {
    match value {
        Some(v) if v > 0 => Ok(v),
        _ => Err(AppError::BadRequest(format!(
            "{field} field must be a positive integer"
        ))),
    }
}

fn page_links(page: u32, per_page: u32, total_pages: u32) -> PageLinks {
    let link = |p: u32| format!("/api/v1/products?page={p}&per_page={per_page}");
    let total_pages = total_pages.max(1);
    let prev = if page > 1 { page - 1 } else { 1 };
    let next = if page < total_pages { page + 1 } else { total_pages };

    PageLinks {
        self_link: link(page),
        first: link(1),
        prev: link(prev),
        next: link(next),
        last: link(total_pages),
    }
}

/// List products, one page at a time
#[utoipa::path(
    get,
    path = "/api/v1/products",
    tag = "products",
    params(ProductListParams),
    responses(
        (status = 200, description = "A page of products", body = ProductPage),
        (status = 400, description = "Missing or invalid paging", body = crate::error::ApiError),
    )
)]
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProductListParams>,
) -> Result<Json<ProductPage>, AppError> {
    let page = positive(params.page, "page")?;
    let per_page = positive(params.per_page, "per_page")?;

    let order = match params.order_by.as_deref() {
        Some("likes") => ProductOrder::LikesDesc,
        _ => ProductOrder::Item,
    };
    let search = params.search_by_name.filter(|s| !s.trim().is_empty());

    let result = state
        .stores
        .products
        .list_products(&ProductQuery {
            search,
            order,
            page,
            per_page,
        })
        .await?;

    let total_pages = result.total_pages();
    Ok(Json(ProductPage {
        metadata: ProductPageMetadata {
            page,
            per_page,
            total_pages,
            total_products: result.total,
            links: page_links(page, per_page, total_pages),
        },
        products: result.items.into_iter().map(ProductResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    tag = "products",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found", body = crate::error::ApiError),
    )
)]
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = state
        .stores
        .products
        .get_product(id)
        .await?
        .ok_or_else(product_not_found)?;

    Ok(Json(product.into()))
}

/// Add a product to the catalogue (admin only)
#[utoipa::path(
    post,
    path = "/api/v1/products",
    tag = "products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid input or item already exists", body = crate::error::ApiError),
        (status = 403, description = "Caller is not an admin", body = crate::error::ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let item = request.item.clone();
    let product = state
        .stores
        .products
        .create_product(NewProduct {
            item: request.item,
            npc: request.npc,
            stock: request.stock,
            price: request.price,
        })
        .await
        .map_err(|e| match e {
            storefront_core::StoreError::AlreadyExists(_) => {
                AppError::BadRequest(format!("A product with item '{item}' already exists."))
            }
            other => other.into(),
        })?;

    tracing::info!(product_id = product.id, item = %product.item, "product created");
    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

/// Partially update a product (admin only)
#[utoipa::path(
    patch,
    path = "/api/v1/products/{id}",
    tag = "products",
    params(("id" = i64, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 404, description = "Product not found", body = crate::error::ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    request.validate()?;

    let product = state
        .stores
        .products
        .update_product(
            id,
            ProductUpdate {
                item: request.item,
                npc: request.npc,
                stock: request.stock,
                price: request.price,
            },
        )
        .await?
        .ok_or_else(product_not_found)?;

    Ok(Json(product.into()))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletedResponse {
    pub ok: String,
}

/// Remove a product (admin only)
#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    tag = "products",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted", body = DeletedResponse),
        (status = 404, description = "Product not found", body = crate::error::ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, AppError> {
    if !state.stores.products.delete_product(id).await? {
        return Err(product_not_found());
    }

    tracing::info!(product_id = id, "product deleted");
    Ok(Json(DeletedResponse {
        ok: "Product deleted".to_string(),
    }))
}

/// Buy `quantity` units of a product
///
/// Insufficient stock is reported with 200 and a `stock_not_enough` body.
#[utoipa::path(
    patch,
    path = "/api/v1/products/{id}/buy",
    tag = "products",
    params(("id" = i64, Path, description = "Product ID")),
    request_body = BuyRequest,
    responses(
        (status = 200, description = "Purchase outcome", body = BuyResponse),
        (status = 404, description = "Product not found", body = crate::error::ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn buy_product(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(request): Json<BuyRequest>,
) -> Result<Json<BuyResponse>, AppError> {
    request.validate()?;

    let outcome = state
        .stores
        .products
        .buy_product(id, user.summary.user_id, request.quantity)
        .await?
        .ok_or_else(product_not_found)?;

    let response = match outcome {
        PurchaseOutcome::Purchased(product) => {
            tracing::info!(
                product_id = id,
                user_id = %user.summary.user_id,
                quantity = request.quantity,
                "purchase recorded"
            );
            BuyResponse::SuccessfulPurchase(SuccessfulPurchase {
                product: PurchasedProduct {
                    id: product.id,
                    item: product.item,
                    npc: product.npc,
                    current_stock: product.stock,
                    price: product.price,
                },
                purchase_quantity: request.quantity,
            })
        }
        PurchaseOutcome::InsufficientStock { current_stock } => {
            BuyResponse::StockNotEnough(StockNotEnough { current_stock })
        }
    };

    Ok(Json(response))
}

#[utoipa::path(
    patch,
    path = "/api/v1/products/{id}/like",
    tag = "products",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Like recorded", body = ProductResponse),
        (status = 404, description = "Product not found", body = crate::error::ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn like_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = state
        .stores
        .products
        .like_product(id)
        .await?
        .ok_or_else(product_not_found)?;

    Ok(Json(product.into()))
}

/// Purchase history of the caller, newest first
#[utoipa::path(
    get,
    path = "/api/v1/products/purchases",
    tag = "products",
    responses(
        (status = 200, description = "Purchase history", body = [PurchaseLogResponse]),
    ),
    security(("api_key" = []))
)]
pub async fn list_purchases(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<PurchaseLogResponse>>, AppError> {
    let logs = state
        .stores
        .products
        .purchases_for_user(user.summary.user_id)
        .await?;

    Ok(Json(logs.into_iter().map(PurchaseLogResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_links_clamp_to_range() {
        let links = page_links(1, 10, 3);
        assert_eq!(links.prev, "/api/v1/products?page=1&per_page=10");
        assert_eq!(links.next, "/api/v1/products?page=2&per_page=10");
        assert_eq!(links.last, "/api/v1/products?page=3&per_page=10");

        let links = page_links(3, 10, 3);
        assert_eq!(links.next, "/api/v1/products?page=3&per_page=10");
    }

    #[test]
    fn test_positive_rejects_zero_and_missing() {
        assert_eq!(positive(Some(2), "page").unwrap(), 2);
        assert!(positive(Some(0), "page").is_err());
        assert!(positive(None, "page").is_err());
    }

    #[test]
    fn test_buy_response_shape() {
        let json = serde_json::to_value(BuyResponse::StockNotEnough(StockNotEnough {
            current_stock: 2,
        }))
        .unwrap();
        assert_eq!(json["stock_not_enough"]["current_stock"], 2);
    }
}
