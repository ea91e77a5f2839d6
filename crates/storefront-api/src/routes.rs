//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::auth::{auth_gate, require_admin};
use crate::handlers::{auth, product_lists, products};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;

/// Create API v1 routes
///
/// Layers run outermost-last, so on admin routes `auth_gate` resolves the
/// caller before `require_admin` inspects it.
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let gate = middleware::from_fn_with_state(state, auth_gate);

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/products", get(products::list_products))
        .route("/products/:id", get(products::get_product));

    // Admin routes
    let admin_routes = Router::new()
        .route("/products", post(products::create_product))
        .route(
            "/products/:id",
            patch(products::update_product).delete(products::delete_product),
        )
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(gate.clone());

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/auth/status", get(auth::status_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/products/purchases", get(products::list_purchases))
        .route("/products/:id/buy", patch(products::buy_product))
        .route("/products/:id/like", patch(products::like_product))
        .route(
            "/productlists",
            get(product_lists::list_product_lists).post(product_lists::create_product_list),
        )
        .route(
            "/productlists/:id",
            get(product_lists::get_product_list)
                .put(product_lists::update_product_list)
                .delete(product_lists::delete_product_list),
        )
        .route("/productlists/:id/items", post(product_lists::create_item))
        .route(
            "/productlists/:id/items/:item_id",
            put(product_lists::update_item).delete(product_lists::delete_item),
        )
        .route_layer(gate);

    // Combine routes
    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .merge(protected_routes)
}
