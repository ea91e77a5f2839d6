//! OpenAPI document served by Swagger UI
//!
//! Author: hephaex@gmail.com

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::auth::UserSummary;
use crate::error::ApiError;
use crate::handlers::{auth, health, product_lists, products};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register_handler,
        auth::login_handler,
        auth::status_handler,
        auth::logout_handler,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::buy_product,
        products::like_product,
        products::list_purchases,
        product_lists::list_product_lists,
        product_lists::create_product_list,
        product_lists::get_product_list,
        product_lists::update_product_list,
        product_lists::delete_product_list,
        product_lists::create_item,
        product_lists::update_item,
        product_lists::delete_item,
    ),
    components(schemas(
        ApiError,
        UserSummary,
        health::HealthResponse,
        auth::CredentialsRequest,
        auth::TokenResponse,
        auth::StatusResponse,
        auth::MessageResponse,
        products::ProductResponse,
        products::PageLinks,
        products::ProductPageMetadata,
        products::ProductPage,
        products::CreateProductRequest,
        products::UpdateProductRequest,
        products::BuyRequest,
        products::PurchasedProduct,
        products::SuccessfulPurchase,
        products::StockNotEnough,
        products::BuyResponse,
        products::PurchaseLogResponse,
        products::DeletedResponse,
        product_lists::ProductListInput,
        product_lists::ItemInput,
        product_lists::ItemResponse,
        product_lists::ProductListResponse,
        product_lists::ProductListWithItems,
        product_lists::ProductListPage,
        product_lists::ProductListItemsPage,
        product_lists::ProductListEnvelope,
        product_lists::ItemEnvelope,
        product_lists::DeleteResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Registration, login, token status and logout"),
        (name = "products", description = "Product catalogue and purchases"),
        (name = "productlists", description = "Per-user product lists"),
    )
)]
pub struct ApiDoc;

/// Registers the `api_key` scheme referenced by gated paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-TOKEN"))),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_gated_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/auth/status"));
        assert!(doc.paths.paths.contains_key("/api/v1/products/{id}/buy"));
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("api_key")));
    }
}
