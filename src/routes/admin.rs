use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Staff Router Module
///
/// Catalog management for ADMIN and OWNER users. Authentication happens in the
/// `AuthUser` extractor of each handler; the role check follows immediately via
/// `require_staff`, so a signed-in USER gets 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Categories ---
        .route("/categories", post(handlers::categories::create_category))
        .route(
            "/categories/{id}",
            put(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )
        // --- Products ---
        // POST /products and POST /products/create are the same operation; the second
        // path is kept for older admin clients.
        .route("/products", post(handlers::products::create_product))
        .route("/products/create", post(handlers::products::create_product))
        .route(
            "/products/{id}",
            put(handlers::products::update_product).delete(handlers::products::delete_product),
        )
        // --- Tooling ---
        .route("/translate", post(handlers::translate::translate_text))
        .route(
            "/suppliers",
            get(handlers::catalog::list_suppliers).post(handlers::catalog::create_supplier),
        )
}
