use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes for any signed-in user. `create_router` wraps this router in the auth
/// middleware, so handlers here can rely on a resolved session.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::accounts::get_me))
        // GET /products/{id}
        // Full detail including every media item and supplier links.
        .route("/products/{id}", get(handlers::products::get_product))
        // GET /products/{id}/comparison?locale=
        .route(
            "/products/{id}/comparison",
            get(handlers::products::product_comparison),
        )
        // GET /media/{id}
        .route("/media/{id}", get(handlers::media::serve_media_by_id))
}
