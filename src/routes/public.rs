use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. Product listing is public; product detail is
/// not.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // POST /auth/login
        // Email + password in, session token out.
        .route("/auth/login", post(handlers::accounts::login))
        // Registration: pending account + verification email, then the emailed link.
        .route(
            "/users/temp/create",
            post(handlers::accounts::create_temp_account),
        )
        .route(
            "/users/temp/verify/{token}",
            get(handlers::accounts::verify_temp_account),
        )
        // GET /categories?search=&sortBy=&sortOrder=&filter=
        .route("/categories", get(handlers::categories::list_categories))
        .route("/categories/{id}", get(handlers::categories::get_category))
        // GET /products?page=&limit=&search=&categoryId=&isActive=
        .route("/products", get(handlers::products::list_products))
        // GET /media?path=
        // Streams stored files, redirects external URLs.
        .route("/media", get(handlers::media::serve_media))
        .route("/plans", get(handlers::catalog::list_plans))
}
