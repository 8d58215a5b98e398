use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod comparison;
pub mod config;
pub mod email;
pub mod error;
pub mod handlers;
pub mod locale;
pub mod media;
pub mod models;
pub mod password;
pub mod repository;
pub mod slug;
pub mod storage;
pub mod translate;

// Security-segregated routers (public, authenticated, staff).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use email::{HttpMailer, LogMailer, MailerState, MockMailer};
pub use error::{AppError, AppResult};
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{LocalStorage, MockStorageService, S3StorageClient, StorageState};
pub use translate::{DeepLTranslator, TranslatorState};

/// Multipart bodies may carry several files; the request limit leaves room for this many
/// maximum-size uploads plus the form fields.
const MAX_FILES_PER_REQUEST: usize = 10;

/// ApiDoc
///
/// OpenAPI document aggregated from the `#[utoipa::path]` handlers and `ToSchema` models.
/// Served at `/api-docs/openapi.json`, browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::accounts::login, handlers::accounts::get_me,
        handlers::accounts::create_temp_account, handlers::accounts::verify_temp_account,
        handlers::categories::list_categories, handlers::categories::get_category,
        handlers::categories::create_category, handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::products::list_products, handlers::products::get_product,
        handlers::products::create_product, handlers::products::update_product,
        handlers::products::delete_product, handlers::products::product_comparison,
        handlers::media::serve_media, handlers::media::serve_media_by_id,
        handlers::translate::translate_text,
        handlers::catalog::list_suppliers, handlers::catalog::create_supplier,
        handlers::catalog::list_plans,
    ),
    components(
        schemas(
            models::Role, models::MediaType, models::User, models::Category,
            models::CategoryTranslation, models::Product, models::ProductTranslation,
            models::Media, models::Supplier, models::ProductSupplier, models::Plan,
            models::CategoryTranslationInput, models::CategoryPayload,
            models::TranslationInput, models::MediaInput, models::SupplierLinkInput,
            models::CreateProductRequest, models::UpdateMediaInput,
            models::UpdateProductRequest, models::CreateSupplierRequest,
            models::CreateTempAccountRequest, models::LoginRequest, models::LoginResponse,
            models::TranslateRequest, models::TranslateResponse, models::Pagination,
            models::ProductListResponse, models::ProductResponse,
            models::ProductMutationResponse, models::CategoryResponse,
            models::CategoryListResponse, models::MessageResponse, models::SuccessResponse,
            models::TempAccountCreated,
            comparison::ProductComparison, comparison::SupplierQuote,
            comparison::MarketplaceQuote,
        )
    ),
    tags(
        (name = "product-genius", description = "Product research catalog API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single shared container of services and configuration, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    /// Persistence behind the `Repository` trait.
    pub repo: RepositoryState,
    /// Media bytes (local filesystem or S3).
    pub storage: StorageState,
    /// Outbound transactional email.
    pub mailer: MailerState,
    /// Machine translation; `None` when no API key is configured.
    pub translator: TranslatorState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated router: extracting `AuthUser` rejects with 401 before the
/// handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing tree, scoped middleware and the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_mul(MAX_FILES_PER_REQUEST)
        .saturating_add(1024 * 1024);

    let api = public::public_routes()
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .merge(admin::admin_routes());

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: every log line of a request carries its request id.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
