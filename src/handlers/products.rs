use axum::{
    Json,
    extract::{Path, Query, Request, State},
    http::StatusCode,
};
use validator::Validate;

use super::parse_id;
use crate::{
    AppState,
    auth::AuthUser,
    comparison::{ProductComparison, build_comparison},
    error::{AppError, AppResult},
    locale::Locale,
    media::{
        local_key, merge_media, orphaned_keys, read_product_submission, spawn_file_cleanup,
        store_uploads,
    },
    models::{
        CreateProductRequest, MessageResponse, NewMedia, NewProduct, NewProductTranslation,
        Pagination, Product, ProductListParams, ProductListResponse, ProductMutationResponse,
        ProductResponse, ProductUpdate, TranslationInput, UpdateProductRequest,
        ensure_unique_locales,
    },
    slug::slugify,
};

fn not_found() -> AppError {
    AppError::NotFound("Product not found".to_string())
}

fn new_translations(translations: &[TranslationInput]) -> Vec<NewProductTranslation> {
    translations
        .iter()
        .map(|t| NewProductTranslation {
            locale: t.locale.clone(),
            title: t.title.clone(),
            description: t.description.clone(),
            slug: slugify(&t.title),
        })
        .collect()
}

async fn load_product(state: &AppState, id: i32) -> AppResult<Product> {
    state
        .repo
        .get_product(id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("product {id} missing after write")))
}

/// list_products
///
/// [Public Route] Paginated product listing, newest first.
#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductListParams),
    responses((status = 200, description = "One page of products", body = ProductListResponse))
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> AppResult<Json<ProductListResponse>> {
    let query = params.into_query();
    let (products, total) = state.repo.list_products(&query).await?;
    Ok(Json(ProductListResponse {
        products,
        pagination: Pagination::new(query.page, query.limit, total),
    }))
}

/// get_product
///
/// [Authenticated Route] Full product detail: translations, all media, category and
/// supplier links.
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Found", body = ProductResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<ProductResponse>> {
    let id = parse_id(&raw_id, "product")?;
    let product = state.repo.get_product(id).await?.ok_or_else(not_found)?;
    Ok(Json(ProductResponse { product }))
}

/// create_product
///
/// [Staff Route] Accepts JSON or a multipart form (`productData` + `media_<n>` files).
///
/// Order of operations: files are validated while the body is read, the product and its
/// URL-based relations are written in one transaction, then the uploads are stored and
/// recorded. A storage failure deletes the product and any files already written.
#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Created", body = ProductMutationResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not staff"),
        (status = 413, description = "Upload too large")
    )
)]
pub async fn create_product(
    user: AuthUser,
    State(state): State<AppState>,
    request: Request,
) -> AppResult<(StatusCode, Json<ProductMutationResponse>)> {
    user.require_staff()?;

    let submission =
        read_product_submission::<CreateProductRequest>(request, state.config.max_upload_bytes)
            .await?;
    let data = submission.data;
    data.validate()?;
    ensure_unique_locales(data.translations.iter().map(|t| t.locale.as_str()))?;

    let new_product = NewProduct {
        translations: new_translations(&data.translations),
        media: data
            .media
            .into_iter()
            .map(|m| NewMedia {
                url: m.url,
                media_type: m.media_type,
                sort_order: m.sort_order,
                provider: m.provider.unwrap_or_else(|| "external".to_string()),
                metadata: m.metadata,
            })
            .collect(),
        default_title: data.default_title,
        default_description: data.default_description,
        suggested_price: data.suggested_price,
        currency: data.currency,
        category_id: data.category_id,
        is_active: data.is_active,
        metadata: data.metadata,
        suppliers: data.suppliers,
    };

    let product_id = state.repo.create_product(new_product).await?;

    if !submission.files.is_empty() {
        let stored = match store_uploads(&state.storage, product_id, submission.files).await {
            Ok(stored) => stored,
            Err(e) => {
                discard_product(&state, product_id).await;
                return Err(e);
            }
        };

        let keys: Vec<String> = stored.iter().filter_map(|m| local_key(&m.url)).collect();
        if let Err(e) = state.repo.add_product_media(product_id, stored).await {
            discard_product(&state, product_id).await;
            spawn_file_cleanup(state.storage.clone(), keys);
            return Err(e);
        }
    }

    let product = load_product(&state, product_id).await?;
    tracing::info!(product_id, user_id = user.id, media = product.media.len(), "product created");

    Ok((
        StatusCode::CREATED,
        Json(ProductMutationResponse {
            message: "Product created successfully".to_string(),
            product,
        }),
    ))
}

async fn discard_product(state: &AppState, product_id: i32) {
    if let Err(e) = state.repo.delete_product(product_id).await {
        tracing::error!(product_id, error = %e, "failed to discard partially created product");
    }
}

/// update_product
///
/// [Staff Route] Full replacement of scalars, translations (slugs regenerated) and media.
/// Media = kept form media + new uploads, sorted by requested order and re-indexed.
/// Local files no longer referenced are deleted in the background after the response.
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated", body = ProductMutationResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_product(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    request: Request,
) -> AppResult<Json<ProductMutationResponse>> {
    user.require_staff()?;
    let id = parse_id(&raw_id, "product")?;
    let existing = state.repo.get_product(id).await?.ok_or_else(not_found)?;

    let submission =
        read_product_submission::<UpdateProductRequest>(request, state.config.max_upload_bytes)
            .await?;
    let data = submission.data;
    data.validate()?;
    ensure_unique_locales(data.translations.iter().map(|t| t.locale.as_str()))?;

    let uploaded = store_uploads(&state.storage, id, submission.files).await?;
    let uploaded_keys: Vec<String> = uploaded.iter().filter_map(|m| local_key(&m.url)).collect();

    let media = merge_media(data.media, uploaded);
    let orphans = orphaned_keys(&existing.media, &media);

    let update = ProductUpdate {
        suggested_price: data.suggested_price,
        currency: data.currency,
        category_id: data.category_id,
        is_active: data.is_active,
        translations: new_translations(&data.translations),
        media,
    };

    match state.repo.update_product(id, update).await {
        Ok(true) => {}
        Ok(false) => {
            spawn_file_cleanup(state.storage.clone(), uploaded_keys);
            return Err(not_found());
        }
        Err(e) => {
            spawn_file_cleanup(state.storage.clone(), uploaded_keys);
            return Err(e);
        }
    }

    spawn_file_cleanup(state.storage.clone(), orphans);

    let product = load_product(&state, id).await?;
    tracing::info!(product_id = id, user_id = user.id, "product updated");

    Ok(Json(ProductMutationResponse {
        message: "Product updated successfully".to_string(),
        product,
    }))
}

/// delete_product
///
/// [Staff Route] Deletes the product (translations, media rows and supplier links
/// cascade) and removes its local files in the background.
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_product(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    user.require_staff()?;
    let id = parse_id(&raw_id, "product")?;

    let existing = state.repo.get_product(id).await?.ok_or_else(not_found)?;
    let local_files: Vec<String> = existing
        .media
        .iter()
        .filter_map(|m| local_key(&m.url))
        .collect();

    if !state.repo.delete_product(id).await? {
        return Err(not_found());
    }
    spawn_file_cleanup(state.storage.clone(), local_files);

    tracing::info!(product_id = id, user_id = user.id, "product deleted");
    Ok(Json(MessageResponse {
        message: "Product deleted successfully".to_string(),
    }))
}

/// product_comparison
///
/// [Authenticated Route] Supplier vs. marketplace price research for one product.
#[utoipa::path(
    get,
    path = "/api/products/{id}/comparison",
    params(
        ("id" = i32, Path, description = "Product ID"),
        ("locale" = Option<String>, Query, description = "Preferred content locale")
    ),
    responses(
        (status = 200, description = "Comparison", body = ProductComparison),
        (status = 404, description = "Not Found")
    )
)]
pub async fn product_comparison(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    locale: Locale,
) -> AppResult<Json<ProductComparison>> {
    let id = parse_id(&raw_id, "product")?;
    let product = state.repo.get_product(id).await?.ok_or_else(not_found)?;
    Ok(Json(build_comparison(&product, locale.as_str())))
}
