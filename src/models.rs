use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

// --- Enumerations (Postgres enum types) ---

/// Role
///
/// RBAC field stored in the `user_role` enum. OWNER and ADMIN are "staff" and may
/// mutate the catalog; USER may only browse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Role {
    Owner,
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[sqlx(type_name = "media_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

impl MediaType {
    /// Video when the MIME type says so, image for everything else.
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.starts_with("video/") {
            MediaType::Video
        } else {
            MediaType::Image
        }
    }
}

// --- Identity ---

/// User
///
/// Canonical account record from the `users` table. The password hash never leaves
/// the repository through this type.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Login lookup row: identity plus the stored argon2 hash.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserCredentials {
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            email: self.email,
            name: self.name,
            role: self.role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// TempAccount
///
/// A registration waiting for its email link to be clicked.
#[derive(Debug, Clone, FromRow)]
pub struct TempAccount {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

impl TempAccount {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct NewTempAccount {
    pub email: String,
    pub password_hash: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

// --- Catalog ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategoryTranslation {
    pub id: i32,
    pub category_id: i32,
    pub locale: String,
    pub title: String,
    pub description: Option<String>,
}

/// Category
///
/// A category row with its translations (ordered by locale). `product_count` is only
/// populated by the category endpoints; embedded categories omit it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Category {
    pub id: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_count: Option<i64>,
    #[sqlx(skip)]
    pub translations: Vec<CategoryTranslation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductTranslation {
    pub id: i32,
    pub product_id: i32,
    pub locale: String,
    pub title: String,
    pub description: String,
    pub slug: Option<String>,
}

/// Media
///
/// An ordered attachment. Local files have URLs under `/uploads/`; everything else is
/// an external URL that clients fetch directly.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Media {
    pub id: i32,
    pub product_id: Option<i32>,
    pub url: String,
    pub provider: Option<String>,
    // `type` is a reserved keyword in Rust.
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub media_type: MediaType,
    pub alt: Option<String>,
    pub sort_order: i32,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Supplier {
    pub id: i32,
    pub name: String,
    pub marketplace: Option<String>,
    pub base_url: Option<String>,
    pub contact_info: Option<String>,
    pub notes: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// ProductSupplier
///
/// Link between a product and a supplier listing, joined with the supplier's name.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductSupplier {
    pub id: i32,
    pub product_id: i32,
    pub supplier_id: i32,
    pub supplier_name: String,
    pub url: String,
    pub marketplace: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub is_primary: bool,
    pub notes: Option<String>,
}

/// Product
///
/// A product row plus its relations. List views carry only the first media item and no
/// supplier links; the detail view carries everything.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: i32,
    pub sku: Option<String>,
    pub default_title: Option<String>,
    pub default_description: Option<String>,
    pub suggested_price: Option<f64>,
    pub currency: Option<String>,
    pub popularity_score: i32,
    pub category_id: Option<i32>,
    pub is_active: bool,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
    pub views: i32,
    pub likes: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub translations: Vec<ProductTranslation>,
    #[sqlx(skip)]
    pub media: Vec<Media>,
    #[sqlx(skip)]
    pub category: Option<Category>,
    #[sqlx(skip)]
    pub suppliers: Vec<ProductSupplier>,
}

// --- Billing ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Plan {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub interval: String,
    pub active: bool,
    #[schema(value_type = Option<Object>)]
    pub features: Option<Value>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// One locale of a category. Fields default to empty so that missing values produce
/// the domain message instead of a deserialization error.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategoryTranslationInput {
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// CategoryPayload
///
/// Body of POST/PUT /categories. The whole translation set is replaced on update.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategoryPayload {
    #[serde(default)]
    pub translations: Vec<CategoryTranslationInput>,
}

impl CategoryPayload {
    pub fn validate_translations(&self) -> AppResult<()> {
        if self.translations.is_empty() {
            return Err(AppError::Validation(
                "At least one translation is required".to_string(),
            ));
        }
        if self
            .translations
            .iter()
            .any(|t| t.locale.trim().is_empty() || t.title.trim().is_empty())
        {
            return Err(AppError::Validation(
                "Each translation must have locale and title".to_string(),
            ));
        }
        ensure_unique_locales(self.translations.iter().map(|t| t.locale.as_str()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct TranslationInput {
    #[validate(length(min = 1))]
    pub locale: String,
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
}

/// A media item referenced by URL at product creation.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MediaInput {
    #[validate(url)]
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub sort_order: i32,
    pub provider: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SupplierLinkInput {
    #[validate(range(min = 1))]
    pub supplier_id: i32,
    #[validate(url)]
    pub url: String,
    pub marketplace: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub price: Option<f64>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    pub notes: Option<String>,
}

fn default_true() -> bool {
    true
}

/// CreateProductRequest
///
/// Body of POST /products, either as JSON or as the `productData` field of a
/// multipart form.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateProductRequest {
    pub default_title: Option<String>,
    pub default_description: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub suggested_price: Option<f64>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[validate(range(min = 1))]
    pub category_id: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
    #[validate(length(min = 1), nested)]
    pub translations: Vec<TranslationInput>,
    #[serde(default)]
    #[validate(nested)]
    pub media: Vec<MediaInput>,
    #[serde(default)]
    #[validate(nested)]
    pub suppliers: Vec<SupplierLinkInput>,
}

/// Media that the edit form keeps. URLs may be local paths, so only non-emptiness is
/// checked.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateMediaInput {
    #[validate(length(min = 1))]
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[validate(range(min = 0))]
    pub sort_order: i32,
}

/// UpdateProductRequest
///
/// Full replacement of a product's editable state. Absent optional scalars are cleared.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateProductRequest {
    #[validate(range(exclusive_min = 0.0))]
    pub suggested_price: Option<f64>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[validate(range(min = 1))]
    pub category_id: Option<i32>,
    pub is_active: bool,
    #[validate(length(min = 1), nested)]
    pub translations: Vec<TranslationInput>,
    #[serde(default)]
    #[validate(nested)]
    pub media: Vec<UpdateMediaInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1))]
    pub name: String,
    pub marketplace: Option<String>,
    #[validate(url)]
    pub base_url: Option<String>,
    pub contact_info: Option<String>,
    pub notes: Option<String>,
}

/// Missing fields deserialize as empty strings so they surface as validation details.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateTempAccountRequest {
    #[serde(default)]
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TranslateRequest {
    pub text: String,
    pub source_language: String,
    pub target_languages: Vec<String>,
}

// --- Repository Inputs ---

#[derive(Debug, Clone)]
pub struct NewProductTranslation {
    pub locale: String,
    pub title: String,
    pub description: String,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub struct NewMedia {
    pub url: String,
    pub media_type: MediaType,
    pub sort_order: i32,
    pub provider: String,
    pub metadata: Option<Value>,
}

/// Everything written in the create-product transaction.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub default_title: Option<String>,
    pub default_description: Option<String>,
    pub suggested_price: Option<f64>,
    pub currency: Option<String>,
    pub category_id: Option<i32>,
    pub is_active: bool,
    pub metadata: Option<Value>,
    pub translations: Vec<NewProductTranslation>,
    pub media: Vec<NewMedia>,
    pub suppliers: Vec<SupplierLinkInput>,
}

/// Everything written in the update-product transaction.
#[derive(Debug, Clone)]
pub struct ProductUpdate {
    pub suggested_price: Option<f64>,
    pub currency: Option<String>,
    pub category_id: Option<i32>,
    pub is_active: bool,
    pub translations: Vec<NewProductTranslation>,
    pub media: Vec<NewMedia>,
}

// --- Listing Queries ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategorySort {
    #[default]
    CreatedAt,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    WithProducts,
    WithoutProducts,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryQuery {
    pub search: Option<String>,
    pub sort: CategorySort,
    pub descending: bool,
    pub filter: CategoryFilter,
}

/// CategoryListParams
///
/// Raw query string of GET /categories. Unknown values fall back to defaults instead
/// of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CategoryListParams {
    pub search: Option<String>,
    /// `createdAt` (default) or `name`.
    pub sort_by: Option<String>,
    /// `asc` or `desc` (default).
    pub sort_order: Option<String>,
    /// `all` (default), `with_products` or `without_products`.
    pub filter: Option<String>,
}

impl CategoryListParams {
    pub fn into_query(self) -> CategoryQuery {
        CategoryQuery {
            search: non_blank(self.search),
            sort: match self.sort_by.as_deref() {
                Some("name") => CategorySort::Name,
                _ => CategorySort::CreatedAt,
            },
            descending: !matches!(self.sort_order.as_deref(), Some("asc")),
            filter: match self.filter.as_deref() {
                Some("with_products") => CategoryFilter::WithProducts,
                Some("without_products") => CategoryFilter::WithoutProducts,
                _ => CategoryFilter::All,
            },
        }
    }
}

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone)]
pub struct ProductQuery {
    pub page: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub category_id: Option<i32>,
    pub is_active: Option<bool>,
}

impl ProductQuery {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

/// ProductListParams
///
/// Raw query string of GET /products. Numbers are parsed leniently: garbage means
/// "use the default".
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ProductListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub category_id: Option<String>,
    /// `true` selects active products; any other value selects inactive ones.
    pub is_active: Option<String>,
}

impl ProductListParams {
    pub fn into_query(self) -> ProductQuery {
        let page = self
            .page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(1)
            .max(1);
        let limit = self
            .limit
            .and_then(|l| l.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        ProductQuery {
            page,
            limit,
            search: non_blank(self.search),
            category_id: self.category_id.and_then(|c| c.trim().parse().ok()),
            is_active: self.is_active.map(|v| v == "true"),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// --- Responses ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        // ceil(total / limit) without floats.
        let pages = if total == 0 { 0 } else { (total + limit - 1) / limit };
        Self { page, limit, total, pages }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProductListResponse {
    pub products: Vec<Product>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProductResponse {
    pub product: Product,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProductMutationResponse {
    pub message: String,
    pub product: Product,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CategoryResponse {
    pub category: Category,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CategoryListResponse {
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TempAccountCreated {
    pub message: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TranslateResponse {
    pub translations: BTreeMap<String, String>,
}

// --- Shared Checks ---

/// Rejects translation sets that mention the same locale twice; the schema would
/// otherwise fail with a unique-constraint error mid-transaction.
pub fn ensure_unique_locales<'a>(locales: impl IntoIterator<Item = &'a str>) -> AppResult<()> {
    let mut seen = HashSet::new();
    for locale in locales {
        if !seen.insert(locale.trim().to_lowercase()) {
            return Err(AppError::Validation(format!(
                "Duplicate translation for locale '{}'",
                locale
            )));
        }
    }
    Ok(())
}
