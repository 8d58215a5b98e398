use crate::error::{AppError, AppResult};
use crate::models::{
    Category, CategoryFilter, CategoryQuery, CategorySort, CategoryTranslation,
    CategoryTranslationInput, CreateSupplierRequest, Media, NewMedia, NewProduct,
    NewProductTranslation, NewTempAccount, Plan, Product, ProductQuery, ProductSupplier,
    ProductTranslation, ProductUpdate, Role, Supplier, TempAccount, User, UserCredentials,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction, query_builder::QueryBuilder};
use std::collections::HashMap;
use std::sync::Arc;

/// Repository Trait
///
/// Contract for all persistence operations. Handlers only see `Arc<dyn Repository>`, so
/// tests substitute an in-memory implementation.
///
/// Lookups return `Ok(None)` / `Ok(false)` for missing rows; `Err` is reserved for real
/// failures.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: i32) -> AppResult<Option<User>>;
    async fn find_user_credentials(&self, email: &str) -> AppResult<Option<UserCredentials>>;
    /// Inserts the account as OWNER, or promotes and re-keys an existing one.
    async fn upsert_owner(&self, email: &str, password_hash: &str) -> AppResult<User>;

    // --- Temporary Accounts ---
    /// Drops any pending registration for the same email and stores the new one.
    async fn replace_temp_account(&self, account: NewTempAccount) -> AppResult<TempAccount>;
    async fn find_temp_account_by_token(&self, token: &str) -> AppResult<Option<TempAccount>>;
    async fn delete_temp_account(&self, id: i32) -> AppResult<()>;
    /// Creates the USER and removes the temp account in one transaction.
    async fn promote_temp_account(&self, account: &TempAccount) -> AppResult<User>;

    // --- Categories ---
    async fn list_categories(&self, query: &CategoryQuery) -> AppResult<Vec<Category>>;
    async fn get_category(&self, id: i32) -> AppResult<Option<Category>>;
    async fn create_category(&self, translations: Vec<CategoryTranslationInput>) -> AppResult<Category>;
    /// Replaces the whole translation set. `None` if the category does not exist.
    async fn update_category(
        &self,
        id: i32,
        translations: Vec<CategoryTranslationInput>,
    ) -> AppResult<Option<Category>>;
    async fn delete_category(&self, id: i32) -> AppResult<bool>;
    async fn count_products_in_category(&self, id: i32) -> AppResult<i64>;

    // --- Products ---
    /// One page of products plus the total number of matches.
    async fn list_products(&self, query: &ProductQuery) -> AppResult<(Vec<Product>, i64)>;
    /// The product with every relation loaded.
    async fn get_product(&self, id: i32) -> AppResult<Option<Product>>;
    /// Writes product, translations, URL media and supplier links in one transaction.
    async fn create_product(&self, product: NewProduct) -> AppResult<i32>;
    async fn add_product_media(&self, product_id: i32, media: Vec<NewMedia>) -> AppResult<()>;
    /// Replaces scalars, translations and media in one transaction. `false` if missing.
    async fn update_product(&self, id: i32, update: ProductUpdate) -> AppResult<bool>;
    async fn delete_product(&self, id: i32) -> AppResult<bool>;
    async fn get_media(&self, id: i32) -> AppResult<Option<Media>>;

    // --- Suppliers & Plans ---
    async fn list_suppliers(&self) -> AppResult<Vec<Supplier>>;
    async fn create_supplier(&self, supplier: CreateSupplierRequest) -> AppResult<Supplier>;
    async fn list_active_plans(&self) -> AppResult<Vec<Plan>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str = "id, email, name, role, created_at, updated_at";
const TEMP_ACCOUNT_COLUMNS: &str =
    "id, email, name, password_hash, token, expires_at, attempts, created_at";
const PRODUCT_COLUMNS: &str = "p.id, p.sku, p.default_title, p.default_description, \
     p.suggested_price, p.currency, p.popularity_score, p.category_id, p.is_active, \
     p.metadata, p.views, p.likes, p.created_at, p.updated_at";
const MEDIA_COLUMNS: &str =
    "id, product_id, url, provider, type, alt, sort_order, metadata, created_at";
const SUPPLIER_COLUMNS: &str =
    "id, name, marketplace, base_url, contact_info, notes, created_at, updated_at";

/// Maps constraint violations to client errors; everything else stays a database error.
fn map_write_error(e: sqlx::Error) -> AppError {
    if let Some(db) = e.as_database_error() {
        if db.is_foreign_key_violation() {
            return AppError::Validation(
                "Referenced category or supplier does not exist".to_string(),
            );
        }
        if db.is_unique_violation() {
            return AppError::Conflict("Resource already exists".to_string());
        }
    }
    AppError::Database(e)
}

/// Turns free text into an `ILIKE ... ESCAPE '\'` substring pattern; `%` and `_` in the
/// input match only themselves.
fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn group_by_key<T>(rows: Vec<T>, key: impl Fn(&T) -> i32) -> HashMap<i32, Vec<T>> {
    let mut grouped: HashMap<i32, Vec<T>> = HashMap::new();
    for row in rows {
        grouped.entry(key(&row)).or_default().push(row);
    }
    grouped
}

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn category_translations(
        &self,
        category_ids: &[i32],
    ) -> AppResult<HashMap<i32, Vec<CategoryTranslation>>> {
        if category_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, CategoryTranslation>(
            "SELECT id, category_id, locale, title, description
             FROM category_translations
             WHERE category_id = ANY($1)
             ORDER BY locale ASC",
        )
        .bind(category_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(group_by_key(rows, |t| t.category_id))
    }

    /// Categories (with translations, without counts) keyed by id.
    async fn categories_by_id(&self, ids: &[i32]) -> AppResult<HashMap<i32, Category>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, created_at, updated_at FROM categories WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut translations = self.category_translations(ids).await?;
        Ok(rows
            .into_iter()
            .map(|mut c| {
                c.translations = translations.remove(&c.id).unwrap_or_default();
                (c.id, c)
            })
            .collect())
    }

    async fn product_translations(
        &self,
        product_ids: &[i32],
    ) -> AppResult<HashMap<i32, Vec<ProductTranslation>>> {
        let rows = sqlx::query_as::<_, ProductTranslation>(
            "SELECT id, product_id, locale, title, description, slug
             FROM product_translations
             WHERE product_id = ANY($1)
             ORDER BY locale ASC",
        )
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(group_by_key(rows, |t| t.product_id))
    }

    /// Media grouped by product, ordered by sort order. `first_only` keeps just the
    /// lead item per product (list views).
    async fn product_media(
        &self,
        product_ids: &[i32],
        first_only: bool,
    ) -> AppResult<HashMap<i32, Vec<Media>>> {
        let sql = if first_only {
            format!(
                "SELECT DISTINCT ON (product_id) {MEDIA_COLUMNS} FROM media
                 WHERE product_id = ANY($1)
                 ORDER BY product_id, sort_order ASC, id ASC"
            )
        } else {
            format!(
                "SELECT {MEDIA_COLUMNS} FROM media
                 WHERE product_id = ANY($1)
                 ORDER BY sort_order ASC, id ASC"
            )
        };
        let rows = sqlx::query_as::<_, Media>(&sql)
            .bind(product_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(group_by_key(rows, |m| m.product_id.unwrap_or_default()))
    }

    async fn product_suppliers(&self, product_id: i32) -> AppResult<Vec<ProductSupplier>> {
        Ok(sqlx::query_as::<_, ProductSupplier>(
            "SELECT ps.id, ps.product_id, ps.supplier_id, s.name AS supplier_name, ps.url,
                    ps.marketplace, ps.price, ps.currency, ps.is_primary, ps.notes
             FROM product_suppliers ps
             JOIN suppliers s ON s.id = ps.supplier_id
             WHERE ps.product_id = $1
             ORDER BY ps.is_primary DESC, ps.id ASC",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Attaches translations, media and categories to a batch of product rows.
    async fn hydrate_products(
        &self,
        mut products: Vec<Product>,
        first_media_only: bool,
    ) -> AppResult<Vec<Product>> {
        if products.is_empty() {
            return Ok(products);
        }
        let ids: Vec<i32> = products.iter().map(|p| p.id).collect();
        let mut category_ids: Vec<i32> = products.iter().filter_map(|p| p.category_id).collect();
        category_ids.sort_unstable();
        category_ids.dedup();

        let mut translations = self.product_translations(&ids).await?;
        let mut media = self.product_media(&ids, first_media_only).await?;
        let categories = self.categories_by_id(&category_ids).await?;

        for product in &mut products {
            product.translations = translations.remove(&product.id).unwrap_or_default();
            product.media = media.remove(&product.id).unwrap_or_default();
            product.category = product
                .category_id
                .and_then(|id| categories.get(&id).cloned());
        }
        Ok(products)
    }

    async fn insert_category_translations(
        tx: &mut Transaction<'_, Postgres>,
        category_id: i32,
        translations: &[CategoryTranslationInput],
    ) -> AppResult<()> {
        for t in translations {
            sqlx::query(
                "INSERT INTO category_translations (category_id, locale, title, description)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(category_id)
            .bind(t.locale.trim())
            .bind(t.title.trim())
            .bind(t.description.clone().unwrap_or_default())
            .execute(&mut **tx)
            .await
            .map_err(map_write_error)?;
        }
        Ok(())
    }

    async fn insert_product_translations(
        tx: &mut Transaction<'_, Postgres>,
        product_id: i32,
        translations: &[NewProductTranslation],
    ) -> AppResult<()> {
        for t in translations {
            sqlx::query(
                "INSERT INTO product_translations (product_id, locale, title, description, slug)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(product_id)
            .bind(&t.locale)
            .bind(&t.title)
            .bind(&t.description)
            .bind(&t.slug)
            .execute(&mut **tx)
            .await
            .map_err(map_write_error)?;
        }
        Ok(())
    }

    async fn insert_media(
        tx: &mut Transaction<'_, Postgres>,
        product_id: i32,
        media: &[NewMedia],
    ) -> AppResult<()> {
        for m in media {
            sqlx::query(
                "INSERT INTO media (product_id, url, provider, type, sort_order, metadata)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(product_id)
            .bind(&m.url)
            .bind(&m.provider)
            .bind(m.media_type)
            .bind(m.sort_order)
            .bind(&m.metadata)
            .execute(&mut **tx)
            .await
            .map_err(map_write_error)?;
        }
        Ok(())
    }
}

/// Appends the shared WHERE clause of the product listing and its count query.
fn push_product_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    builder.push(" WHERE 1 = 1");

    if let Some(search) = &query.search {
        let pattern = contains_pattern(search);
        builder.push(" AND (p.default_title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(
            " ESCAPE '\\' OR EXISTS (SELECT 1 FROM product_translations t \
             WHERE t.product_id = p.id AND t.title ILIKE ",
        );
        builder.push_bind(pattern);
        builder.push(" ESCAPE '\\'))");
    }
    if let Some(category_id) = query.category_id {
        builder.push(" AND p.category_id = ");
        builder.push_bind(category_id);
    }
    if let Some(is_active) = query.is_active {
        builder.push(" AND p.is_active = ");
        builder.push_bind(is_active);
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: i32) -> AppResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_user_credentials(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        Ok(sqlx::query_as::<_, UserCredentials>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn upsert_owner(&self, email: &str, password_hash: &str) -> AppResult<User> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, role)
             VALUES ($1, $2, $3)
             ON CONFLICT (email) DO UPDATE
                SET password_hash = EXCLUDED.password_hash, role = EXCLUDED.role,
                    updated_at = NOW()
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .bind(Role::Owner)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn replace_temp_account(&self, account: NewTempAccount) -> AppResult<TempAccount> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM temp_accounts WHERE LOWER(email) = LOWER($1)")
            .bind(&account.email)
            .execute(&mut *tx)
            .await?;

        let created = sqlx::query_as::<_, TempAccount>(&format!(
            "INSERT INTO temp_accounts (email, password_hash, token, expires_at, attempts)
             VALUES ($1, $2, $3, $4, 0)
             RETURNING {TEMP_ACCOUNT_COLUMNS}"
        ))
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.token)
        .bind(account.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        tx.commit().await?;
        Ok(created)
    }

    async fn find_temp_account_by_token(&self, token: &str) -> AppResult<Option<TempAccount>> {
        Ok(sqlx::query_as::<_, TempAccount>(&format!(
            "SELECT {TEMP_ACCOUNT_COLUMNS} FROM temp_accounts WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_temp_account(&self, id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM temp_accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn promote_temp_account(&self, account: &TempAccount) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, name, password_hash, role)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&account.email)
        .bind(&account.name)
        .bind(&account.password_hash)
        .bind(Role::User)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        sqlx::query("DELETE FROM temp_accounts WHERE id = $1")
            .bind(account.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// list_categories
    ///
    /// Search matches any translation's title or description (case-insensitive). The
    /// `name` sort key is the title of the first translation by locale.
    async fn list_categories(&self, query: &CategoryQuery) -> AppResult<Vec<Category>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT c.id, c.created_at, c.updated_at,
                    (SELECT COUNT(*) FROM products p WHERE p.category_id = c.id) AS product_count
             FROM categories c
             WHERE 1 = 1",
        );

        if let Some(search) = &query.search {
            let pattern = contains_pattern(search);
            builder.push(
                " AND EXISTS (SELECT 1 FROM category_translations t \
                 WHERE t.category_id = c.id AND (t.title ILIKE ",
            );
            builder.push_bind(pattern.clone());
            builder.push(" ESCAPE '\\' OR t.description ILIKE ");
            builder.push_bind(pattern);
            builder.push(" ESCAPE '\\'))");
        }

        match query.filter {
            CategoryFilter::All => {}
            CategoryFilter::WithProducts => {
                builder.push(" AND EXISTS (SELECT 1 FROM products p WHERE p.category_id = c.id)");
            }
            CategoryFilter::WithoutProducts => {
                builder
                    .push(" AND NOT EXISTS (SELECT 1 FROM products p WHERE p.category_id = c.id)");
            }
        }

        let direction = if query.descending { "DESC" } else { "ASC" };
        match query.sort {
            CategorySort::CreatedAt => {
                builder.push(format!(" ORDER BY c.created_at {direction}, c.id {direction}"));
            }
            CategorySort::Name => {
                builder.push(format!(
                    " ORDER BY (SELECT t.title FROM category_translations t \
                     WHERE t.category_id = c.id ORDER BY t.locale ASC LIMIT 1) {direction} NULLS LAST, \
                     c.id ASC"
                ));
            }
        }

        let mut categories = builder
            .build_query_as::<Category>()
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<i32> = categories.iter().map(|c| c.id).collect();
        let mut translations = self.category_translations(&ids).await?;
        for category in &mut categories {
            category.translations = translations.remove(&category.id).unwrap_or_default();
        }
        Ok(categories)
    }

    async fn get_category(&self, id: i32) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT c.id, c.created_at, c.updated_at,
                    (SELECT COUNT(*) FROM products p WHERE p.category_id = c.id) AS product_count
             FROM categories c
             WHERE c.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(mut category) = category else {
            return Ok(None);
        };
        category.translations = self
            .category_translations(&[id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(Some(category))
    }

    async fn create_category(&self, translations: Vec<CategoryTranslationInput>) -> AppResult<Category> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar("INSERT INTO categories DEFAULT VALUES RETURNING id")
            .fetch_one(&mut *tx)
            .await?;
        Self::insert_category_translations(&mut tx, id, &translations).await?;
        tx.commit().await?;

        self.get_category(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("category {id} vanished after insert")))
    }

    async fn update_category(
        &self,
        id: i32,
        translations: Vec<CategoryTranslationInput>,
    ) -> AppResult<Option<Category>> {
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE categories SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if touched == 0 {
            return Ok(None);
        }

        sqlx::query("DELETE FROM category_translations WHERE category_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Self::insert_category_translations(&mut tx, id, &translations).await?;
        tx.commit().await?;

        self.get_category(id).await
    }

    async fn delete_category(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_products_in_category(&self, id: i32) -> AppResult<i64> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE category_id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    /// list_products
    ///
    /// Newest first. Each product carries translations, its category and only its first
    /// media item.
    async fn list_products(&self, query: &ProductQuery) -> AppResult<(Vec<Product>, i64)> {
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM products p");
        push_product_filters(&mut count_builder, query);
        let total = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products p"));
        push_product_filters(&mut builder, query);
        builder.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ");
        builder.push_bind(query.limit);
        builder.push(" OFFSET ");
        builder.push_bind(query.offset());

        let products = builder
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        Ok((self.hydrate_products(products, true).await?, total))
    }

    async fn get_product(&self, id: i32) -> AppResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(product) = product else {
            return Ok(None);
        };
        let mut product = self
            .hydrate_products(vec![product], false)
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("product hydration lost a row".to_string()))?;
        product.suppliers = self.product_suppliers(id).await?;
        Ok(Some(product))
    }

    async fn create_product(&self, product: NewProduct) -> AppResult<i32> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            "INSERT INTO products
                (default_title, default_description, suggested_price, currency, category_id,
                 is_active, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(&product.default_title)
        .bind(&product.default_description)
        .bind(product.suggested_price)
        .bind(&product.currency)
        .bind(product.category_id)
        .bind(product.is_active)
        .bind(&product.metadata)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        Self::insert_product_translations(&mut tx, id, &product.translations).await?;
        Self::insert_media(&mut tx, id, &product.media).await?;

        for link in &product.suppliers {
            sqlx::query(
                "INSERT INTO product_suppliers
                    (product_id, supplier_id, url, marketplace, price, currency, is_primary, notes)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(id)
            .bind(link.supplier_id)
            .bind(&link.url)
            .bind(&link.marketplace)
            .bind(link.price)
            .bind(&link.currency)
            .bind(link.is_primary)
            .bind(&link.notes)
            .execute(&mut *tx)
            .await
            .map_err(map_write_error)?;
        }

        tx.commit().await?;
        Ok(id)
    }

    async fn add_product_media(&self, product_id: i32, media: Vec<NewMedia>) -> AppResult<()> {
        if media.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        Self::insert_media(&mut tx, product_id, &media).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_product(&self, id: i32, update: ProductUpdate) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query(
            "UPDATE products
             SET suggested_price = $1, currency = $2, category_id = $3, is_active = $4,
                 updated_at = NOW()
             WHERE id = $5",
        )
        .bind(update.suggested_price)
        .bind(&update.currency)
        .bind(update.category_id)
        .bind(update.is_active)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?
        .rows_affected();
        if touched == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM product_translations WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Self::insert_product_translations(&mut tx, id, &update.translations).await?;

        sqlx::query("DELETE FROM media WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Self::insert_media(&mut tx, id, &update.media).await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_product(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_media(&self, id: i32) -> AppResult<Option<Media>> {
        Ok(sqlx::query_as::<_, Media>(&format!(
            "SELECT {MEDIA_COLUMNS} FROM media WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_suppliers(&self) -> AppResult<Vec<Supplier>> {
        Ok(sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers ORDER BY name ASC"
        ))
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_supplier(&self, supplier: CreateSupplierRequest) -> AppResult<Supplier> {
        sqlx::query_as::<_, Supplier>(&format!(
            "INSERT INTO suppliers (name, marketplace, base_url, contact_info, notes)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {SUPPLIER_COLUMNS}"
        ))
        .bind(supplier.name.trim())
        .bind(&supplier.marketplace)
        .bind(&supplier.base_url)
        .bind(&supplier.contact_info)
        .bind(&supplier.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn list_active_plans(&self) -> AppResult<Vec<Plan>> {
        Ok(sqlx::query_as::<_, Plan>(
            "SELECT id, name, description, price, interval, active, features, created_at
             FROM plans
             WHERE active = TRUE
             ORDER BY price ASC",
        )
        .fetch_all(&self.pool)
        .await?)
    }
}
