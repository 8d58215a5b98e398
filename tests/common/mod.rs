#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    response::Response,
};
use chrono::{Duration, Utc};
use product_genius::{
    AppConfig, AppState, MockMailer, MockStorageService,
    auth::issue_token,
    create_router,
    error::{AppError, AppResult},
    models::{
        Category, CategoryFilter, CategoryQuery, CategorySort, CategoryTranslation,
        CategoryTranslationInput, CreateSupplierRequest, Media, NewMedia, NewProduct,
        NewTempAccount, Plan, Product, ProductQuery, ProductSupplier, ProductTranslation,
        ProductUpdate, Role, Supplier, TempAccount, User, UserCredentials,
    },
    password::hash_password,
    repository::Repository,
    translate::{MockTranslator, Translator},
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

// --- In-Memory Repository ---

#[derive(Default)]
struct Store {
    next_id: i32,
    users: Vec<(User, Option<String>)>,
    temp_accounts: Vec<TempAccount>,
    categories: Vec<Category>,
    products: Vec<Product>,
    suppliers: Vec<Supplier>,
    plans: Vec<Plan>,
}

impl Store {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn product_count(&self, category_id: i32) -> i64 {
        self.products
            .iter()
            .filter(|p| p.category_id == Some(category_id))
            .count() as i64
    }

    fn category_with_count(&self, category: &Category) -> Category {
        let mut category = category.clone();
        category.product_count = Some(self.product_count(category.id));
        category
    }

    fn embedded_category(&self, id: Option<i32>) -> Option<Category> {
        id.and_then(|id| self.categories.iter().find(|c| c.id == id).cloned())
    }

    fn translations_for_category(&mut self, category_id: i32, input: &[CategoryTranslationInput]) -> Vec<CategoryTranslation> {
        let mut translations: Vec<CategoryTranslation> = input
            .iter()
            .map(|t| CategoryTranslation {
                id: self.next_id(),
                category_id,
                locale: t.locale.trim().to_string(),
                title: t.title.trim().to_string(),
                description: Some(t.description.clone().unwrap_or_default()),
            })
            .collect();
        translations.sort_by(|a, b| a.locale.cmp(&b.locale));
        translations
    }

    fn media_rows(&mut self, product_id: i32, media: &[NewMedia]) -> Vec<Media> {
        media
            .iter()
            .map(|m| Media {
                id: self.next_id(),
                product_id: Some(product_id),
                url: m.url.clone(),
                provider: Some(m.provider.clone()),
                media_type: m.media_type,
                alt: None,
                sort_order: m.sort_order,
                metadata: m.metadata.clone(),
                created_at: Utc::now(),
            })
            .collect()
    }

    fn full_product(&self, product: &Product) -> Product {
        let mut product = product.clone();
        product.translations.sort_by(|a, b| a.locale.cmp(&b.locale));
        product.media.sort_by_key(|m| (m.sort_order, m.id));
        product.category = self.embedded_category(product.category_id);
        product
    }
}

/// InMemoryRepository
///
/// `Repository` over plain vectors, mirroring the Postgres semantics the handlers rely on
/// (cascades, SET NULL on category delete, ordering, pagination).
#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn store(&self) -> std::sync::MutexGuard<'_, Store> {
        self.store.lock().expect("store poisoned")
    }

    pub fn seed_user(&self, email: &str, role: Role, password: Option<&str>) -> User {
        let mut store = self.store();
        let user = User {
            id: store.next_id(),
            email: email.to_string(),
            name: None,
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let hash = password.map(|p| hash_password(p).unwrap());
        store.users.push((user.clone(), hash));
        user
    }

    pub fn seed_category(&self, titles: &[(&str, &str)]) -> Category {
        let mut store = self.store();
        let id = store.next_id();
        let input: Vec<CategoryTranslationInput> = titles
            .iter()
            .map(|(locale, title)| CategoryTranslationInput {
                locale: locale.to_string(),
                title: title.to_string(),
                description: None,
            })
            .collect();
        let category = Category {
            id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            product_count: None,
            translations: store.translations_for_category(id, &input),
        };
        store.categories.push(category.clone());
        category
    }

    pub fn seed_supplier(&self, name: &str) -> Supplier {
        let mut store = self.store();
        let supplier = Supplier {
            id: store.next_id(),
            name: name.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            ..Default::default()
        };
        store.suppliers.push(supplier.clone());
        supplier
    }

    pub fn seed_plan(&self, name: &str, price: f64, active: bool) -> Plan {
        let mut store = self.store();
        let plan = Plan {
            id: store.next_id(),
            name: name.to_string(),
            price,
            interval: "month".to_string(),
            active,
            created_at: Utc::now(),
            ..Default::default()
        };
        store.plans.push(plan.clone());
        plan
    }

    pub fn temp_accounts(&self) -> Vec<TempAccount> {
        self.store().temp_accounts.clone()
    }

    pub fn expire_temp_account(&self, token: &str) {
        let mut store = self.store();
        if let Some(account) = store.temp_accounts.iter_mut().find(|a| a.token == token) {
            account.expires_at = Utc::now() - Duration::hours(1);
        }
    }

    pub fn product_count(&self) -> usize {
        self.store().products.len()
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        self.store()
            .users
            .iter()
            .find(|(u, _)| u.email == email)
            .map(|(u, _)| u.clone())
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: i32) -> AppResult<Option<User>> {
        Ok(self
            .store()
            .users
            .iter()
            .find(|(u, _)| u.id == id)
            .map(|(u, _)| u.clone()))
    }

    async fn find_user_credentials(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        Ok(self
            .store()
            .users
            .iter()
            .find(|(u, _)| u.email.eq_ignore_ascii_case(email))
            .map(|(u, hash)| UserCredentials {
                id: u.id,
                email: u.email.clone(),
                name: u.name.clone(),
                role: u.role,
                password_hash: hash.clone(),
                created_at: u.created_at,
                updated_at: u.updated_at,
            }))
    }

    async fn upsert_owner(&self, email: &str, password_hash: &str) -> AppResult<User> {
        let mut store = self.store();
        if let Some((user, hash)) = store.users.iter_mut().find(|(u, _)| u.email == email) {
            user.role = Role::Owner;
            user.updated_at = Utc::now();
            *hash = Some(password_hash.to_string());
            return Ok(user.clone());
        }
        let user = User {
            id: store.next_id(),
            email: email.to_string(),
            name: None,
            role: Role::Owner,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.users.push((user.clone(), Some(password_hash.to_string())));
        Ok(user)
    }

    async fn replace_temp_account(&self, account: NewTempAccount) -> AppResult<TempAccount> {
        let mut store = self.store();
        store
            .temp_accounts
            .retain(|a| !a.email.eq_ignore_ascii_case(&account.email));
        let created = TempAccount {
            id: store.next_id(),
            email: account.email,
            name: None,
            password_hash: account.password_hash,
            token: account.token,
            expires_at: account.expires_at,
            attempts: 0,
            created_at: Utc::now(),
        };
        store.temp_accounts.push(created.clone());
        Ok(created)
    }

    async fn find_temp_account_by_token(&self, token: &str) -> AppResult<Option<TempAccount>> {
        Ok(self
            .store()
            .temp_accounts
            .iter()
            .find(|a| a.token == token)
            .cloned())
    }

    async fn delete_temp_account(&self, id: i32) -> AppResult<()> {
        self.store().temp_accounts.retain(|a| a.id != id);
        Ok(())
    }

    async fn promote_temp_account(&self, account: &TempAccount) -> AppResult<User> {
        let mut store = self.store();
        if store.users.iter().any(|(u, _)| u.email == account.email) {
            return Err(AppError::Conflict("Resource already exists".to_string()));
        }
        let user = User {
            id: store.next_id(),
            email: account.email.clone(),
            name: account.name.clone(),
            role: Role::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store
            .users
            .push((user.clone(), Some(account.password_hash.clone())));
        store.temp_accounts.retain(|a| a.id != account.id);
        Ok(user)
    }

    async fn list_categories(&self, query: &CategoryQuery) -> AppResult<Vec<Category>> {
        let store = self.store();
        let mut categories: Vec<Category> = store
            .categories
            .iter()
            .filter(|c| match &query.search {
                Some(search) => c.translations.iter().any(|t| {
                    contains_ci(&t.title, search)
                        || t.description.as_deref().is_some_and(|d| contains_ci(d, search))
                }),
                None => true,
            })
            .map(|c| store.category_with_count(c))
            .filter(|c| match query.filter {
                CategoryFilter::All => true,
                CategoryFilter::WithProducts => c.product_count.unwrap_or(0) > 0,
                CategoryFilter::WithoutProducts => c.product_count.unwrap_or(0) == 0,
            })
            .collect();

        match query.sort {
            CategorySort::CreatedAt => categories.sort_by_key(|c| (c.created_at, c.id)),
            CategorySort::Name => categories.sort_by(|a, b| {
                let title = |c: &Category| c.translations.first().map(|t| t.title.clone());
                title(a).cmp(&title(b))
            }),
        }
        if query.descending {
            categories.reverse();
        }
        Ok(categories)
    }

    async fn get_category(&self, id: i32) -> AppResult<Option<Category>> {
        let store = self.store();
        Ok(store
            .categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| store.category_with_count(c)))
    }

    async fn create_category(&self, translations: Vec<CategoryTranslationInput>) -> AppResult<Category> {
        let mut store = self.store();
        let id = store.next_id();
        let category = Category {
            id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            product_count: None,
            translations: store.translations_for_category(id, &translations),
        };
        store.categories.push(category.clone());
        Ok(store.category_with_count(&category))
    }

    async fn update_category(
        &self,
        id: i32,
        translations: Vec<CategoryTranslationInput>,
    ) -> AppResult<Option<Category>> {
        let mut store = self.store();
        if !store.categories.iter().any(|c| c.id == id) {
            return Ok(None);
        }
        let new_translations = store.translations_for_category(id, &translations);
        let category = store
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .expect("checked above");
        category.translations = new_translations;
        category.updated_at = Utc::now();
        let category = category.clone();
        Ok(Some(store.category_with_count(&category)))
    }

    async fn delete_category(&self, id: i32) -> AppResult<bool> {
        let mut store = self.store();
        let before = store.categories.len();
        store.categories.retain(|c| c.id != id);
        for product in store.products.iter_mut() {
            if product.category_id == Some(id) {
                product.category_id = None;
            }
        }
        Ok(store.categories.len() < before)
    }

    async fn count_products_in_category(&self, id: i32) -> AppResult<i64> {
        Ok(self.store().product_count(id))
    }

    async fn list_products(&self, query: &ProductQuery) -> AppResult<(Vec<Product>, i64)> {
        let store = self.store();
        let mut matching: Vec<&Product> = store
            .products
            .iter()
            .filter(|p| match &query.search {
                Some(search) => {
                    p.default_title.as_deref().is_some_and(|t| contains_ci(t, search))
                        || p.translations.iter().any(|t| contains_ci(&t.title, search))
                }
                None => true,
            })
            .filter(|p| query.category_id.is_none_or(|c| p.category_id == Some(c)))
            .filter(|p| query.is_active.is_none_or(|a| p.is_active == a))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .map(|p| {
                let mut product = store.full_product(p);
                product.media.truncate(1);
                product.suppliers.clear();
                product
            })
            .collect();
        Ok((page, total))
    }

    async fn get_product(&self, id: i32) -> AppResult<Option<Product>> {
        let store = self.store();
        Ok(store
            .products
            .iter()
            .find(|p| p.id == id)
            .map(|p| store.full_product(p)))
    }

    async fn create_product(&self, new: NewProduct) -> AppResult<i32> {
        let mut store = self.store();
        if let Some(category_id) = new.category_id {
            if !store.categories.iter().any(|c| c.id == category_id) {
                return Err(AppError::Validation(
                    "Referenced category or supplier does not exist".to_string(),
                ));
            }
        }
        let mut links = Vec::new();
        for link in &new.suppliers {
            let supplier = store
                .suppliers
                .iter()
                .find(|s| s.id == link.supplier_id)
                .cloned()
                .ok_or_else(|| {
                    AppError::Validation("Referenced category or supplier does not exist".to_string())
                })?;
            links.push((link.clone(), supplier.name));
        }

        let id = store.next_id();
        let translations: Vec<ProductTranslation> = new
            .translations
            .iter()
            .map(|t| ProductTranslation {
                id: 0,
                product_id: id,
                locale: t.locale.clone(),
                title: t.title.clone(),
                description: t.description.clone(),
                slug: Some(t.slug.clone()),
            })
            .collect();
        let media = store.media_rows(id, &new.media);
        let suppliers = links
            .into_iter()
            .map(|(link, supplier_name)| ProductSupplier {
                id: 0,
                product_id: id,
                supplier_id: link.supplier_id,
                supplier_name,
                url: link.url,
                marketplace: link.marketplace,
                price: link.price,
                currency: link.currency,
                is_primary: link.is_primary,
                notes: link.notes,
            })
            .collect();

        store.products.push(Product {
            id,
            default_title: new.default_title,
            default_description: new.default_description,
            suggested_price: new.suggested_price,
            currency: new.currency,
            category_id: new.category_id,
            is_active: new.is_active,
            metadata: new.metadata,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            translations,
            media,
            suppliers,
            ..Default::default()
        });
        Ok(id)
    }

    async fn add_product_media(&self, product_id: i32, media: Vec<NewMedia>) -> AppResult<()> {
        let mut store = self.store();
        let rows = store.media_rows(product_id, &media);
        let product = store
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
        product.media.extend(rows);
        Ok(())
    }

    async fn update_product(&self, id: i32, update: ProductUpdate) -> AppResult<bool> {
        let mut store = self.store();
        if !store.products.iter().any(|p| p.id == id) {
            return Ok(false);
        }
        let media = store.media_rows(id, &update.media);
        let product = store
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .expect("checked above");
        product.suggested_price = update.suggested_price;
        product.currency = update.currency;
        product.category_id = update.category_id;
        product.is_active = update.is_active;
        product.translations = update
            .translations
            .into_iter()
            .map(|t| ProductTranslation {
                id: 0,
                product_id: id,
                locale: t.locale,
                title: t.title,
                description: t.description,
                slug: Some(t.slug),
            })
            .collect();
        product.media = media;
        product.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_product(&self, id: i32) -> AppResult<bool> {
        let mut store = self.store();
        let before = store.products.len();
        store.products.retain(|p| p.id != id);
        Ok(store.products.len() < before)
    }

    async fn get_media(&self, id: i32) -> AppResult<Option<Media>> {
        Ok(self
            .store()
            .products
            .iter()
            .flat_map(|p| p.media.iter())
            .find(|m| m.id == id)
            .cloned())
    }

    async fn list_suppliers(&self) -> AppResult<Vec<Supplier>> {
        let mut suppliers = self.store().suppliers.clone();
        suppliers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(suppliers)
    }

    async fn create_supplier(&self, request: CreateSupplierRequest) -> AppResult<Supplier> {
        let mut store = self.store();
        let supplier = Supplier {
            id: store.next_id(),
            name: request.name.trim().to_string(),
            marketplace: request.marketplace,
            base_url: request.base_url,
            contact_info: request.contact_info,
            notes: request.notes,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.suppliers.push(supplier.clone());
        Ok(supplier)
    }

    async fn list_active_plans(&self) -> AppResult<Vec<Plan>> {
        let mut plans: Vec<Plan> = self
            .store()
            .plans
            .iter()
            .filter(|p| p.active)
            .cloned()
            .collect();
        plans.sort_by(|a, b| a.price.total_cmp(&b.price));
        Ok(plans)
    }
}

// --- Test Application ---

/// Everything a router test needs: the app plus handles on its mocks.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub repo: Arc<InMemoryRepository>,
    pub storage: MockStorageService,
    pub mailer: MockMailer,
}

pub struct TestAppBuilder {
    config: AppConfig,
    storage: MockStorageService,
    mailer: MockMailer,
    translator: Option<Arc<dyn Translator>>,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            storage: MockStorageService::new(),
            mailer: MockMailer::new(),
            translator: Some(Arc::new(MockTranslator::default())),
        }
    }
}

impl TestAppBuilder {
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn storage(mut self, storage: MockStorageService) -> Self {
        self.storage = storage;
        self
    }

    pub fn mailer(mut self, mailer: MockMailer) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn translator(mut self, translator: Option<Arc<dyn Translator>>) -> Self {
        self.translator = translator;
        self
    }

    pub fn build(self) -> TestApp {
        let repo = InMemoryRepository::new();
        let state = AppState {
            repo: repo.clone(),
            storage: Arc::new(self.storage.clone()),
            mailer: Arc::new(self.mailer.clone()),
            translator: self.translator,
            config: self.config,
        };
        TestApp {
            router: create_router(state.clone()),
            state,
            repo,
            storage: self.storage,
            mailer: self.mailer,
        }
    }
}

pub fn test_app() -> TestApp {
    TestAppBuilder::default().build()
}

impl TestApp {
    pub fn bearer(&self, user: &User) -> String {
        format!("Bearer {}", issue_token(user.id, &self.state.config).unwrap())
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.send(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    }
}

pub fn json_request(method: &str, uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::empty()).unwrap()
}

/// Hand-built `multipart/form-data` body: text fields first, then files.
pub fn multipart_request(
    method: &str,
    uri: &str,
    auth: &str,
    fields: &[(&str, &str)],
    files: &[(&str, &str, &str, &[u8])],
) -> Request<Body> {
    let boundary = "X-PRODUCT-GENIUS-BOUNDARY";
    let mut body: Vec<u8> = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    for (name, file_name, content_type, bytes) in files {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", auth)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}
