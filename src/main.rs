use product_genius::{
    AppState, DeepLTranslator, HttpMailer, LocalStorage, LogMailer, MailerState,
    PostgresRepository, RepositoryState, S3StorageClient, StorageState, TranslatorState,
    auth::bootstrap_owner,
    config::{AppConfig, Env, StorageBackend},
    create_router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Boots configuration, logging, database (with migrations and the owner account), storage,
/// email, translation and the HTTP server, in that order. Any startup failure aborts the process.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "product_genius=debug,tower_http=info,axum=trace".into());

    // Pretty output locally, JSON for log aggregation in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // Database
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Database migrations failed.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    match bootstrap_owner(repo.as_ref(), &config).await {
        Ok(Some(_)) => {}
        Ok(None) => tracing::warn!("OWNER_EMAIL not set; no staff account is ensured"),
        Err(e) => panic!("FATAL: Owner bootstrap failed: {e}"),
    }

    // Storage
    let storage: StorageState = match config.storage.backend {
        StorageBackend::Local => Arc::new(LocalStorage::new(&config.storage.media_root)),
        StorageBackend::S3 => Arc::new(
            S3StorageClient::new(
                &config.storage.s3_endpoint,
                &config.storage.s3_region,
                &config.storage.s3_key,
                &config.storage.s3_secret,
                &config.storage.s3_bucket,
            )
            .await,
        ),
    };
    storage
        .ensure_ready()
        .await
        .expect("FATAL: Media storage is not usable.");
    tracing::info!(backend = ?config.storage.backend, "media storage ready");

    // Email
    let mailer: MailerState = match (&config.email.api_url, &config.email.api_key) {
        (Some(url), Some(key)) => Arc::new(HttpMailer::new(url, key, &config.email)),
        _ => {
            tracing::warn!("EMAIL_API_URL/EMAIL_API_KEY not set; verification emails are only logged");
            Arc::new(LogMailer)
        }
    };

    // Translation
    let translator: TranslatorState = config.translation.api_key.as_ref().map(|key| {
        Arc::new(DeepLTranslator::new(&config.translation.api_url, key))
            as Arc<dyn product_genius::translate::Translator>
    });
    if translator.is_none() {
        tracing::warn!("DEEPL_API_KEY not set; /api/translate will answer 503");
    }

    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState {
        repo,
        storage,
        mailer,
        translator,
        config,
    });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: Cannot bind {bind_addr}: {e}"));

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app).await.expect("FATAL: HTTP server error");
}
