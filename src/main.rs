use blog_api::{
    AppState, bootstrap,
    config::{AppConfig, Env},
    create_router,
    identity::{IdentityState, PostgresIdentityRepository},
    repository::{ContentState, PostgresRepository},
    storage::{S3ImageStorage, StorageState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Asynchronous entry point: configuration, logging, database, identity
/// seeding, storage, HTTP server. Any backend failure during this sequence
/// aborts startup.
#[tokio::main]
async fn main() {
    // 1. Configuration loading (fail-fast on missing production secrets).
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging filter: RUST_LOG wins, sensible defaults otherwise.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "blog_api=debug,tower_http=info,axum=trace".into());

    // 3. Logging format per environment: pretty locally, JSON in production
    // for log aggregators.
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

    // 4. Database initialization and schema migration.
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Failed to run database migrations.");

    let repo = Arc::new(PostgresRepository::new(pool.clone(), config.category_policy))
        as ContentState;
    let identity = Arc::new(PostgresIdentityRepository::new(pool)) as IdentityState;

    // 5. Identity seeding: fixed roles + privileged account, idempotent.
    // Runs before the listener binds; a failure here prevents startup.
    bootstrap::seed_identity(identity.as_ref(), &config.admin_email, &config.admin_password)
        .await
        .expect("FATAL: identity seeding failed.");

    // 6. Blob storage initialization (S3/MinIO).
    let s3_client = S3ImageStorage::new(
        &config.s3_endpoint,
        &config.s3_region,
        &config.s3_key,
        &config.s3_secret,
        &config.s3_bucket,
    )
    .await;

    // LOCAL-ONLY: provision the MinIO bucket for the Dockerized setup.
    if config.env == Env::Local {
        use blog_api::storage::ImageStorage;
        s3_client.ensure_bucket_exists().await;
    }

    let storage = Arc::new(s3_client) as StorageState;

    // 7. Unified state assembly and server startup.
    let app_state = AppState {
        repo,
        identity,
        storage,
        config,
    };

    let app = create_router(app_state);

    let listener = TcpListener::bind("0.0.0.0:3000").await.unwrap();

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on 0.0.0.0:3000");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:3000/swagger-ui");

    axum::serve(listener, app).await.unwrap();
}
