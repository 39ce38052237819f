use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
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

// Core application services and components.
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod repository;
pub mod storage;
pub mod token;

// Routing segregation (public reads + auth, Writer-gated mutations).
pub mod routes;
use auth::AuthUser;
use errors::ApiError;
use models::Role;
use routes::{public, writer};

// --- Public Re-exports ---

// Core state types for the application entry point and the test suite.
pub use config::AppConfig;
pub use identity::{IdentityState, MemoryIdentityRepository, PostgresIdentityRepository};
pub use repository::{ContentState, MemoryContentRepository, PostgresRepository};
pub use storage::{MockImageStorage, S3ImageStorage, StorageState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation for the application, aggregating
/// every annotated handler and schema. Served at `/api-docs/openapi.json`
/// and browsable through the bundled Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::register,
        handlers::create_post, handlers::get_posts, handlers::get_post,
        handlers::get_post_by_url_handle, handlers::update_post, handlers::delete_post,
        handlers::create_category, handlers::get_categories, handlers::get_category,
        handlers::update_category, handlers::delete_category,
        handlers::get_images, handlers::upload_image,
    ),
    components(
        schemas(
            models::Post, models::Category, models::BlogImage,
            models::CreatePostRequest, models::UpdatePostRequest,
            models::CreateCategoryRequest, models::UpdateCategoryRequest,
            models::LoginRequest, models::RegisterRequest, models::LoginResponse,
        )
    ),
    tags(
        (name = "blog-api", description = "Blog content management API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container holding the application's services and
/// configuration, shared across all requests.
#[derive(Clone)]
pub struct AppState {
    /// Content persistence: posts, categories, image metadata.
    pub repo: ContentState,
    /// Identity persistence: users, roles, memberships.
    pub identity: IdentityState,
    /// Blob store for raw image bytes.
    pub storage: StorageState,
    /// Loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Let handlers and extractors pull individual components out of the shared
// state.

impl FromRef<AppState> for ContentState {
    fn from_ref(app_state: &AppState) -> ContentState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
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

/// writer_gate
///
/// Middleware protecting the mutation routes. The `AuthUser` extractor
/// rejects requests without a verifiable bearer token (401); this function
/// then requires the Writer role among the token's claims (403). Handlers
/// behind the gate never re-check.
async fn writer_gate(auth_user: AuthUser, request: Request, next: Next) -> Result<Response, ApiError> {
    if !auth_user.has_role(Role::Writer) {
        return Err(ApiError::Forbidden);
    }
    Ok(next.run(request).await)
}

/// create_router
///
/// Assembles the routing structure, applies the Writer gate and the
/// observability layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        // Documentation: auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes: no middleware applied.
        .merge(public::public_routes())
        // Mutation routes: bearer token + Writer role required.
        .merge(
            writer::writer_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), writer_gate)),
        )
        .with_state(state);

    // Observability and correlation layers, outermost first.
    base_router
        .layer(
            ServiceBuilder::new()
                // Unique id per incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // Request/response lifecycle span carrying the request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Return the generated x-request-id header to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// Customizes the `TraceLayer` span so every log line of a request is
/// correlated by its `x-request-id`.
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
