use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Unauthenticated endpoints: read-only content access and the two identity
/// gateway operations. Visibility of individual posts (`is_visible`) is a
/// presentation concern left to consumers; the API serves the stored record.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Monitoring and load balancer probe; returns "ok" immediately.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/login
        // Credential verification and bearer-token issuance.
        .route("/auth/login", post(handlers::login))
        // POST /auth/register
        // Account creation; new accounts receive the Reader role.
        .route("/auth/register", post(handlers::register))
        // Post reads, by listing, id, or URL slug.
        .route("/posts", get(handlers::get_posts))
        .route("/posts/{id}", get(handlers::get_post))
        .route("/posts/handle/{url_handle}", get(handlers::get_post_by_url_handle))
        // Category reads.
        .route("/categories", get(handlers::get_categories))
        .route("/categories/{id}", get(handlers::get_category))
        // Image metadata listing.
        .route("/images", get(handlers::get_images))
}
