use crate::{AppState, handlers};
use axum::{Router, extract::DefaultBodyLimit, routing::post, routing::put};

/// Writer Router Module
///
/// Every content mutation lives here. The whole router is wrapped by the
/// Writer-role gate in `create_router`: requests without a valid bearer token
/// are rejected with 401, tokens without the Writer role with 403, before any
/// handler runs.
pub fn writer_routes() -> Router<AppState> {
    Router::new()
        // Post mutations. Category resolution happens inside the store.
        .route("/posts", post(handlers::create_post))
        .route(
            "/posts/{id}",
            put(handlers::update_post).delete(handlers::delete_post),
        )
        // Category mutations. Deleting a category detaches it from posts.
        .route("/categories", post(handlers::create_category))
        .route(
            "/categories/{id}",
            put(handlers::update_category).delete(handlers::delete_category),
        )
        // POST /images
        // Multipart upload; raised body limit to fit the 10 MiB file ceiling
        // plus multipart framing.
        .route(
            "/images",
            post(handlers::upload_image)
                .layer(DefaultBodyLimit::max(handlers::MAX_IMAGE_BYTES + 64 * 1024)),
        )
}
