use crate::{
    AppState,
    errors::ApiError,
    identity,
    models::{
        BlogImage, Category, CreateCategoryRequest, CreatePostRequest, LoginRequest,
        LoginResponse, Post, RegisterRequest, Role, UpdateCategoryRequest, UpdatePostRequest,
    },
    token,
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

// --- Auth Handlers ---

/// login
///
/// [Public Route] Verifies an email/password pair and issues a bearer token
/// carrying the identity and its role names. All credential failures produce
/// the same non-specific 401.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (user, roles) =
        identity::verify_credentials(state.identity.as_ref(), &payload.email, &payload.password)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

    let token = token::issue_token(
        &user,
        &roles,
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )
    .map_err(|e| ApiError::Internal(format!("token creation failed: {e}")))?;

    Ok(Json(LoginResponse {
        email: user.email,
        roles,
        token,
    }))
}

/// register
///
/// [Public Route] Creates a new account and grants it the Reader role.
/// Writer membership is only ever granted through seeding or operator action.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<StatusCode, ApiError> {
    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?;

    let user = state
        .identity
        .create_user(payload.email.trim(), &password_hash)
        .await?;
    state
        .identity
        .add_user_to_role(user.id, Role::Reader.as_str())
        .await?;

    tracing::info!("new account registered: {}", user.email);
    Ok(StatusCode::CREATED)
}

// --- Post Handlers ---

/// create_post
///
/// [Writer Route] Persists a new post. Supplied category ids are resolved by
/// the store; under the default Lenient policy unknown ids are dropped
/// silently.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses((status = 200, description = "Created", body = Post))
)]
pub async fn create_post(
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    let post = state.repo.create_post(payload).await?;
    Ok(Json(post))
}

/// get_posts
///
/// [Public Route] Lists all posts with fully populated category sets.
#[utoipa::path(
    get,
    path = "/posts",
    responses((status = 200, description = "All posts", body = [Post]))
)]
pub async fn get_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>, ApiError> {
    let posts = state.repo.get_posts().await?;
    Ok(Json(posts))
}

/// get_post
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = Post),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, ApiError> {
    state
        .repo
        .get_post(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// get_post_by_url_handle
///
/// [Public Route] Slug-based lookup used by the rendered blog frontend.
/// Handle uniqueness is guaranteed by the schema.
#[utoipa::path(
    get,
    path = "/posts/handle/{url_handle}",
    params(("url_handle" = String, Path, description = "Post URL slug")),
    responses(
        (status = 200, description = "Found", body = Post),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_post_by_url_handle(
    State(state): State<AppState>,
    Path(url_handle): Path<String>,
) -> Result<Json<Post>, ApiError> {
    state
        .repo
        .get_post_by_url_handle(&url_handle)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// update_post
///
/// [Writer Route] Full-replace update: every scalar field is overwritten and
/// the category set is replaced with the newly resolved one.
#[utoipa::path(
    put,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    state
        .repo
        .update_post(id, payload)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// delete_post
///
/// [Writer Route] Removes the post and returns its last snapshot. Category
/// entities referenced by it are untouched.
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Deleted", body = Post),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, ApiError> {
    state
        .repo
        .delete_post(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

// --- Category Handlers ---

/// create_category
#[utoipa::path(
    post,
    path = "/categories",
    request_body = CreateCategoryRequest,
    responses((status = 200, description = "Created", body = Category))
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let category = state.repo.create_category(payload).await?;
    Ok(Json(category))
}

/// get_categories
#[utoipa::path(
    get,
    path = "/categories",
    responses((status = 200, description = "All categories", body = [Category]))
)]
pub async fn get_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = state.repo.get_categories().await?;
    Ok(Json(categories))
}

/// get_category
#[utoipa::path(
    get,
    path = "/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Found", body = Category),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>, ApiError> {
    state
        .repo
        .get_category(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// update_category
///
/// [Writer Route] Full replace of name and url_handle.
#[utoipa::path(
    put,
    path = "/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Updated", body = Category),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    state
        .repo
        .update_category(id, payload)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// delete_category
///
/// [Writer Route] Removes the category. Posts that referenced it simply lose
/// the edge; they are not re-validated or deleted.
#[utoipa::path(
    delete,
    path = "/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Deleted", body = Category),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>, ApiError> {
    state
        .repo
        .delete_category(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

// --- Image Handlers ---

/// File types accepted for upload, by extension.
const ALLOWED_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];
/// Upload size ceiling, 10 MiB.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// get_images
#[utoipa::path(
    get,
    path = "/images",
    responses((status = 200, description = "All image metadata", body = [BlogImage]))
)]
pub async fn get_images(State(state): State<AppState>) -> Result<Json<Vec<BlogImage>>, ApiError> {
    let images = state.repo.get_images().await?;
    Ok(Json(images))
}

/// upload_image
///
/// [Writer Route] Multipart upload: `file` (the bytes), `fileName`, `title`.
/// The bytes go to the blob store; only the metadata record with the
/// resulting URL is persisted here.
#[utoipa::path(
    post,
    path = "/images",
    responses(
        (status = 200, description = "Uploaded", body = BlogImage),
        (status = 400, description = "Unsupported file format or size")
    )
)]
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BlogImage>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut file_name: Option<String> = None;
    let mut title: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("malformed multipart body".to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let original_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::Validation("unreadable file field".to_string()))?;
                file = Some((original_name, bytes.to_vec()));
            }
            "fileName" => {
                file_name = Some(field.text().await.map_err(|_| {
                    ApiError::Validation("unreadable fileName field".to_string())
                })?);
            }
            "title" => {
                title = Some(field.text().await.map_err(|_| {
                    ApiError::Validation("unreadable title field".to_string())
                })?);
            }
            _ => {}
        }
    }

    let (original_name, bytes) =
        file.ok_or_else(|| ApiError::Validation("missing file field".to_string()))?;
    let file_name =
        file_name.ok_or_else(|| ApiError::Validation("missing fileName field".to_string()))?;
    let title = title.ok_or_else(|| ApiError::Validation("missing title field".to_string()))?;

    let extension = std::path::Path::new(&original_name)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default();

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::Validation("unsupported file format".to_string()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ApiError::Validation(
            "file size cannot be more than 10MB".to_string(),
        ));
    }

    let id = Uuid::new_v4();
    let key = format!("images/{}{}", id, extension);
    let content_type = match extension.as_str() {
        ".png" => "image/png",
        _ => "image/jpeg",
    };

    let url = state
        .storage
        .store_image(&key, content_type, bytes)
        .await?;

    let image = state
        .repo
        .create_image(BlogImage {
            id,
            file_name,
            file_extension: extension,
            title,
            url,
            date_created: Utc::now(),
        })
        .await?;

    Ok(Json(image))
}
