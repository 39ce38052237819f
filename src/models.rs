use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// The fixed, enumerated role set used for access control. "Reader" is granted
/// to every registered account; "Writer" is required for all content mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Reader,
    Writer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reader => "Reader",
            Role::Writer => "Writer",
        }
    }

    /// Both seeded roles, in seeding order.
    pub const ALL: [Role; 2] = [Role::Reader, Role::Writer];
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category
///
/// A named tag entity from the `categories` table, referenced by zero or more
/// posts through the explicit `post_categories` join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub url_handle: String,
}

/// Post
///
/// A blog article with its category set fully populated. The `categories`
/// field holds only references that resolved against the category store at
/// the time of the write that established them; it is unordered and
/// duplicate-free.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct Post {
    pub id: Uuid,
    pub author: String,
    pub title: String,
    pub content: String,
    pub short_description: String,
    pub featured_image_url: String,
    pub url_handle: String,
    pub published_date: DateTime<Utc>,
    pub is_visible: bool,
    pub categories: Vec<Category>,
}

/// BlogImage
///
/// Metadata for an uploaded image. The bytes themselves live in the blob
/// store; this record only tracks the descriptive fields and the public URL.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct BlogImage {
    pub id: Uuid,
    pub file_name: String,
    pub file_extension: String,
    pub title: String,
    pub url: String,
    pub date_created: DateTime<Utc>,
}

/// UserRecord
///
/// The canonical identity row from the `users` table. The password hash never
/// leaves the identity module; this struct is not serialized into responses.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
}

// --- Request Payloads (Input Schemas) ---

/// CreatePostRequest
///
/// Input payload for submitting a new post (POST /posts). `categories` is a
/// list of category ids; ids that do not resolve are handled according to the
/// configured category policy.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreatePostRequest {
    pub author: String,
    pub title: String,
    pub content: String,
    pub short_description: String,
    pub featured_image_url: String,
    pub url_handle: String,
    pub published_date: DateTime<Utc>,
    pub is_visible: bool,
    pub categories: Vec<Uuid>,
}

/// UpdatePostRequest
///
/// Full-replace update payload (PUT /posts/{id}). Every scalar field
/// overwrites the stored value and `categories` replaces the whole set;
/// there is no partial-patch path.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdatePostRequest {
    pub author: String,
    pub title: String,
    pub content: String,
    pub short_description: String,
    pub featured_image_url: String,
    pub url_handle: String,
    pub published_date: DateTime<Utc>,
    pub is_visible: bool,
    pub categories: Vec<Uuid>,
}

/// CreateCategoryRequest
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub url_handle: String,
}

/// UpdateCategoryRequest
///
/// Full replace of both fields; not-found if the id is absent.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateCategoryRequest {
    pub name: String,
    pub url_handle: String,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// RegisterRequest
///
/// Input payload for the public registration endpoint. New accounts always
/// start with the Reader role only.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

// --- Response Payloads (Output Schemas) ---

/// LoginResponse
///
/// Successful authentication result: the identity's email, its role names,
/// and the signed bearer token carrying both as claims.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct LoginResponse {
    pub email: String,
    pub roles: Vec<String>,
    pub token: String,
}
