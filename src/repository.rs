use crate::config::CategoryPolicy;
use crate::models::{
    BlogImage, Category, CreateCategoryRequest, CreatePostRequest, Post, UpdateCategoryRequest,
    UpdatePostRequest,
};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

/// StoreError
///
/// Failure surface of the content stores. Domain absence is never an error
/// (operations return `Ok(None)`); this type only carries reference-policy
/// violations and backend unavailability.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("one or more supplied category ids do not exist")]
    UnresolvedCategory,
    #[error("backend unavailable: {0}")]
    Backend(#[from] sqlx::Error),
}

/// ContentRepository
///
/// The persistence contract for blog content: posts with their category
/// relationships, standalone categories, and image metadata. Category
/// resolution for post writes happens inside the implementation, so a post
/// can never reference a category that did not exist at write time,
/// regardless of caller.
///
/// **Send + Sync + async_trait** make the trait object (`Arc<dyn
/// ContentRepository>`) shareable across Axum's task boundaries.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    // --- Posts ---
    /// Persists a new post with a freshly generated id. Supplied category ids
    /// are resolved first; what happens to unresolvable ids depends on the
    /// configured category policy.
    async fn create_post(&self, req: CreatePostRequest) -> Result<Post, StoreError>;
    /// All posts, category sets fully populated.
    async fn get_posts(&self) -> Result<Vec<Post>, StoreError>;
    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, StoreError>;
    /// Handle uniqueness is enforced by the schema, not checked here.
    async fn get_post_by_url_handle(&self, handle: &str) -> Result<Option<Post>, StoreError>;
    /// Full replace: every scalar field is overwritten and the category set
    /// is replaced with the newly resolved set. Detached categories survive
    /// as entities.
    async fn update_post(
        &self,
        id: Uuid,
        req: UpdatePostRequest,
    ) -> Result<Option<Post>, StoreError>;
    /// Removes the post and returns its last snapshot. Category entities are
    /// untouched.
    async fn delete_post(&self, id: Uuid) -> Result<Option<Post>, StoreError>;

    // --- Categories ---
    async fn create_category(&self, req: CreateCategoryRequest) -> Result<Category, StoreError>;
    async fn get_categories(&self) -> Result<Vec<Category>, StoreError>;
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError>;
    async fn update_category(
        &self,
        id: Uuid,
        req: UpdateCategoryRequest,
    ) -> Result<Option<Category>, StoreError>;
    /// Removes the category. Posts referencing it lose the edge, nothing
    /// else; no cascade into post entities.
    async fn delete_category(&self, id: Uuid) -> Result<Option<Category>, StoreError>;

    // --- Image metadata ---
    async fn create_image(&self, image: BlogImage) -> Result<BlogImage, StoreError>;
    async fn get_images(&self) -> Result<Vec<BlogImage>, StoreError>;
}

/// ContentState
///
/// The shared handle to the content persistence layer.
pub type ContentState = Arc<dyn ContentRepository>;

// --- Row types ---

/// A `posts` row without its relationships. Hydrated into `Post` once the
/// category set has been loaded.
#[derive(Debug, Clone, FromRow)]
struct PostRow {
    id: Uuid,
    author: String,
    title: String,
    content: String,
    short_description: String,
    featured_image_url: String,
    url_handle: String,
    published_date: chrono::DateTime<chrono::Utc>,
    is_visible: bool,
}

/// One post-category edge joined with the category it points at. Used to
/// hydrate many posts in a single query.
#[derive(Debug, FromRow)]
struct CategoryEdgeRow {
    post_id: Uuid,
    category_id: Uuid,
    name: String,
    url_handle: String,
}

fn assemble(row: PostRow, categories: Vec<Category>) -> Post {
    Post {
        id: row.id,
        author: row.author,
        title: row.title,
        content: row.content,
        short_description: row.short_description,
        featured_image_url: row.featured_image_url,
        url_handle: row.url_handle,
        published_date: row.published_date,
        is_visible: row.is_visible,
        categories,
    }
}

const POST_COLUMNS: &str = "id, author, title, content, short_description, \
     featured_image_url, url_handle, published_date, is_visible";

/// PostgresRepository
///
/// The concrete `ContentRepository` backed by PostgreSQL. All multi-statement
/// writes (post create/update/delete) run inside a single transaction; reads
/// go straight to the pool.
pub struct PostgresRepository {
    pool: PgPool,
    category_policy: CategoryPolicy,
}

impl PostgresRepository {
    pub fn new(pool: PgPool, category_policy: CategoryPolicy) -> Self {
        Self {
            pool,
            category_policy,
        }
    }
}

/// Loads the categories currently resolvable from the supplied id list.
/// Ids with no matching row simply produce no output here; the caller decides
/// what that means under its policy.
async fn resolve_categories(
    tx: &mut Transaction<'_, Postgres>,
    ids: &[Uuid],
) -> Result<Vec<Category>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_as::<_, Category>("SELECT id, name, url_handle FROM categories WHERE id = ANY($1)")
        .bind(ids.to_vec())
        .fetch_all(&mut **tx)
        .await
}

/// Inserts the join rows for an already-resolved category set.
async fn attach_categories(
    tx: &mut Transaction<'_, Postgres>,
    post_id: Uuid,
    categories: &[Category],
) -> Result<(), sqlx::Error> {
    if categories.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = categories.iter().map(|c| c.id).collect();
    sqlx::query(
        "INSERT INTO post_categories (post_id, category_id) \
         SELECT $1, unnest($2::uuid[]) ON CONFLICT DO NOTHING",
    )
    .bind(post_id)
    .bind(ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// The stored category set of one post.
async fn categories_for_post<'e, E>(executor: E, post_id: Uuid) -> Result<Vec<Category>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Category>(
        "SELECT c.id, c.name, c.url_handle FROM categories c \
         JOIN post_categories pc ON pc.category_id = c.id WHERE pc.post_id = $1",
    )
    .bind(post_id)
    .fetch_all(executor)
    .await
}

/// Checks a resolved set against the requested ids under the Strict policy.
/// Duplicated request ids count once.
fn check_policy(
    policy: CategoryPolicy,
    requested: &[Uuid],
    resolved: &[Category],
) -> Result<(), StoreError> {
    if policy == CategoryPolicy::Strict {
        let distinct: HashSet<Uuid> = requested.iter().copied().collect();
        if resolved.len() != distinct.len() {
            return Err(StoreError::UnresolvedCategory);
        }
    }
    Ok(())
}

#[async_trait]
impl ContentRepository for PostgresRepository {
    /// Resolves the category set and persists post + join rows atomically.
    /// Under the default Lenient policy, ids that did not resolve are simply
    /// absent from the stored set; no error reaches the caller.
    async fn create_post(&self, req: CreatePostRequest) -> Result<Post, StoreError> {
        let mut tx = self.pool.begin().await?;

        let resolved = resolve_categories(&mut tx, &req.categories).await?;
        check_policy(self.category_policy, &req.categories, &resolved)?;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            "INSERT INTO posts ({POST_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {POST_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&req.author)
        .bind(&req.title)
        .bind(&req.content)
        .bind(&req.short_description)
        .bind(&req.featured_image_url)
        .bind(&req.url_handle)
        .bind(req.published_date)
        .bind(req.is_visible)
        .fetch_one(&mut *tx)
        .await?;

        attach_categories(&mut tx, row.id, &resolved).await?;
        tx.commit().await?;

        Ok(assemble(row, resolved))
    }

    /// Hydrates every post's category set with one edge query, so results
    /// are never partially populated.
    async fn get_posts(&self) -> Result<Vec<Post>, StoreError> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY published_date DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let edges = sqlx::query_as::<_, CategoryEdgeRow>(
            "SELECT pc.post_id, c.id AS category_id, c.name, c.url_handle \
             FROM post_categories pc JOIN categories c ON c.id = pc.category_id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_post: HashMap<Uuid, Vec<Category>> = HashMap::new();
        for edge in edges {
            by_post.entry(edge.post_id).or_default().push(Category {
                id: edge.category_id,
                name: edge.name,
                url_handle: edge.url_handle,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let categories = by_post.remove(&row.id).unwrap_or_default();
                assemble(row, categories)
            })
            .collect())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let categories = categories_for_post(&self.pool, row.id).await?;
                Ok(Some(assemble(row, categories)))
            }
            None => Ok(None),
        }
    }

    async fn get_post_by_url_handle(&self, handle: &str) -> Result<Option<Post>, StoreError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE url_handle = $1"
        ))
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let categories = categories_for_post(&self.pool, row.id).await?;
                Ok(Some(assemble(row, categories)))
            }
            None => Ok(None),
        }
    }

    /// Overwrites every scalar column and swaps the whole category set for
    /// the newly resolved one in the same transaction. Last write wins; no
    /// optimistic-concurrency token is checked.
    async fn update_post(
        &self,
        id: Uuid,
        req: UpdatePostRequest,
    ) -> Result<Option<Post>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            "UPDATE posts SET author = $2, title = $3, content = $4, \
             short_description = $5, featured_image_url = $6, url_handle = $7, \
             published_date = $8, is_visible = $9 WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(&req.author)
        .bind(&req.title)
        .bind(&req.content)
        .bind(&req.short_description)
        .bind(&req.featured_image_url)
        .bind(&req.url_handle)
        .bind(req.published_date)
        .bind(req.is_visible)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let resolved = resolve_categories(&mut tx, &req.categories).await?;
        check_policy(self.category_policy, &req.categories, &resolved)?;

        // Replacement, not merge: previously attached categories that are no
        // longer referenced are detached here, never deleted as entities.
        sqlx::query("DELETE FROM post_categories WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        attach_categories(&mut tx, id, &resolved).await?;
        tx.commit().await?;

        Ok(Some(assemble(row, resolved)))
    }

    /// Removes the post and returns the snapshot it had, category set
    /// included. Join rows go with the post; categories stay.
    async fn delete_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let categories = categories_for_post(&mut *tx, id).await?;
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "DELETE FROM posts WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(row.map(|row| assemble(row, categories)))
    }

    async fn create_category(&self, req: CreateCategoryRequest) -> Result<Category, StoreError> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (id, name, url_handle) VALUES ($1, $2, $3) \
             RETURNING id, name, url_handle",
        )
        .bind(Uuid::new_v4())
        .bind(&req.name)
        .bind(&req.url_handle)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn get_categories(&self) -> Result<Vec<Category>, StoreError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, url_handle FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, url_handle FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn update_category(
        &self,
        id: Uuid,
        req: UpdateCategoryRequest,
    ) -> Result<Option<Category>, StoreError> {
        let category = sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = $2, url_handle = $3 WHERE id = $1 \
             RETURNING id, name, url_handle",
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.url_handle)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    /// Join rows referencing the category are removed by the schema's
    /// cascade; posts themselves are never touched.
    async fn delete_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        let category = sqlx::query_as::<_, Category>(
            "DELETE FROM categories WHERE id = $1 RETURNING id, name, url_handle",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn create_image(&self, image: BlogImage) -> Result<BlogImage, StoreError> {
        let stored = sqlx::query_as::<_, BlogImage>(
            "INSERT INTO images (id, file_name, file_extension, title, url, date_created) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, file_name, file_extension, title, url, date_created",
        )
        .bind(image.id)
        .bind(&image.file_name)
        .bind(&image.file_extension)
        .bind(&image.title)
        .bind(&image.url)
        .bind(image.date_created)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn get_images(&self) -> Result<Vec<BlogImage>, StoreError> {
        let images = sqlx::query_as::<_, BlogImage>(
            "SELECT id, file_name, file_extension, title, url, date_created \
             FROM images ORDER BY date_created DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(images)
    }
}

// --- In-memory implementation ---

#[derive(Default)]
struct MemoryInner {
    posts: HashMap<Uuid, StoredPost>,
    categories: HashMap<Uuid, Category>,
    // Explicit join edges, (post_id, category_id).
    edges: HashSet<(Uuid, Uuid)>,
    images: Vec<BlogImage>,
}

#[derive(Clone)]
struct StoredPost {
    author: String,
    title: String,
    content: String,
    short_description: String,
    featured_image_url: String,
    url_handle: String,
    published_date: chrono::DateTime<chrono::Utc>,
    is_visible: bool,
}

impl MemoryInner {
    fn hydrate(&self, id: Uuid, stored: &StoredPost) -> Post {
        let categories = self
            .edges
            .iter()
            .filter(|(post_id, _)| *post_id == id)
            .filter_map(|(_, category_id)| self.categories.get(category_id).cloned())
            .collect();
        Post {
            id,
            author: stored.author.clone(),
            title: stored.title.clone(),
            content: stored.content.clone(),
            short_description: stored.short_description.clone(),
            featured_image_url: stored.featured_image_url.clone(),
            url_handle: stored.url_handle.clone(),
            published_date: stored.published_date,
            is_visible: stored.is_visible,
            categories,
        }
    }

    fn resolve(&self, ids: &[Uuid]) -> Vec<Uuid> {
        let distinct: HashSet<Uuid> = ids.iter().copied().collect();
        distinct
            .into_iter()
            .filter(|id| self.categories.contains_key(id))
            .collect()
    }
}

/// MemoryContentRepository
///
/// A `ContentRepository` over process memory, honoring the same relationship
/// semantics as the Postgres implementation (explicit edges, lenient or
/// strict resolution, cascade of edges on delete). Used by the test suite and
/// usable for local experimentation without a database.
pub struct MemoryContentRepository {
    policy: CategoryPolicy,
    inner: Mutex<MemoryInner>,
}

impl MemoryContentRepository {
    pub fn new() -> Self {
        Self::with_policy(CategoryPolicy::Lenient)
    }

    pub fn with_policy(policy: CategoryPolicy) -> Self {
        Self {
            policy,
            inner: Mutex::new(MemoryInner::default()),
        }
    }
}

impl Default for MemoryContentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentRepository for MemoryContentRepository {
    async fn create_post(&self, req: CreatePostRequest) -> Result<Post, StoreError> {
        let mut inner = self.inner.lock().expect("content store lock poisoned");

        let resolved = inner.resolve(&req.categories);
        let distinct: HashSet<Uuid> = req.categories.iter().copied().collect();
        if self.policy == CategoryPolicy::Strict && resolved.len() != distinct.len() {
            return Err(StoreError::UnresolvedCategory);
        }

        let id = Uuid::new_v4();
        let stored = StoredPost {
            author: req.author,
            title: req.title,
            content: req.content,
            short_description: req.short_description,
            featured_image_url: req.featured_image_url,
            url_handle: req.url_handle,
            published_date: req.published_date,
            is_visible: req.is_visible,
        };
        inner.posts.insert(id, stored.clone());
        for category_id in resolved {
            inner.edges.insert((id, category_id));
        }

        Ok(inner.hydrate(id, &stored))
    }

    async fn get_posts(&self) -> Result<Vec<Post>, StoreError> {
        let inner = self.inner.lock().expect("content store lock poisoned");
        Ok(inner
            .posts
            .iter()
            .map(|(id, stored)| inner.hydrate(*id, stored))
            .collect())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let inner = self.inner.lock().expect("content store lock poisoned");
        Ok(inner.posts.get(&id).map(|stored| inner.hydrate(id, stored)))
    }

    async fn get_post_by_url_handle(&self, handle: &str) -> Result<Option<Post>, StoreError> {
        let inner = self.inner.lock().expect("content store lock poisoned");
        Ok(inner
            .posts
            .iter()
            .find(|(_, stored)| stored.url_handle == handle)
            .map(|(id, stored)| inner.hydrate(*id, stored)))
    }

    async fn update_post(
        &self,
        id: Uuid,
        req: UpdatePostRequest,
    ) -> Result<Option<Post>, StoreError> {
        let mut inner = self.inner.lock().expect("content store lock poisoned");
        if !inner.posts.contains_key(&id) {
            return Ok(None);
        }

        let resolved = inner.resolve(&req.categories);
        let distinct: HashSet<Uuid> = req.categories.iter().copied().collect();
        if self.policy == CategoryPolicy::Strict && resolved.len() != distinct.len() {
            return Err(StoreError::UnresolvedCategory);
        }

        let stored = StoredPost {
            author: req.author,
            title: req.title,
            content: req.content,
            short_description: req.short_description,
            featured_image_url: req.featured_image_url,
            url_handle: req.url_handle,
            published_date: req.published_date,
            is_visible: req.is_visible,
        };
        inner.posts.insert(id, stored.clone());
        inner.edges.retain(|(post_id, _)| *post_id != id);
        for category_id in resolved {
            inner.edges.insert((id, category_id));
        }

        Ok(Some(inner.hydrate(id, &stored)))
    }

    async fn delete_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let mut inner = self.inner.lock().expect("content store lock poisoned");
        let Some(stored) = inner.posts.remove(&id) else {
            return Ok(None);
        };
        let snapshot = inner.hydrate(id, &stored);
        inner.edges.retain(|(post_id, _)| *post_id != id);
        Ok(Some(snapshot))
    }

    async fn create_category(&self, req: CreateCategoryRequest) -> Result<Category, StoreError> {
        let mut inner = self.inner.lock().expect("content store lock poisoned");
        let category = Category {
            id: Uuid::new_v4(),
            name: req.name,
            url_handle: req.url_handle,
        };
        inner.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn get_categories(&self) -> Result<Vec<Category>, StoreError> {
        let inner = self.inner.lock().expect("content store lock poisoned");
        Ok(inner.categories.values().cloned().collect())
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        let inner = self.inner.lock().expect("content store lock poisoned");
        Ok(inner.categories.get(&id).cloned())
    }

    async fn update_category(
        &self,
        id: Uuid,
        req: UpdateCategoryRequest,
    ) -> Result<Option<Category>, StoreError> {
        let mut inner = self.inner.lock().expect("content store lock poisoned");
        match inner.categories.get_mut(&id) {
            Some(category) => {
                category.name = req.name;
                category.url_handle = req.url_handle;
                Ok(Some(category.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        let mut inner = self.inner.lock().expect("content store lock poisoned");
        let removed = inner.categories.remove(&id);
        if removed.is_some() {
            // Edges cascade with the category; posts keep everything else.
            inner.edges.retain(|(_, category_id)| *category_id != id);
        }
        Ok(removed)
    }

    async fn create_image(&self, image: BlogImage) -> Result<BlogImage, StoreError> {
        let mut inner = self.inner.lock().expect("content store lock poisoned");
        inner.images.push(image.clone());
        Ok(image)
    }

    async fn get_images(&self) -> Result<Vec<BlogImage>, StoreError> {
        let inner = self.inner.lock().expect("content store lock poisoned");
        Ok(inner.images.clone())
    }
}
