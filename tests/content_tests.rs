use blog_api::config::CategoryPolicy;
use blog_api::models::{CreateCategoryRequest, CreatePostRequest, UpdatePostRequest};
use blog_api::repository::{ContentRepository, MemoryContentRepository, StoreError};
use chrono::Utc;
use uuid::Uuid;

fn post_request(categories: Vec<Uuid>) -> CreatePostRequest {
    CreatePostRequest {
        author: "Alice".to_string(),
        title: "Hello".to_string(),
        content: "Full article body".to_string(),
        short_description: "Intro".to_string(),
        featured_image_url: "http://localhost:9000/blog-images/hello.png".to_string(),
        url_handle: "hello".to_string(),
        published_date: Utc::now(),
        is_visible: true,
        categories,
    }
}

fn update_request(categories: Vec<Uuid>) -> UpdatePostRequest {
    UpdatePostRequest {
        author: "Bob".to_string(),
        title: "Hello, again".to_string(),
        content: "Rewritten body".to_string(),
        short_description: "Changed intro".to_string(),
        featured_image_url: "http://localhost:9000/blog-images/other.png".to_string(),
        url_handle: "hello-again".to_string(),
        published_date: Utc::now(),
        is_visible: false,
        categories,
    }
}

#[tokio::test]
async fn create_drops_unresolvable_category_ids() {
    let repo = MemoryContentRepository::new();
    let tech = repo
        .create_category(CreateCategoryRequest {
            name: "Tech".to_string(),
            url_handle: "tech".to_string(),
        })
        .await
        .unwrap();

    let post = repo
        .create_post(post_request(vec![tech.id, Uuid::new_v4(), Uuid::new_v4()]))
        .await
        .expect("lenient create must not error on unknown ids");

    assert_eq!(post.categories.len(), 1);
    assert_eq!(post.categories[0].id, tech.id);

    // The stored set matches what create returned.
    let fetched = repo.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(fetched.categories.len(), 1);
    assert_eq!(fetched.categories[0].id, tech.id);
}

#[tokio::test]
async fn strict_policy_rejects_unresolvable_ids() {
    let repo = MemoryContentRepository::with_policy(CategoryPolicy::Strict);
    let tech = repo
        .create_category(CreateCategoryRequest {
            name: "Tech".to_string(),
            url_handle: "tech".to_string(),
        })
        .await
        .unwrap();

    let result = repo
        .create_post(post_request(vec![tech.id, Uuid::new_v4()]))
        .await;
    assert!(matches!(result, Err(StoreError::UnresolvedCategory)));

    // A fully resolvable set still goes through.
    let post = repo.create_post(post_request(vec![tech.id])).await.unwrap();
    assert_eq!(post.categories.len(), 1);
}

#[tokio::test]
async fn duplicate_category_ids_collapse_to_one_edge() {
    let repo = MemoryContentRepository::new();
    let tech = repo
        .create_category(CreateCategoryRequest {
            name: "Tech".to_string(),
            url_handle: "tech".to_string(),
        })
        .await
        .unwrap();

    let post = repo
        .create_post(post_request(vec![tech.id, tech.id, tech.id]))
        .await
        .unwrap();
    assert_eq!(post.categories.len(), 1);
}

#[tokio::test]
async fn update_replaces_every_scalar_and_the_whole_category_set() {
    let repo = MemoryContentRepository::new();
    let tech = repo
        .create_category(CreateCategoryRequest {
            name: "Tech".to_string(),
            url_handle: "tech".to_string(),
        })
        .await
        .unwrap();
    let life = repo
        .create_category(CreateCategoryRequest {
            name: "Life".to_string(),
            url_handle: "life".to_string(),
        })
        .await
        .unwrap();

    let post = repo.create_post(post_request(vec![tech.id])).await.unwrap();

    let req = update_request(vec![life.id]);
    let updated = repo
        .update_post(post.id, req.clone())
        .await
        .unwrap()
        .expect("existing post must update");

    let fetched = repo.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(fetched.author, req.author);
    assert_eq!(fetched.title, req.title);
    assert_eq!(fetched.content, req.content);
    assert_eq!(fetched.short_description, req.short_description);
    assert_eq!(fetched.featured_image_url, req.featured_image_url);
    assert_eq!(fetched.url_handle, req.url_handle);
    assert_eq!(fetched.published_date, req.published_date);
    assert_eq!(fetched.is_visible, req.is_visible);

    // Replacement, not union: the old category is detached.
    assert_eq!(updated.categories.len(), 1);
    assert_eq!(fetched.categories.len(), 1);
    assert_eq!(fetched.categories[0].id, life.id);

    // The detached category still exists as an entity.
    assert!(repo.get_category(tech.id).await.unwrap().is_some());
}

#[tokio::test]
async fn update_with_empty_list_clears_the_category_set() {
    let repo = MemoryContentRepository::new();
    let tech = repo
        .create_category(CreateCategoryRequest {
            name: "Tech".to_string(),
            url_handle: "tech".to_string(),
        })
        .await
        .unwrap();

    let post = repo
        .create_post(post_request(vec![tech.id, Uuid::new_v4()]))
        .await
        .unwrap();
    assert_eq!(post.categories.len(), 1);

    repo.update_post(post.id, update_request(vec![]))
        .await
        .unwrap()
        .expect("existing post must update");

    let fetched = repo.get_post(post.id).await.unwrap().unwrap();
    assert!(fetched.categories.is_empty());
}

#[tokio::test]
async fn update_of_missing_post_is_not_found() {
    let repo = MemoryContentRepository::new();
    let result = repo.update_post(Uuid::new_v4(), update_request(vec![])).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn delete_returns_snapshot_then_not_found() {
    let repo = MemoryContentRepository::new();
    let post = repo.create_post(post_request(vec![])).await.unwrap();

    let missing = repo.delete_post(Uuid::new_v4()).await.unwrap();
    assert!(missing.is_none());

    let snapshot = repo
        .delete_post(post.id)
        .await
        .unwrap()
        .expect("existing post must delete");
    assert_eq!(snapshot.id, post.id);
    assert_eq!(snapshot.title, post.title);

    assert!(repo.get_post(post.id).await.unwrap().is_none());
    let second = repo.delete_post(post.id).await.unwrap();
    assert!(second.is_none());
}

#[tokio::test]
async fn deleting_a_category_detaches_it_from_posts() {
    let repo = MemoryContentRepository::new();
    let tech = repo
        .create_category(CreateCategoryRequest {
            name: "Tech".to_string(),
            url_handle: "tech".to_string(),
        })
        .await
        .unwrap();
    let post = repo.create_post(post_request(vec![tech.id])).await.unwrap();
    assert_eq!(post.categories.len(), 1);

    repo.delete_category(tech.id)
        .await
        .unwrap()
        .expect("existing category must delete");

    // The post survives with an empty category set; no dangling edge.
    let fetched = repo.get_post(post.id).await.unwrap().unwrap();
    assert!(fetched.categories.is_empty());
}

#[tokio::test]
async fn url_handle_lookup_returns_populated_post() {
    let repo = MemoryContentRepository::new();
    let tech = repo
        .create_category(CreateCategoryRequest {
            name: "Tech".to_string(),
            url_handle: "tech".to_string(),
        })
        .await
        .unwrap();
    repo.create_post(post_request(vec![tech.id])).await.unwrap();

    let fetched = repo
        .get_post_by_url_handle("hello")
        .await
        .unwrap()
        .expect("handle lookup must find the post");
    assert_eq!(fetched.categories.len(), 1);

    assert!(
        repo.get_post_by_url_handle("no-such-handle")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn category_crud_full_replace_and_not_found() {
    let repo = MemoryContentRepository::new();
    let tech = repo
        .create_category(CreateCategoryRequest {
            name: "Tech".to_string(),
            url_handle: "tech".to_string(),
        })
        .await
        .unwrap();

    let updated = repo
        .update_category(
            tech.id,
            blog_api::models::UpdateCategoryRequest {
                name: "Technology".to_string(),
                url_handle: "technology".to_string(),
            },
        )
        .await
        .unwrap()
        .expect("existing category must update");
    assert_eq!(updated.name, "Technology");
    assert_eq!(updated.url_handle, "technology");

    let missing = repo
        .update_category(
            Uuid::new_v4(),
            blog_api::models::UpdateCategoryRequest {
                name: "X".to_string(),
                url_handle: "x".to_string(),
            },
        )
        .await
        .unwrap();
    assert!(missing.is_none());

    assert!(repo.delete_category(Uuid::new_v4()).await.unwrap().is_none());
}
