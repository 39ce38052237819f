use blog_api::bootstrap::{self, ADMIN_USER_ID, READER_ROLE_ID, WRITER_ROLE_ID};
use blog_api::identity::{IdentityRepository, MemoryIdentityRepository, verify_credentials};

const ADMIN_EMAIL: &str = "admin@blog.local";
const ADMIN_PASSWORD: &str = "admin";

#[tokio::test]
async fn seeding_twice_produces_no_duplicates() {
    let repo = MemoryIdentityRepository::new();

    bootstrap::seed_identity(&repo, ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("first seed should succeed");
    assert_eq!(repo.role_count(), 2);
    assert_eq!(repo.user_count(), 1);

    bootstrap::seed_identity(&repo, ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("second seed should succeed");
    assert_eq!(repo.role_count(), 2, "reseeding must not duplicate roles");
    assert_eq!(repo.user_count(), 1, "reseeding must not duplicate the account");

    let roles = repo.roles_for_user(ADMIN_USER_ID).await.unwrap();
    assert_eq!(roles, vec!["Reader", "Writer"]);
}

#[tokio::test]
async fn seed_identifiers_are_fixed() {
    // Keyed by constants, not generated ids: two stores seeded independently
    // end up with identical identifiers.
    assert_ne!(READER_ROLE_ID, WRITER_ROLE_ID);

    let first = MemoryIdentityRepository::new();
    let second = MemoryIdentityRepository::new();
    bootstrap::seed_identity(&first, ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap();
    bootstrap::seed_identity(&second, ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap();

    let first_admin = first.find_user_by_email(ADMIN_EMAIL).await.unwrap().unwrap();
    let second_admin = second.find_user_by_email(ADMIN_EMAIL).await.unwrap().unwrap();
    assert_eq!(first_admin.id, ADMIN_USER_ID);
    assert_eq!(second_admin.id, ADMIN_USER_ID);
}

#[tokio::test]
async fn seeded_admin_authenticates_with_both_roles() {
    let repo = MemoryIdentityRepository::new();
    bootstrap::seed_identity(&repo, ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap();

    let (user, roles) = verify_credentials(&repo, ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap()
        .expect("seeded credentials should verify");
    assert_eq!(user.email, ADMIN_EMAIL);
    assert_eq!(roles, vec!["Reader", "Writer"]);
}

#[tokio::test]
async fn wrong_password_and_unknown_email_are_indistinguishable() {
    let repo = MemoryIdentityRepository::new();
    bootstrap::seed_identity(&repo, ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap();

    let wrong_password = verify_credentials(&repo, ADMIN_EMAIL, "not-the-password")
        .await
        .unwrap();
    let unknown_email = verify_credentials(&repo, "nobody@blog.local", ADMIN_PASSWORD)
        .await
        .unwrap();

    assert!(wrong_password.is_none());
    assert!(unknown_email.is_none());
}

#[tokio::test]
async fn reseeding_leaves_registered_accounts_alone() {
    let repo = MemoryIdentityRepository::new();
    bootstrap::seed_identity(&repo, ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap();

    repo.create_user("reader@blog.local", "hash").await.unwrap();
    bootstrap::seed_identity(&repo, ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap();

    assert_eq!(repo.user_count(), 2);
    assert!(
        repo.find_user_by_email("reader@blog.local")
            .await
            .unwrap()
            .is_some()
    );
}
