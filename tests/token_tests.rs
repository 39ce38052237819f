use blog_api::models::{Role, UserRecord};
use blog_api::token::{issue_token, verify_token};
use uuid::Uuid;

const SECRET: &str = "test-signing-secret";

fn admin_user() -> UserRecord {
    UserRecord {
        id: Uuid::new_v4(),
        email: "admin@blog.local".to_string(),
        password_hash: String::new(),
    }
}

fn both_roles() -> Vec<String> {
    Role::ALL.iter().map(|r| r.as_str().to_string()).collect()
}

#[test]
fn issued_token_verifies_with_exact_role_claims() {
    let user = admin_user();
    let roles = both_roles();

    let token = issue_token(&user, &roles, SECRET, 24).expect("issuance should not fail");
    let claims = verify_token(&token, SECRET).expect("freshly issued token should verify");

    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.email, user.email);
    assert_eq!(claims.roles, vec!["Reader", "Writer"]);
    assert!(claims.has_role("Reader"));
    assert!(claims.has_role("Writer"));
    assert!(!claims.has_role("Admin"));
}

#[test]
fn tampered_signature_fails_verification() {
    let user = admin_user();
    let token = issue_token(&user, &both_roles(), SECRET, 24).unwrap();

    // Flip the last character of the signature segment.
    let mut tampered = token.clone();
    let last = tampered.pop().unwrap();
    tampered.push(if last == 'A' { 'B' } else { 'A' });

    assert!(verify_token(&tampered, SECRET).is_none());
}

#[test]
fn wrong_secret_fails_verification() {
    let user = admin_user();
    let token = issue_token(&user, &both_roles(), SECRET, 24).unwrap();

    assert!(verify_token(&token, "some-other-secret").is_none());
}

#[test]
fn expired_token_fails_verification() {
    let user = admin_user();
    // Issued already two hours past expiry, well beyond the decoder's leeway.
    let token = issue_token(&user, &both_roles(), SECRET, -2).unwrap();

    assert!(verify_token(&token, SECRET).is_none());
}

#[test]
fn token_with_no_roles_carries_no_roles() {
    let user = admin_user();
    let token = issue_token(&user, &[], SECRET, 24).unwrap();
    let claims = verify_token(&token, SECRET).unwrap();

    assert!(claims.roles.is_empty());
    assert!(!claims.has_role("Writer"));
}
