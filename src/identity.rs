use crate::models::UserRecord;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

/// IdentityError
///
/// Failure surface of the credential store. Unknown users and wrong passwords
/// are not errors; they surface as `None` from the lookup/verification paths.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("email is already registered")]
    EmailTaken,
    #[error("backend unavailable: {0}")]
    Backend(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// IdentityRepository
///
/// Persistence contract for the identity domain: user records, the fixed role
/// set, and role memberships. The upsert operations are conflict-ignoring so
/// the bootstrap seed can run on every startup without duplicating records.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, IdentityError>;
    /// Role names held by the user, resolved through the membership join.
    async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<String>, IdentityError>;
    /// Creates a fresh account. Fails with `EmailTaken` if the email is
    /// already registered.
    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<UserRecord, IdentityError>;
    /// Grants a role to a user by role name. Granting an already-held role is
    /// a no-op; granting a nonexistent role name is also a no-op.
    async fn add_user_to_role(&self, user_id: Uuid, role_name: &str) -> Result<(), IdentityError>;

    // --- Bootstrap primitives (idempotent by construction) ---
    /// Inserts the role if its fixed id is not present yet.
    async fn upsert_role(&self, id: Uuid, name: &str) -> Result<(), IdentityError>;
    /// Inserts the user if its fixed id is not present yet. An existing row
    /// is left untouched.
    async fn upsert_user(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &str,
    ) -> Result<(), IdentityError>;
    /// Inserts the membership edge if absent.
    async fn ensure_role_membership(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<(), IdentityError>;
}

/// IdentityState
///
/// The shared handle to the credential store.
pub type IdentityState = Arc<dyn IdentityRepository>;

/// Verifies an email/password pair against the store and returns the matched
/// user with its role names. Unknown email, wrong password, and an
/// undecodable stored hash all collapse into `None`: the caller cannot tell
/// which half failed.
pub async fn verify_credentials(
    repo: &dyn IdentityRepository,
    email: &str,
    password: &str,
) -> Result<Option<(UserRecord, Vec<String>)>, IdentityError> {
    let Some(user) = repo.find_user_by_email(email).await? else {
        return Ok(None);
    };

    let matches = bcrypt::verify(password, &user.password_hash).unwrap_or(false);
    if !matches {
        return Ok(None);
    }

    let roles = repo.roles_for_user(user.id).await?;
    Ok(Some((user, roles)))
}

/// PostgresIdentityRepository
///
/// The concrete `IdentityRepository` backed by the same PostgreSQL instance
/// as the content stores.
pub struct PostgresIdentityRepository {
    pool: PgPool,
}

impl PostgresIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Postgres unique-violation code, used to map duplicate registrations.
const UNIQUE_VIOLATION: &str = "23505";

fn map_unique_violation(err: sqlx::Error) -> IdentityError {
    if let sqlx::Error::Database(ref db) = err {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return IdentityError::EmailTaken;
        }
    }
    IdentityError::Backend(err)
}

#[async_trait]
impl IdentityRepository for PostgresIdentityRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, IdentityError> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<String>, IdentityError> {
        let roles = sqlx::query_scalar::<_, String>(
            "SELECT r.name FROM roles r \
             JOIN user_roles ur ON ur.role_id = r.id WHERE ur.user_id = $1 ORDER BY r.name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<UserRecord, IdentityError> {
        let user = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING id, email, password_hash",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;
        Ok(user)
    }

    async fn add_user_to_role(&self, user_id: Uuid, role_name: &str) -> Result<(), IdentityError> {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) \
             SELECT $1, id FROM roles WHERE name = $2 ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_role(&self, id: Uuid, name: &str) -> Result<(), IdentityError> {
        sqlx::query("INSERT INTO roles (id, name) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
            .bind(id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_user(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &str,
    ) -> Result<(), IdentityError> {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ensure_role_membership(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<(), IdentityError> {
        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// --- In-memory implementation ---

#[derive(Default)]
struct MemoryIdentityInner {
    users: HashMap<Uuid, UserRecord>,
    roles: HashMap<Uuid, String>,
    memberships: HashSet<(Uuid, Uuid)>,
}

/// MemoryIdentityRepository
///
/// An `IdentityRepository` over process memory with the same conflict
/// semantics as the Postgres implementation. Used by the test suite.
#[derive(Default)]
pub struct MemoryIdentityRepository {
    inner: Mutex<MemoryIdentityInner>,
}

impl MemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of role records currently stored. Test-facing helper.
    pub fn role_count(&self) -> usize {
        self.inner.lock().expect("identity store lock poisoned").roles.len()
    }

    /// Number of user records currently stored. Test-facing helper.
    pub fn user_count(&self) -> usize {
        self.inner.lock().expect("identity store lock poisoned").users.len()
    }
}

#[async_trait]
impl IdentityRepository for MemoryIdentityRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, IdentityError> {
        let inner = self.inner.lock().expect("identity store lock poisoned");
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<String>, IdentityError> {
        let inner = self.inner.lock().expect("identity store lock poisoned");
        let mut roles: Vec<String> = inner
            .memberships
            .iter()
            .filter(|(user, _)| *user == user_id)
            .filter_map(|(_, role_id)| inner.roles.get(role_id).cloned())
            .collect();
        roles.sort();
        Ok(roles)
    }

    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<UserRecord, IdentityError> {
        let mut inner = self.inner.lock().expect("identity store lock poisoned");
        if inner.users.values().any(|u| u.email == email) {
            return Err(IdentityError::EmailTaken);
        }
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn add_user_to_role(&self, user_id: Uuid, role_name: &str) -> Result<(), IdentityError> {
        let mut inner = self.inner.lock().expect("identity store lock poisoned");
        let role_id = inner
            .roles
            .iter()
            .find(|(_, name)| name.as_str() == role_name)
            .map(|(id, _)| *id);
        if let Some(role_id) = role_id {
            inner.memberships.insert((user_id, role_id));
        }
        Ok(())
    }

    async fn upsert_role(&self, id: Uuid, name: &str) -> Result<(), IdentityError> {
        let mut inner = self.inner.lock().expect("identity store lock poisoned");
        inner.roles.entry(id).or_insert_with(|| name.to_string());
        Ok(())
    }

    async fn upsert_user(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &str,
    ) -> Result<(), IdentityError> {
        let mut inner = self.inner.lock().expect("identity store lock poisoned");
        inner.users.entry(id).or_insert_with(|| UserRecord {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        });
        Ok(())
    }

    async fn ensure_role_membership(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<(), IdentityError> {
        let mut inner = self.inner.lock().expect("identity store lock poisoned");
        inner.memberships.insert((user_id, role_id));
        Ok(())
    }
}
