use bcrypt::DEFAULT_COST;
use uuid::{Uuid, uuid};

use crate::identity::{IdentityError, IdentityRepository};
use crate::models::Role;

/// Fixed seed identifiers. Seeding keys by these constants instead of
/// generating fresh ids, so re-running the seed matches the existing rows
/// and inserts nothing.
pub const READER_ROLE_ID: Uuid = uuid!("7d5a9c1e-4b2f-4e8a-9c3d-1f6b8a2e5d40");
pub const WRITER_ROLE_ID: Uuid = uuid!("c2e8f4a6-9d13-47b5-8e6a-3b9c5d1f7a28");
pub const ADMIN_USER_ID: Uuid = uuid!("5b3e7f91-2c8d-4a6e-b1f4-8d2a6c9e3b57");

pub fn role_id(role: Role) -> Uuid {
    match role {
        Role::Reader => READER_ROLE_ID,
        Role::Writer => WRITER_ROLE_ID,
    }
}

/// Seeds the fixed role set and the privileged account, then grants that
/// account every seeded role. Runs once at startup, before the server accepts
/// requests; every step is an insert-if-absent keyed by the constants above,
/// so a second run changes nothing. A backend failure here aborts startup.
pub async fn seed_identity(
    repo: &dyn IdentityRepository,
    admin_email: &str,
    admin_password: &str,
) -> Result<(), IdentityError> {
    for role in Role::ALL {
        repo.upsert_role(role_id(role), role.as_str()).await?;
    }

    let password_hash = bcrypt::hash(admin_password, DEFAULT_COST)?;
    repo.upsert_user(ADMIN_USER_ID, admin_email, &password_hash)
        .await?;

    for role in Role::ALL {
        repo.ensure_role_membership(ADMIN_USER_ID, role_id(role))
            .await?;
    }

    tracing::info!("identity seed applied: {} roles, 1 privileged account", Role::ALL.len());
    Ok(())
}
