//! PostgreSQL store.

mod identity;
mod models;
mod profile;

use async_trait::async_trait;
use sqlx::PgPool;

pub use identity::PgIdentityRepository;
pub use profile::PgProfileRepository;

use crate::application::ports::{AccountStore, Field, Repository, StoreError};
use crate::domain::identity::Identity;
use crate::domain::profile::Profile;
use crate::domain::role::Role;

const UNIQUE_VIOLATION: &str = "23505";

/// Maps unique violations back to the field they concern.
fn store_error<F: Field>(err: sqlx::Error, fields: &[F]) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            let constraint = db.constraint().unwrap_or_default();
            let field = fields
                .iter()
                .find(|field| constraint.contains(field.name()))
                .or(fields.first());

            if let Some(field) = field {
                return StoreError::Duplicate(field.conflict_message());
            }
        }
    }

    StoreError::backend(err)
}

/// Identities and profiles backed by one pool.
pub struct PgStore {
    pool: PgPool,
    identities: PgIdentityRepository,
    buyers: PgProfileRepository,
    sellers: PgProfileRepository,
    admins: PgProfileRepository,
}

impl PgStore {
    /// Create a new [`PgStore`].
    pub fn new(pool: PgPool) -> Self {
        Self {
            identities: PgIdentityRepository::new(pool.clone()),
            buyers: PgProfileRepository::new(pool.clone(), Role::Buyer),
            sellers: PgProfileRepository::new(pool.clone(), Role::Seller),
            admins: PgProfileRepository::new(pool.clone(), Role::Admin),
            pool,
        }
    }
}

#[async_trait]
impl AccountStore for PgStore {
    fn identities(&self) -> &dyn Repository<Identity> {
        &self.identities
    }

    fn profiles(&self, role: Role) -> &dyn Repository<Profile> {
        match role {
            Role::Buyer => &self.buyers,
            Role::Seller => &self.sellers,
            Role::Admin => &self.admins,
        }
    }

    async fn remove_account(
        &self,
        role: Role,
        profile_id: &str,
        identity_id: &str,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        let profile = sqlx::query("DELETE FROM profiles WHERE id = $1 AND identity_id = $2 AND role = $3")
            .bind(profile_id)
            .bind(identity_id)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await
            .map_err(StoreError::backend)?;
        if profile.rows_affected() == 0 {
            return Err(StoreError::Missing);
        }

        let identity = sqlx::query("DELETE FROM identities WHERE id = $1")
            .bind(identity_id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::backend)?;
        if identity.rows_affected() == 0 {
            return Err(StoreError::Missing);
        }

        tx.commit().await.map_err(StoreError::backend)
    }
}
