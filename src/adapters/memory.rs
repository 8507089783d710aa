//! In-memory store, used when no database is configured and in tests.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::adapters::random::record_id;
use crate::application::ports::{AccountStore, Entity, Field, Repository, StoreError};
use crate::domain::identity::Identity;
use crate::domain::profile::Profile;
use crate::domain::role::Role;

/// Vector-backed repository enforcing [`Entity::unique_fields`].
pub struct MemoryRepository<T> {
    records: RwLock<Vec<T>>,
}

impl<T> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }
}

/// First unique field of `entity` already held by another record.
fn duplicate<T: Entity>(records: &[T], entity: &T) -> Option<T::Field> {
    T::unique_fields().iter().copied().find(|field| {
        let Some(value) = entity.field(*field) else {
            return false;
        };
        records
            .iter()
            .filter(|record| record.id() != entity.id())
            .any(|record| record.field(*field) == Some(value))
    })
}

impl<T: Entity> MemoryRepository<T> {
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for MemoryRepository<T> {
    async fn create(&self, mut entity: T) -> Result<T, StoreError> {
        let mut records = self.records.write().await;
        entity.assign_id(record_id());

        if let Some(field) = duplicate(&records, &entity) {
            return Err(StoreError::Duplicate(field.conflict_message()));
        }

        records.push(entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: &T) -> Result<(), StoreError> {
        let mut records = self.records.write().await;

        if let Some(field) = duplicate(&records, entity) {
            return Err(StoreError::Duplicate(field.conflict_message()));
        }

        let record = records
            .iter_mut()
            .find(|record| record.id() == entity.id())
            .ok_or(StoreError::Missing)?;
        *record = entity.clone();
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|record| record.id() != id);
        Ok(records.len() != before)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<T>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|record| record.id() == id)
            .cloned())
    }

    async fn find_by_field(&self, field: T::Field, value: &str) -> Result<Option<T>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|record| record.field(field) == Some(value))
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.records.read().await.clone())
    }
}

/// Identities plus one profile collection per role.
#[derive(Default)]
pub struct MemoryStore {
    identities: MemoryRepository<Identity>,
    buyers: MemoryRepository<Profile>,
    sellers: MemoryRepository<Profile>,
    admins: MemoryRepository<Profile>,
}

impl MemoryStore {
    fn profile_repository(&self, role: Role) -> &MemoryRepository<Profile> {
        match role {
            Role::Buyer => &self.buyers,
            Role::Seller => &self.sellers,
            Role::Admin => &self.admins,
        }
    }

    #[cfg(test)]
    pub async fn identity_count(&self) -> usize {
        self.identities.len().await
    }

    #[cfg(test)]
    pub async fn profile_count(&self, role: Role) -> usize {
        self.profile_repository(role).len().await
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    fn identities(&self) -> &dyn Repository<Identity> {
        &self.identities
    }

    fn profiles(&self, role: Role) -> &dyn Repository<Profile> {
        self.profile_repository(role)
    }

    async fn remove_account(
        &self,
        role: Role,
        profile_id: &str,
        identity_id: &str,
    ) -> Result<(), StoreError> {
        // Both locks are held so no reader sees half an account.
        let mut identities = self.identities.records.write().await;
        let mut profiles = self.profile_repository(role).records.write().await;

        let profile = profiles
            .iter()
            .position(|profile| profile.id == profile_id && profile.identity_id == identity_id)
            .ok_or(StoreError::Missing)?;
        let identity = identities
            .iter()
            .position(|identity| identity.id == identity_id)
            .ok_or(StoreError::Missing)?;

        profiles.remove(profile);
        identities.remove(identity);
        Ok(())
    }
}
