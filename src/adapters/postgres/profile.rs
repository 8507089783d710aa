//! PostgreSQL implementation for profile repositories.

use async_trait::async_trait;
use sqlx::PgPool;

use super::models::ProfileRecord;
use super::store_error;
use crate::adapters::random::record_id;
use crate::application::ports::{Entity, Field, ProfileField, Repository, StoreError};
use crate::domain::profile::Profile;
use crate::domain::role::Role;

const COLUMNS: &str = "id, identity_id, role, full_name, contact, username, password_hash, bio, \
    profile_picture_url, terms, moderation, created_at, updated_at";

/// Profiles of one role. Every role shares the `profiles` table.
pub struct PgProfileRepository {
    pool: PgPool,
    role: Role,
}

impl PgProfileRepository {
    /// Create a new [`PgProfileRepository`].
    pub fn new(pool: PgPool, role: Role) -> Self {
        Self { pool, role }
    }

    fn error(err: sqlx::Error) -> StoreError {
        store_error(err, Profile::unique_fields())
    }

    /// `column` always comes from a fixed set of names.
    async fn find_by_column(
        &self,
        column: &'static str,
        value: &str,
    ) -> Result<Option<Profile>, StoreError> {
        let record = sqlx::query_as::<_, ProfileRecord>(&format!(
            "SELECT {COLUMNS} FROM profiles WHERE {column} = $1 AND role = $2"
        ))
        .bind(value)
        .bind(self.role.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::error)?;

        record.map(ProfileRecord::try_into_domain).transpose()
    }
}

#[async_trait]
impl Repository<Profile> for PgProfileRepository {
    async fn create(&self, mut entity: Profile) -> Result<Profile, StoreError> {
        entity.assign_id(record_id());
        entity.role = self.role;
        let record = ProfileRecord::from(&entity);

        sqlx::query(&format!(
            "INSERT INTO profiles ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        ))
        .bind(&record.id)
        .bind(&record.identity_id)
        .bind(&record.role)
        .bind(&record.full_name)
        .bind(&record.contact)
        .bind(&record.username)
        .bind(&record.password_hash)
        .bind(&record.bio)
        .bind(&record.profile_picture_url)
        .bind(record.terms)
        .bind(&record.moderation)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Self::error)?;

        Ok(entity)
    }

    async fn update(&self, entity: &Profile) -> Result<(), StoreError> {
        let record = ProfileRecord::from(entity);

        let result = sqlx::query(
            r#"
            UPDATE profiles SET
                full_name = $3, contact = $4, username = $5, password_hash = $6,
                bio = $7, profile_picture_url = $8, terms = $9, moderation = $10,
                updated_at = $11
            WHERE id = $1 AND role = $2
            "#,
        )
        .bind(&record.id)
        .bind(self.role.as_str())
        .bind(&record.full_name)
        .bind(&record.contact)
        .bind(&record.username)
        .bind(&record.password_hash)
        .bind(&record.bio)
        .bind(&record.profile_picture_url)
        .bind(record.terms)
        .bind(&record.moderation)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Self::error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing);
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1 AND role = $2")
            .bind(id)
            .bind(self.role.as_str())
            .execute(&self.pool)
            .await
            .map_err(Self::error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        self.find_by_column("id", id).await
    }

    async fn find_by_field(
        &self,
        field: ProfileField,
        value: &str,
    ) -> Result<Option<Profile>, StoreError> {
        self.find_by_column(field.name(), value).await
    }

    async fn find_all(&self) -> Result<Vec<Profile>, StoreError> {
        sqlx::query_as::<_, ProfileRecord>(&format!(
            "SELECT {COLUMNS} FROM profiles WHERE role = $1 ORDER BY created_at"
        ))
        .bind(self.role.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(Self::error)?
        .into_iter()
        .map(ProfileRecord::try_into_domain)
        .collect()
    }
}
