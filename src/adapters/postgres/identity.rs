//! PostgreSQL implementation for identity repository.

use async_trait::async_trait;
use sqlx::PgPool;

use super::models::IdentityRecord;
use super::store_error;
use crate::adapters::random::record_id;
use crate::application::ports::{Entity, Field, IdentityField, Repository, StoreError};
use crate::domain::identity::Identity;

const COLUMNS: &str = "id, email, role, is_verified, verification_code, verification_expires_at, \
    reset_code, reset_expires_at, is_permanently_banned, ban_reason, created_at, updated_at";

/// PostgreSQL identity repository.
pub struct PgIdentityRepository {
    pool: PgPool,
}

impl PgIdentityRepository {
    /// Create a new [`PgIdentityRepository`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn error(err: sqlx::Error) -> StoreError {
        store_error(err, Identity::unique_fields())
    }
}

#[async_trait]
impl Repository<Identity> for PgIdentityRepository {
    async fn create(&self, mut entity: Identity) -> Result<Identity, StoreError> {
        entity.assign_id(record_id());
        let record = IdentityRecord::from(&entity);

        sqlx::query(&format!(
            "INSERT INTO identities ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(&record.id)
        .bind(&record.email)
        .bind(&record.role)
        .bind(record.is_verified)
        .bind(&record.verification_code)
        .bind(record.verification_expires_at)
        .bind(&record.reset_code)
        .bind(record.reset_expires_at)
        .bind(record.is_permanently_banned)
        .bind(&record.ban_reason)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Self::error)?;

        Ok(entity)
    }

    async fn update(&self, entity: &Identity) -> Result<(), StoreError> {
        let record = IdentityRecord::from(entity);

        let result = sqlx::query(
            r#"
            UPDATE identities SET
                email = $2, role = $3, is_verified = $4,
                verification_code = $5, verification_expires_at = $6,
                reset_code = $7, reset_expires_at = $8,
                is_permanently_banned = $9, ban_reason = $10, updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(&record.id)
        .bind(&record.email)
        .bind(&record.role)
        .bind(record.is_verified)
        .bind(&record.verification_code)
        .bind(record.verification_expires_at)
        .bind(&record.reset_code)
        .bind(record.reset_expires_at)
        .bind(record.is_permanently_banned)
        .bind(&record.ban_reason)
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
        let result = sqlx::query("DELETE FROM identities WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, StoreError> {
        self.find_by_column("id", id).await
    }

    async fn find_by_field(
        &self,
        field: IdentityField,
        value: &str,
    ) -> Result<Option<Identity>, StoreError> {
        self.find_by_column(field.name(), value).await
    }

    async fn find_all(&self) -> Result<Vec<Identity>, StoreError> {
        sqlx::query_as::<_, IdentityRecord>(&format!(
            "SELECT {COLUMNS} FROM identities ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(Self::error)?
        .into_iter()
        .map(IdentityRecord::try_into_domain)
        .collect()
    }
}

impl PgIdentityRepository {
    /// `column` always comes from a fixed set of names.
    async fn find_by_column(
        &self,
        column: &'static str,
        value: &str,
    ) -> Result<Option<Identity>, StoreError> {
        let record = sqlx::query_as::<_, IdentityRecord>(&format!(
            "SELECT {COLUMNS} FROM identities WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::error)?;

        record.map(IdentityRecord::try_into_domain).transpose()
    }
}
