//! Generic persistence port.

use std::fmt;
use std::hash::Hash;

use async_trait::async_trait;

use crate::application::error::ApplicationError;
use crate::domain::identity::Identity;
use crate::domain::profile::Profile;
use crate::domain::role::Role;

/// Failure reported by a store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key is already held by another record.
    #[error("{0}")]
    Duplicate(String),
    #[error("record not found")]
    Missing,
    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

impl From<StoreError> for ApplicationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(message) => ApplicationError::Conflict(message),
            StoreError::Missing => ApplicationError::NotFound("Record not found!".into()),
            StoreError::Backend(source) => ApplicationError::Internal {
                message: "Something went wrong! Please try again later.".into(),
                source: Some(source),
            },
        }
    }
}

/// Searchable attribute of an entity.
pub trait Field: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Column name.
    fn name(&self) -> &'static str;
    /// Message returned when the value is already taken.
    fn conflict_message(&self) -> String;
}

/// Anything a [`Repository`] can hold.
pub trait Entity: Clone + Send + Sync + 'static {
    type Field: Field;

    fn id(&self) -> &str;
    fn assign_id(&mut self, id: String);
    fn field(&self, field: Self::Field) -> Option<&str>;
    /// Fields no two records may share.
    fn unique_fields() -> &'static [Self::Field];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityField {
    Email,
}

impl Field for IdentityField {
    fn name(&self) -> &'static str {
        "email"
    }

    fn conflict_message(&self) -> String {
        "Email already registered!".into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    IdentityId,
    Username,
    Contact,
}

impl Field for ProfileField {
    fn name(&self) -> &'static str {
        match self {
            ProfileField::IdentityId => "identity_id",
            ProfileField::Username => "username",
            ProfileField::Contact => "contact",
        }
    }

    fn conflict_message(&self) -> String {
        match self {
            ProfileField::IdentityId => "Profile already exists for this account!".into(),
            ProfileField::Username => "Username already exists!".into(),
            ProfileField::Contact => "Contact already exists!".into(),
        }
    }
}

impl Entity for Identity {
    type Field = IdentityField;

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn field(&self, field: IdentityField) -> Option<&str> {
        match field {
            IdentityField::Email => Some(self.email.as_str()),
        }
    }

    fn unique_fields() -> &'static [IdentityField] {
        &[IdentityField::Email]
    }
}

impl Entity for Profile {
    type Field = ProfileField;

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn field(&self, field: ProfileField) -> Option<&str> {
        match field {
            ProfileField::IdentityId => Some(&self.identity_id),
            ProfileField::Username => self.username.as_ref().map(|u| u.as_str()),
            ProfileField::Contact => Some(self.contact.as_str()),
        }
    }

    fn unique_fields() -> &'static [ProfileField] {
        &[
            ProfileField::IdentityId,
            ProfileField::Username,
            ProfileField::Contact,
        ]
    }
}

/// Port for persistence of one entity type.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Insert `entity`, returning it with its store-assigned id.
    async fn create(&self, entity: T) -> Result<T, StoreError>;

    /// Replace the record sharing `entity`'s id.
    async fn update(&self, entity: &T) -> Result<(), StoreError>;

    /// Returns whether a record was removed.
    async fn delete_by_id(&self, id: &str) -> Result<bool, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<T>, StoreError>;

    async fn find_by_field(&self, field: T::Field, value: &str) -> Result<Option<T>, StoreError>;

    async fn find_all(&self) -> Result<Vec<T>, StoreError>;
}

/// Identity store plus one profile store per role.
#[async_trait]
pub trait AccountStore: Send + Sync {
    fn identities(&self) -> &dyn Repository<Identity>;

    fn profiles(&self, role: Role) -> &dyn Repository<Profile>;

    /// Removes a profile and its identity together. Either both are gone
    /// afterwards or neither is.
    async fn remove_account(
        &self,
        role: Role,
        profile_id: &str,
        identity_id: &str,
    ) -> Result<(), StoreError>;
}
