//! Outbound ports: what use cases need from the outside world.

mod clock;
mod crypto;
mod image;
mod notifier;
mod repository;
mod token;

pub use clock::Clock;
pub use crypto::{CodeGenerator, PasswordHasher};
pub use image::{ImageStore, ImageUpload};
pub use notifier::{DeliveryError, Notifier, OtpMessage, OtpPurpose};
pub use repository::{
    AccountStore, Entity, Field, IdentityField, ProfileField, Repository, StoreError,
};
pub use token::{AccessClaims, TokenIssuer, TokenPurpose};
