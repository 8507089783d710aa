//! In-memory wiring shared by the use case tests.

use std::sync::Arc;

use chrono::Utc;

use crate::adapters::argon2::Argon2PasswordHasher;
use crate::adapters::clock::ManualClock;
use crate::adapters::image::RecordingImageStore;
use crate::adapters::jwt::JwtIssuer;
use crate::adapters::mail::RecordingNotifier;
use crate::adapters::memory::MemoryStore;
use crate::adapters::random::FixedCodes;
use crate::application::dto::{Envelope, LoginRequest, RegisterRequest};
use crate::application::policy::policy_for;
use crate::application::ports::{AccountStore, IdentityField, ProfileField};
use crate::application::usecases::{AccountContext, AccountSettings, Accounts};
use crate::domain::identity::Identity;
use crate::domain::role::Role;

pub const PASSWORD: &str = "Abcd123!@";
pub const CODE: &str = "123456";
const SECRET: &str = "test-secret-test-secret-test-secret";

pub fn register_request(role: Role) -> RegisterRequest {
    RegisterRequest {
        full_name: "Jane Doe".into(),
        email: "a@x.com".into(),
        password: PASSWORD.into(),
        role,
        contact: "9999999999".into(),
        username: Some("abc".into()),
        terms: true,
    }
}

pub fn login_request(identifier: &str, role: Role) -> LoginRequest {
    LoginRequest {
        identifier: identifier.into(),
        password: PASSWORD.into(),
        role,
    }
}

pub struct Harness {
    pub accounts: Accounts,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub codes: Arc<FixedCodes>,
    pub clock: Arc<ManualClock>,
    pub tokens: Arc<JwtIssuer>,
    pub images: Arc<RecordingImageStore>,
    settings: AccountSettings,
}

impl Harness {
    pub fn new(role: Role) -> Self {
        Self::build(role, Arc::new(MemoryStore::default()), AccountSettings::default())
    }

    /// Refuses logins of unverified accounts.
    pub fn strict(role: Role) -> Self {
        let settings = AccountSettings {
            require_verified_login: true,
            ..AccountSettings::default()
        };
        Self::build(role, Arc::new(MemoryStore::default()), settings)
    }

    /// Another role working on the same store.
    pub fn shared_store_harness(&self, role: Role) -> Self {
        Self::build(role, Arc::clone(&self.store), self.settings.clone())
    }

    fn build(role: Role, store: Arc<MemoryStore>, settings: AccountSettings) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let codes = Arc::new(FixedCodes::new(CODE));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let tokens = Arc::new(JwtIssuer::new(SECRET).unwrap());
        let images = Arc::new(RecordingImageStore::default());

        let accounts = Accounts::new(AccountContext {
            policy: policy_for(role),
            store: store.clone(),
            hasher: Arc::new(Argon2PasswordHasher::new(1024, 1, 1).unwrap()),
            tokens: tokens.clone(),
            notifier: notifier.clone(),
            images: images.clone(),
            codes: codes.clone(),
            clock: clock.clone(),
            settings: settings.clone(),
        });

        Self {
            accounts,
            store,
            notifier,
            codes,
            clock,
            tokens,
            images,
            settings,
        }
    }

    pub async fn identity(&self, email: &str) -> Option<Identity> {
        self.store
            .identities()
            .find_by_field(IdentityField::Email, email)
            .await
            .unwrap()
    }

    /// Number of profiles linked to `identity`, across every role.
    pub async fn profiles_of(&self, identity: &Identity) -> usize {
        let mut count = 0;
        for role in Role::ALL {
            let profile = self
                .store
                .profiles(role)
                .find_by_field(ProfileField::IdentityId, &identity.id)
                .await
                .unwrap();
            count += usize::from(profile.is_some());
        }
        count
    }

    /// Registers the default request for `role` and verifies it.
    pub async fn register_verified(&self, role: Role) -> Envelope {
        self.register_and_verify(register_request(role)).await
    }

    /// Returns the registration envelope, which carries the signup token.
    pub async fn register_and_verify(&self, request: RegisterRequest) -> Envelope {
        let email = request.email.clone();
        let envelope = self.accounts.registration.register(request).await.unwrap();
        let code = self.notifier.sent().last().unwrap().code.clone();

        self.accounts
            .registration
            .verify(&email, &code)
            .await
            .unwrap();
        envelope
    }

    pub async fn drop_profile_of(&self, identity: &Identity) {
        let profiles = self.store.profiles(identity.role);
        let profile = profiles
            .find_by_field(ProfileField::IdentityId, &identity.id)
            .await
            .unwrap()
            .unwrap();
        profiles.delete_by_id(&profile.id).await.unwrap();
    }

    /// Strips the password hash from the profile of `email`.
    pub async fn clear_password(&self, email: &str) {
        let identity = self.identity(email).await.unwrap();
        let profiles = self.store.profiles(identity.role);
        let mut profile = profiles
            .find_by_field(ProfileField::IdentityId, &identity.id)
            .await
            .unwrap()
            .unwrap();
        profile.password_hash = None;
        profiles.update(&profile).await.unwrap();
    }
}
