//! Account lifecycle use cases.
//!
//! One [`Accounts`] bundle exists per role; every use case inside it shares
//! the same [`AccountContext`].

mod login;
mod password_reset;
mod profile;
mod registration;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

pub use login::Login;
pub use password_reset::PasswordReset;
pub use profile::ProfileManager;
pub use registration::Registration;

use crate::application::dto::ProfileView;
use crate::application::error::{ApplicationError, Result};
use crate::application::policy::RolePolicy;
use crate::application::ports::{
    AccessClaims, AccountStore, Clock, CodeGenerator, Field, IdentityField, ImageStore, Notifier,
    PasswordHasher, ProfileField, Repository, TokenIssuer, TokenPurpose,
};
use crate::domain::email::EmailAddress;
use crate::domain::identity::Identity;
use crate::domain::otp::OneTimeCode;
use crate::domain::profile::Profile;
use crate::domain::role::Role;

/// Tunables of the account lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSettings {
    pub otp_ttl: TimeDelta,
    pub signup_token_ttl: TimeDelta,
    pub login_token_ttl: TimeDelta,
    /// Refuse logins of unverified identities.
    pub require_verified_login: bool,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            otp_ttl: TimeDelta::minutes(10),
            signup_token_ttl: TimeDelta::days(365),
            login_token_ttl: TimeDelta::hours(24),
            require_verified_login: false,
        }
    }
}

/// Collaborators shared by every use case of one role.
pub struct AccountContext {
    pub policy: Arc<dyn RolePolicy>,
    pub store: Arc<dyn AccountStore>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Arc<dyn TokenIssuer>,
    pub notifier: Arc<dyn Notifier>,
    pub images: Arc<dyn ImageStore>,
    pub codes: Arc<dyn CodeGenerator>,
    pub clock: Arc<dyn Clock>,
    pub settings: AccountSettings,
}

/// Outcome of looking at who holds a unique profile value.
enum Claim {
    Free,
    /// Held by an unverified account; can be taken over.
    Stale(Profile),
}

impl AccountContext {
    fn role(&self) -> Role {
        self.policy.role()
    }

    fn identities(&self) -> &dyn Repository<Identity> {
        self.store.identities()
    }

    fn profiles(&self) -> &dyn Repository<Profile> {
        self.store.profiles(self.role())
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn issue_code(&self) -> OneTimeCode {
        OneTimeCode::new(self.codes.generate(), self.now() + self.settings.otp_ttl)
    }

    async fn identity_by_email(&self, email: &EmailAddress) -> Result<Option<Identity>> {
        Ok(self
            .identities()
            .find_by_field(IdentityField::Email, email.as_str())
            .await?)
    }

    async fn require_identity(&self, email: &EmailAddress) -> Result<Identity> {
        self.identity_by_email(email)
            .await?
            .ok_or_else(|| ApplicationError::NotFound("User with this email does not exist!".into()))
    }

    async fn profile_of(&self, identity: &Identity) -> Result<Option<Profile>> {
        Ok(self
            .profiles()
            .find_by_field(ProfileField::IdentityId, &identity.id)
            .await?)
    }

    async fn require_profile_of(&self, identity: &Identity) -> Result<Profile> {
        self.profile_of(identity).await?.ok_or_else(|| self.profile_not_found())
    }

    async fn require_profile(&self, id: &str) -> Result<Profile> {
        self.profiles()
            .find_by_id(id)
            .await?
            .ok_or_else(|| self.profile_not_found())
    }

    /// Identity owning `profile`, which must carry this role.
    async fn owner_of(&self, profile: &Profile) -> Result<Identity> {
        match self.identities().find_by_id(&profile.identity_id).await? {
            Some(identity) if identity.role == self.role() => Ok(identity),
            _ => Err(ApplicationError::NotFound("Base user with this id not found!".into())),
        }
    }

    fn profile_not_found(&self) -> ApplicationError {
        ApplicationError::NotFound(format!("{} not found!", self.role().title()))
    }

    /// Who holds `value` for `field`, ignoring records owned by `owner`.
    ///
    /// Verified holders are a conflict, unverified ones are stale.
    async fn inspect_claim(
        &self,
        field: ProfileField,
        value: &str,
        owner: Option<&str>,
    ) -> Result<Claim> {
        let Some(holder) = self.profiles().find_by_field(field, value).await? else {
            return Ok(Claim::Free);
        };

        if owner.is_some_and(|owner| owner == holder.identity_id) {
            return Ok(Claim::Free);
        }

        match self.identities().find_by_id(&holder.identity_id).await? {
            Some(identity) if identity.is_verified => {
                Err(ApplicationError::Conflict(field.conflict_message()))
            },
            _ => Ok(Claim::Stale(holder)),
        }
    }

    /// Frees values held by unverified accounts.
    async fn release(&self, stale: Vec<Profile>) -> Result<()> {
        let mut released: Vec<String> = Vec::new();
        for profile in stale {
            if released.contains(&profile.id) {
                continue;
            }
            tracing::warn!(
                role = %self.role(),
                profile_id = %profile.id,
                identity_id = %profile.identity_id,
                "releasing values claimed by an unverified account"
            );
            self.profiles().delete_by_id(&profile.id).await?;
            released.push(profile.id);
        }
        Ok(())
    }

    fn claims(&self, identity: &Identity, profile: &Profile, purpose: TokenPurpose) -> AccessClaims {
        AccessClaims {
            sub: profile.id.clone(),
            identity_id: identity.id.clone(),
            email: identity.email.to_string(),
            role: identity.role,
            username: profile.username.as_ref().map(ToString::to_string),
            contact: Some(profile.contact.to_string()),
            purpose,
        }
    }

    fn view(&self, identity: &Identity, profile: &Profile) -> ProfileView {
        ProfileView::new(identity, profile)
    }
}

/// Use cases of one role.
#[derive(Clone)]
pub struct Accounts {
    pub registration: Arc<Registration>,
    pub login: Arc<Login>,
    pub reset: Arc<PasswordReset>,
    pub profiles: Arc<ProfileManager>,
}

impl Accounts {
    pub fn new(context: AccountContext) -> Self {
        let context = Arc::new(context);
        Self {
            registration: Arc::new(Registration::new(Arc::clone(&context))),
            login: Arc::new(Login::new(Arc::clone(&context))),
            reset: Arc::new(PasswordReset::new(Arc::clone(&context))),
            profiles: Arc::new(ProfileManager::new(context)),
        }
    }
}
