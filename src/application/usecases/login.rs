//! Login authenticator.

use std::sync::Arc;

use crate::application::dto::{Envelope, LoginRequest};
use crate::application::error::{ApplicationError, Result};
use crate::application::policy::Identifier;
use crate::application::ports::{ProfileField, TokenPurpose};
use crate::application::usecases::AccountContext;
use crate::domain::identity::Identity;
use crate::domain::password::Password;
use crate::domain::profile::Profile;

pub struct Login {
    ctx: Arc<AccountContext>,
}

impl Login {
    pub fn new(ctx: Arc<AccountContext>) -> Self {
        Self { ctx }
    }

    pub async fn login(&self, request: LoginRequest) -> Result<Envelope> {
        let ctx = &self.ctx;
        let role = ctx.role();

        if request.role != role {
            return Err(ApplicationError::BadRequest("Invalid role! Role is unknown.".into()));
        }
        if request.identifier.trim().is_empty() || request.password.is_empty() {
            return Err(ApplicationError::BadRequest(
                "Identifier and password are required!".into(),
            ));
        }

        let (identity, profile) = match ctx.policy.classify_login(&request.identifier)? {
            Identifier::Email(email) => {
                let identity = match ctx.identity_by_email(&email).await? {
                    Some(identity) if identity.role == role => identity,
                    _ => return Err(self.not_found()),
                };
                let profile = ctx.profile_of(&identity).await?.ok_or_else(|| self.not_found())?;
                (identity, profile)
            },
            Identifier::Username(username) => {
                self.by_alias(ProfileField::Username, username.as_str()).await?
            },
            Identifier::Contact(contact) => {
                self.by_alias(ProfileField::Contact, contact.as_str()).await?
            },
        };

        if ctx.settings.require_verified_login && !identity.is_verified {
            return Err(ApplicationError::BadRequest(
                "This account is not verified! Please verify your email first.".into(),
            ));
        }
        if identity.is_permanently_banned {
            return Err(ApplicationError::BadRequest(
                "This account is permanently banned!".into(),
            ));
        }

        let Some(hash) = &profile.password_hash else {
            return Err(ApplicationError::BadRequest(format!("Password not found for {role}!")));
        };
        let accepted = match Password::new(request.password.as_str()) {
            Ok(password) => ctx.hasher.verify(&password, hash)?,
            // A password the rules reject cannot have been stored.
            Err(_) => false,
        };
        if !accepted {
            metrics::counter!("logins_total", "role" => role.as_str(), "outcome" => "rejected")
                .increment(1);
            return Err(ApplicationError::BadRequest(
                "Invalid password! Please enter correct password.".into(),
            ));
        }

        let claims = ctx.claims(&identity, &profile, TokenPurpose::Login);
        let token = ctx.tokens.sign(&claims, ctx.settings.login_token_ttl)?;

        metrics::counter!("logins_total", "role" => role.as_str(), "outcome" => "success")
            .increment(1);
        tracing::info!(%role, identity_id = %identity.id, "logged in");

        Ok(Envelope::ok(format!("Logged in as {role} successfully."))
            .token(token)
            .user(ctx.view(&identity, &profile)))
    }

    /// Tokens are stateless; the client discards its copy.
    pub fn logout(&self) -> Envelope {
        Envelope::ok("Logged out successfully.")
    }

    async fn by_alias(&self, field: ProfileField, value: &str) -> Result<(Identity, Profile)> {
        let ctx = &self.ctx;
        let profile = ctx
            .profiles()
            .find_by_field(field, value)
            .await?
            .ok_or_else(|| self.not_found())?;
        let identity = ctx.owner_of(&profile).await?;
        Ok((identity, profile))
    }

    fn not_found(&self) -> ApplicationError {
        ApplicationError::NotFound(format!(
            "{} with this identifier not found!",
            self.ctx.role().title()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::TokenIssuer;
    use crate::application::usecases::testing::{Harness, PASSWORD, login_request, register_request};
    use crate::domain::role::Role;

    #[tokio::test]
    async fn test_login_by_email_after_verification() {
        let harness = Harness::new(Role::Buyer);
        harness.register_verified(Role::Buyer).await;

        let envelope = harness
            .accounts
            .login
            .login(login_request("a@x.com", Role::Buyer))
            .await
            .unwrap();

        assert_eq!(envelope.status, 200);
        assert_eq!(envelope.message, "Logged in as buyer successfully.");
        let token = envelope.token.unwrap();
        assert!(!token.is_empty());

        let claims = harness.tokens.verify(&token).unwrap();
        let user = envelope.user.unwrap();
        assert_eq!(claims.role, Role::Buyer);
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.identity_id, user.base_user.id);
        assert_eq!(claims.username.as_deref(), Some("abc"));
        assert_eq!(claims.purpose, TokenPurpose::Login);
    }

    #[tokio::test]
    async fn test_login_by_alias() {
        let buyers = Harness::new(Role::Buyer);
        buyers.register_verified(Role::Buyer).await;
        assert!(buyers.accounts.login.login(login_request("abc", Role::Buyer)).await.is_ok());

        let sellers = Harness::new(Role::Seller);
        sellers.register_verified(Role::Seller).await;
        assert!(
            sellers
                .accounts
                .login
                .login(login_request("9999999999", Role::Seller))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_foreign_role_never_yields_token() {
        let harness = Harness::new(Role::Buyer);
        harness.register_verified(Role::Buyer).await;

        let err = harness
            .accounts
            .login
            .login(login_request("a@x.com", Role::Seller))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(err.to_string().contains("Invalid role"));
    }

    #[tokio::test]
    async fn test_identity_of_other_role_is_not_found() {
        let harness = Harness::new(Role::Seller);
        let shared = harness.shared_store_harness(Role::Buyer);
        shared.register_verified(Role::Buyer).await;

        let err = harness
            .accounts
            .login
            .login(login_request("a@x.com", Role::Seller))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let harness = Harness::new(Role::Admin);
        harness.register_verified(Role::Admin).await;

        let mut request = login_request("a@x.com", Role::Admin);
        request.password = "Wrong123!@".into();
        let err = harness.accounts.login.login(request).await.unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(err.to_string().contains("Invalid password"));
    }

    #[tokio::test]
    async fn test_unknown_identifier_shape() {
        let harness = Harness::new(Role::Admin);
        let err = harness
            .accounts
            .login
            .login(login_request("abc", Role::Admin))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn test_missing_password_hash() {
        let harness = Harness::new(Role::Buyer);
        harness.register_verified(Role::Buyer).await;
        harness.clear_password("a@x.com").await;

        let err = harness
            .accounts
            .login
            .login(login_request("a@x.com", Role::Buyer))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Password not found for buyer!");
    }

    #[tokio::test]
    async fn test_unverified_login_follows_policy() {
        let open = Harness::new(Role::Buyer);
        open.accounts
            .registration
            .register(register_request(Role::Buyer))
            .await
            .unwrap();
        assert!(open.accounts.login.login(login_request("abc", Role::Buyer)).await.is_ok());

        let strict = Harness::strict(Role::Buyer);
        strict
            .accounts
            .registration
            .register(register_request(Role::Buyer))
            .await
            .unwrap();
        let err = strict
            .accounts
            .login
            .login(login_request("abc", Role::Buyer))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not verified"));
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let harness = Harness::new(Role::Buyer);
        let mut request = login_request("ghost", Role::Buyer);
        request.password = PASSWORD.into();
        assert_eq!(harness.accounts.login.login(request).await.unwrap_err().status(), 404);
    }
}
