//! Password reset: request a code, optionally verify it, then consume it.
//!
//! The stored code is the only thing tying the three steps together. It is
//! left intact by [`PasswordReset::verify`] and cleared by
//! [`PasswordReset::reset`].

use std::sync::Arc;

use crate::application::dto::{Envelope, ResetPasswordRequest};
use crate::application::error::{ApplicationError, Result};
use crate::application::ports::{OtpMessage, OtpPurpose};
use crate::application::usecases::AccountContext;
use crate::domain::email::EmailAddress;
use crate::domain::identity::Identity;
use crate::domain::password::Password;

pub struct PasswordReset {
    ctx: Arc<AccountContext>,
}

impl PasswordReset {
    pub fn new(ctx: Arc<AccountContext>) -> Self {
        Self { ctx }
    }

    /// Identity of this role owning `email`.
    async fn identity(&self, email: &str) -> Result<Identity> {
        let email = EmailAddress::parse(email)?;
        let identity = self.ctx.require_identity(&email).await?;
        if identity.role != self.ctx.role() {
            return Err(ApplicationError::NotFound(
                "User with this email does not exist!".into(),
            ));
        }
        Ok(identity)
    }

    pub async fn request(&self, email: &str) -> Result<Envelope> {
        let ctx = &self.ctx;
        let mut identity = self.identity(email).await?;

        if !identity.is_verified {
            return Err(ApplicationError::BadRequest(
                "This account is not verified! Please verify your email first.".into(),
            ));
        }
        let profile = ctx.require_profile_of(&identity).await?;

        let code = ctx.issue_code();
        let raw = code.code().to_owned();
        identity.issue_reset(code, ctx.now());
        ctx.identities().update(&identity).await?;

        ctx.notifier
            .send_otp(OtpMessage {
                purpose: OtpPurpose::PasswordReset,
                recipient_name: profile.full_name.as_str(),
                email: &identity.email,
                code: &raw,
            })
            .await
            .map_err(|err| ApplicationError::internal_message(err.to_string()))?;

        tracing::info!(role = %ctx.role(), identity_id = %identity.id, "password reset requested");

        Ok(Envelope::ok("Reset Password instructions have been sent to your email"))
    }

    pub async fn verify(&self, email: &str, otp: &str) -> Result<Envelope> {
        let identity = self.identity(email).await?;
        identity.check_reset(otp, self.ctx.now())?;

        Ok(Envelope::ok("OTP verified successfully. You can now reset your password."))
    }

    pub async fn reset(&self, request: ResetPasswordRequest) -> Result<Envelope> {
        let ctx = &self.ctx;
        let password = Password::new(request.new_password.as_str())?;

        let mut identity = self.identity(&request.email).await?;
        let mut profile = ctx.require_profile_of(&identity).await?;

        let now = ctx.now();
        identity.consume_reset(&request.otp, now)?;
        ctx.identities().update(&identity).await?;

        profile.set_password(ctx.hasher.hash(&password)?, now);
        ctx.profiles().update(&profile).await?;

        tracing::info!(role = %ctx.role(), identity_id = %identity.id, "password reset");

        Ok(Envelope::ok(
            "Password reset successfully. You can now login with your new password.",
        ))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::application::usecases::testing::{Harness, login_request, register_request};
    use crate::domain::role::Role;

    const NEW_PASSWORD: &str = "Newpass1!";

    fn reset_request(otp: &str) -> ResetPasswordRequest {
        ResetPasswordRequest {
            email: "a@x.com".into(),
            otp: otp.into(),
            new_password: NEW_PASSWORD.into(),
        }
    }

    #[tokio::test]
    async fn test_unverified_account_cannot_request() {
        let harness = Harness::new(Role::Buyer);
        harness
            .accounts
            .registration
            .register(register_request(Role::Buyer))
            .await
            .unwrap();

        let err = harness.accounts.reset.request("a@x.com").await.unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(err.to_string().contains("not verified"));
    }

    #[tokio::test]
    async fn test_unknown_email() {
        let harness = Harness::new(Role::Buyer);
        let err = harness.accounts.reset.request("ghost@x.com").await.unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[tokio::test]
    async fn test_full_reset_flow() {
        let harness = Harness::new(Role::Buyer);
        harness.register_verified(Role::Buyer).await;
        let reset = &harness.accounts.reset;

        harness.codes.set("777777");
        reset.request("a@x.com").await.unwrap();
        let sent = harness.notifier.sent();
        let last = sent.last().unwrap();
        assert_eq!(last.purpose, OtpPurpose::PasswordReset);
        assert_eq!(last.code, "777777");

        reset.verify("a@x.com", "777777").await.unwrap();
        assert!(harness.identity("a@x.com").await.unwrap().reset.is_some());

        let envelope = reset.reset(reset_request("777777")).await.unwrap();
        assert_eq!(envelope.status, 200);
        assert!(harness.identity("a@x.com").await.unwrap().reset.is_none());

        let login = &harness.accounts.login;
        let old = login.login(login_request("a@x.com", Role::Buyer)).await;
        assert_eq!(old.unwrap_err().status(), 400);

        let mut fresh = login_request("a@x.com", Role::Buyer);
        fresh.password = NEW_PASSWORD.into();
        assert!(login.login(fresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_code_is_single_use() {
        let harness = Harness::new(Role::Seller);
        harness.register_verified(Role::Seller).await;
        let reset = &harness.accounts.reset;

        reset.request("a@x.com").await.unwrap();
        reset.reset(reset_request("123456")).await.unwrap();

        let err = reset.reset(reset_request("123456")).await.unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(err.to_string().contains("No OTP request"));
    }

    #[tokio::test]
    async fn test_only_latest_code_counts() {
        let harness = Harness::new(Role::Admin);
        harness.register_verified(Role::Admin).await;
        let reset = &harness.accounts.reset;

        harness.codes.set("111111");
        reset.request("a@x.com").await.unwrap();
        harness.codes.set("222222");
        reset.request("a@x.com").await.unwrap();

        assert!(reset.reset(reset_request("111111")).await.is_err());
        assert!(reset.reset(reset_request("222222")).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_code() {
        let harness = Harness::new(Role::Admin);
        harness.register_verified(Role::Admin).await;
        let reset = &harness.accounts.reset;

        reset.request("a@x.com").await.unwrap();
        harness.clock.advance(TimeDelta::minutes(11));

        let err = reset.verify("a@x.com", "123456").await.unwrap_err();
        assert!(err.to_string().contains("expired"));
        assert!(reset.reset(reset_request("123456")).await.is_err());
    }

    #[tokio::test]
    async fn test_request_delivery_failure() {
        let harness = Harness::new(Role::Buyer);
        harness.register_verified(Role::Buyer).await;
        harness.notifier.fail(true);

        let err = harness.accounts.reset.request("a@x.com").await.unwrap_err();
        assert_eq!(err.status(), 500);
    }
}
