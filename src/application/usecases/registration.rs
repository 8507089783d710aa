//! Registration state machine: `NoIdentity -> UnverifiedExists -> Verified`.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::application::dto::{Envelope, RegisterRequest};
use crate::application::error::{ApplicationError, Result};
use crate::application::policy::Identifier;
use crate::application::ports::{OtpMessage, OtpPurpose, ProfileField, StoreError, TokenPurpose};
use crate::application::usecases::{AccountContext, Claim};
use crate::domain::attributes::{Contact, Username};
use crate::domain::email::EmailAddress;
use crate::domain::identity::Identity;
use crate::domain::otp::OneTimeCode;
use crate::domain::password::{Password, PasswordHash};
use crate::domain::profile::{Profile, ProfileDraft};
use crate::domain::role::Role;

/// How the identity and profile of an attempt came to exist. Drives the
/// compensation when delivery fails.
enum Established {
    /// Both records were created by this attempt.
    Created,
    /// An unverified identity was reused. `role` is the role it had before,
    /// `previous` the profile it held under that role when the attempt
    /// switched roles.
    Reused {
        profile_created: bool,
        role: Role,
        previous: Option<Profile>,
    },
}

pub struct Registration {
    ctx: Arc<AccountContext>,
}

impl Registration {
    pub fn new(ctx: Arc<AccountContext>) -> Self {
        Self { ctx }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<Envelope> {
        let ctx = &self.ctx;
        if request.role != ctx.role() {
            return Err(ApplicationError::BadRequest("Invalid role! Role is unknown.".into()));
        }

        let email = EmailAddress::parse(&request.email)?;
        let password = Password::new(request.password.as_str())?;
        let draft = ctx.policy.draft(&request)?;

        let existing = ctx.identity_by_email(&email).await?;
        let owner = existing.as_ref().map(|identity| identity.id.as_str());

        let mut stale = Vec::new();
        let mut claims = vec![(ProfileField::Contact, draft.contact.to_string())];
        if let Some(username) = &draft.username {
            claims.push((ProfileField::Username, username.to_string()));
        }
        for (field, value) in &claims {
            if let Claim::Stale(profile) = ctx.inspect_claim(*field, value, owner).await? {
                stale.push(profile);
            }
        }

        if existing.as_ref().is_some_and(|identity| identity.is_verified) {
            return Err(ApplicationError::Conflict("Email already registered!".into()));
        }

        ctx.release(stale).await?;

        let code = ctx.issue_code();
        let password_hash = ctx.hasher.hash(&password)?;
        let now = ctx.now();

        let (identity, profile, established) = match existing {
            None => {
                let identity = ctx
                    .identities()
                    .create(Identity::pending(email, ctx.role(), code, now))
                    .await?;
                let profile = Profile::new(&identity.id, ctx.role(), draft, password_hash, now);

                match ctx.profiles().create(profile).await {
                    Ok(profile) => (identity, profile, Established::Created),
                    Err(err) => {
                        if let Err(cleanup) = ctx.identities().delete_by_id(&identity.id).await {
                            tracing::error!(
                                identity_id = %identity.id,
                                error = %cleanup,
                                "failed to remove identity after profile creation failed"
                            );
                        }
                        return Err(err.into());
                    },
                }
            },
            Some(identity) => {
                let original = identity.clone();
                let previous = if identity.role != ctx.role() {
                    self.drop_foreign_profile(&identity).await?
                } else {
                    None
                };

                match self.reuse(identity, draft, password_hash, code, now).await {
                    Ok((identity, profile, profile_created)) => {
                        let established = Established::Reused {
                            profile_created,
                            role: original.role,
                            previous,
                        };
                        (identity, profile, established)
                    },
                    Err(err) => {
                        if let Some(previous) = previous {
                            if let Err(cleanup) = self.restore(&original, previous).await {
                                tracing::error!(
                                    identity_id = %original.id,
                                    error = %cleanup,
                                    "failed to restore profile after role switch failed"
                                );
                            }
                        }
                        return Err(err);
                    },
                }
            },
        };

        let claims = ctx.claims(&identity, &profile, TokenPurpose::Signup);
        let token = match ctx.tokens.sign(&claims, ctx.settings.signup_token_ttl) {
            Ok(token) => token,
            Err(err) => {
                self.rollback(&identity, &profile, &established).await;
                return Err(err);
            },
        };

        let code = identity
            .verification
            .as_ref()
            .map(|code| code.code().to_owned())
            .unwrap_or_default();
        let message = OtpMessage {
            purpose: OtpPurpose::Registration,
            recipient_name: profile.full_name.as_str(),
            email: &identity.email,
            code: &code,
        };

        if let Err(err) = ctx.notifier.send_otp(message).await {
            tracing::warn!(
                role = %ctx.role(),
                identity_id = %identity.id,
                error = %err,
                "verification email failed, rolling back registration"
            );
            self.rollback(&identity, &profile, &established).await;
            return Err(ApplicationError::internal_message(err.to_string()));
        }

        metrics::counter!("accounts_registered_total", "role" => ctx.role().as_str()).increment(1);
        tracing::info!(role = %ctx.role(), identity_id = %identity.id, "account registered");

        Ok(Envelope::created("User registered successfully. Please verify your email.")
            .token(token)
            .user(ctx.view(&identity, &profile)))
    }

    /// Restarts verification of an unverified identity under this role and
    /// writes the attempt's profile. Tells whether the profile was created.
    async fn reuse(
        &self,
        mut identity: Identity,
        draft: ProfileDraft,
        password_hash: PasswordHash,
        code: OneTimeCode,
        now: DateTime<Utc>,
    ) -> Result<(Identity, Profile, bool)> {
        let ctx = &self.ctx;
        identity.restart_verification(ctx.role(), code, now);
        ctx.identities().update(&identity).await?;

        match ctx.profile_of(&identity).await? {
            Some(mut profile) => {
                profile.apply_draft(draft, password_hash, now);
                ctx.profiles().update(&profile).await?;
                Ok((identity, profile, false))
            },
            None => {
                let profile = ctx
                    .profiles()
                    .create(Profile::new(&identity.id, ctx.role(), draft, password_hash, now))
                    .await?;
                Ok((identity, profile, true))
            },
        }
    }

    /// An unverified identity switching role leaves its previous profile
    /// behind; remove it so the identity keeps a single profile. The removed
    /// profile is returned so a failed attempt can put it back.
    async fn drop_foreign_profile(&self, identity: &Identity) -> Result<Option<Profile>> {
        let previous = self.ctx.store.profiles(identity.role);
        let Some(profile) = previous
            .find_by_field(ProfileField::IdentityId, &identity.id)
            .await?
        else {
            return Ok(None);
        };

        tracing::info!(
            identity_id = %identity.id,
            from = %identity.role,
            to = %self.ctx.role(),
            "unverified identity changes role"
        );
        previous.delete_by_id(&profile.id).await?;
        Ok(Some(profile))
    }

    /// Puts back `original` and the profile it held before a role switch.
    /// The profile comes back under a new id.
    async fn restore(&self, original: &Identity, previous: Profile) -> std::result::Result<(), StoreError> {
        let store = &self.ctx.store;
        store.identities().update(original).await?;
        store.profiles(previous.role).create(previous).await?;
        Ok(())
    }

    /// Compensation for a failed attempt. Updates made to a pre-existing
    /// profile are kept.
    async fn rollback(&self, identity: &Identity, profile: &Profile, established: &Established) {
        let ctx = &self.ctx;
        metrics::counter!("registration_rollbacks_total", "role" => ctx.role().as_str()).increment(1);

        let result = match established {
            Established::Created => {
                let removed = ctx.profiles().delete_by_id(&profile.id).await;
                match removed {
                    Ok(_) => ctx.identities().delete_by_id(&identity.id).await.map(|_| ()),
                    Err(err) => Err(err),
                }
            },
            Established::Reused {
                profile_created,
                role,
                previous,
            } => {
                let mut reverted = identity.clone();
                reverted.role = *role;
                reverted.verification = None;
                reverted.updated_at = ctx.now();

                let mut result = Ok(());
                if *profile_created {
                    result = ctx.profiles().delete_by_id(&profile.id).await.map(|_| ());
                }
                if result.is_ok() {
                    result = ctx.identities().update(&reverted).await;
                }
                if let Some(previous) = previous.as_ref().filter(|_| result.is_ok()) {
                    result = ctx
                        .store
                        .profiles(previous.role)
                        .create(previous.clone())
                        .await
                        .map(|_| ());
                }
                result
            },
        };

        if let Err(err) = result {
            tracing::error!(
                identity_id = %identity.id,
                profile_id = %profile.id,
                error = %err,
                "registration rollback failed"
            );
        }
    }

    pub async fn verify(&self, identifier: &str, otp: &str) -> Result<Envelope> {
        let ctx = &self.ctx;

        let (mut identity, profile) = match ctx.policy.classify_verification(identifier)? {
            Identifier::Email(email) => {
                let identity = ctx.require_identity(&email).await?;
                let profile = ctx.require_profile_of(&identity).await?;
                (identity, profile)
            },
            Identifier::Username(username) => {
                self.by_profile_field(ProfileField::Username, username.as_str()).await?
            },
            Identifier::Contact(contact) => {
                self.by_profile_field(ProfileField::Contact, contact.as_str()).await?
            },
        };

        if identity.is_verified {
            return Err(ApplicationError::Conflict(
                "This account is already verified! Please login.".into(),
            ));
        }

        identity.confirm(otp, ctx.now())?;
        ctx.identities().update(&identity).await?;

        metrics::counter!("accounts_verified_total", "role" => ctx.role().as_str()).increment(1);
        tracing::info!(role = %ctx.role(), identity_id = %identity.id, "account verified");

        Ok(Envelope::ok("Account verified successfully. You can now login.")
            .user(ctx.view(&identity, &profile)))
    }

    async fn by_profile_field(&self, field: ProfileField, value: &str) -> Result<(Identity, Profile)> {
        let ctx = &self.ctx;
        let profile = ctx
            .profiles()
            .find_by_field(field, value)
            .await?
            .ok_or_else(|| ctx.profile_not_found())?;
        let identity = ctx.owner_of(&profile).await?;
        Ok((identity, profile))
    }

    /// Sends a fresh registration code. A delivery failure is reported but
    /// the new code stays stored.
    pub async fn resend(&self, email: &str) -> Result<Envelope> {
        let ctx = &self.ctx;
        let email = EmailAddress::parse(email)?;

        let mut identity = ctx.require_identity(&email).await?;
        if identity.is_verified {
            return Err(ApplicationError::Conflict(
                "This account is already verified! Please login.".into(),
            ));
        }
        let profile = ctx.require_profile_of(&identity).await?;

        let code = ctx.issue_code();
        let raw = code.code().to_owned();
        identity.restart_verification(identity.role, code, ctx.now());
        ctx.identities().update(&identity).await?;

        ctx.notifier
            .send_otp(OtpMessage {
                purpose: OtpPurpose::Registration,
                recipient_name: profile.full_name.as_str(),
                email: &identity.email,
                code: &raw,
            })
            .await
            .map_err(|err| ApplicationError::internal_message(err.to_string()))?;

        Ok(Envelope::ok("Verification email sent successfully. Please check your inbox.")
            .user(ctx.view(&identity, &profile)))
    }

    /// Whether the role's public handle is still free to claim.
    pub async fn check_availability(&self, value: &str) -> Result<Envelope> {
        let ctx = &self.ctx;
        let field = ctx.policy.availability_field();
        let value = value.trim();

        match field {
            ProfileField::Username => {
                Username::parse(value)?;
            },
            _ => {
                Contact::parse(value)?;
            },
        }

        ctx.inspect_claim(field, value, None).await?;

        Ok(Envelope::ok(match field {
            ProfileField::Username => "Username is available",
            _ => "Contact is available",
        }))
    }
}
