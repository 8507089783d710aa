//! Profile reads, edits, picture upload and account deletion.

use std::sync::Arc;

use crate::application::dto::{Envelope, UpdateProfileRequest};
use crate::application::error::{ApplicationError, Result};
use crate::application::ports::{AccessClaims, ImageUpload, ProfileField};
use crate::application::usecases::{AccountContext, Claim};
use crate::domain::attributes::{Bio, Contact, FullName, Username};
use crate::domain::email::EmailAddress;
use crate::domain::identity::Identity;
use crate::domain::profile::Profile;

pub struct ProfileManager {
    ctx: Arc<AccountContext>,
}

impl ProfileManager {
    pub fn new(ctx: Arc<AccountContext>) -> Self {
        Self { ctx }
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Envelope> {
        let ctx = &self.ctx;
        let profile = ctx.require_profile(id).await?;
        let identity = ctx.owner_of(&profile).await?;

        Ok(self.found(&identity, &profile))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Envelope> {
        let ctx = &self.ctx;
        let email = EmailAddress::parse(email)?;
        let identity = ctx.require_identity(&email).await?;
        let profile = ctx.require_profile_of(&identity).await?;

        Ok(self.found(&identity, &profile))
    }

    /// Checks that the account behind a bearer token still exists.
    pub async fn authenticate(&self, caller: &AccessClaims) -> Result<()> {
        let ctx = &self.ctx;
        if ctx.identities().find_by_id(&caller.identity_id).await?.is_none() {
            return Err(ApplicationError::NotFound("Base user with this id not found!".into()));
        }

        match ctx.profiles().find_by_id(&caller.sub).await? {
            Some(profile) if profile.identity_id == caller.identity_id => Ok(()),
            _ => Err(ctx.profile_not_found()),
        }
    }

    pub async fn get_current(&self, caller: &AccessClaims, id: &str) -> Result<Envelope> {
        let (identity, profile) = self.owned(caller, id).await?;
        Ok(self.found(&identity, &profile))
    }

    /// Applies `changes`. Profile fields are written before the identity email,
    /// as two separate store calls.
    pub async fn update(
        &self,
        caller: &AccessClaims,
        id: &str,
        changes: UpdateProfileRequest,
    ) -> Result<Envelope> {
        let ctx = &self.ctx;
        let (mut identity, mut profile) = self.owned(caller, id).await?;
        let owner = Some(identity.id.as_str());

        let email = changes
            .email
            .as_deref()
            .map(EmailAddress::parse)
            .transpose()?
            .filter(|email| *email != identity.email);
        let contact = changes
            .contact
            .as_deref()
            .map(Contact::parse)
            .transpose()?
            .filter(|contact| *contact != profile.contact);
        let username = match changes.username.as_deref() {
            Some(_) if ctx.policy.availability_field() != ProfileField::Username => {
                return Err(ApplicationError::BadRequest(format!(
                    "{} accounts have no username!",
                    ctx.role().title()
                )));
            },
            raw => raw
                .map(Username::parse)
                .transpose()?
                .filter(|username| profile.username.as_ref() != Some(username)),
        };
        let full_name = changes.full_name.as_deref().map(FullName::parse).transpose()?;
        let bio = changes.bio.as_deref().map(Bio::parse).transpose()?;

        let mut stale = Vec::new();
        if let Some(contact) = &contact {
            if let Claim::Stale(holder) = ctx
                .inspect_claim(ProfileField::Contact, contact.as_str(), owner)
                .await?
            {
                stale.push(holder);
            }
        }
        if let Some(username) = &username {
            if let Claim::Stale(holder) = ctx
                .inspect_claim(ProfileField::Username, username.as_str(), owner)
                .await?
            {
                stale.push(holder);
            }
        }
        let stale_identity = match &email {
            Some(email) => self.inspect_email(email, &identity).await?,
            None => None,
        };

        ctx.release(stale).await?;
        if let Some(stale_identity) = stale_identity {
            self.release_identity(stale_identity).await?;
        }

        let now = ctx.now();
        if let Some(full_name) = full_name {
            profile.full_name = full_name;
        }
        if let Some(contact) = contact {
            profile.contact = contact;
        }
        if let Some(username) = username {
            profile.username = Some(username);
        }
        if let Some(bio) = bio {
            profile.bio = Some(bio);
        }
        profile.updated_at = now;
        ctx.profiles().update(&profile).await?;

        if let Some(email) = email {
            identity.email = email;
            identity.updated_at = now;
            ctx.identities().update(&identity).await?;
        }

        tracing::info!(role = %ctx.role(), profile_id = %profile.id, "profile updated");

        Ok(Envelope::ok("Profile updated successfully.").user(ctx.view(&identity, &profile)))
    }

    /// Another identity holding `email`, if it can be released.
    async fn inspect_email(&self, email: &EmailAddress, current: &Identity) -> Result<Option<Identity>> {
        match self.ctx.identity_by_email(email).await? {
            Some(holder) if holder.id != current.id => {
                if holder.is_verified {
                    Err(ApplicationError::Conflict("Email already in use!".into()))
                } else {
                    Ok(Some(holder))
                }
            },
            _ => Ok(None),
        }
    }

    /// Deletes an unverified identity and whatever profile it has.
    async fn release_identity(&self, identity: Identity) -> Result<()> {
        let store = &self.ctx.store;
        tracing::warn!(identity_id = %identity.id, "releasing email held by an unverified account");

        let profile = store
            .profiles(identity.role)
            .find_by_field(ProfileField::IdentityId, &identity.id)
            .await?;
        match profile {
            Some(profile) => {
                store
                    .remove_account(identity.role, &profile.id, &identity.id)
                    .await?
            },
            None => {
                store.identities().delete_by_id(&identity.id).await?;
            },
        }
        Ok(())
    }

    pub async fn upload_picture(
        &self,
        caller: &AccessClaims,
        id: &str,
        image: ImageUpload,
    ) -> Result<Envelope> {
        let ctx = &self.ctx;
        let (identity, mut profile) = self.owned(caller, id).await?;

        if !image.content_type.starts_with("image/") {
            return Err(ApplicationError::BadRequest("Only image files are allowed!".into()));
        }
        if image.bytes.is_empty() {
            return Err(ApplicationError::BadRequest("Please upload an image!".into()));
        }

        let folder = format!("{}s/profile-pictures", ctx.role());
        let url = ctx.images.upload(image.bytes, &image.filename, &folder).await?;

        profile.profile_picture_url = Some(url);
        profile.updated_at = ctx.now();
        ctx.profiles().update(&profile).await?;

        Ok(Envelope::ok("Profile picture uploaded successfully.")
            .user(ctx.view(&identity, &profile)))
    }

    pub async fn delete(&self, caller: &AccessClaims, id: &str) -> Result<Envelope> {
        let ctx = &self.ctx;
        let (identity, profile) = self.owned(caller, id).await?;

        ctx.store
            .remove_account(ctx.role(), &profile.id, &identity.id)
            .await?;

        let profile_left = ctx.profiles().find_by_id(&profile.id).await?.is_some();
        let identity_left = ctx.identities().find_by_id(&identity.id).await?.is_some();
        if profile_left || identity_left {
            tracing::error!(
                profile_id = %profile.id,
                identity_id = %identity.id,
                profile_left,
                identity_left,
                "account still present after deletion"
            );
            return Err(ApplicationError::internal_message("Failed to delete account!"));
        }

        tracing::info!(role = %ctx.role(), identity_id = %identity.id, "account deleted");

        Ok(Envelope::ok("Account deleted successfully."))
    }

    /// Loads the pair designated by `id`, which must belong to `caller`.
    async fn owned(&self, caller: &AccessClaims, id: &str) -> Result<(Identity, Profile)> {
        let ctx = &self.ctx;
        if caller.role != ctx.role() || !caller.owns(id) {
            return Err(ApplicationError::Forbidden(
                "You are not allowed to access this account!".into(),
            ));
        }

        let profile = ctx.require_profile(&caller.sub).await?;
        let identity = ctx.owner_of(&profile).await?;
        if identity.id != caller.identity_id {
            return Err(ApplicationError::Forbidden(
                "You are not allowed to access this account!".into(),
            ));
        }
        Ok((identity, profile))
    }

    fn found(&self, identity: &Identity, profile: &Profile) -> Envelope {
        Envelope::ok(format!("{} fetched successfully.", self.ctx.role().title()))
            .user(self.ctx.view(identity, profile))
    }
}
