//! Role-specific profile linked to one identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::attributes::{Bio, Contact, FullName, Username};
use crate::domain::password::PasswordHash;
use crate::domain::role::Role;

/// Review state of a seller.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellerStatus {
    #[default]
    None,
    Pending,
    Verified,
    Rejected,
}

/// Moderation data only sellers carry.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerModeration {
    pub status: SellerStatus,
    pub verified_at: Option<DateTime<Utc>>,
    pub ban_until: Option<DateTime<Utc>>,
    pub verification_attempts: u32,
    pub violation_count: u32,
    pub notes: Option<String>,
}

/// Validated registration fields written onto a profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileDraft {
    pub full_name: FullName,
    pub contact: Contact,
    pub username: Option<Username>,
    pub terms: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// Store-assigned; empty until created.
    pub id: String,
    pub identity_id: String,
    pub role: Role,
    pub full_name: FullName,
    pub contact: Contact,
    pub username: Option<Username>,
    pub password_hash: Option<PasswordHash>,
    pub bio: Option<Bio>,
    pub profile_picture_url: Option<String>,
    pub terms: bool,
    pub moderation: Option<SellerModeration>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(
        identity_id: impl Into<String>,
        role: Role,
        draft: ProfileDraft,
        password_hash: PasswordHash,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: String::new(),
            identity_id: identity_id.into(),
            role,
            full_name: draft.full_name,
            contact: draft.contact,
            username: draft.username,
            password_hash: Some(password_hash),
            bio: None,
            profile_picture_url: None,
            terms: draft.terms,
            moderation: (role == Role::Seller).then(SellerModeration::default),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites everything a registration retry may change.
    pub fn apply_draft(&mut self, draft: ProfileDraft, password_hash: PasswordHash, now: DateTime<Utc>) {
        self.full_name = draft.full_name;
        self.contact = draft.contact;
        self.username = draft.username;
        self.terms = draft.terms;
        self.password_hash = Some(password_hash);
        self.updated_at = now;
    }

    pub fn set_password(&mut self, password_hash: PasswordHash, now: DateTime<Utc>) {
        self.password_hash = Some(password_hash);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProfileDraft {
        ProfileDraft {
            full_name: FullName::parse("Jane Doe").unwrap(),
            contact: Contact::parse("9999999999").unwrap(),
            username: None,
            terms: false,
        }
    }

    fn hash() -> PasswordHash {
        PasswordHash::parse("$argon2id$v=19$m=65536,t=4,p=2$c2FsdA$aGFzaA").unwrap()
    }

    #[test]
    fn test_only_sellers_have_moderation() {
        let now = Utc::now();
        let seller = Profile::new("id", Role::Seller, draft(), hash(), now);
        let admin = Profile::new("id", Role::Admin, draft(), hash(), now);

        assert_eq!(seller.moderation.unwrap().status, SellerStatus::None);
        assert!(admin.moderation.is_none());
    }

    #[test]
    fn test_apply_draft_replaces_fields() {
        let now = Utc::now();
        let mut profile = Profile::new("id", Role::Buyer, draft(), hash(), now);
        profile.bio = Some(Bio::parse("kept").unwrap());

        let mut next = draft();
        next.full_name = FullName::parse("John Roe").unwrap();
        next.username = Some(Username::parse("john").unwrap());
        profile.apply_draft(next, hash(), now);

        assert_eq!(profile.full_name.as_str(), "John Roe");
        assert_eq!(profile.username.as_ref().map(Username::as_str), Some("john"));
        assert_eq!(profile.bio.as_ref().map(Bio::as_str), Some("kept"));
    }
}
