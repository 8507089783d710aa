//! Role-specific rules injected into the shared use cases.

use std::sync::Arc;

use crate::application::dto::RegisterRequest;
use crate::application::error::{ApplicationError, Result};
use crate::application::ports::ProfileField;
use crate::domain::attributes::{Contact, FullName, Username};
use crate::domain::email::EmailAddress;
use crate::domain::error::DomainError;
use crate::domain::profile::ProfileDraft;
use crate::domain::role::Role;

/// A login or verification identifier after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Email(EmailAddress),
    Username(Username),
    Contact(Contact),
}

/// What differs between buyers, sellers and admins.
pub trait RolePolicy: Send + Sync {
    fn role(&self) -> Role;

    /// Identifier accepted at login besides the email.
    fn login_alias(&self) -> Option<ProfileField>;

    /// Identifier accepted to verify a registration besides the email.
    fn verification_alias(&self) -> Option<ProfileField> {
        None
    }

    /// Field answered by the availability check.
    fn availability_field(&self) -> ProfileField {
        ProfileField::Contact
    }

    fn requires_username(&self) -> bool {
        false
    }

    fn requires_terms(&self) -> bool {
        false
    }

    /// Message for an identifier matching no accepted shape.
    fn invalid_identifier(&self) -> &'static str;

    /// Validates role-specific registration fields.
    fn draft(&self, request: &RegisterRequest) -> Result<ProfileDraft> {
        let username = match (&request.username, self.requires_username()) {
            (Some(raw), true) => Some(Username::parse(raw)?),
            (None, true) => {
                return Err(DomainError::invalid("username", "Username is required").into());
            },
            (_, false) => None,
        };

        if self.requires_terms() && !request.terms {
            return Err(DomainError::invalid(
                "terms",
                "You must accept the terms and conditions",
            )
            .into());
        }

        Ok(ProfileDraft {
            full_name: FullName::parse(&request.full_name)?,
            contact: Contact::parse(&request.contact)?,
            username,
            terms: request.terms,
        })
    }

    fn classify_login(&self, raw: &str) -> Result<Identifier> {
        classify(raw, self.login_alias(), self.invalid_identifier())
    }

    fn classify_verification(&self, raw: &str) -> Result<Identifier> {
        classify(raw, self.verification_alias(), self.invalid_identifier())
    }
}

fn classify(raw: &str, alias: Option<ProfileField>, invalid: &str) -> Result<Identifier> {
    let raw = raw.trim();

    if EmailAddress::is_email(raw) {
        return Ok(Identifier::Email(EmailAddress::parse(raw)?));
    }

    match alias {
        Some(ProfileField::Username) if Username::is_username(raw) => {
            Ok(Identifier::Username(Username::parse(raw)?))
        },
        Some(ProfileField::Contact) if Contact::is_contact(raw) => {
            Ok(Identifier::Contact(Contact::parse(raw)?))
        },
        _ => Err(ApplicationError::BadRequest(invalid.to_owned())),
    }
}

pub struct BuyerPolicy;

impl RolePolicy for BuyerPolicy {
    fn role(&self) -> Role {
        Role::Buyer
    }

    fn login_alias(&self) -> Option<ProfileField> {
        Some(ProfileField::Username)
    }

    fn verification_alias(&self) -> Option<ProfileField> {
        Some(ProfileField::Username)
    }

    fn availability_field(&self) -> ProfileField {
        ProfileField::Username
    }

    fn requires_username(&self) -> bool {
        true
    }

    fn requires_terms(&self) -> bool {
        true
    }

    fn invalid_identifier(&self) -> &'static str {
        "Invalid identifier! Please enter a valid email or username."
    }
}

pub struct SellerPolicy;

impl RolePolicy for SellerPolicy {
    fn role(&self) -> Role {
        Role::Seller
    }

    fn login_alias(&self) -> Option<ProfileField> {
        Some(ProfileField::Contact)
    }

    fn invalid_identifier(&self) -> &'static str {
        "Invalid identifier! Please enter a valid email or phone number."
    }
}

pub struct AdminPolicy;

impl RolePolicy for AdminPolicy {
    fn role(&self) -> Role {
        Role::Admin
    }

    fn login_alias(&self) -> Option<ProfileField> {
        None
    }

    fn invalid_identifier(&self) -> &'static str {
        "Invalid identifier! Please enter a valid email."
    }
}

pub fn policy_for(role: Role) -> Arc<dyn RolePolicy> {
    match role {
        Role::Buyer => Arc::new(BuyerPolicy),
        Role::Seller => Arc::new(SellerPolicy),
        Role::Admin => Arc::new(AdminPolicy),
    }
}
