//! Base identity shared by every role.

use chrono::{DateTime, Utc};

use crate::domain::email::EmailAddress;
use crate::domain::otp::{OneTimeCode, OtpRejection, check_pending};
use crate::domain::role::Role;

/// Authentication record, one per account, unique by email.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// Store-assigned; empty until created.
    pub id: String,
    pub email: EmailAddress,
    pub role: Role,
    pub is_verified: bool,
    pub verification: Option<OneTimeCode>,
    pub reset: Option<OneTimeCode>,
    pub is_permanently_banned: bool,
    pub ban_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// New unverified identity waiting for `code`.
    pub fn pending(email: EmailAddress, role: Role, code: OneTimeCode, now: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            email,
            role,
            is_verified: false,
            verification: Some(code),
            reset: None,
            is_permanently_banned: false,
            ban_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Registration retry on an unverified identity.
    pub fn restart_verification(&mut self, role: Role, code: OneTimeCode, now: DateTime<Utc>) {
        debug_assert!(!self.is_verified);
        self.role = role;
        self.verification = Some(code);
        self.updated_at = now;
    }

    /// Consumes the registration code.
    pub fn confirm(&mut self, otp: &str, now: DateTime<Utc>) -> Result<(), OtpRejection> {
        check_pending(self.verification.as_ref(), otp, now)?;
        self.is_verified = true;
        self.verification = None;
        self.updated_at = now;
        Ok(())
    }

    /// Validates a reset code without consuming it.
    pub fn check_reset(&self, otp: &str, now: DateTime<Utc>) -> Result<(), OtpRejection> {
        check_pending(self.reset.as_ref(), otp, now)
    }

    /// Validates then clears the reset code.
    pub fn consume_reset(&mut self, otp: &str, now: DateTime<Utc>) -> Result<(), OtpRejection> {
        self.check_reset(otp, now)?;
        self.reset = None;
        self.updated_at = now;
        Ok(())
    }

    pub fn issue_reset(&mut self, code: OneTimeCode, now: DateTime<Utc>) {
        self.reset = Some(code);
        self.updated_at = now;
    }
}
