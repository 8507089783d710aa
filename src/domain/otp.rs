//! One-time passcodes used for verification and password reset.

use chrono::{DateTime, Utc};

/// Number of digits of a passcode.
pub const OTP_LENGTH: usize = 6;

/// Why a submitted passcode was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OtpRejection {
    #[error("No OTP request found! Please request for a new OTP.")]
    Missing,
    #[error("OTP has expired! Please request for a new OTP.")]
    Expired,
    #[error("Invalid OTP! Please try again.")]
    Mismatch,
}

/// A pending passcode with its expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct OneTimeCode {
    code: String,
    expires_at: DateTime<Utc>,
}

impl OneTimeCode {
    pub fn new(code: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            code: code.into(),
            expires_at,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Expiry is inclusive: a code is still valid at the exact expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Validates `candidate`. Expiry wins over correctness.
    pub fn check(&self, candidate: &str, now: DateTime<Utc>) -> Result<(), OtpRejection> {
        if self.is_expired(now) {
            return Err(OtpRejection::Expired);
        }

        if !constant_time_eq(self.code.as_bytes(), candidate.trim().as_bytes()) {
            return Err(OtpRejection::Mismatch);
        }

        Ok(())
    }
}

impl std::fmt::Debug for OneTimeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OneTimeCode")
            .field("code", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Checks an optional pending code.
pub fn check_pending(
    pending: Option<&OneTimeCode>,
    candidate: &str,
    now: DateTime<Utc>,
) -> Result<(), OtpRejection> {
    pending.ok_or(OtpRejection::Missing)?.check(candidate, now)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn test_accepts_matching_code() {
        let otp = OneTimeCode::new("042137", at(600));
        assert_eq!(otp.check("042137", at(0)), Ok(()));
        assert_eq!(otp.check("042137", at(600)), Ok(()));
    }

    #[test]
    fn test_expiry_wins_over_match() {
        let otp = OneTimeCode::new("042137", at(600));
        assert_eq!(otp.check("042137", at(601)), Err(OtpRejection::Expired));
        assert_eq!(otp.check("000000", at(601)), Err(OtpRejection::Expired));
    }

    #[test]
    fn test_mismatch() {
        let otp = OneTimeCode::new("042137", at(0) + Duration::minutes(10));
        assert_eq!(otp.check("42137", at(0)), Err(OtpRejection::Mismatch));
        assert_eq!(otp.check("042138", at(0)), Err(OtpRejection::Mismatch));
    }

    #[test]
    fn test_missing() {
        assert_eq!(check_pending(None, "042137", at(0)), Err(OtpRejection::Missing));
    }
}
