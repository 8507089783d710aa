//! Notification sender port.

use async_trait::async_trait;

use crate::domain::email::EmailAddress;

/// Why a passcode is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    Registration,
    PasswordReset,
}

/// Passcode delivery request.
#[derive(Debug, Clone, Copy)]
pub struct OtpMessage<'a> {
    pub purpose: OtpPurpose,
    pub recipient_name: &'a str,
    pub email: &'a EmailAddress,
    pub code: &'a str,
}

/// Delivery failure. The message is returned to the caller.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Invalid mail configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to send email: {0}")]
    SendFailed(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_otp(&self, message: OtpMessage<'_>) -> Result<(), DeliveryError>;
}
