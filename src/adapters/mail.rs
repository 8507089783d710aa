//! Send passcodes by email.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::application::ports::{DeliveryError, Notifier, OtpMessage, OtpPurpose};
use crate::config::Mail;

const IMPLICIT_TLS_PORT: u16 = 465;

struct Content {
    subject: String,
    text: String,
    html: String,
}

impl Content {
    fn new(message: &OtpMessage<'_>, sender: &str, ttl_minutes: i64) -> Self {
        let (subject, reason) = match message.purpose {
            OtpPurpose::Registration => (
                "Your Verification Code",
                "Thank you for signing up with us. Please use the following code to verify your email address for your registration.",
            ),
            OtpPurpose::PasswordReset => (
                "Your Password Reset Code",
                "We received a request to reset your password. Please use the following code to choose a new one.",
            ),
        };
        let ignore = match message.purpose {
            OtpPurpose::Registration => "If you did not sign up for an account, please ignore this email.",
            OtpPurpose::PasswordReset => "If you did not ask for a new password, please ignore this email.",
        };
        let name = message.recipient_name;
        let code = message.code;

        Self {
            subject: format!("{sender} | {subject}"),
            text: format!(
                "Hello, {name}\n\n{reason}\n\nVerification Code: {code}\n\n{ignore}\nThis code will expire in {ttl_minutes} minutes.\n"
            ),
            html: format!(
                r#"<!DOCTYPE html>
<html lang="en" dir="ltr">
  <head><meta charset="UTF-8" /><title>Verification Code</title></head>
  <body style="font-family: Verdana, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
      <h2 style="color: #1a73e8;">Hello, {name}</h2>
      <p>{reason}</p>
      <p><strong>Verification Code: {code}</strong></p>
      <p>{ignore}</p>
      <p>This code will expire in {ttl_minutes} minutes.</p>
    </div>
  </body>
</html>"#
            ),
        }
    }
}

/// SMTP notifier.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    sender: String,
    ttl_minutes: i64,
}

impl SmtpNotifier {
    /// Create a new [`SmtpNotifier`].
    pub fn new(config: &Mail, ttl_minutes: i64) -> Result<Self, DeliveryError> {
        let mut builder = if config.tls {
            let tls = TlsParameters::new(config.host.clone())
                .map_err(|e| DeliveryError::InvalidConfig(format!("TLS configuration error: {e}")))?;

            if config.port == IMPLICIT_TLS_PORT {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                    .map_err(|e| DeliveryError::InvalidConfig(format!("SMTP relay error: {e}")))?
                    .port(config.port)
                    .tls(Tls::Wrapper(tls))
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .map_err(|e| DeliveryError::InvalidConfig(format!("SMTP relay error: {e}")))?
                    .port(config.port)
                    .tls(Tls::Required(tls))
            }
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port)
        };

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let from = format!("{} <{}>", config.from_name, config.from_address)
            .parse::<Mailbox>()
            .map_err(|e| DeliveryError::InvalidConfig(format!("Invalid from address: {e}")))?;

        Ok(Self {
            transport: builder.build(),
            from,
            sender: config.from_name.clone(),
            ttl_minutes,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_otp(&self, message: OtpMessage<'_>) -> Result<(), DeliveryError> {
        let content = Content::new(&message, &self.sender, self.ttl_minutes);
        let to = message
            .email
            .as_str()
            .parse::<Mailbox>()
            .map_err(|e| DeliveryError::InvalidConfig(format!("Invalid to address: {e}")))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(content.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(content.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(content.html),
                    ),
            )
            .map_err(|e| DeliveryError::SendFailed(format!("Failed to build email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| DeliveryError::SendFailed(e.to_string()))?;

        tracing::debug!(purpose = ?message.purpose, "passcode email sent");
        Ok(())
    }
}

/// Notifier used when no SMTP server is configured.
///
/// Codes are written to the log at `info` level so local setups stay usable.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_otp(&self, message: OtpMessage<'_>) -> Result<(), DeliveryError> {
        tracing::info!(
            purpose = ?message.purpose,
            email = %message.email,
            code = message.code,
            "mail is not configured, passcode not delivered"
        );
        Ok(())
    }
}

/// Passcode captured by [`RecordingNotifier`].
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub struct SentOtp {
    pub purpose: OtpPurpose,
    pub email: String,
    pub code: String,
    pub name: String,
}

/// Notifier keeping every message in memory.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingNotifier {
    sent: std::sync::Mutex<Vec<SentOtp>>,
    failing: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentOtp> {
        self.sent.lock().unwrap().clone()
    }

    /// Makes every following send fail.
    pub fn fail(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_otp(&self, message: OtpMessage<'_>) -> Result<(), DeliveryError> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(DeliveryError::SendFailed("connection refused".into()));
        }

        self.sent.lock().unwrap().push(SentOtp {
            purpose: message.purpose,
            email: message.email.to_string(),
            code: message.code.to_owned(),
            name: message.recipient_name.to_owned(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::email::EmailAddress;

    fn config(tls: bool, port: u16) -> Mail {
        Mail {
            host: "localhost".into(),
            port,
            username: Some("user".into()),
            password: Some("pass".into()),
            tls,
            from_address: "noreply@example.com".into(),
            from_name: "Tessera".into(),
        }
    }

    #[tokio::test]
    async fn test_notifier_creation() {
        assert!(SmtpNotifier::new(&config(false, 25), 10).is_ok());
        assert!(SmtpNotifier::new(&config(true, 465), 10).is_ok());
        assert!(SmtpNotifier::new(&config(true, 587), 10).is_ok());
    }

    #[test]
    fn test_invalid_sender() {
        let mut config = config(false, 25);
        config.from_address = "not an address".into();

        assert!(matches!(
            SmtpNotifier::new(&config, 10),
            Err(DeliveryError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_content_carries_code() {
        let email = EmailAddress::parse("a@x.com").unwrap();
        let message = OtpMessage {
            purpose: OtpPurpose::PasswordReset,
            recipient_name: "Jane Doe",
            email: &email,
            code: "042042",
        };
        let content = Content::new(&message, "Tessera", 10);

        assert_eq!(content.subject, "Tessera | Your Password Reset Code");
        assert!(content.text.contains("042042"));
        assert!(content.html.contains("Hello, Jane Doe"));
        assert!(content.html.contains("10 minutes"));
    }
}
