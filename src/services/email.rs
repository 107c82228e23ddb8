//! Outbound email notifications.
//!
//! The engines treat the notifier as fire-and-forget: delivery failures
//! are logged by the caller and never fail the surrounding operation.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::SmtpConfig;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_otp_email(
        &self,
        to_email: &str,
        code: &str,
        ttl_minutes: i64,
    ) -> Result<(), anyhow::Error>;

    async fn send_warning_email(
        &self,
        to_email: &str,
        ip: &str,
        user_agent: &str,
    ) -> Result<(), anyhow::Error>;

    async fn send_password_reset_email(
        &self,
        to_email: &str,
        reset_url: &str,
    ) -> Result<(), anyhow::Error>;

    async fn send_verification_email(
        &self,
        to_email: &str,
        verification_url: &str,
    ) -> Result<(), anyhow::Error>;
}

#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: SmtpTransport,
    from_address: String,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, anyhow::Error> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| anyhow::anyhow!("SMTP relay setup failed: {}", e))?
            .credentials(creds)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "SMTP notifier initialized");

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    async fn send(&self, to_email: &str, subject: &str, body: String) -> Result<(), anyhow::Error> {
        let email = Message::builder()
            .from(self.from_address.parse()?)
            .to(to_email.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        // Send on the blocking pool to keep the async runtime free.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email)).await?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to = %to_email, "Failed to send email");
                Err(anyhow::anyhow!("email send failed: {}", e))
            }
        }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_otp_email(
        &self,
        to_email: &str,
        code: &str,
        ttl_minutes: i64,
    ) -> Result<(), anyhow::Error> {
        let body = format!(
            "Your login verification code is: {}\n\nIt is valid for {} minutes.",
            code, ttl_minutes
        );
        self.send(to_email, "Your login verification code", body)
            .await
    }

    async fn send_warning_email(
        &self,
        to_email: &str,
        ip: &str,
        user_agent: &str,
    ) -> Result<(), anyhow::Error> {
        let body = format!(
            "Your account was just accessed from an unrecognized device.\n\n\
             IP address: {}\nDevice: {}\n\n\
             All active sessions have been signed out. If this was not you, \
             secure your account immediately.",
            ip, user_agent
        );
        self.send(to_email, "Security alert: new sign-in detected", body)
            .await
    }

    async fn send_password_reset_email(
        &self,
        to_email: &str,
        reset_url: &str,
    ) -> Result<(), anyhow::Error> {
        let body = format!(
            "You are receiving this because a password reset was requested for \
             your account.\n\nFollow the link below to set a new password:\n\n{}\n\n\
             The link expires in 1 hour. If you did not request this, ignore \
             this email and your password will remain unchanged.",
            reset_url
        );
        self.send(to_email, "Password reset request", body).await
    }

    async fn send_verification_email(
        &self,
        to_email: &str,
        verification_url: &str,
    ) -> Result<(), anyhow::Error> {
        let body = format!(
            "Thank you for registering. Follow the link below to activate your \
             account:\n\n{}\n\nIf you did not register, ignore this email.",
            verification_url
        );
        self.send(to_email, "Welcome! Please verify your account", body)
            .await
    }
}

/// Every email a recording notifier has captured, in send order.
#[derive(Debug, Clone)]
pub enum OutboundEmail {
    Otp {
        to: String,
        code: String,
    },
    Warning {
        to: String,
        ip: String,
        user_agent: String,
    },
    PasswordReset {
        to: String,
        reset_url: String,
    },
    Verification {
        to: String,
        verification_url: String,
    },
}

/// Notifier that records instead of sending. Used by tests to extract the
/// raw OTP codes and link tokens that production mails carry.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("notifier lock poisoned").clone()
    }

    pub fn last_otp_code(&self) -> Option<String> {
        self.sent()
            .iter()
            .rev()
            .find_map(|m| match m {
                OutboundEmail::Otp { code, .. } => Some(code.clone()),
                _ => None,
            })
    }

    pub fn last_reset_url(&self) -> Option<String> {
        self.sent()
            .iter()
            .rev()
            .find_map(|m| match m {
                OutboundEmail::PasswordReset { reset_url, .. } => Some(reset_url.clone()),
                _ => None,
            })
    }

    pub fn last_verification_url(&self) -> Option<String> {
        self.sent()
            .iter()
            .rev()
            .find_map(|m| match m {
                OutboundEmail::Verification {
                    verification_url, ..
                } => Some(verification_url.clone()),
                _ => None,
            })
    }

    fn record(&self, email: OutboundEmail) {
        self.sent.lock().expect("notifier lock poisoned").push(email);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_otp_email(
        &self,
        to_email: &str,
        code: &str,
        _ttl_minutes: i64,
    ) -> Result<(), anyhow::Error> {
        self.record(OutboundEmail::Otp {
            to: to_email.to_string(),
            code: code.to_string(),
        });
        Ok(())
    }

    async fn send_warning_email(
        &self,
        to_email: &str,
        ip: &str,
        user_agent: &str,
    ) -> Result<(), anyhow::Error> {
        self.record(OutboundEmail::Warning {
            to: to_email.to_string(),
            ip: ip.to_string(),
            user_agent: user_agent.to_string(),
        });
        Ok(())
    }

    async fn send_password_reset_email(
        &self,
        to_email: &str,
        reset_url: &str,
    ) -> Result<(), anyhow::Error> {
        self.record(OutboundEmail::PasswordReset {
            to: to_email.to_string(),
            reset_url: reset_url.to_string(),
        });
        Ok(())
    }

    async fn send_verification_email(
        &self,
        to_email: &str,
        verification_url: &str,
    ) -> Result<(), anyhow::Error> {
        self.record(OutboundEmail::Verification {
            to: to_email.to_string(),
            verification_url: verification_url.to_string(),
        });
        Ok(())
    }
}
