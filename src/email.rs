use async_trait::async_trait;
use lettre::message::{Mailbox, Message, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::{Arc, Mutex};

use crate::config::AppConfig;
use crate::error::ApiError;

/// Mailer
///
/// The abstract contract for the email transport. Used for verification
/// links, password-reset links, and new-post notifications to newsletter
/// subscribers.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        html_body: &str,
    ) -> Result<(), ApiError>;
}

/// MailerState
pub type MailerState = Arc<dyn Mailer>;

/// SmtpMailer
///
/// Async SMTP transport wrapper. If no SMTP host is configured it operates in
/// no-op mode (logs only), which keeps local development working without mail
/// infrastructure.
pub struct SmtpMailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|e| ApiError::Internal(format!("invalid SMTP_FROM address: {e}")))?;

        let transport = if config.smtp_host.trim().is_empty() {
            tracing::warn!("SMTP host not configured; mailer will operate in no-op mode");
            None
        } else {
            let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(
                &config.smtp_host,
            )
            .map_err(|e| ApiError::Internal(format!("failed to configure SMTP transport: {e}")))?
            .port(config.smtp_port);

            if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password)
            {
                builder =
                    builder.credentials(Credentials::new(username.clone(), password.clone()));
            }

            Some(builder.build())
        };

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        html_body: &str,
    ) -> Result<(), ApiError> {
        let Some(transport) = &self.transport else {
            tracing::info!(?recipients, subject, "mailer in no-op mode, skipping send");
            return Ok(());
        };

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_HTML);
        let mut any_recipient = false;
        for recipient in recipients {
            match recipient.parse::<Mailbox>() {
                Ok(mailbox) => {
                    builder = builder.to(mailbox);
                    any_recipient = true;
                }
                Err(e) => {
                    tracing::warn!(recipient = %recipient, error = %e, "skipping unparseable recipient")
                }
            }
        }
        if !any_recipient {
            return Ok(());
        }

        let message = builder
            .body(html_body.to_string())
            .map_err(|e| ApiError::Internal(format!("failed to build message: {e}")))?;

        transport
            .send(message)
            .await
            .map_err(|e| ApiError::ExternalService(format!("email delivery failed: {e}")))?;
        Ok(())
    }
}

/// MockMailer
///
/// Test double recording every send, with an optional simulated outage.
#[derive(Clone, Default)]
pub struct MockMailer {
    pub should_fail: bool,
    pub sent: Arc<Mutex<Vec<(Vec<String>, String)>>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_subjects(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, s)| s.clone()).collect()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        _html_body: &str,
    ) -> Result<(), ApiError> {
        if self.should_fail {
            return Err(ApiError::ExternalService("mock mailer failure".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipients.to_vec(), subject.to_string()));
        Ok(())
    }
}

// --- Outgoing mail bodies ---

pub fn verification_email(username: &str, link: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; text-align: center; padding: 20px;">
  <h3>Hello {username},</h3>
  <p>Thank you for registering! Please click the button below to verify your email address.</p>
  <a href="{link}" style="display: inline-block; background-color: #514DCC; color: white; text-decoration: none; padding: 12px 20px; border-radius: 5px;">Verify Email</a>
</div>"#
    )
}

pub fn password_reset_email(username: &str, link: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; text-align: center; padding: 20px;">
  <h3>Hello {username},</h3>
  <p>We received a request to reset your password. If this was you, click the button below to create a new password.</p>
  <a href="{link}" style="display: inline-block; background-color: #514DCC; color: white; text-decoration: none; padding: 12px 20px; border-radius: 5px;">Reset Password</a>
</div>"#
    )
}

pub fn new_post_email(author: &str, category: &str, title: &str, link: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; padding: 20px;">
  <h3>Hello,</h3>
  <p><strong>{author}</strong> has just published a new post in the <strong>{category}</strong> category. Check it out at the link below:</p>
  <p style="text-align: center;"><a href="{link}" style="color: #514DCC; text-decoration: underline;">{title}</a></p>
</div>"#
    )
}
