//! Email delivery abstractions and background worker.
//!
//! Handlers never talk to the email provider directly. They build an
//! `EmailMessage` and hand it to the configured `EmailSender`:
//!
//! - `LogEmailSender` logs the message and returns `Ok(())`. This is the
//!   default for local dev, where verification and reset links are also
//!   surfaced in API responses.
//! - `QueueEmailSender` pushes the message onto an unbounded channel drained
//!   by a background task that POSTs a SendGrid-style JSON payload to the
//!   configured HTTP endpoint. Enqueueing never blocks request handling and
//!   delivery failures only affect the worker.

use anyhow::{anyhow, bail, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{error, info};

use super::APP_USER_AGENT;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to_email: String,
    pub subject: String,
    pub body_html: String,
}

/// Email delivery abstraction used by the auth flows.
pub trait EmailSender: Send + Sync {
    /// Deliver or enqueue a message; errors are logged by the caller.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            subject = %message.subject,
            body = %message.body_html,
            "email send stub"
        );
        Ok(())
    }
}

/// Settings for the HTTP email provider.
#[derive(Clone, Debug)]
pub struct HttpEmailConfig {
    api_url: String,
    api_key: SecretString,
    from_email: String,
}

impl HttpEmailConfig {
    #[must_use]
    pub fn new(api_url: String, api_key: SecretString, from_email: String) -> Self {
        Self {
            api_url,
            api_key,
            from_email,
        }
    }

    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    #[must_use]
    pub fn from_email(&self) -> &str {
        &self.from_email
    }
}

/// Sender that enqueues messages for the background delivery worker.
#[derive(Clone, Debug)]
pub struct QueueEmailSender {
    tx: UnboundedSender<EmailMessage>,
}

impl QueueEmailSender {
    pub(crate) fn new(tx: UnboundedSender<EmailMessage>) -> Self {
        Self { tx }
    }
}

impl EmailSender for QueueEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        self.tx
            .send(message.clone())
            .map_err(|_| anyhow!("email delivery worker is gone"))
    }
}

/// Spawn the delivery worker and return the sender handlers should use.
pub fn spawn_delivery_worker(
    config: HttpEmailConfig,
) -> Result<(QueueEmailSender, tokio::task::JoinHandle<()>)> {
    let client = reqwest::Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(DELIVERY_TIMEOUT)
        .build()
        .context("failed to build email http client")?;

    let (tx, mut rx) = mpsc::unbounded_channel::<EmailMessage>();

    let handle = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(err) = deliver(&client, &config, &message).await {
                error!(to_email = %message.to_email, "email delivery failed: {err}");
            }
        }
    });

    Ok((QueueEmailSender::new(tx), handle))
}

async fn deliver(
    client: &reqwest::Client,
    config: &HttpEmailConfig,
    message: &EmailMessage,
) -> Result<()> {
    let payload = provider_payload(config.from_email(), message);
    let response = client
        .post(config.api_url())
        .bearer_auth(config.api_key.expose_secret())
        .json(&payload)
        .send()
        .await
        .context("failed to reach email provider")?;

    let status = response.status();
    if !status.is_success() {
        bail!("email provider returned {status}");
    }

    info!(to_email = %message.to_email, %status, "email delivered");
    Ok(())
}

fn provider_payload(from_email: &str, message: &EmailMessage) -> serde_json::Value {
    json!({
        "personalizations": [{"to": [{"email": message.to_email}]}],
        "from": {"email": from_email},
        "subject": message.subject,
        "content": [{"type": "text/html", "value": message.body_html}],
    })
}

pub(crate) fn verification_email(to_email: &str, link: &str) -> EmailMessage {
    EmailMessage {
        to_email: to_email.to_string(),
        subject: concat!(env!("CARGO_PKG_NAME"), " - Verify your email").to_string(),
        body_html: format!(
            "<p>Welcome!</p>\
             <p>Please <a href=\"{link}\">verify your email address</a> to finish setting up \
             your account.</p>\
             <p>If you did not sign up, you can ignore this message.</p>"
        ),
    }
}

pub(crate) fn password_reset_email(to_email: &str, link: &str) -> EmailMessage {
    EmailMessage {
        to_email: to_email.to_string(),
        subject: concat!(env!("CARGO_PKG_NAME"), " - Password recovery").to_string(),
        body_html: format!(
            "<p>We received a request to reset your password.</p>\
             <p><a href=\"{link}\">Choose a new password</a> before the link expires.</p>\
             <p>If you did not request a reset, you can ignore this message.</p>"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        password_reset_email, provider_payload, verification_email, EmailMessage, EmailSender,
        HttpEmailConfig, LogEmailSender, QueueEmailSender,
    };
    use secrecy::SecretString;
    use tokio::sync::mpsc;

    fn sample_message() -> EmailMessage {
        EmailMessage {
            to_email: "alice@example.com".to_string(),
            subject: "Hello".to_string(),
            body_html: "<p>Hi</p>".to_string(),
        }
    }

    #[test]
    fn log_sender_always_succeeds() {
        let sender = LogEmailSender;
        assert!(sender.send(&sample_message()).is_ok());
    }

    #[tokio::test]
    async fn queue_sender_enqueues_messages() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = QueueEmailSender::new(tx);

        sender.send(&sample_message()).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.to_email, "alice@example.com");
        assert_eq!(received.subject, "Hello");
    }

    #[tokio::test]
    async fn queue_sender_errors_after_worker_is_gone() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = QueueEmailSender::new(tx);
        drop(rx);

        assert!(sender.send(&sample_message()).is_err());
    }

    #[test]
    fn provider_payload_has_sendgrid_shape() {
        let payload = provider_payload("noreply@ideahub.dev", &sample_message());
        assert_eq!(
            payload["personalizations"][0]["to"][0]["email"],
            "alice@example.com"
        );
        assert_eq!(payload["from"]["email"], "noreply@ideahub.dev");
        assert_eq!(payload["subject"], "Hello");
        assert_eq!(payload["content"][0]["type"], "text/html");
        assert_eq!(payload["content"][0]["value"], "<p>Hi</p>");
    }

    #[test]
    fn config_exposes_url_and_from() {
        let config = HttpEmailConfig::new(
            "https://api.sendgrid.com/v3/mail/send".to_string(),
            SecretString::from("sg-key"),
            "noreply@ideahub.dev".to_string(),
        );
        assert_eq!(config.api_url(), "https://api.sendgrid.com/v3/mail/send");
        assert_eq!(config.from_email(), "noreply@ideahub.dev");
    }

    #[test]
    fn composed_emails_embed_the_link() {
        let message = verification_email("alice@example.com", "https://app/verify-email?token=t1");
        assert!(message.subject.contains("Verify"));
        assert!(message.body_html.contains("https://app/verify-email?token=t1"));

        let message =
            password_reset_email("alice@example.com", "https://app/reset-password?token=t2");
        assert!(message.subject.contains("Password recovery"));
        assert!(message
            .body_html
            .contains("https://app/reset-password?token=t2"));
    }
}
