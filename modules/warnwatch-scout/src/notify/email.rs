use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};
use warnwatch_common::{EmailConfig, SmtpSettings};

use super::{alert_subject, render_entity_plain, render_html, AlertBatch, EntityAlert};
use crate::traits::Notifier;

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends one multipart (plain + HTML) email per entity with new notices,
/// over SMTP with STARTTLS.
pub struct EmailNotifier {
    from: Mailbox,
    to: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailNotifier {
    /// `None` when email is disabled, or enabled without complete SMTP
    /// settings (logged, not an error).
    pub fn from_config(config: &EmailConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let Some(settings) = config.settings() else {
            warn!("Email alerts enabled but SMTP config incomplete, skipping email");
            return Ok(None);
        };
        Self::new(&settings).map(Some)
    }

    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let from: Mailbox = settings
            .sender
            .parse()
            .with_context(|| format!("Invalid sender address: {}", settings.sender))?;
        let to: Mailbox = settings
            .recipient
            .parse()
            .with_context(|| format!("Invalid recipient address: {}", settings.recipient))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)
            .with_context(|| format!("Invalid SMTP server: {}", settings.server))?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.sender.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self { from, to, transport })
    }
}

pub(crate) fn build_message(
    from: &Mailbox,
    to: &Mailbox,
    alert: &EntityAlert,
    checked_at: DateTime<Utc>,
) -> Result<Message> {
    Message::builder()
        .from(from.clone())
        .to(to.clone())
        .subject(alert_subject(&alert.entity))
        .multipart(MultiPart::alternative_plain_html(
            render_entity_plain(alert, checked_at),
            render_html(alert, checked_at),
        ))
        .context("Failed to build alert email")
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn notify(&self, batch: &AlertBatch) -> Result<()> {
        for alert in batch.alerts.iter().filter(|a| !a.notices.is_empty()) {
            let message = build_message(&self.from, &self.to, alert, batch.checked_at)?;
            self.transport
                .send(message)
                .await
                .with_context(|| format!("Failed to send alert email for {}", alert.entity))?;
            info!(
                entity = alert.entity.as_str(),
                count = alert.notices.len(),
                recipient = %self.to,
                "Email alert sent"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use warnwatch_common::Record;

    fn complete_config() -> EmailConfig {
        EmailConfig {
            sender_email: Some("alerts@example.org".into()),
            sender_password: Some("app-password".into()),
            recipient_email: Some("ops@example.org".into()),
            ..EmailConfig::default()
        }
    }

    #[test]
    fn message_is_multipart_with_entity_subject() {
        let alert = EntityAlert {
            entity: "Acme".into(),
            notices: vec![Record::from_pairs([
                ("Company", "Acme Corp"),
                ("Notice Date", "2024-01-01"),
            ])],
        };
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let from: Mailbox = "alerts@example.org".parse().unwrap();
        let to: Mailbox = "ops@example.org".parse().unwrap();

        let message = build_message(&from, &to, &alert, at).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: New WARN Notice Alert: Acme"));
        assert!(raw.contains("From: alerts@example.org"));
        assert!(raw.contains("To: ops@example.org"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("text/plain"));
        assert!(raw.contains("text/html"));
        assert!(raw.contains("Acme Corp"));
    }

    #[test]
    fn disabled_email_builds_no_notifier() {
        let config = EmailConfig {
            enabled: false,
            ..complete_config()
        };
        assert!(EmailNotifier::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn incomplete_settings_skip_email_without_failing() {
        let config = EmailConfig {
            sender_password: None,
            ..complete_config()
        };
        assert!(EmailNotifier::from_config(&config).unwrap().is_none());
    }

    #[tokio::test]
    async fn complete_settings_build_a_notifier() {
        let notifier = EmailNotifier::from_config(&complete_config()).unwrap().unwrap();
        assert_eq!(notifier.name(), "email");
    }

    #[test]
    fn malformed_recipient_is_an_error() {
        let config = EmailConfig {
            recipient_email: Some("not an address".into()),
            ..complete_config()
        };
        assert!(EmailNotifier::from_config(&config).is_err());
    }
}
