//! SMTP delivery via lettre.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use super::{Mailer, OutgoingMail};
use crate::config::MailConfig;
use crate::error::{AppError, Result};

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    cc: Option<Mailbox>,
}

impl SmtpMailer {
    /// Builds a STARTTLS relay from `config`. Requires `config.host`.
    pub fn new(config: &MailConfig) -> Result<Self> {
        let host = config
            .host
            .as_deref()
            .ok_or_else(|| AppError::Mail("Missing EMAIL_HOST".into()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| AppError::Mail(e.to_string()))?
            .port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = parse_mailbox(&config.sender, "sender")?;
        let cc = config
            .default_cc
            .as_deref()
            .map(|cc| parse_mailbox(cc, "cc"))
            .transpose()?;

        Ok(Self {
            transport: builder.build(),
            from,
            cc,
        })
    }
}

fn parse_mailbox(raw: &str, role: &str) -> Result<Mailbox> {
    raw.parse()
        .map_err(|e| AppError::Mail(format!("Invalid {} address: {}", role, e)))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&mail.to, "recipient")?)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_HTML);
        if let Some(cc) = &self.cc {
            builder = builder.cc(cc.clone());
        }

        let message = builder
            .body(mail.html)
            .map_err(|e| AppError::Mail(e.to_string()))?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| AppError::Mail(e.to_string()))?;

        info!(
            to = %mail.to,
            subject = %mail.subject,
            response = %response.message().collect::<Vec<_>>().join(" "),
            "Email sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_host() {
        let result = SmtpMailer::new(&MailConfig::default());
        assert!(matches!(result, Err(AppError::Mail(_))));
    }

    #[tokio::test]
    async fn test_rejects_invalid_sender() {
        let config = MailConfig {
            host: Some("smtp.example.com".to_string()),
            port: 587,
            sender: "not an address".to_string(),
            ..MailConfig::default()
        };
        assert!(matches!(SmtpMailer::new(&config), Err(AppError::Mail(_))));
    }
}
