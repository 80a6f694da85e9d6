//! Mail Module
//!
//! Account emails go through the [`Mailer`] trait. `SmtpMailer` delivers over
//! SMTP; `LogMailer` only records them and is used when no SMTP host is set.

mod smtp;
mod templates;

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;

pub use smtp::SmtpMailer;
pub use templates::Template;

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl OutgoingMail {
    pub fn from_template(to: impl Into<String>, template: &Template) -> Self {
        Self {
            to: to.into(),
            subject: template.subject().to_string(),
            html: template.render(),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<()>;
}

// == Log Mailer ==
const OUTBOX_CAPACITY: usize = 64;

/// Records messages in the log and keeps the most recent ones in memory.
#[derive(Debug, Default)]
pub struct LogMailer {
    outbox: Mutex<VecDeque<OutgoingMail>>,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent messages, oldest first.
    pub fn sent(&self) -> Vec<OutgoingMail> {
        let outbox = self.outbox.lock().unwrap_or_else(|p| p.into_inner());
        outbox.iter().cloned().collect()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        info!(to = %mail.to, subject = %mail.subject, "Email recorded (SMTP not configured)");

        let mut outbox = self.outbox.lock().unwrap_or_else(|p| p.into_inner());
        if outbox.len() == OUTBOX_CAPACITY {
            outbox.pop_front();
        }
        outbox.push_back(mail);
        Ok(())
    }
}
