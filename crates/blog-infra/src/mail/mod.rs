//! Mail transports - log (development), HTTP webhook, and an in-memory
//! outbox for tests.

mod console;
mod memory;
mod webhook;

use std::sync::Arc;

use blog_core::ports::Mailer;

pub use console::LogMailer;
pub use memory::RecordingMailer;
pub use webhook::WebhookMailer;

/// Which transport delivers outbound mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailTransport {
    /// Write messages to the log instead of sending them.
    Log,
    /// POST messages as JSON to an HTTP mail API.
    Webhook { url: String, token: Option<String> },
}

/// Mail configuration.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub from: String,
    pub transport: MailTransport,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: "noreply@localhost".to_string(),
            transport: MailTransport::Log,
        }
    }
}

impl MailConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let from = std::env::var("MAIL_FROM").unwrap_or_else(|_| "noreply@localhost".to_string());
        let transport = match std::env::var("MAIL_WEBHOOK_URL") {
            Ok(url) if !url.is_empty() => MailTransport::Webhook {
                url,
                token: std::env::var("MAIL_WEBHOOK_TOKEN").ok(),
            },
            _ => MailTransport::Log,
        };
        Self { from, transport }
    }

    /// Build the configured transport.
    pub fn build(&self) -> Arc<dyn Mailer> {
        match &self.transport {
            MailTransport::Log => {
                tracing::info!("Mail transport: log");
                Arc::new(LogMailer)
            }
            MailTransport::Webhook { url, token } => {
                tracing::info!("Mail transport: webhook");
                Arc::new(WebhookMailer::new(url.clone(), token.clone()))
            }
        }
    }
}
