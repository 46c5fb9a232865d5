use async_trait::async_trait;

use blog_core::ports::{EmailMessage, MailError, Mailer};

/// Logs messages instead of delivering them (for development).
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        tracing::info!(
            from = %message.from,
            recipients = message.to.len(),
            subject = %message.subject,
            "Outbound email\n{}",
            message.body
        );
        Ok(())
    }
}
