use async_trait::async_trait;
use tokio::sync::Mutex;

use blog_core::ports::{EmailMessage, MailError, Mailer};

/// Keeps sent messages in memory. Can be told to fail, to exercise
/// transport-error paths.
#[derive(Default)]
pub struct RecordingMailer {
    outbox: Mutex<Vec<EmailMessage>>,
    fail_with: Option<String>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            outbox: Mutex::new(Vec::new()),
            fail_with: Some(reason.into()),
        }
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.outbox.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        if let Some(reason) = &self.fail_with {
            return Err(MailError::Transport(reason.clone()));
        }
        self.outbox.lock().await.push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage {
            from: "blog@example.com".into(),
            to: vec!["reader@example.com".into()],
            subject: "Hello".into(),
            body: "Body".into(),
        }
    }

    #[tokio::test]
    async fn records_sent_messages() {
        let mailer = RecordingMailer::new();
        mailer.send(message()).await.unwrap();

        assert_eq!(mailer.sent().await, vec![message()]);
    }

    #[tokio::test]
    async fn failing_mailer_keeps_nothing() {
        let mailer = RecordingMailer::failing("smtp down");

        let err = mailer.send(message()).await.unwrap_err();
        assert!(matches!(err, MailError::Transport(reason) if reason == "smtp down"));
        assert!(mailer.sent().await.is_empty());
    }
}
