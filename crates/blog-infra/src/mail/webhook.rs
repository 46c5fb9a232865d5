use async_trait::async_trait;

use blog_core::ports::{EmailMessage, MailError, Mailer};

/// Sends mail through an HTTP mail API: one JSON POST per message.
pub struct WebhookMailer {
    url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl WebhookMailer {
    pub fn new(url: String, token: Option<String>) -> Self {
        Self {
            url,
            token,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let payload = serde_json::json!({
            "from": message.from,
            "to": message.to,
            "subject": message.subject,
            "text": message.body,
        });

        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected(format!("{status}: {detail}")));
        }

        tracing::debug!(subject = %message.subject, "Email handed to mail API");
        Ok(())
    }
}
