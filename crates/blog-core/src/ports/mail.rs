//! Outbound mail port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A plain-text email ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Mail transport - delivers a message or fails. Callers do not retry.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Mail delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Transport failed: {0}")]
    Transport(String),

    #[error("Rejected by server: {0}")]
    Rejected(String),
}
