use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::error::SendError;

/// Delivers one rendered message to one recipient.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SendError>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSender;

#[async_trait]
impl MessageSender for LogSender {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SendError> {
        info!(
            recipient = %recipient,
            subject = %subject,
            body_len = body.len(),
            "Message delivered to log"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// POSTs `{ to, subject, body }` to a mail relay.
#[derive(Debug, Clone)]
pub struct WebhookSender {
    client: reqwest::Client,
    url: String,
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

impl WebhookSender {
    pub fn new(url: impl Into<String>) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl MessageSender for WebhookSender {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SendError> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload {
                to: recipient,
                subject,
                body,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(SendError::Rejected(format!("{status}: {text}")))
    }
}
