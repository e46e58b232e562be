use async_trait::async_trait;
use chrono::Utc;
use qd_config::NotificationConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Fixed welcome template. A blank display name greets "User".
pub fn render_welcome(config: &NotificationConfig, display_name: &str, email: &str) -> WelcomeMessage {
    let name = if display_name.trim().is_empty() { "User" } else { display_name.trim() };

    WelcomeMessage {
        from: format!("\"{}\" <{}>", config.from_name, config.from_address),
        to: email.to_string(),
        subject: "Welcome to Q'd!".to_string(),
        text: format!(
            "Hello {},\n\nWelcome to Q'd! We're excited to have you on board.\n\nBest regards,\nThe Q'd Team",
            name
        ),
        html: format!(
            "<p>Hello {},</p>\n<p>Welcome to <strong>Q'd</strong>! We're excited to have you here.</p>\n<p>Best regards,<br/>The Q'd Team</p>",
            escape_html(name)
        ),
    }
}

/// Delivery of the account-creation welcome message
#[async_trait]
pub trait WelcomeMailer: Send + Sync {
    async fn send(&self, message: &WelcomeMessage) -> Result<(), MailError>;
}

/// Drops each message as a JSON file into an outbox directory for a relay to pick up
pub struct OutboxMailer {
    dir: PathBuf,
}

impl OutboxMailer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl WelcomeMailer for OutboxMailer {
    async fn send(&self, message: &WelcomeMessage) -> Result<(), MailError> {
        if !message.to.contains('@') {
            return Err(MailError::InvalidRecipient(message.to.clone()));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let recipient: String = message
            .to
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '@' { c } else { '_' })
            .collect();
        let path = self
            .dir
            .join(format!("{}-{}.json", Utc::now().format("%Y%m%dT%H%M%S%3f"), recipient));
        tokio::fs::write(&path, serde_json::to_vec_pretty(message)?).await?;

        info!("Welcome email queued for {} at {}", message.to, path.display());
        Ok(())
    }
}

/// Only logs; for setups without a mail relay
pub struct LogMailer;

#[async_trait]
impl WelcomeMailer for LogMailer {
    async fn send(&self, message: &WelcomeMessage) -> Result<(), MailError> {
        info!("Welcome email to {}: {}", message.to, message.subject);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_welcome_template() {
        let message = render_welcome(&NotificationConfig::default(), "Alice", "alice@example.com");
        assert_eq!(message.from, "\"Q'd Team\" <team@qd.local>");
        assert_eq!(message.to, "alice@example.com");
        assert_eq!(message.subject, "Welcome to Q'd!");
        assert!(message.text.starts_with("Hello Alice,"));
        assert!(message.html.contains("<strong>Q'd</strong>"));
    }

    #[test]
    fn test_blank_display_name_greets_user() {
        let message = render_welcome(&NotificationConfig::default(), "  ", "x@example.com");
        assert!(message.text.starts_with("Hello User,"));
    }

    #[test]
    fn test_display_name_is_escaped_in_html() {
        let message = render_welcome(&NotificationConfig::default(), "<b>Eve</b>", "eve@example.com");
        assert!(message.html.contains("&lt;b&gt;Eve&lt;/b&gt;"));
    }

    #[tokio::test]
    async fn test_outbox_writes_message_file() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = OutboxMailer::new(dir.path());
        let message = render_welcome(&NotificationConfig::default(), "Alice", "alice@example.com");
        mailer.send(&message).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let path = entries[0].as_ref().unwrap().path();
        let stored: WelcomeMessage = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(stored, message);
    }

    #[tokio::test]
    async fn test_outbox_rejects_bad_recipient() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = OutboxMailer::new(dir.path());
        let message = render_welcome(&NotificationConfig::default(), "Alice", "not-an-address");
        assert!(matches!(mailer.send(&message).await, Err(MailError::InvalidRecipient(_))));
    }
}
