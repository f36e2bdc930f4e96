//! Outgoing account mail (verification, password reset)
//!
//! Delivery is behind [`Mailer`]. [`LogMailer`] writes messages to the log,
//! which is what development and the default deployment use; tests capture
//! messages with [`InMemoryMailer`].

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{UserError, UserResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl MailMessage {
    pub fn verification(from: &str, to: &str, link: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: "Verify your email".to_string(),
            text: format!("Click the link to verify your email: {}", link),
        }
    }

    pub fn password_reset(from: &str, to: &str, link: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: "Password Reset".to_string(),
            text: format!("Click the link to reset your password: {}", link),
        }
    }

    pub fn password_reset_done(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: "Password Reset Successful".to_string(),
            text: "Your password has been successfully reset. If you didn't make this change, \
                   please contact support immediately."
                .to_string(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> UserResult<()>;
}

/// Writes every message to the log instead of delivering it
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) -> UserResult<()> {
        tracing::info!(
            to = %message.to,
            from = %message.from,
            subject = %message.subject,
            body = %message.text,
            "Outgoing email"
        );
        Ok(())
    }
}

/// Captures messages in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryMailer {
    sent: Arc<Mutex<Vec<MailMessage>>>,
    failure: Option<String>,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every delivery fails
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            sent: Arc::default(),
            failure: Some(message.into()),
        }
    }

    pub async fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().await.clone()
    }

    /// Most recent message addressed to `to`
    pub async fn last_to(&self, to: &str) -> Option<MailMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|m| m.to == to)
            .cloned()
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn send(&self, message: MailMessage) -> UserResult<()> {
        if let Some(failure) = &self.failure {
            return Err(UserError::Mail(failure.clone()));
        }
        self.sent.lock().await.push(message);
        Ok(())
    }
}

/// Last path segments of an emailed link: `(uid, token)`
pub fn link_parts(text: &str) -> Option<(String, String)> {
    let link = text.split_whitespace().last()?;
    let mut segments = link.trim_end_matches('/').rsplit('/');
    let token = segments.next()?.to_string();
    let uid = segments.next()?.to_string();
    Some((uid, token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_mailer_captures() {
        let mailer = InMemoryMailer::new();
        mailer
            .send(MailMessage::verification(
                "no-reply@bookshelf.local",
                "reader@example.com",
                "http://localhost:3000/verify-email/abc/def/",
            ))
            .await
            .unwrap();

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Verify your email");
        assert!(mailer.last_to("reader@example.com").await.is_some());
        assert!(mailer.last_to("other@example.com").await.is_none());
    }

    #[tokio::test]
    async fn test_failing_mailer() {
        let mailer = InMemoryMailer::failing("smtp down");
        let result = mailer
            .send(MailMessage::password_reset_done("a@b.c", "d@e.f"))
            .await;
        assert!(matches!(result, Err(UserError::Mail(msg)) if msg == "smtp down"));
        assert!(mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_everything() {
        assert!(
            LogMailer
                .send(MailMessage::password_reset("a@b.c", "d@e.f", "http://x/reset-password/u/t/"))
                .await
                .is_ok()
        );
    }

    #[test]
    fn test_link_parts() {
        let message = MailMessage::password_reset(
            "a@b.c",
            "d@e.f",
            "http://localhost:3000/reset-password/0191abcd/2x-ff00/",
        );
        assert_eq!(
            link_parts(&message.text),
            Some(("0191abcd".to_string(), "2x-ff00".to_string()))
        );
    }
}
