//! Outbound mail hook.
//!
//! Messages are POSTed as JSON to a configured webhook (a mail relay or
//! transactional email provider). Without a webhook, messages are dropped
//! after logging the recipient and subject.

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Delivery error: {0}")]
    Delivery(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub struct Mailer {
    http_client: Client,
    webhook_url: Option<String>,
    from_address: String,
}

impl Mailer {
    pub fn new(webhook_url: Option<String>, from_address: String) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            webhook_url,
            from_address,
        }
    }

    /// A mailer that only logs. Used in tests and when no relay is configured.
    pub fn disabled() -> Self {
        Self::new(None, "noreply@localhost".to_string())
    }

    pub fn compose(&self, to: &str, subject: &str, body: String) -> OutgoingEmail {
        OutgoingEmail {
            from: self.from_address.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            body,
        }
    }

    pub async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let url = match self.webhook_url {
            Some(ref url) => url,
            None => {
                log::info!(
                    "Mail delivery disabled, dropping '{}' to {}",
                    email.subject,
                    email.to
                );
                return Ok(());
            }
        };

        let response = self
            .http_client
            .post(url)
            .json(email)
            .send()
            .await
            .map_err(|e| MailError::Delivery(format!("HTTP error: {}", e)))?;

        if !response.status().is_success() {
            return Err(MailError::Delivery(format!(
                "HTTP {} from mail relay",
                response.status()
            )));
        }

        log::debug!("Delivered '{}' to {}", email.subject, email.to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_uses_from_address() {
        let mailer = Mailer::new(None, "wishlist@example.com".to_string());
        let email = mailer.compose("bob@example.com", "Hello", "<p>hi</p>".to_string());
        assert_eq!(email.from, "wishlist@example.com");
        assert_eq!(email.to, "bob@example.com");
    }

    #[tokio::test]
    async fn test_disabled_mailer_drops_message() {
        let mailer = Mailer::disabled();
        let email = mailer.compose("bob@example.com", "Hello", String::new());
        assert!(mailer.send(&email).await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_delivery_error() {
        let mailer = Mailer::new(
            Some("http://127.0.0.1:9/mail".to_string()),
            "wishlist@example.com".to_string(),
        );
        let email = mailer.compose("bob@example.com", "Hello", String::new());
        assert!(matches!(mailer.send(&email).await, Err(MailError::Delivery(_))));
    }
}
