//! # Email Delivery
//!
//! `HttpMailer` posts to a Resend-compatible `/emails` endpoint.
//! `LogMailer` writes the message to the log instead.

use super::{IntegrationError, Mailer, check_status, send, trim_base};
use async_trait::async_trait;
use serde::Serialize;
use tvmount_core::Notification;

const SERVICE: &str = "Mail";

#[derive(Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

pub struct HttpMailer {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str, from: &str) -> Self {
        Self {
            http,
            base_url: trim_base(base_url),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, notification: &Notification) -> Result<(), IntegrationError> {
        let email = OutgoingEmail {
            from: &self.from,
            to: [&notification.to],
            subject: &notification.subject,
            text: &notification.body,
        };
        let req = self
            .http
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&email);
        check_status(SERVICE, send(SERVICE, req).await?).await?;
        Ok(())
    }
}

/// Development mailer.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, notification: &Notification) -> Result<(), IntegrationError> {
        tracing::info!(
            event = "email_logged",
            kind = ?notification.kind,
            to = %notification.to,
            subject = %notification.subject,
            "Email delivery disabled; message logged"
        );
        tracing::debug!(body = %notification.body, "Email body");
        Ok(())
    }
}
