use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

pub const VERIFICATION_SUBJECT: &str = "Verify Your Email Address - Product Genius";
const URL_PLACEHOLDER: &str = "{{VERIFICATION_URL}}";

const FALLBACK_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <body>
    <p>Please verify your email address to finish creating your Product Genius account.</p>
    <p><a href="{{VERIFICATION_URL}}">Verify email</a></p>
    <p>{{VERIFICATION_URL}}</p>
  </body>
</html>
"#;

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Mailer
///
/// Outbound transactional email. `HttpMailer` talks to the provider, `LogMailer` only
/// logs, and `MockMailer` records messages for tests.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> AppResult<()>;
}

pub type MailerState = Arc<dyn Mailer>;

/// HttpMailer
///
/// Sends through a transactional email HTTP API (Brevo-style JSON body, `api-key`
/// header).
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from_name: String,
    from_address: String,
}

impl HttpMailer {
    pub fn new(api_url: &str, api_key: &str, config: &EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            from_name: config.from_name.clone(),
            from_address: config.from_address.clone(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        let payload = json!({
            "sender": { "name": self.from_name, "email": self.from_address },
            "to": [{ "email": message.to }],
            "subject": message.subject,
            "htmlContent": message.html,
            "textContent": message.text,
        });

        let response = self
            .client
            .post(&self.api_url)
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Email provider unreachable: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %body, to = %message.to, "email provider rejected message");
            return Err(AppError::Upstream(format!("Email provider returned {status}")));
        }

        tracing::info!(to = %message.to, subject = %message.subject, "email sent");
        Ok(())
    }
}

/// LogMailer
///
/// Development fallback when no email API is configured: the message (including the
/// verification link) only goes to the log.
#[derive(Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            text = %message.text,
            "email delivery disabled; message logged instead"
        );
        Ok(())
    }
}

/// MockMailer
///
/// Records every message it is asked to send. With `should_fail` every send errors.
#[derive(Clone, Default)]
pub struct MockMailer {
    pub should_fail: bool,
    sent: Arc<Mutex<Vec<EmailMessage>>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        if self.should_fail {
            return Err(AppError::Upstream("Simulated email send failure".to_string()));
        }
        self.sent
            .lock()
            .map_err(|_| AppError::Internal("mock mailer poisoned".to_string()))?
            .push(message);
        Ok(())
    }
}

pub fn verification_url(app_url: &str, token: &str) -> String {
    format!("{}/api/users/temp/verify/{}", app_url.trim_end_matches('/'), token)
}

/// verification_email
///
/// Renders `verification.html` from the template directory, substituting every
/// `{{VERIFICATION_URL}}`. A missing template file falls back to a minimal built-in one.
pub async fn verification_email(
    to: &str,
    token: &str,
    app_url: &str,
    template_dir: &str,
) -> EmailMessage {
    let url = verification_url(app_url, token);
    let path = Path::new(template_dir).join("verification.html");

    let template = match tokio::fs::read_to_string(&path).await {
        Ok(template) => template,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "verification template missing, using built-in");
            FALLBACK_TEMPLATE.to_string()
        }
    };

    EmailMessage {
        to: to.to_string(),
        subject: VERIFICATION_SUBJECT.to_string(),
        html: template.replace(URL_PLACEHOLDER, &url),
        text: format!("Please verify your email address by clicking this link: {url}"),
    }
}
