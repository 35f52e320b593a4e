//! Mailgun messages API transport.
//!
//! `POST {base_url}/{domain}/messages`, HTTP basic auth with user `api`, form
//! encoded fields. A 200 answer carries `{"id": "<...>", "message": "Queued..."}`.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{Instrument, error, info_span, instrument, warn};
use url::Url;

use super::{EmailError, MailTransport, OutboundEmail};

pub const DEFAULT_BASE_URL: &str = "https://api.mailgun.net/v3";
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

#[derive(Clone, Debug)]
pub struct MailgunConfig {
    api_key: SecretString,
    domain: String,
    base_url: String,
    sender: Option<String>,
    timeout: Duration,
}

impl MailgunConfig {
    #[must_use]
    pub fn new(api_key: SecretString, domain: String) -> Self {
        Self {
            api_key,
            domain,
            base_url: DEFAULT_BASE_URL.to_string(),
            sender: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Override the `From` header, `Urbex <noreply@{domain}>` by default.
    #[must_use]
    pub fn with_sender(mut self, sender: Option<String>) -> Self {
        self.sender = sender;
        self
    }

    #[must_use]
    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout = Duration::from_secs(seconds.max(1));
        self
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn sender(&self) -> String {
        self.sender
            .clone()
            .unwrap_or_else(|| format!("Urbex <noreply@{}>", self.domain))
    }

    #[must_use]
    pub fn messages_url(&self) -> String {
        format!(
            "{}/{}/messages",
            self.base_url.trim_end_matches('/'),
            self.domain
        )
    }

    /// # Errors
    /// Returns an error if the key or domain is empty, or the base URL is not a URL.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(anyhow!("Mailgun API key must not be empty"));
        }
        if self.domain.trim().is_empty() || self.domain.contains('/') {
            return Err(anyhow!("Invalid Mailgun domain: {}", self.domain));
        }
        Url::parse(&self.base_url)
            .with_context(|| format!("Invalid Mailgun base URL: {}", self.base_url))?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    id: String,
}

#[derive(Debug)]
pub struct MailgunClient {
    config: MailgunConfig,
    http: Client,
}

impl MailgunClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: MailgunConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(config.timeout())
            .build()
            .context("Failed to build email provider HTTP client")?;
        Ok(Self { config, http })
    }
}

/// Map a non-success status; client errors mean the provider refused the message.
fn classify(status: StatusCode) -> EmailError {
    if status.is_server_error() {
        EmailError::UpstreamUnavailable(format!("email provider returned {status}"))
    } else {
        EmailError::ProviderRejected(format!("email provider returned {status}"))
    }
}

#[async_trait]
impl MailTransport for MailgunClient {
    #[instrument(skip_all, fields(domain = %self.config.domain()))]
    async fn deliver(&self, message: &OutboundEmail) -> Result<String, EmailError> {
        let mut form = vec![
            ("from", self.config.sender()),
            ("to", message.to.clone()),
            ("subject", message.subject.clone()),
            ("text", message.text.clone()),
            ("html", message.html.clone()),
        ];
        if let Some(reply_to) = &message.reply_to {
            form.push(("h:Reply-To", reply_to.clone()));
        }

        let span = info_span!("email.send", email.system = "mailgun");
        let response = self
            .http
            .post(self.config.messages_url())
            .basic_auth("api", Some(self.config.api_key.expose_secret()))
            .form(&form)
            .send()
            .instrument(span)
            .await
            .map_err(|err| {
                error!("Email provider request failed: {}", err);
                EmailError::UpstreamUnavailable(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "email provider refused message: {}", body);
            return Err(classify(status));
        }

        response
            .json::<MessagesResponse>()
            .await
            .map(|accepted| accepted.id)
            .map_err(|err| {
                error!("Malformed email provider response: {}", err);
                EmailError::UpstreamUnavailable("malformed email provider response".to_string())
            })
    }
}
