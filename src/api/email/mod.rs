//! Email delegate.
//!
//! [`EmailDelegate`] is the only seam through which the gateway reaches the email
//! provider. [`ContactMailer`] turns a validated [`ContactMessage`] into two
//! messages and hands them to a [`MailTransport`]:
//!
//! 1. a notification to the administrative address, `Reply-To` set to the
//!    submitter (must succeed);
//! 2. a confirmation to the submitter (best-effort, failures are only logged).
//!
//! The transport decides how to deliver (Mailgun API in production, a recording
//! fake in tests) and returns the provider message id.

pub mod mailgun;
mod templates;

pub use self::mailgun::{MailgunClient, MailgunConfig};

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;

use crate::api::validation::ContactMessage;

/// Shared handle stored in the router.
pub type Mailer = Arc<dyn EmailDelegate>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// Invalid sender or domain, quota exceeded, bad credentials.
    #[error("email provider rejected the message: {0}")]
    ProviderRejected(String),
    /// Network failure, timeout or provider outage.
    #[error("email provider unavailable: {0}")]
    UpstreamUnavailable(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub reply_to: Option<String>,
}

/// Delivery abstraction used by [`ContactMailer`].
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver a message and return the provider message id.
    async fn deliver(&self, message: &OutboundEmail) -> Result<String, EmailError>;
}

#[derive(ToSchema, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ContactReceipt {
    pub accepted: bool,
    /// Id of the administrative notification.
    pub provider_message_id: String,
}

#[async_trait]
pub trait EmailDelegate: Send + Sync {
    async fn send(&self, message: &ContactMessage) -> Result<ContactReceipt, EmailError>;
}

#[derive(Debug)]
pub struct ContactMailer<T> {
    transport: T,
    admin_email: String,
}

impl<T: MailTransport> ContactMailer<T> {
    #[must_use]
    pub fn new(transport: T, admin_email: String) -> Self {
        Self {
            transport,
            admin_email,
        }
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait]
impl<T: MailTransport> EmailDelegate for ContactMailer<T> {
    #[instrument(skip_all)]
    async fn send(&self, message: &ContactMessage) -> Result<ContactReceipt, EmailError> {
        let notification = templates::admin_notification(message, &self.admin_email);
        let provider_message_id = self.transport.deliver(&notification).await?;
        debug!(id = %provider_message_id, "contact notification accepted");

        let confirmation = templates::submitter_confirmation(message);
        if let Err(err) = self.transport.deliver(&confirmation).await {
            warn!("Failed to send contact confirmation: {}", err);
        }

        Ok(ContactReceipt {
            accepted: true,
            provider_message_id,
        })
    }
}
