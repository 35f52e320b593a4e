//! In-memory fakes for the identity and email delegates.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::api::{
    email::{EmailError, MailTransport, OutboundEmail},
    identity::{
        Confirmation, CurrentUserView, IdentityError, IdentityProvider, Registration, Revocation,
        TOKEN_TYPE, TokenBundle, display_name,
    },
    validation::{ConfirmationRequest, LoginRequest, RefreshRequest, RegistrationRequest},
};

/// Code every fake account is confirmed with.
pub const CONFIRMATION_CODE: &str = "123456";

struct Account {
    email: String,
    password: String,
    first_name: Option<String>,
    last_name: Option<String>,
    confirmed: bool,
}

#[derive(Default)]
struct Directory {
    accounts: HashMap<String, Account>,
    access_tokens: HashMap<String, String>,
    refresh_tokens: HashMap<String, String>,
    issued: usize,
}

/// Identity provider that keeps accounts in memory and counts every call.
///
/// Passwords without a digit are refused as weak, imitating a provider policy.
#[derive(Default)]
pub struct FakeIdentity {
    directory: Mutex<Directory>,
    calls: AtomicUsize,
    signed_refresh: bool,
}

impl FakeIdentity {
    #[must_use]
    pub fn with_confirmed_user(self, username: &str, email: &str, password: &str) -> Self {
        self.lock().accounts.insert(
            username.to_string(),
            Account {
                email: email.to_string(),
                password: password.to_string(),
                first_name: None,
                last_name: None,
                confirmed: true,
            },
        );
        self
    }

    /// Imitate a provider client with a secret, where refresh needs the username.
    #[must_use]
    pub fn with_signed_refresh(mut self) -> Self {
        self.signed_refresh = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Directory> {
        self.directory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self) -> MutexGuard<'_, Directory> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.lock()
    }
}

fn issue(directory: &mut Directory, username: &str) -> TokenBundle {
    directory.issued += 1;
    let access_token = format!("access-{}", directory.issued);
    let refresh_token = format!("refresh-{}", directory.issued);
    directory
        .access_tokens
        .insert(access_token.clone(), username.to_string());
    directory
        .refresh_tokens
        .insert(refresh_token.clone(), username.to_string());

    TokenBundle {
        access_token,
        refresh_token,
        id_token: None,
        token_type: TOKEN_TYPE.to_string(),
        expires_in: 3600,
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Result<Registration, IdentityError> {
        let mut directory = self.record();
        let taken = directory.accounts.contains_key(&request.username)
            || directory
                .accounts
                .values()
                .any(|account| account.email == request.email);
        if taken {
            return Err(IdentityError::AlreadyExists);
        }

        let password = request.password.expose_secret();
        if !password.chars().any(|ch| ch.is_ascii_digit()) {
            return Err(IdentityError::WeakCredential);
        }

        directory.accounts.insert(
            request.username.clone(),
            Account {
                email: request.email.clone(),
                password: password.to_string(),
                first_name: request.first_name.clone(),
                last_name: request.last_name.clone(),
                confirmed: false,
            },
        );

        Ok(Registration {
            username: request.username.clone(),
            confirmation_required: true,
        })
    }

    async fn confirm(
        &self,
        request: &ConfirmationRequest,
    ) -> Result<Confirmation, IdentityError> {
        let mut directory = self.record();
        let account = directory
            .accounts
            .get_mut(&request.username)
            .ok_or(IdentityError::NotFound)?;
        if account.confirmed || request.confirmation_code != CONFIRMATION_CODE {
            return Err(IdentityError::InvalidCode);
        }
        account.confirmed = true;
        Ok(Confirmation { confirmed: true })
    }

    async fn login(&self, request: &LoginRequest) -> Result<TokenBundle, IdentityError> {
        let mut directory = self.record();
        let confirmed = match directory.accounts.get(&request.username) {
            Some(account) if account.password == request.password.expose_secret() => {
                account.confirmed
            }
            _ => return Err(IdentityError::InvalidCredentials),
        };
        if !confirmed {
            return Err(IdentityError::NotConfirmed);
        }
        Ok(issue(&mut directory, &request.username))
    }

    async fn refresh(&self, request: &RefreshRequest) -> Result<TokenBundle, IdentityError> {
        let mut directory = self.record();
        let username = directory
            .refresh_tokens
            .get(&request.refresh_token)
            .cloned()
            .ok_or(IdentityError::InvalidToken)?;
        let mut tokens = issue(&mut directory, &username);
        // Refresh tokens do not rotate.
        directory.refresh_tokens.remove(&tokens.refresh_token);
        tokens.refresh_token = request.refresh_token.clone();
        Ok(tokens)
    }

    fn refresh_requires_username(&self) -> bool {
        self.signed_refresh
    }

    async fn current_user(&self, bearer_token: &str) -> Result<CurrentUserView, IdentityError> {
        let directory = self.record();
        let username = directory
            .access_tokens
            .get(bearer_token)
            .ok_or(IdentityError::Unauthorized)?;
        let account = directory
            .accounts
            .get(username)
            .ok_or(IdentityError::Unauthorized)?;

        Ok(CurrentUserView {
            username: username.clone(),
            email: Some(account.email.clone()),
            email_verified: account.confirmed,
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            name: display_name(account.first_name.as_deref(), account.last_name.as_deref()),
            ..CurrentUserView::default()
        })
    }

    async fn logout(&self, bearer_token: &str) -> Result<Revocation, IdentityError> {
        let mut directory = self.record();
        let username = directory
            .access_tokens
            .get(bearer_token)
            .cloned()
            .ok_or(IdentityError::Unauthorized)?;
        directory.access_tokens.retain(|_, owner| *owner != username);
        directory.refresh_tokens.retain(|_, owner| *owner != username);
        Ok(Revocation { revoked: true })
    }
}

/// Mail transport that records every delivered message.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutboundEmail>>,
    attempts: AtomicUsize,
    failing_for: Option<String>,
}

impl RecordingTransport {
    /// Refuse every message addressed to `recipient`.
    #[must_use]
    pub fn failing_for(mut self, recipient: &str) -> Self {
        self.failing_for = Some(recipient.to_string());
        self
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn deliver(&self, message: &OutboundEmail) -> Result<String, EmailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing_for.as_deref() == Some(message.to.as_str()) {
            return Err(EmailError::ProviderRejected(format!(
                "recipient refused: {}",
                message.to
            )));
        }

        let mut sent = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
        sent.push(message.clone());
        Ok(format!("<{}@recording>", sent.len()))
    }
}
