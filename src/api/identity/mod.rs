//! Identity delegate.
//!
//! [`IdentityProvider`] is the only seam through which the gateway reaches the
//! identity provider. Implementations translate provider responses into the
//! records below and provider failures into [`IdentityError`]; callers never see
//! provider-specific error shapes.

pub mod cognito;

pub use self::cognito::{CognitoClient, CognitoConfig};

use async_trait::async_trait;
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc};
use utoipa::ToSchema;

use crate::api::validation::{
    ConfirmationRequest, LoginRequest, RefreshRequest, RegistrationRequest,
};

/// `token_type` forwarded with every token bundle.
pub const TOKEN_TYPE: &str = "bearer";

/// Shared handle stored in the router.
pub type Identity = Arc<dyn IdentityProvider>;

/// Closed failure vocabulary for identity operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("username or email already registered")]
    AlreadyExists,
    #[error("password rejected by the provider policy")]
    WeakCredential,
    #[error("confirmation code is invalid or expired")]
    InvalidCode,
    #[error("user not found")]
    NotFound,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("account is not confirmed")]
    NotConfirmed,
    #[error("refresh token is invalid or expired")]
    InvalidToken,
    #[error("access token is missing, invalid or expired")]
    Unauthorized,
    /// Network failure, timeout, throttling or an unmapped provider fault.
    #[error("identity provider unavailable: {0}")]
    UpstreamUnavailable(String),
}

#[derive(ToSchema, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub confirmation_required: bool,
}

#[derive(ToSchema, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub confirmed: bool,
}

/// Tokens minted by the provider, forwarded verbatim and never stored.
#[derive(ToSchema, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[schema(example = "bearer")]
    pub token_type: String,
    /// Access token lifetime in seconds.
    #[schema(example = 3600)]
    pub expires_in: u64,
}

/// Authenticated principal, re-resolved from the bearer token on every call.
#[derive(ToSchema, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct CurrentUserView {
    pub username: String,
    pub sub: Option<String>,
    pub email: Option<String>,
    pub email_verified: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub phone_number_verified: bool,
    /// Provider custom attributes, prefix stripped (e.g. `su`, `plan`).
    pub custom_attributes: BTreeMap<String, String>,
}

#[derive(ToSchema, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Revocation {
    pub revoked: bool,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account; the provider decides whether confirmation is needed.
    async fn register(&self, request: &RegistrationRequest)
    -> Result<Registration, IdentityError>;

    /// Consume a confirmation code.
    async fn confirm(&self, request: &ConfirmationRequest)
    -> Result<Confirmation, IdentityError>;

    /// Exchange credentials for tokens. Wrong password and unknown user both
    /// yield [`IdentityError::InvalidCredentials`].
    async fn login(&self, request: &LoginRequest) -> Result<TokenBundle, IdentityError>;

    /// Exchange a refresh token for a new access token.
    async fn refresh(&self, request: &RefreshRequest) -> Result<TokenBundle, IdentityError>;

    /// Whether `refresh` needs the username to sign the request.
    fn refresh_requires_username(&self) -> bool {
        false
    }

    async fn current_user(&self, bearer_token: &str) -> Result<CurrentUserView, IdentityError>;

    /// Revoke every token issued for the session behind `bearer_token`.
    async fn logout(&self, bearer_token: &str) -> Result<Revocation, IdentityError>;
}

/// Join first and last names, `None` when both are absent.
pub(crate) fn display_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let joined = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() { None } else { Some(joined) }
}
