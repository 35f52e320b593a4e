pub mod confirm;
pub mod contact;
pub mod health;
pub mod login;
pub mod logout;
pub mod me;
pub mod refresh;
pub mod register;
pub mod root;


// common types for the handlers
use axum::{
    Json,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::api::{
    email::EmailError,
    identity::IdentityError,
    validation::{FieldError, Payload, ValidationError},
};

/// Uniform success envelope.
#[derive(ToSchema, Serialize, Debug)]
pub struct Envelope<T> {
    #[schema(example = true)]
    pub success: bool,
    pub message: String,
    pub data: T,
}

/// Uniform failure envelope; `errors` is present only for validation failures.
#[derive(ToSchema, Serialize, Debug)]
pub struct ErrorEnvelope {
    #[schema(example = false)]
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// Every way a request can fail, each mapped to exactly one status.
#[derive(Debug)]
pub enum ApiError {
    /// Missing body, non-JSON body or JSON that is not an object.
    BadRequest(&'static str),
    Validation(ValidationError),
    /// Bearer token missing or malformed before reaching the identity provider.
    Unauthenticated(&'static str),
    Forbidden,
    Identity(IdentityError),
    Email(EmailError),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        Self::Identity(err)
    }
}

impl From<EmailError> for ApiError {
    fn from(err: EmailError) -> Self {
        Self::Email(err)
    }
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Identity(err) => match err {
                IdentityError::AlreadyExists => StatusCode::CONFLICT,
                IdentityError::WeakCredential | IdentityError::InvalidCode => {
                    StatusCode::BAD_REQUEST
                }
                IdentityError::NotFound => StatusCode::NOT_FOUND,
                IdentityError::InvalidCredentials
                | IdentityError::InvalidToken
                | IdentityError::Unauthorized => StatusCode::UNAUTHORIZED,
                IdentityError::NotConfirmed => StatusCode::FORBIDDEN,
                IdentityError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::Email(err) => match err {
                EmailError::ProviderRejected(_) => StatusCode::BAD_GATEWAY,
                EmailError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    /// Caller-facing message; provider details stay in the logs.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::BadRequest(message) | Self::Unauthenticated(message) => message,
            Self::Validation(_) => "Validation failed",
            Self::Forbidden => "Invalid or missing API key",
            Self::Identity(err) => match err {
                IdentityError::AlreadyExists => "Username or email already registered",
                IdentityError::WeakCredential => "Password does not meet the password policy",
                IdentityError::InvalidCode => "Invalid confirmation code",
                IdentityError::NotFound => "User not found",
                IdentityError::InvalidCredentials => "Invalid username or password",
                IdentityError::NotConfirmed => "User account is not confirmed",
                IdentityError::InvalidToken => "Invalid refresh token",
                IdentityError::Unauthorized => "Invalid or expired access token",
                IdentityError::UpstreamUnavailable(_) => "Identity service unavailable",
            },
            Self::Email(err) => match err {
                EmailError::ProviderRejected(_) => "Failed to send contact email",
                EmailError::UpstreamUnavailable(_) => "Email service unavailable",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message().to_string();

        if status.is_server_error() {
            warn!(%status, "request failed: {:?}", self);
        } else {
            debug!(%status, "request rejected: {}", message);
        }

        let errors = match self {
            Self::Validation(err) => Some(err.into_errors()),
            _ => None,
        };

        let body = ErrorEnvelope {
            success: false,
            message,
            errors,
        };

        (status, Json(body)).into_response()
    }
}

/// Success envelope with the given status.
pub(crate) fn respond<T: Serialize>(status: StatusCode, message: &str, data: T) -> Response {
    let body = Envelope {
        success: true,
        message: message.to_string(),
        data,
    };
    (status, Json(body)).into_response()
}

/// Accept only a JSON object as request body.
pub(crate) fn payload_from(payload: Option<Json<Value>>) -> Result<Payload, ApiError> {
    match payload {
        Some(Json(Value::Object(map))) => Ok(map),
        Some(_) => Err(ApiError::BadRequest("Request body must be a JSON object")),
        None => Err(ApiError::BadRequest("Missing or invalid JSON body")),
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(ApiError::Unauthenticated("Authorization header missing"))?
        .to_str()
        .map_err(|_| ApiError::Unauthenticated("Invalid authorization header"))?;

    let Some((scheme, token)) = value.split_once(' ') else {
        return Err(ApiError::Unauthenticated(
            "Invalid authorization header format. Expected 'Bearer <token>'",
        ));
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(ApiError::Unauthenticated(
            "Invalid authorization header format. Expected 'Bearer <token>'",
        ));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::Unauthenticated("Token is empty"));
    }
    Ok(token)
}
