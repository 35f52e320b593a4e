//! Typed auth requests built from raw JSON bodies.

use secrecy::SecretString;
use utoipa::ToSchema;

use super::{Fields, Length, Payload, ValidationError};

const USERNAME_LENGTH: Length = Length::between(3, 50);
const PASSWORD_LENGTH: Length = Length::between(8, 256);
const NAME_LENGTH: Length = Length::between(1, 50);
// Login and refresh only require presence; policy checks there would leak which part was wrong.
const PRESENT: Length = Length::between(1, 256);
const OPAQUE_LENGTH: Length = Length::between(1, 4096);

#[derive(ToSchema, Debug)]
pub struct RegistrationRequest {
    /// Unique login handle.
    #[schema(example = "juanperez")]
    pub username: String,
    #[schema(example = "juan.perez@example.com")]
    pub email: String,
    /// At least 8 characters; the identity provider may enforce a stricter policy.
    #[schema(value_type = String, format = Password)]
    pub password: SecretString,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl RegistrationRequest {
    /// # Errors
    /// Returns every invalid or missing field.
    pub fn from_payload(payload: &Payload) -> Result<Self, ValidationError> {
        let mut fields = Fields::new(payload);
        let username = fields.text("username", USERNAME_LENGTH);
        let email = fields.email("email");
        let password = fields.secret("password", PASSWORD_LENGTH);
        let first_name = fields.optional_text("first_name", NAME_LENGTH);
        let last_name = fields.optional_text("last_name", NAME_LENGTH);

        match (username, email, password) {
            (Some(username), Some(email), Some(password)) if fields.is_clean() => Ok(Self {
                username,
                email,
                password: SecretString::from(password),
                first_name,
                last_name,
            }),
            _ => Err(fields.into_error()),
        }
    }
}

#[derive(ToSchema, Debug)]
pub struct ConfirmationRequest {
    pub username: String,
    /// Code delivered by the identity provider; expiry is enforced upstream.
    #[schema(example = "123456")]
    pub confirmation_code: String,
}

impl ConfirmationRequest {
    /// # Errors
    /// Returns every invalid or missing field.
    pub fn from_payload(payload: &Payload) -> Result<Self, ValidationError> {
        let mut fields = Fields::new(payload);
        let username = fields.text("username", PRESENT);
        let confirmation_code = fields.text("confirmation_code", OPAQUE_LENGTH);

        match (username, confirmation_code) {
            (Some(username), Some(confirmation_code)) if fields.is_clean() => Ok(Self {
                username,
                confirmation_code,
            }),
            _ => Err(fields.into_error()),
        }
    }
}

#[derive(ToSchema, Debug)]
pub struct LoginRequest {
    pub username: String,
    #[schema(value_type = String, format = Password)]
    pub password: SecretString,
}

impl LoginRequest {
    /// # Errors
    /// Returns every invalid or missing field.
    pub fn from_payload(payload: &Payload) -> Result<Self, ValidationError> {
        let mut fields = Fields::new(payload);
        let username = fields.text("username", PRESENT);
        let password = fields.secret("password", PRESENT);

        match (username, password) {
            (Some(username), Some(password)) if fields.is_clean() => Ok(Self {
                username,
                password: SecretString::from(password),
            }),
            _ => Err(fields.into_error()),
        }
    }
}

#[derive(ToSchema, Debug)]
pub struct RefreshRequest {
    pub refresh_token: String,
    /// Needed only when the identity provider client is configured with a secret.
    pub username: Option<String>,
}

impl RefreshRequest {
    /// # Errors
    /// Returns every invalid or missing field.
    pub fn from_payload(payload: &Payload) -> Result<Self, ValidationError> {
        let mut fields = Fields::new(payload);
        let refresh_token = fields.text("refresh_token", OPAQUE_LENGTH);
        let username = fields.optional_text("username", PRESENT);

        match refresh_token {
            Some(refresh_token) if fields.is_clean() => Ok(Self {
                refresh_token,
                username,
            }),
            _ => Err(fields.into_error()),
        }
    }
}
