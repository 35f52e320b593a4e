//! Request validation layer.
//!
//! Handlers hand over the raw JSON object; the constructors in this module either
//! return a fully typed record or a [`ValidationError`] listing *every* offending
//! field. Records are never partially built, and nothing in here performs I/O.

pub mod auth;
pub mod contact;

pub use self::auth::{ConfirmationRequest, LoginRequest, RefreshRequest, RegistrationRequest};
pub use self::contact::ContactMessage;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Raw request body as received from the client.
pub type Payload = Map<String, Value>;

const EMAIL_MAX_LENGTH: usize = 254;

pub(crate) const REASON_REQUIRED: &str = "field required";
pub(crate) const REASON_NOT_STRING: &str = "must be a string";
pub(crate) const REASON_EMPTY: &str = "must not be empty";
pub(crate) const REASON_EMAIL: &str = "must be a valid email address";

/// One rejected field and the reason it was rejected.
#[derive(ToSchema, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

/// Every field-level failure found while building a record.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("request validation failed for {} field(s)", .errors.len())]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Names of the rejected fields, in the order they were checked.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|error| error.field.as_str()).collect()
    }

    #[must_use]
    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    /// A single absent field whose presence depends on runtime configuration.
    #[must_use]
    pub fn missing(field: &str) -> Self {
        Self {
            errors: vec![FieldError {
                field: field.to_string(),
                reason: REASON_REQUIRED.to_string(),
            }],
        }
    }
}

/// Email sanity check shared by registration and the contact form.
pub fn valid_email(email: &str) -> bool {
    email.len() <= EMAIL_MAX_LENGTH
        && Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Normalize an email before it is forwarded to a provider.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Character-length bounds for a text field.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Length {
    min: usize,
    max: Option<usize>,
}

impl Length {
    pub(crate) const fn between(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub(crate) const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    fn check(self, value: &str) -> Option<String> {
        let length = value.chars().count();
        if length < self.min {
            return Some(format!("must be at least {} characters", self.min));
        }
        match self.max {
            Some(max) if length > max => Some(format!("must be at most {max} characters")),
            _ => None,
        }
    }
}

/// Accumulates field errors while a record is assembled.
pub(crate) struct Fields<'a> {
    payload: &'a Payload,
    errors: Vec<FieldError>,
}

impl<'a> Fields<'a> {
    pub(crate) const fn new(payload: &'a Payload) -> Self {
        Self {
            payload,
            errors: Vec::new(),
        }
    }

    fn reject(&mut self, field: &str, reason: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            reason: reason.into(),
        });
    }

    /// Raw string value; `Ok(None)` when absent or `null`.
    fn raw(&mut self, field: &str) -> Result<Option<&'a str>, ()> {
        let payload = self.payload;
        match payload.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.as_str())),
            Some(_) => {
                self.reject(field, REASON_NOT_STRING);
                Err(())
            }
        }
    }

    /// Required text, trimmed.
    pub(crate) fn text(&mut self, field: &str, length: Length) -> Option<String> {
        match self.raw(field) {
            Ok(Some(value)) => {
                let value = value.trim();
                if value.is_empty() {
                    self.reject(field, REASON_EMPTY);
                    return None;
                }
                self.bounded(field, value, length)
            }
            Ok(None) => {
                self.reject(field, REASON_REQUIRED);
                None
            }
            Err(()) => None,
        }
    }

    /// Optional text, trimmed; blank strings count as absent.
    pub(crate) fn optional_text(&mut self, field: &str, length: Length) -> Option<String> {
        match self.raw(field) {
            Ok(Some(value)) if !value.trim().is_empty() => {
                self.bounded(field, value.trim(), length)
            }
            _ => None,
        }
    }

    /// Required secret, kept byte-for-byte (no trimming).
    pub(crate) fn secret(&mut self, field: &str, length: Length) -> Option<String> {
        match self.raw(field) {
            Ok(Some(value)) => {
                if value.trim().is_empty() {
                    self.reject(field, REASON_EMPTY);
                    return None;
                }
                self.bounded(field, value, length)
            }
            Ok(None) => {
                self.reject(field, REASON_REQUIRED);
                None
            }
            Err(()) => None,
        }
    }

    /// Required email address, normalized.
    pub(crate) fn email(&mut self, field: &str) -> Option<String> {
        let value = self.text(field, Length::at_least(1))?;
        let email = normalize_email(&value);
        if valid_email(&email) {
            Some(email)
        } else {
            self.reject(field, REASON_EMAIL);
            None
        }
    }

    fn bounded(&mut self, field: &str, value: &str, length: Length) -> Option<String> {
        if let Some(reason) = length.check(value) {
            self.reject(field, reason);
            None
        } else {
            Some(value.to_string())
        }
    }

    pub(crate) fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn into_error(self) -> ValidationError {
        ValidationError {
            errors: self.errors,
        }
    }
}
