//! Contact form submission.

use utoipa::ToSchema;

use super::{Fields, Length, Payload, ValidationError};

const FULL_NAME_LENGTH: Length = Length::between(2, 100);
const PHONE_LENGTH: Length = Length::between(10, 20);
/// Anything shorter is treated as noise.
pub const MESSAGE_MIN_LENGTH: usize = 10;
pub const MESSAGE_MAX_LENGTH: usize = 2000;
const MESSAGE_LENGTH: Length = Length::between(MESSAGE_MIN_LENGTH, MESSAGE_MAX_LENGTH);

#[derive(ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    #[schema(example = "Juan Pérez")]
    pub full_name: String,
    #[schema(example = "juan.perez@example.com")]
    pub email: String,
    #[schema(example = "+1234567890")]
    pub phone: Option<String>,
    #[schema(example = "Hola, me gustaría obtener más información.")]
    pub message: String,
}

impl ContactMessage {
    /// # Errors
    /// Returns every invalid or missing field.
    pub fn from_payload(payload: &Payload) -> Result<Self, ValidationError> {
        let mut fields = Fields::new(payload);
        let full_name = fields.text("full_name", FULL_NAME_LENGTH);
        let email = fields.email("email");
        let phone = fields.optional_text("phone", PHONE_LENGTH);
        let message = fields.text("message", MESSAGE_LENGTH);

        match (full_name, email, message) {
            (Some(full_name), Some(email), Some(message)) if fields.is_clean() => Ok(Self {
                full_name,
                email,
                phone,
                message,
            }),
            _ => Err(fields.into_error()),
        }
    }
}
